//! Diagnostician - attributes a failing run to a pipeline stage.

use async_trait::async_trait;
use genepool_core::{Diagnosis, ScoreModel};
use genepool_llm::{GenerationRequest, TextGenerator};
use std::sync::Arc;
use tracing::{info, warn};

use crate::analyzer::{feedback, shortfalls};

/// Derives a causal diagnosis for an underperforming run.
///
/// Never fails: an unreachable model yields [`Diagnosis::Unavailable`].
#[async_trait]
pub trait Diagnostician: Send + Sync {
    /// Diagnose why `response` to `request` earned `scores`.
    async fn diagnose(&self, request: &str, response: &str, scores: &ScoreModel) -> Diagnosis;
}

/// Build the diagnostic prompt.
pub fn diagnosis_prompt(request: &str, response: &str, feedback: &str) -> String {
    format!(
        "You are a Senior Compliance Auditor and System Diagnostician.\n\
         A junior AI assistant failed to answer a compliance question correctly.\n\
         \n\
         User Request: {request}\n\
         Assistant Response: {response}\n\
         \n\
         Auditor's Feedback:\n\
         {feedback}\n\
         \n\
         Diagnose the root cause. Was it:\n\
         1. A failure to Retrieve the right policy? (Search Gap)\n\
         2. A failure to Plan the right steps? (Planner Gap)\n\
         3. A failure to Synthesize the answer correctly? (Writer Gap)\n\
         \n\
         Provide a concise diagnosis (max 2 sentences) explaining exactly what instruction was missing or misinterpreted."
    )
}

/// Diagnostician backed by an external model.
pub struct LlmDiagnostician {
    director: Arc<dyn TextGenerator>,
}

impl LlmDiagnostician {
    /// Create a new diagnostician.
    pub fn new(director: Arc<dyn TextGenerator>) -> Self {
        Self { director }
    }
}

#[async_trait]
impl Diagnostician for LlmDiagnostician {
    async fn diagnose(&self, request: &str, response: &str, scores: &ScoreModel) -> Diagnosis {
        let failing = shortfalls(scores);
        if failing.is_empty() {
            info!("All dimensions cleared the diagnostic bar");
            return Diagnosis::NoFailure;
        }

        let prompt = diagnosis_prompt(request, response, &feedback(&failing));
        match self.director.generate(&GenerationRequest::text(prompt)).await {
            Ok(text) => {
                let diagnosis = Diagnosis::from_text(text);
                info!(
                    "Diagnosed {} failing dimension(s), category: {}",
                    failing.len(),
                    diagnosis.category().map(|c| c.label()).unwrap_or("unclassified")
                );
                diagnosis
            }
            Err(e) => {
                warn!("Diagnostic call failed: {}", e);
                Diagnosis::Unavailable
            }
        }
    }
}
