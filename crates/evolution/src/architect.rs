//! Architect - derives the next genome from the current one and a diagnosis.

use async_trait::async_trait;
use genepool_core::{Diagnosis, Genome};
use genepool_llm::{decode, GenerationRequest, TextGenerator};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Key holding a revised planner instruction.
const PLANNER_KEY: &str = "plannerInstruction";

/// Key holding a revised synthesizer instruction.
const SYNTHESIZER_KEY: &str = "synthesizerInstruction";

/// Produces a candidate next-generation genome.
///
/// Mutation only touches instructions and never fails: on total failure the
/// input genome is returned unchanged.
#[async_trait]
pub trait Architect: Send + Sync {
    /// Propose the next genome.
    async fn mutate(&self, genome: &Genome, diagnosis: &Diagnosis) -> Genome;
}

/// Configuration for the architect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchitectConfig {
    /// Attempts before giving up and keeping the current genome
    pub max_attempts: usize,
}

impl Default for ArchitectConfig {
    fn default() -> Self {
        Self { max_attempts: 3 }
    }
}

/// Build the mutation prompt.
pub fn mutation_prompt(genome: &Genome, diagnosis: &Diagnosis) -> String {
    format!(
        "You are the Architect of a Compliance AI System.\n\
         The current system failed a recent test.\n\
         \n\
         Diagnosis of Failure:\n\
         {diagnosis}\n\
         \n\
         Current Planner Instruction:\n\
         \"{planner}\"\n\
         \n\
         Current Synthesizer Instruction:\n\
         \"{synthesizer}\"\n\
         \n\
         Your Task:\n\
         Rewrite ONE or BOTH of the instructions to fix this failure.\n\
         - If the Planner missed a step, update the Planner Instruction.\n\
         - If the Synthesizer missed a constraint, update the Synthesizer Instruction.\n\
         - Change only what is necessary and keep all unrelated guidance.\n\
         - Be specific and directive.\n\
         \n\
         Respond in JSON with the revised instructions. Omit a key to keep that instruction unchanged:\n\
         {{\n    \"{PLANNER_KEY}\": \"...\",\n    \"{SYNTHESIZER_KEY}\": \"...\"\n}}",
        diagnosis = diagnosis.text(),
        planner = genome.planner_instruction(),
        synthesizer = genome.synthesizer_instruction(),
    )
}

/// Architect backed by an external model.
pub struct LlmArchitect {
    director: Arc<dyn TextGenerator>,
    config: ArchitectConfig,
}

impl LlmArchitect {
    /// Create a new architect.
    pub fn new(director: Arc<dyn TextGenerator>) -> Self {
        Self {
            director,
            config: ArchitectConfig::default(),
        }
    }

    /// Set the configuration.
    pub fn with_config(mut self, config: ArchitectConfig) -> Self {
        self.config = config;
        self
    }
}

#[async_trait]
impl Architect for LlmArchitect {
    async fn mutate(&self, genome: &Genome, diagnosis: &Diagnosis) -> Genome {
        let request = GenerationRequest::json(mutation_prompt(genome, diagnosis));

        for attempt in 1..=self.config.max_attempts {
            let raw = match self.director.generate(&request).await {
                Ok(raw) => raw,
                Err(e) => {
                    warn!("Mutation attempt {}/{} failed: {}", attempt, self.config.max_attempts, e);
                    continue;
                }
            };

            let decoded = decode(&raw);
            if decoded.is_empty() {
                warn!(
                    "Mutation attempt {}/{} produced no usable record",
                    attempt, self.config.max_attempts
                );
                continue;
            }

            let planner = decoded.str_field(PLANNER_KEY).present();
            let synthesizer = decoded.str_field(SYNTHESIZER_KEY).present();
            debug!(
                "Mutation revises planner: {}, synthesizer: {}",
                planner.is_some(),
                synthesizer.is_some()
            );

            let next = genome.with_instructions(planner, synthesizer);
            info!("Architect produced a candidate genome on attempt {}", attempt);
            return next;
        }

        error!(
            "Mutation exhausted {} attempts; keeping the current genome",
            self.config.max_attempts
        );
        genome.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use genepool_core::ModelId;
    use genepool_llm::LlmError;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct ScriptedDirector {
        outputs: Mutex<VecDeque<Option<String>>>,
        calls: Mutex<usize>,
    }

    impl ScriptedDirector {
        fn new(outputs: Vec<Option<&str>>) -> Arc<Self> {
            Arc::new(Self {
                outputs: Mutex::new(outputs.into_iter().map(|o| o.map(str::to_string)).collect()),
                calls: Mutex::new(0),
            })
        }

        fn calls(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedDirector {
        async fn generate(&self, _request: &GenerationRequest) -> genepool_llm::Result<String> {
            *self.calls.lock().unwrap() += 1;
            match self.outputs.lock().unwrap().pop_front().flatten() {
                Some(text) => Ok(text),
                None => Err(LlmError::Other("unavailable".to_string())),
            }
        }
    }

    fn diagnosis() -> Diagnosis {
        Diagnosis::from_text("Writer Gap: the answer omitted policy citations.")
    }

    #[tokio::test]
    async fn test_partial_update_keeps_other_instruction() {
        let director = ScriptedDirector::new(vec![Some(
            r#"{"synthesizerInstruction": "Always cite [POL-nnn] for every claim."}"#,
        )]);
        let architect = LlmArchitect::new(director.clone());
        let genome = Genome::baseline();

        let next = architect.mutate(&genome, &diagnosis()).await;

        assert_eq!(next.synthesizer_instruction(), "Always cite [POL-nnn] for every claim.");
        assert_eq!(next.planner_instruction(), genome.planner_instruction());
        assert_eq!(director.calls(), 1);
    }

    #[tokio::test]
    async fn test_strategy_fields_are_preserved() {
        let director = ScriptedDirector::new(vec![Some(
            "```json\n{\"plannerInstruction\": \"p2\", \"synthesizerInstruction\": \"s2\", \"retrievalBreadth\": 9, \"conflictCheckEnabled\": false}\n```",
        )]);
        let architect = LlmArchitect::new(director);
        let genome = Genome::new("p1", "s1")
            .unwrap()
            .with_strategy(3, true, ModelId::Qwen25)
            .unwrap();

        let next = architect.mutate(&genome, &diagnosis()).await;

        assert_eq!(next.planner_instruction(), "p2");
        assert_eq!(next.synthesizer_instruction(), "s2");
        assert_eq!(next.retrieval_breadth(), 3);
        assert!(next.conflict_check_enabled());
        assert_eq!(next.synthesizer_model(), ModelId::Qwen25);
    }

    #[tokio::test]
    async fn test_exhaustion_returns_input_unchanged() {
        let director = ScriptedDirector::new(vec![
            Some("I would rather not."),
            None,
            Some("{}"),
            Some(r#"{"plannerInstruction": "too late"}"#),
        ]);
        let architect = LlmArchitect::new(director.clone());
        let genome = Genome::baseline();

        let next = architect.mutate(&genome, &diagnosis()).await;

        assert_eq!(next, genome);
        assert_eq!(director.calls(), 3);
    }

    #[tokio::test]
    async fn test_retry_recovers_on_later_attempt() {
        let director = ScriptedDirector::new(vec![
            None,
            Some(r#"{"plannerInstruction": "Plan a SQL lookup for retention."}"#),
        ]);
        let architect = LlmArchitect::new(director.clone());

        let next = architect.mutate(&Genome::baseline(), &diagnosis()).await;

        assert_eq!(next.planner_instruction(), "Plan a SQL lookup for retention.");
        assert_eq!(director.calls(), 2);
    }

    #[tokio::test]
    async fn test_configured_attempts() {
        let director = ScriptedDirector::new(vec![None, None, None, None, None]);
        let architect = LlmArchitect::new(director.clone())
            .with_config(ArchitectConfig { max_attempts: 5 });

        let genome = Genome::baseline();
        assert_eq!(architect.mutate(&genome, &diagnosis()).await, genome);
        assert_eq!(director.calls(), 5);
    }

    #[test]
    fn test_prompt_carries_context() {
        let genome = Genome::new("plan carefully", "write clearly").unwrap();
        let prompt = mutation_prompt(&genome, &diagnosis());
        assert!(prompt.contains("Writer Gap"));
        assert!(prompt.contains("\"plan carefully\""));
        assert!(prompt.contains("\"write clearly\""));
        assert!(prompt.contains("\"plannerInstruction\""));
        assert!(prompt.contains("\"synthesizerInstruction\""));
    }
}
