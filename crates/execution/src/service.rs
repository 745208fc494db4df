//! Request-facing operations: answer a question, evolve one generation.

use crate::engine::Agents;
use crate::pipeline::PipelineError;
use genepool_core::{AgentFinding, Genome, GenomeId, RunId, ScoreSummary, Time};
use genepool_storage::{GenomeStore, LookupError, StorageError};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, info_span, Instrument};

/// Longest text returned for findings and diagnoses.
pub const REPORT_TEXT_LIMIT: usize = 500;

/// Errors surfaced by the service.
#[derive(Debug, thiserror::Error)]
pub enum EvolutionError {
    /// The requested genome could not be resolved
    #[error(transparent)]
    Lookup(#[from] LookupError),

    /// The pipeline could not answer
    #[error("Agent execution failed: {0}")]
    Pipeline(#[from] PipelineError),

    /// The new generation could not be stored
    #[error("failed to persist new generation: {0}")]
    Persistence(#[from] StorageError),
}

/// Answer to a user question.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryAnswer {
    /// Final answer
    pub answer: String,
    /// Genome the answer was produced under
    pub genome_version: GenomeId,
    /// Per-agent findings, each truncated
    pub agent_outputs: Vec<AgentFinding>,
    /// When the answer was produced
    pub timestamp: Time,
}

/// Outcome of a single evolution step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvolutionReport {
    /// Genome that was tested
    pub previous_version: GenomeId,
    /// Generation that was stored
    pub new_version: GenomeId,
    /// Truncated diagnosis text
    pub diagnosis: String,
    /// Grades of the tested genome
    pub scores: ScoreSummary,
    /// When the step finished
    pub timestamp: Time,
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Single-shot operations over a shared store.
#[derive(Clone)]
pub struct EvolutionService {
    store: Arc<dyn GenomeStore>,
    agents: Agents,
}

impl EvolutionService {
    /// Create a new service.
    pub fn new(store: Arc<dyn GenomeStore>, agents: Agents) -> Self {
        Self { store, agents }
    }

    /// Resolve an explicit id, or the latest genome when none is given.
    async fn resolve(&self, raw_id: Option<&str>) -> Result<(GenomeId, Genome), LookupError> {
        let Some(raw_id) = raw_id else {
            return Ok(self.store.latest().await);
        };
        let id: GenomeId = raw_id.parse()?;
        match self.store.get(&id).await {
            Some(genome) => Ok((id, genome)),
            None => Err(LookupError::NotFound(id)),
        }
    }

    /// Run `request` through the pipeline under the chosen genome.
    pub async fn answer(&self, request: &str, genome_id: Option<&str>) -> Result<QueryAnswer, EvolutionError> {
        let (id, genome) = self.resolve(genome_id).await?;
        info!("Answering request under {}", id);

        let run = self.agents.pipeline.run(request, &genome).await?;
        let agent_outputs = run
            .findings
            .into_iter()
            .map(|f| AgentFinding {
                findings: truncate(&f.findings, REPORT_TEXT_LIMIT),
                agent: f.agent,
            })
            .collect();

        Ok(QueryAnswer {
            answer: run.response,
            genome_version: id,
            agent_outputs,
            timestamp: chrono::Utc::now(),
        })
    }

    /// Test, grade, diagnose and mutate once, storing the result as a new
    /// generation regardless of the grades.
    pub async fn evolve_once(
        &self,
        request: &str,
        genome_id: Option<&str>,
    ) -> Result<EvolutionReport, EvolutionError> {
        let span = info_span!("evolve", run_id = %RunId::new());
        self.step(request, genome_id).instrument(span).await
    }

    async fn step(&self, request: &str, genome_id: Option<&str>) -> Result<EvolutionReport, EvolutionError> {
        let (previous_version, genome) = self.resolve(genome_id).await?;
        info!("Evolving {}", previous_version);

        let run = self.agents.pipeline.run(request, &genome).await?;
        let scores = self
            .agents
            .evaluator
            .evaluate(request, &run.response, &run.context())
            .await;
        info!("Scores: {}", scores.summary());

        let diagnosis = self
            .agents
            .diagnostician
            .diagnose(request, &run.response, &scores)
            .await;
        let candidate = self.agents.architect.mutate(&genome, &diagnosis).await;

        let new_version = self.store.append(candidate).await?;
        info!("Stored generation {}", new_version);

        Ok(EvolutionReport {
            previous_version,
            new_version,
            diagnosis: diagnosis.truncated(REPORT_TEXT_LIMIT),
            scores: scores.summary(),
            timestamp: chrono::Utc::now(),
        })
    }
}
