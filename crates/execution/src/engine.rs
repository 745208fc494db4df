//! The convergence loop - evolves genomes until every dimension passes.

use crate::pipeline::Pipeline;
use genepool_core::{CycleStatus, EvolutionCycle, Genome, GenomeId, RunId, ScoreModel};
use genepool_evolution::Architect;
use genepool_quality::Evaluator;
use genepool_reflection::Diagnostician;
use genepool_storage::{GenomeStore, StorageError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, info_span, warn, Instrument};

/// The collaborators an evolution step talks to.
#[derive(Clone)]
pub struct Agents {
    /// Produces answers under a genome
    pub pipeline: Arc<dyn Pipeline>,
    /// Grades answers
    pub evaluator: Arc<dyn Evaluator>,
    /// Explains failing grades
    pub diagnostician: Arc<dyn Diagnostician>,
    /// Rewrites genomes
    pub architect: Arc<dyn Architect>,
}

/// Configuration for the convergence loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    /// Minimum score every dimension must reach
    pub threshold: f64,
    /// Iteration budget
    pub max_iterations: usize,
    /// Request the loop optimises for
    pub request: String,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            threshold: 3.75,
            max_iterations: 5,
            request: "Can I use ChatGPT for personal work?".to_string(),
        }
    }
}

/// Errors that abort a convergence run.
#[derive(Debug, thiserror::Error)]
pub enum LoopError {
    /// A new generation could not be stored
    #[error("failed to persist new generation: {0}")]
    Persistence(#[from] StorageError),
}

/// How a convergence run ended.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopOutcome {
    /// Run identifier
    pub run_id: RunId,
    /// `Converged` or `Exhausted`
    pub status: CycleStatus,
    /// Genome under test when the run stopped
    pub genome_id: GenomeId,
    /// Iterations started
    pub iterations: usize,
    /// Generations stored during the run, in order
    pub generations: Vec<GenomeId>,
    /// Scores of the last evaluated iteration
    pub last_scores: Option<ScoreModel>,
}

/// Drives the test, grade, diagnose, mutate cycle.
///
/// ```text
/// Run pipeline → Evaluate → (all pass? stop) → Diagnose → Mutate → Persist
/// ```
pub struct ConvergenceLoop {
    store: Arc<dyn GenomeStore>,
    agents: Agents,
    config: LoopConfig,
}

impl ConvergenceLoop {
    /// Create a new loop over `store`.
    pub fn new(store: Arc<dyn GenomeStore>, agents: Agents) -> Self {
        Self {
            store,
            agents,
            config: LoopConfig::default(),
        }
    }

    /// Set the configuration.
    pub fn with_config(mut self, config: LoopConfig) -> Self {
        self.config = config;
        self
    }

    /// Run from the latest stored genome until convergence or exhaustion.
    pub async fn run(&self) -> Result<LoopOutcome, LoopError> {
        let (genome_id, genome) = self.store.latest().await;
        let mut cycle = EvolutionCycle::start(genome_id);
        let span = info_span!("evolution", run_id = %cycle.run_id);
        self.drive(&mut cycle, genome).instrument(span).await
    }

    async fn drive(&self, cycle: &mut EvolutionCycle, mut genome: Genome) -> Result<LoopOutcome, LoopError> {
        let request = self.config.request.as_str();
        let mut generations = Vec::new();
        let mut last_scores = None;

        info!(
            "Starting evolution from {} (threshold {}, budget {})",
            cycle.genome_id, self.config.threshold, self.config.max_iterations
        );

        while cycle.iteration < self.config.max_iterations {
            let iteration = cycle.advance();
            info!("Iteration {}/{} testing {}", iteration, self.config.max_iterations, cycle.genome_id);

            // 1. Test
            let run = match self.agents.pipeline.run(request, &genome).await {
                Ok(run) => run,
                Err(e) => {
                    error!("Pipeline failed on iteration {}: {}", iteration, e);
                    continue;
                }
            };

            // 2. Evaluate
            let scores = self
                .agents
                .evaluator
                .evaluate(request, &run.response, &run.context())
                .await;
            info!("Scores: {}", scores.summary());
            for (dimension, grade) in scores.dimensions() {
                debug!("{}: {}/5 - {}", dimension, grade.score, grade.reasoning);
            }

            if scores.all_pass(self.config.threshold) {
                cycle.converge();
                last_scores = Some(scores);
                break;
            }

            // 3. Diagnose
            let diagnosis = self
                .agents
                .diagnostician
                .diagnose(request, &run.response, &scores)
                .await;
            info!("Diagnosis: {}", diagnosis.truncated(200));

            // 4. Mutate and persist
            let candidate = self.agents.architect.mutate(&genome, &diagnosis).await;
            let next_id = self.store.append(candidate.clone()).await?;
            info!("Stored generation {}", next_id);

            genome = candidate;
            cycle.adopt(next_id.clone());
            generations.push(next_id);
            last_scores = Some(scores);
        }

        if cycle.is_finished() {
            info!("Converged on {} after {} iteration(s)", cycle.genome_id, cycle.iteration);
        } else {
            cycle.exhaust();
            warn!(
                "Iteration budget spent without convergence; stopping at {}",
                cycle.genome_id
            );
        }

        Ok(LoopOutcome {
            run_id: cycle.run_id,
            status: cycle.status,
            genome_id: cycle.genome_id.clone(),
            iterations: cycle.iteration,
            generations,
            last_scores,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{agents, fixed_scores, ScriptedPipeline};
    use genepool_storage::JsonGenomeStore;

    async fn open_store(dir: &tempfile::TempDir) -> Arc<JsonGenomeStore> {
        Arc::new(
            JsonGenomeStore::open(dir.path().join("sop_gene_pool.json"))
                .await
                .unwrap(),
        )
    }

    fn ids(raw: &[&str]) -> Vec<GenomeId> {
        raw.iter().map(|r| GenomeId::from_raw(*r)).collect()
    }

    #[tokio::test]
    async fn test_passing_first_run_converges_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir).await;
        let (agents, calls) = agents(ScriptedPipeline::answering(), fixed_scores(vec![5]));

        let outcome = ConvergenceLoop::new(store.clone(), agents).run().await.unwrap();

        assert_eq!(outcome.status, CycleStatus::Converged);
        assert_eq!(outcome.genome_id, GenomeId::baseline());
        assert_eq!(outcome.iterations, 1);
        assert!(outcome.generations.is_empty());
        assert_eq!(calls.diagnoses(), 0);
        assert_eq!(calls.mutations(), 0);
        assert_eq!(store.all_ids().await, ids(&["v0"]));
    }

    #[tokio::test]
    async fn test_all_fours_clear_default_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir).await;
        let (agents, calls) = agents(ScriptedPipeline::answering(), fixed_scores(vec![4]));

        let outcome = ConvergenceLoop::new(store, agents).run().await.unwrap();

        assert_eq!(outcome.status, CycleStatus::Converged);
        assert_eq!(outcome.iterations, 1);
        assert_eq!(calls.mutations(), 0);
    }

    #[tokio::test]
    async fn test_never_passing_exhausts_budget() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir).await;
        let (agents, calls) = agents(ScriptedPipeline::answering(), fixed_scores(vec![1]));

        let outcome = ConvergenceLoop::new(store.clone(), agents).run().await.unwrap();

        assert_eq!(outcome.status, CycleStatus::Exhausted);
        assert_eq!(outcome.iterations, 5);
        assert_eq!(outcome.genome_id, GenomeId::version(5));
        assert_eq!(outcome.generations, ids(&["v1", "v2", "v3", "v4", "v5"]));
        assert_eq!(calls.diagnoses(), 5);
        assert_eq!(calls.mutations(), 5);
        assert_eq!(store.len().await, 6);
    }

    #[tokio::test]
    async fn test_converges_on_second_generation() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir).await;
        let (agents, calls) = agents(ScriptedPipeline::answering(), fixed_scores(vec![1, 1, 5]));

        let outcome = ConvergenceLoop::new(store.clone(), agents).run().await.unwrap();

        assert_eq!(outcome.status, CycleStatus::Converged);
        assert_eq!(outcome.genome_id, GenomeId::version(2));
        assert_eq!(outcome.iterations, 3);
        assert_eq!(store.all_ids().await, ids(&["v0", "v1", "v2"]));
        assert_eq!(calls.mutations(), 2);

        // The converged genome is the one the pipeline saw last.
        let v2 = store.get(&GenomeId::version(2)).await.unwrap();
        assert_eq!(calls.last_tested_planner().as_deref(), Some(v2.planner_instruction()));
    }

    #[tokio::test]
    async fn test_pipeline_failure_consumes_iteration() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir).await;
        let pipeline = ScriptedPipeline::failing_first(1);
        let (agents, calls) = agents(pipeline, fixed_scores(vec![5]));

        let outcome = ConvergenceLoop::new(store.clone(), agents).run().await.unwrap();

        assert_eq!(outcome.status, CycleStatus::Converged);
        assert_eq!(outcome.iterations, 2);
        assert_eq!(outcome.genome_id, GenomeId::baseline());
        assert_eq!(calls.evaluations(), 1);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_failing_pipeline_exhausts_without_new_genomes() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir).await;
        let (agents, calls) = agents(ScriptedPipeline::failing_first(usize::MAX), fixed_scores(vec![5]));
        let config = LoopConfig {
            max_iterations: 3,
            ..LoopConfig::default()
        };

        let outcome = ConvergenceLoop::new(store.clone(), agents)
            .with_config(config)
            .run()
            .await
            .unwrap();

        assert_eq!(outcome.status, CycleStatus::Exhausted);
        assert_eq!(outcome.iterations, 3);
        assert!(outcome.last_scores.is_none());
        assert_eq!(calls.evaluations(), 0);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_resumes_from_latest_generation() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir).await;
        store
            .add(GenomeId::version(3), Genome::new("plan v3", "write v3").unwrap())
            .await
            .unwrap();
        let (agents, calls) = agents(ScriptedPipeline::answering(), fixed_scores(vec![2, 5]));

        let outcome = ConvergenceLoop::new(store.clone(), agents).run().await.unwrap();

        assert_eq!(outcome.status, CycleStatus::Converged);
        assert_eq!(outcome.generations, ids(&["v4"]));
        assert_eq!(outcome.genome_id, GenomeId::version(4));
        assert_eq!(calls.mutations(), 1);
    }

    #[tokio::test]
    async fn test_zero_budget_exhausts_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir).await;
        let (agents, calls) = agents(ScriptedPipeline::answering(), fixed_scores(vec![5]));
        let config = LoopConfig {
            max_iterations: 0,
            ..LoopConfig::default()
        };

        let outcome = ConvergenceLoop::new(store, agents).with_config(config).run().await.unwrap();

        assert_eq!(outcome.status, CycleStatus::Exhausted);
        assert_eq!(outcome.iterations, 0);
        assert_eq!(calls.runs(), 0);
    }

    #[tokio::test]
    async fn test_persist_failure_stops_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("data");
        let store = Arc::new(
            JsonGenomeStore::open(data_dir.join("sop_gene_pool.json"))
                .await
                .unwrap(),
        );
        std::fs::remove_dir_all(&data_dir).unwrap();
        std::fs::write(&data_dir, "blocker").unwrap();
        let (agents, calls) = agents(ScriptedPipeline::answering(), fixed_scores(vec![1]));

        let result = ConvergenceLoop::new(store.clone(), agents).run().await;

        assert!(matches!(result, Err(LoopError::Persistence(_))));
        assert_eq!(calls.runs(), 1);
        assert_eq!(calls.mutations(), 1);
        assert_eq!(store.all_ids().await, ids(&["v0"]));
    }
}
