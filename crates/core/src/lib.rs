//! Genepool core data models.
//!
//! This crate defines the data structures shared by the evolution engine:
//! genomes and their ids, the multi-dimensional score model, diagnoses, and
//! the ephemeral state of a convergence run.

#![warn(missing_docs)]

// Identities
mod id;

// Genome
mod genome;

// Evaluation and diagnosis
mod score;
mod diagnosis;

// Runs
mod cycle;
mod run;

// Re-exports
pub use id::{GenomeId, MalformedGenomeId, RunId};
pub use genome::{Genome, GenomeError, GenomeRecord, ModelId, DEFAULT_RETRIEVAL_BREADTH};
pub use score::{Dimension, GradedScore, ScoreModel, ScoreSummary, MAX_SCORE, MIN_SCORE};
pub use diagnosis::{Diagnosis, FailureCategory};
pub use cycle::{CycleStatus, EvolutionCycle};
pub use run::{AgentFinding, PipelineRun};

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;
