//! Execution layer - the convergence loop and single-step evolution service.

#![warn(missing_docs)]

pub mod pipeline;
pub mod engine;
pub mod service;

#[cfg(test)]
mod testing;

pub use pipeline::{HttpPipeline, Pipeline, PipelineConfig, PipelineError};
pub use engine::{Agents, ConvergenceLoop, LoopConfig, LoopError, LoopOutcome};
pub use service::{EvolutionError, EvolutionReport, EvolutionService, QueryAnswer, REPORT_TEXT_LIMIT};
