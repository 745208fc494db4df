//! Quality evaluation for Genepool runs.
//!
//! Grades a pipeline response along four dimensions: three through an
//! external judging model and citation fidelity through a deterministic check.

#![warn(missing_docs)]

pub mod citations;
pub mod engine;

pub use citations::{citation_fidelity, ratio_to_score, verify_citations, CitationReport};
pub use engine::{grade_from_output, judge_prompt, Evaluator, LlmEvaluator};
