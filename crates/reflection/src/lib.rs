//! Reflection layer - diagnoses why a run fell short.

#![warn(missing_docs, unused_crate_dependencies)]

mod engine;
mod analyzer;

pub use engine::{diagnosis_prompt, Diagnostician, LlmDiagnostician};
pub use analyzer::{feedback, shortfalls, Shortfall, DIAGNOSTIC_BAR};
