//! Evolution layer - rewrites genome instructions from a diagnosis.

#![warn(missing_docs, unused_crate_dependencies)]

mod architect;

pub use architect::{mutation_prompt, Architect, ArchitectConfig, LlmArchitect};
