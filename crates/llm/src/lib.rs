//! External text generation for Genepool.
//!
//! Provides the text-generation contract used by the judges, the
//! diagnostician and the architect, an Ollama-backed implementation, and
//! the structured-output decoder that turns free model text into records.

#![warn(missing_docs)]

pub mod client;
pub mod decode;
pub mod ollama;

pub use client::{GenerationRequest, LlmError, OutputFormat, Result, TextGenerator};
pub use decode::{decode, preview, Decoded, Field, Record};
pub use ollama::{OllamaClient, OllamaConfig};
