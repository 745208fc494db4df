//! Genome storage for Genepool.
//!
//! This crate provides a trait-based store for versioned genomes with a
//! single-file JSON implementation, plus a read-only catalog surface.

#![warn(missing_docs)]

pub mod trait_;
pub mod json_storage;
pub mod catalog;

pub use trait_::{GenomeStore, StorageError, Result};
pub use json_storage::JsonGenomeStore;
pub use catalog::{GenomeCatalog, GenomeEntry, HealthReport, LookupError, VersionListing};
