//! Identifiers for genomes and evolution runs.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use ulid::Ulid;

/// Identifier of one genome generation, of the form `v<N>`.
///
/// Ids are ordered by their numeric suffix, so `v10` sorts after `v2`.
/// Ids that do not follow the `v<digits>` shape can still exist in a loaded
/// pool; they sort as suffix 0.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GenomeId(String);

/// Error returned when strictly parsing a genome id.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed genome id '{0}': expected v<N>")]
pub struct MalformedGenomeId(pub String);

impl GenomeId {
    /// The reserved baseline id.
    pub const BASELINE: &'static str = "v0";

    /// Id of the baseline generation.
    pub fn baseline() -> Self {
        Self(Self::BASELINE.to_string())
    }

    /// Id for generation `n`.
    pub fn version(n: u64) -> Self {
        Self(format!("v{}", n))
    }

    /// Wrap a raw id without validating it.
    ///
    /// Used for keys read back from storage, which may be malformed.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Numeric suffix if the id is well-formed.
    pub fn number(&self) -> Option<u64> {
        let digits = self.0.strip_prefix('v')?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok()
    }

    /// Key used for ordering: the numeric suffix, or 0 for malformed ids.
    pub fn sort_key(&self) -> u64 {
        self.number().unwrap_or(0)
    }

    /// Whether the id has the `v<N>` shape.
    pub fn is_well_formed(&self) -> bool {
        self.number().is_some()
    }

    /// The id that follows this one numerically.
    pub fn successor(&self) -> Self {
        Self::version(self.sort_key() + 1)
    }

    /// Borrow the raw string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Ord for GenomeId {
    fn cmp(&self, other: &Self) -> Ordering {
        // Well-formed ids rank above malformed ones sharing the same key.
        self.sort_key()
            .cmp(&other.sort_key())
            .then_with(|| self.is_well_formed().cmp(&other.is_well_formed()))
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for GenomeId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl std::fmt::Display for GenomeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for GenomeId {
    type Err = MalformedGenomeId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = Self(s.trim().to_string());
        if id.is_well_formed() {
            Ok(id)
        } else {
            Err(MalformedGenomeId(s.to_string()))
        }
    }
}

/// Unique identifier for one convergence run, used to correlate log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(Ulid);

impl RunId {
    /// Generate a new RunId
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
