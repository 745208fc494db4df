//! Collects the failing dimensions of a score model into auditor feedback.

use genepool_core::{Dimension, ScoreModel};

/// Grades below this count as failing for diagnosis purposes.
pub const DIAGNOSTIC_BAR: u8 = 4;

/// One failing dimension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shortfall {
    /// Dimension that failed
    pub dimension: Dimension,
    /// Its grade
    pub score: u8,
    /// Judge's justification
    pub reasoning: String,
}

impl std::fmt::Display for Shortfall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}/5): {}", self.dimension, self.score, self.reasoning)
    }
}

/// Dimensions of `scores` graded below [`DIAGNOSTIC_BAR`], in vector order.
pub fn shortfalls(scores: &ScoreModel) -> Vec<Shortfall> {
    scores
        .failing(DIAGNOSTIC_BAR)
        .into_iter()
        .map(|(dimension, grade)| Shortfall {
            dimension,
            score: grade.score,
            reasoning: grade.reasoning.clone(),
        })
        .collect()
}

/// Feedback block listing each shortfall on its own line.
pub fn feedback(shortfalls: &[Shortfall]) -> String {
    shortfalls
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}
