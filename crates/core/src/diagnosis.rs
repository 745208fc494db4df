//! Diagnosis model - causal attribution of a failing run.

use serde::{Deserialize, Serialize};

/// Pipeline stage blamed for a shortfall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCategory {
    /// The right policy was never retrieved.
    RetrievalGap,
    /// The plan missed a step.
    PlanningGap,
    /// The answer was written badly from good findings.
    SynthesisGap,
}

impl FailureCategory {
    const KEYWORDS: [(FailureCategory, &'static [&'static str]); 3] = [
        (FailureCategory::RetrievalGap, &["search gap", "retriev"]),
        (FailureCategory::PlanningGap, &["planner", "planning"]),
        (FailureCategory::SynthesisGap, &["writer", "synthes"]),
    ];

    /// Infer the category from free diagnosis text; earliest mention wins.
    pub fn infer(text: &str) -> Option<Self> {
        let lower = text.to_lowercase();
        Self::KEYWORDS
            .iter()
            .filter_map(|(category, words)| {
                words
                    .iter()
                    .filter_map(|w| lower.find(w))
                    .min()
                    .map(|pos| (pos, *category))
            })
            .min_by_key(|(pos, _)| *pos)
            .map(|(_, category)| category)
    }

    /// Short label.
    pub fn label(&self) -> &'static str {
        match self {
            FailureCategory::RetrievalGap => "retrieval gap",
            FailureCategory::PlanningGap => "planning gap",
            FailureCategory::SynthesisGap => "synthesis gap",
        }
    }
}

impl std::fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Outcome of diagnosing a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnosis {
    /// Every dimension cleared the diagnostic bar.
    NoFailure,

    /// The diagnostician's verbatim explanation.
    Failure {
        /// Raw diagnosis text
        text: String,
        /// Category inferred from the text, if any
        category: Option<FailureCategory>,
    },

    /// The diagnostic call could not be completed.
    Unavailable,
}

impl Diagnosis {
    /// Placeholder text used when the diagnostic call fails.
    pub const UNAVAILABLE_TEXT: &'static str =
        "Diagnosis unavailable: the diagnostic model could not be reached.";

    /// Text reported for a passing run.
    pub const NO_FAILURE_TEXT: &'static str = "No failure: every dimension met the bar.";

    /// Wrap raw diagnostician output.
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        let category = FailureCategory::infer(&text);
        Self::Failure { text, category }
    }

    /// Text handed to the architect and reported to callers.
    pub fn text(&self) -> &str {
        match self {
            Diagnosis::NoFailure => Self::NO_FAILURE_TEXT,
            Diagnosis::Failure { text, .. } => text,
            Diagnosis::Unavailable => Self::UNAVAILABLE_TEXT,
        }
    }

    /// Inferred category, if any.
    pub fn category(&self) -> Option<FailureCategory> {
        match self {
            Diagnosis::Failure { category, .. } => *category,
            _ => None,
        }
    }

    /// Text truncated to at most `max_chars` characters.
    pub fn truncated(&self, max_chars: usize) -> String {
        self.text().chars().take(max_chars).collect()
    }
}

impl std::fmt::Display for Diagnosis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.text())
    }
}
