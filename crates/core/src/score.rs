//! Score model - multi-dimensional evaluation of one pipeline run.

use serde::{Deserialize, Serialize};

/// Lowest grade a dimension can receive.
pub const MIN_SCORE: u8 = 1;

/// Highest grade a dimension can receive.
pub const MAX_SCORE: u8 = 5;

/// The graded quality dimensions, in vector order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    /// Does the response address the request correctly?
    Accuracy,
    /// Are cited fragments actually backed by the context?
    CitationFidelity,
    /// Did the response miss constraints present in the context?
    Completeness,
    /// Is the tone professional and appropriate?
    RegulatoryTone,
}

impl Dimension {
    /// All dimensions in vector order.
    pub const ALL: [Dimension; 4] = [
        Dimension::Accuracy,
        Dimension::CitationFidelity,
        Dimension::Completeness,
        Dimension::RegulatoryTone,
    ];

    /// Human readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Dimension::Accuracy => "Accuracy",
            Dimension::CitationFidelity => "Citations",
            Dimension::Completeness => "Completeness",
            Dimension::RegulatoryTone => "Tone",
        }
    }
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A single dimension grade with its justification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradedScore {
    /// Grade in `[1, 5]`
    pub score: u8,

    /// Justification for the grade
    pub reasoning: String,
}

impl GradedScore {
    /// Create a grade, clamping the score into `[1, 5]`.
    pub fn new(score: u8, reasoning: impl Into<String>) -> Self {
        Self {
            score: score.clamp(MIN_SCORE, MAX_SCORE),
            reasoning: reasoning.into(),
        }
    }

    /// Minimum grade, used when a judgment cannot be obtained.
    pub fn floor(reasoning: impl Into<String>) -> Self {
        Self::new(MIN_SCORE, reasoning)
    }
}

/// Aggregate evaluation of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreModel {
    /// Accuracy grade
    pub accuracy: GradedScore,

    /// Citation fidelity grade (computed programmatically)
    pub citation_fidelity: GradedScore,

    /// Completeness grade
    pub completeness: GradedScore,

    /// Regulatory tone grade
    pub regulatory_tone: GradedScore,

    /// Normalized latency/cost score; not used by evolution decisions
    #[serde(default = "default_performance")]
    pub performance: f64,
}

fn default_performance() -> f64 {
    1.0
}

impl ScoreModel {
    /// Build a score model with the default performance scalar.
    pub fn new(
        accuracy: GradedScore,
        citation_fidelity: GradedScore,
        completeness: GradedScore,
        regulatory_tone: GradedScore,
    ) -> Self {
        Self {
            accuracy,
            citation_fidelity,
            completeness,
            regulatory_tone,
            performance: default_performance(),
        }
    }

    /// Uniform grade on every dimension.
    pub fn uniform(score: u8, reasoning: &str) -> Self {
        let grade = GradedScore::new(score, reasoning);
        Self::new(grade.clone(), grade.clone(), grade.clone(), grade)
    }

    /// Grade of a single dimension.
    pub fn get(&self, dimension: Dimension) -> &GradedScore {
        match dimension {
            Dimension::Accuracy => &self.accuracy,
            Dimension::CitationFidelity => &self.citation_fidelity,
            Dimension::Completeness => &self.completeness,
            Dimension::RegulatoryTone => &self.regulatory_tone,
        }
    }

    /// Iterate `(dimension, grade)` in vector order.
    pub fn dimensions(&self) -> impl Iterator<Item = (Dimension, &GradedScore)> + '_ {
        Dimension::ALL.into_iter().map(move |d| (d, self.get(d)))
    }

    /// Scores as a vector for Pareto-style comparison.
    ///
    /// Order: accuracy, citation fidelity, completeness, regulatory tone, performance.
    pub fn to_vector(&self) -> [f64; 5] {
        [
            f64::from(self.accuracy.score),
            f64::from(self.citation_fidelity.score),
            f64::from(self.completeness.score),
            f64::from(self.regulatory_tone.score),
            self.performance,
        ]
    }

    /// Whether every graded dimension reaches `threshold`.
    ///
    /// The performance scalar does not participate.
    pub fn all_pass(&self, threshold: f64) -> bool {
        self.dimensions()
            .all(|(_, grade)| f64::from(grade.score) >= threshold)
    }

    /// Dimensions graded strictly below `bar`.
    pub fn failing(&self, bar: u8) -> Vec<(Dimension, &GradedScore)> {
        self.dimensions()
            .filter(|(_, grade)| grade.score < bar)
            .collect()
    }

    /// Compact per-dimension summary.
    pub fn summary(&self) -> ScoreSummary {
        ScoreSummary {
            accuracy: self.accuracy.score,
            citations: self.citation_fidelity.score,
            completeness: self.completeness.score,
            tone: self.regulatory_tone.score,
        }
    }
}

/// Four-dimension score summary returned by the evolution trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreSummary {
    /// Accuracy grade
    pub accuracy: u8,
    /// Citation fidelity grade
    pub citations: u8,
    /// Completeness grade
    pub completeness: u8,
    /// Regulatory tone grade
    pub tone: u8,
}

impl std::fmt::Display for ScoreSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "accuracy={}/5 citations={}/5 completeness={}/5 tone={}/5",
            self.accuracy, self.citations, self.completeness, self.tone
        )
    }
}
