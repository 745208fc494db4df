//! Programmatic citation fidelity check.
//!
//! Every text fragment that precedes a `[POL-<digits>]` marker must appear,
//! case-insensitively, somewhere in the supporting context.

use genepool_core::{GradedScore, MAX_SCORE, MIN_SCORE};
use regex::Regex;
use std::sync::OnceLock;

fn cited_fragment() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([^.]+)\[POL-\d+\]").expect("valid citation regex"))
}

/// Outcome of checking the citations of one response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CitationReport {
    /// Cited fragments found
    pub total: usize,
    /// Fragments present in the context
    pub supported: usize,
}

impl CitationReport {
    /// Share of supported fragments; 1.0 when nothing was cited.
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.supported as f64 / self.total as f64
        }
    }
}

/// Check every cited fragment of `response` against `context`.
pub fn verify_citations(response: &str, context: &str) -> CitationReport {
    let context = context.to_lowercase();
    let mut report = CitationReport { total: 0, supported: 0 };

    for caps in cited_fragment().captures_iter(response) {
        report.total += 1;
        let fragment = caps[1].trim().to_lowercase();
        if context.contains(&fragment) {
            report.supported += 1;
        }
    }

    report
}

/// Map a fidelity ratio in `[0, 1]` onto the 1–5 grade scale.
pub fn ratio_to_score(ratio: f64) -> u8 {
    let ratio = if ratio.is_nan() { 0.0 } else { ratio.clamp(0.0, 1.0) };
    let score = (1.0 + ratio * 4.0).floor() as u8;
    score.clamp(MIN_SCORE, MAX_SCORE)
}

/// Grade the citation fidelity of `response`.
pub fn citation_fidelity(response: &str, context: &str) -> GradedScore {
    let report = verify_citations(response, context);
    let ratio = report.ratio();
    GradedScore::new(
        ratio_to_score(ratio),
        format!(
            "Programmatic check found {:.0}% of citation fragments in context ({}/{}).",
            ratio * 100.0,
            report.supported,
            report.total
        ),
    )
}
