//! Evolution cycle state machine.

use crate::id::{GenomeId, RunId};
use serde::{Deserialize, Serialize};

/// Status of a convergence run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleStatus {
    /// Still iterating
    Running,
    /// Every dimension met the threshold
    Converged,
    /// Iteration budget spent before convergence
    Exhausted,
}

impl std::fmt::Display for CycleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CycleStatus::Running => write!(f, "running"),
            CycleStatus::Converged => write!(f, "converged"),
            CycleStatus::Exhausted => write!(f, "exhausted"),
        }
    }
}

/// Ephemeral progress of one convergence run. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EvolutionCycle {
    /// Run identifier
    pub run_id: RunId,
    /// Iterations started so far
    pub iteration: usize,
    /// Genome currently under test
    pub genome_id: GenomeId,
    /// Current status
    pub status: CycleStatus,
}

impl EvolutionCycle {
    /// `RUNNING(0, genome_id)`.
    pub fn start(genome_id: GenomeId) -> Self {
        Self {
            run_id: RunId::new(),
            iteration: 0,
            genome_id,
            status: CycleStatus::Running,
        }
    }

    /// Begin the next iteration and return its 1-based number.
    pub fn advance(&mut self) -> usize {
        self.iteration += 1;
        self.iteration
    }

    /// Switch the genome under test.
    pub fn adopt(&mut self, genome_id: GenomeId) {
        self.genome_id = genome_id;
    }

    /// Transition to `CONVERGED(genome_id)`.
    pub fn converge(&mut self) {
        self.status = CycleStatus::Converged;
    }

    /// Transition to `EXHAUSTED(genome_id)`.
    pub fn exhaust(&mut self) {
        self.status = CycleStatus::Exhausted;
    }

    /// Whether the run has stopped.
    pub fn is_finished(&self) -> bool {
        self.status != CycleStatus::Running
    }
}
