//! Scripted collaborators shared by the loop and service tests.

use crate::engine::Agents;
use crate::pipeline::{Pipeline, PipelineError};
use async_trait::async_trait;
use genepool_core::{AgentFinding, Diagnosis, Genome, PipelineRun, ScoreModel};
use genepool_evolution::Architect;
use genepool_quality::Evaluator;
use genepool_reflection::Diagnostician;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Call counters observed across the scripted collaborators.
#[derive(Default)]
pub struct CallLog {
    runs: AtomicUsize,
    evaluations: AtomicUsize,
    diagnoses: AtomicUsize,
    mutations: AtomicUsize,
    last_planner: Mutex<Option<String>>,
}

impl CallLog {
    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }

    pub fn evaluations(&self) -> usize {
        self.evaluations.load(Ordering::SeqCst)
    }

    pub fn diagnoses(&self) -> usize {
        self.diagnoses.load(Ordering::SeqCst)
    }

    pub fn mutations(&self) -> usize {
        self.mutations.load(Ordering::SeqCst)
    }

    /// Planner instruction of the genome the pipeline last ran under.
    pub fn last_tested_planner(&self) -> Option<String> {
        self.last_planner.lock().unwrap().clone()
    }
}

pub struct ScriptedPipeline {
    failures: usize,
    findings: Vec<AgentFinding>,
    calls: Arc<CallLog>,
}

impl ScriptedPipeline {
    pub fn answering() -> Self {
        Self::failing_first(0)
    }

    pub fn failing_first(failures: usize) -> Self {
        Self {
            failures,
            findings: vec![
                AgentFinding {
                    agent: "researcher".to_string(),
                    findings: "POL-001: public AI tools may not receive client data.".to_string(),
                },
                AgentFinding {
                    agent: "sql_analyst".to_string(),
                    findings: "No exceptions on record.".to_string(),
                },
            ],
            calls: Arc::default(),
        }
    }

    pub fn with_findings(mut self, agent: &str, findings: String) -> Self {
        self.findings = vec![AgentFinding {
            agent: agent.to_string(),
            findings,
        }];
        self
    }
}

#[async_trait]
impl Pipeline for ScriptedPipeline {
    async fn run(&self, _request: &str, genome: &Genome) -> Result<PipelineRun, PipelineError> {
        let call = self.calls.runs.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            return Err(PipelineError::Other("agent crashed".to_string()));
        }
        *self.calls.last_planner.lock().unwrap() = Some(genome.planner_instruction().to_string());
        Ok(PipelineRun {
            response: "Public AI tools may not receive client data [POL-001].".to_string(),
            findings: self.findings.clone(),
        })
    }
}

/// Replays uniform scores, repeating the last one.
pub struct ScriptedEvaluator {
    scores: Mutex<VecDeque<u8>>,
    last: Mutex<u8>,
    calls: Arc<CallLog>,
}

pub fn fixed_scores(scores: Vec<u8>) -> ScriptedEvaluator {
    ScriptedEvaluator {
        scores: Mutex::new(scores.into()),
        last: Mutex::new(1),
        calls: Arc::default(),
    }
}

#[async_trait]
impl Evaluator for ScriptedEvaluator {
    async fn evaluate(&self, _request: &str, _response: &str, _context: &str) -> ScoreModel {
        self.calls.evaluations.fetch_add(1, Ordering::SeqCst);
        let mut last = self.last.lock().unwrap();
        if let Some(next) = self.scores.lock().unwrap().pop_front() {
            *last = next;
        }
        ScoreModel::uniform(*last, "scripted")
    }
}

pub struct ScriptedDiagnostician {
    text: String,
    calls: Arc<CallLog>,
}

impl ScriptedDiagnostician {
    pub fn new(text: impl Into<String>, calls: Arc<CallLog>) -> Self {
        Self {
            text: text.into(),
            calls,
        }
    }
}

#[async_trait]
impl Diagnostician for ScriptedDiagnostician {
    async fn diagnose(&self, _request: &str, _response: &str, _scores: &ScoreModel) -> Diagnosis {
        self.calls.diagnoses.fetch_add(1, Ordering::SeqCst);
        Diagnosis::from_text(self.text.clone())
    }
}

/// Rewrites the planner instruction to `revision <n>`.
pub struct CountingArchitect {
    calls: Arc<CallLog>,
}

#[async_trait]
impl Architect for CountingArchitect {
    async fn mutate(&self, genome: &Genome, _diagnosis: &Diagnosis) -> Genome {
        let n = self.calls.mutations.fetch_add(1, Ordering::SeqCst) + 1;
        genome.with_instructions(Some(&format!("revision {}", n)), None)
    }
}

/// Wire scripted collaborators to one shared call log.
pub fn agents(mut pipeline: ScriptedPipeline, mut evaluator: ScriptedEvaluator) -> (Agents, Arc<CallLog>) {
    let calls = Arc::new(CallLog::default());
    pipeline.calls = calls.clone();
    evaluator.calls = calls.clone();
    let agents = Agents {
        pipeline: Arc::new(pipeline),
        evaluator: Arc::new(evaluator),
        diagnostician: Arc::new(ScriptedDiagnostician::new(
            "Writer Gap: the synthesizer ignored the retention rule.",
            calls.clone(),
        )),
        architect: Arc::new(CountingArchitect { calls: calls.clone() }),
    };
    (agents, calls)
}
