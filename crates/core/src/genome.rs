//! Genome model - the evolvable configuration of the answering pipeline.

use serde::{Deserialize, Serialize};

/// Default number of documents the researcher retrieves.
pub const DEFAULT_RETRIEVAL_BREADTH: u32 = 3;

const BASE_PLANNER_INSTRUCTION: &str = "
You are a Compliance Strategy Planner. \n\
Your job is to break down a user's compliance question into specific research tasks.
Decide if you need content research (Researcher) or metadata lookups (SQL Analyst).

Example: \"Can I use ChatGPT?\" -> Researcher query: \"AI and LLM usage policy\"
Example: \"Who owns the remote work policy?\" -> SQL Analyst query: \"SELECT owner FROM policies WHERE title LIKE '%Remote%'\"
";

const BASE_SYNTHESIZER_INSTRUCTION: &str = "
You are a Corporate Compliance Officer.
Answer the user's question based ONLY on the provided research findings.
If information is missing, state it clearly.
Include citations to specific policy IDs or names (e.g. [POL-001]).
Be professional, concise, and definitive.
";

/// Models the synthesizer may be switched to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ModelId {
    /// Qwen 2.5
    #[default]
    #[serde(rename = "qwen2.5")]
    Qwen25,
}

impl ModelId {
    /// Wire name of the model.
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelId::Qwen25 => "qwen2.5",
        }
    }
}

impl std::fmt::Display for ModelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised when a genome would violate its invariants.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenomeError {
    /// An instruction was empty or whitespace.
    #[error("{0} instruction must not be empty")]
    EmptyInstruction(&'static str),

    /// Retrieval breadth below 1.
    #[error("retrieval breadth must be at least 1, got {0}")]
    InvalidRetrievalBreadth(u32),
}

/// Flat record form of a genome, as persisted and exchanged.
///
/// This is the single canonical serialized shape. Optional fields default
/// when absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenomeRecord {
    /// Planner system instruction
    #[serde(alias = "planner_prompt")]
    pub planner_instruction: String,

    /// Synthesizer system instruction
    #[serde(alias = "synthesizer_prompt")]
    pub synthesizer_instruction: String,

    /// Number of documents to retrieve per research task
    #[serde(default = "default_retrieval_breadth", alias = "researcher_retriever_k")]
    pub retrieval_breadth: u32,

    /// Whether the conflict detector runs
    #[serde(default = "default_conflict_check")]
    pub conflict_check_enabled: bool,

    /// Model used by the synthesizer
    #[serde(default)]
    pub synthesizer_model: ModelId,
}

fn default_retrieval_breadth() -> u32 {
    DEFAULT_RETRIEVAL_BREADTH
}

fn default_conflict_check() -> bool {
    true
}

/// An immutable, validated genome.
///
/// Evolution never edits a genome in place; it derives a new one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "GenomeRecord", into = "GenomeRecord")]
pub struct Genome {
    planner_instruction: String,
    synthesizer_instruction: String,
    retrieval_breadth: u32,
    conflict_check_enabled: bool,
    synthesizer_model: ModelId,
}

impl Genome {
    /// Create a genome from two instructions, defaulting the strategy switches.
    pub fn new(
        planner_instruction: impl Into<String>,
        synthesizer_instruction: impl Into<String>,
    ) -> Result<Self, GenomeError> {
        Self::try_from(GenomeRecord {
            planner_instruction: planner_instruction.into(),
            synthesizer_instruction: synthesizer_instruction.into(),
            retrieval_breadth: DEFAULT_RETRIEVAL_BREADTH,
            conflict_check_enabled: true,
            synthesizer_model: ModelId::default(),
        })
    }

    /// The `v0` baseline genome.
    pub fn baseline() -> Self {
        Self {
            planner_instruction: BASE_PLANNER_INSTRUCTION.to_string(),
            synthesizer_instruction: BASE_SYNTHESIZER_INSTRUCTION.to_string(),
            retrieval_breadth: DEFAULT_RETRIEVAL_BREADTH,
            conflict_check_enabled: true,
            synthesizer_model: ModelId::default(),
        }
    }

    /// Derive a genome with different strategy switches.
    pub fn with_strategy(
        &self,
        retrieval_breadth: u32,
        conflict_check_enabled: bool,
        synthesizer_model: ModelId,
    ) -> Result<Self, GenomeError> {
        Self::try_from(GenomeRecord {
            retrieval_breadth,
            conflict_check_enabled,
            synthesizer_model,
            ..self.to_record()
        })
    }

    /// Derive a genome with replaced instructions.
    ///
    /// `None` or blank replacements keep the current instruction. Strategy
    /// switches are always carried over.
    pub fn with_instructions(&self, planner: Option<&str>, synthesizer: Option<&str>) -> Self {
        let pick = |candidate: Option<&str>, current: &str| match candidate {
            Some(text) if !text.trim().is_empty() => text.to_string(),
            _ => current.to_string(),
        };
        Self {
            planner_instruction: pick(planner, &self.planner_instruction),
            synthesizer_instruction: pick(synthesizer, &self.synthesizer_instruction),
            ..self.clone()
        }
    }

    /// Planner instruction.
    pub fn planner_instruction(&self) -> &str {
        &self.planner_instruction
    }

    /// Synthesizer instruction.
    pub fn synthesizer_instruction(&self) -> &str {
        &self.synthesizer_instruction
    }

    /// Retrieval breadth.
    pub fn retrieval_breadth(&self) -> u32 {
        self.retrieval_breadth
    }

    /// Whether conflict checking is on.
    pub fn conflict_check_enabled(&self) -> bool {
        self.conflict_check_enabled
    }

    /// Synthesizer model.
    pub fn synthesizer_model(&self) -> ModelId {
        self.synthesizer_model
    }

    /// Canonical record form.
    pub fn to_record(&self) -> GenomeRecord {
        GenomeRecord::from(self.clone())
    }
}

impl Default for Genome {
    fn default() -> Self {
        Self::baseline()
    }
}

impl TryFrom<GenomeRecord> for Genome {
    type Error = GenomeError;

    fn try_from(record: GenomeRecord) -> Result<Self, Self::Error> {
        if record.planner_instruction.trim().is_empty() {
            return Err(GenomeError::EmptyInstruction("planner"));
        }
        if record.synthesizer_instruction.trim().is_empty() {
            return Err(GenomeError::EmptyInstruction("synthesizer"));
        }
        if record.retrieval_breadth < 1 {
            return Err(GenomeError::InvalidRetrievalBreadth(record.retrieval_breadth));
        }
        Ok(Self {
            planner_instruction: record.planner_instruction,
            synthesizer_instruction: record.synthesizer_instruction,
            retrieval_breadth: record.retrieval_breadth,
            conflict_check_enabled: record.conflict_check_enabled,
            synthesizer_model: record.synthesizer_model,
        })
    }
}

impl From<Genome> for GenomeRecord {
    fn from(genome: Genome) -> Self {
        Self {
            planner_instruction: genome.planner_instruction,
            synthesizer_instruction: genome.synthesizer_instruction,
            retrieval_breadth: genome.retrieval_breadth,
            conflict_check_enabled: genome.conflict_check_enabled,
            synthesizer_model: genome.synthesizer_model,
        }
    }
}
