//! Genepool CLI - self-evolving compliance agent configuration.

mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use config::AppConfig;
use genepool_core::CycleStatus;
use genepool_evolution::LlmArchitect;
use genepool_execution::{Agents, ConvergenceLoop, EvolutionService, HttpPipeline};
use genepool_llm::{OllamaClient, TextGenerator};
use genepool_quality::{Evaluator, LlmEvaluator};
use genepool_reflection::LlmDiagnostician;
use genepool_storage::{GenomeCatalog, GenomeStore, JsonGenomeStore};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "genepool")]
#[command(about = "Self-evolving configuration engine for a compliance agent pipeline", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Data directory holding the genome pool
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Ollama server URL
    #[arg(long, global = true)]
    ollama_url: Option<String>,

    /// Pipeline endpoint
    #[arg(long, global = true)]
    pipeline_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evolve until every dimension passes or the budget is spent
    Run {
        /// Iteration budget
        #[arg(long)]
        max_iterations: Option<usize>,
        /// Pass threshold per dimension
        #[arg(long)]
        threshold: Option<f64>,
        /// Request to optimise for
        #[arg(long)]
        request: Option<String>,
    },
    /// Run a single evolution cycle and store the result
    Evolve {
        /// Request to test with
        #[arg(long)]
        request: Option<String>,
        /// Genome to evolve from (defaults to latest)
        #[arg(long)]
        genome: Option<String>,
    },
    /// Answer a question with the pipeline
    Ask {
        /// Question
        question: String,
        /// Genome to answer under (defaults to latest)
        #[arg(long)]
        genome: Option<String>,
    },
    /// Grade a response against its context
    Evaluate {
        /// Original question
        question: String,
        /// Response to grade
        response: String,
        /// Supporting context
        #[arg(long, default_value = "")]
        context: String,
    },
    /// List stored genome versions
    Versions,
    /// Show one genome
    Show {
        /// Genome id (e.g. v3)
        id: String,
    },
    /// Show the latest genome
    Latest,
    /// Show store and model health
    Health,
}

impl Commands {
    /// Whether the subcommand reads or writes the genome pool.
    fn uses_store(&self) -> bool {
        !matches!(self, Commands::Evaluate { .. })
    }
}

impl Cli {
    /// File, then environment, then flags.
    fn resolve_config(&self) -> Result<AppConfig> {
        let mut config = AppConfig::load(self.config.as_deref())?.with_env();
        if let Some(dir) = &self.data_dir {
            config.store.data_dir = dir.clone();
        }
        if let Some(url) = &self.ollama_url {
            config.llm.base_url = url.clone();
        }
        if let Some(url) = &self.pipeline_url {
            config.pipeline.endpoint = url.clone();
        }
        Ok(config)
    }
}

fn agents(director: Arc<dyn TextGenerator>, config: &AppConfig) -> Agents {
    Agents {
        pipeline: Arc::new(HttpPipeline::new(config.pipeline.clone())),
        evaluator: Arc::new(LlmEvaluator::new(director.clone())),
        diagnostician: Arc::new(LlmDiagnostician::new(director.clone())),
        architect: Arc::new(LlmArchitect::new(director)),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Grade a standalone (question, response, context) triple.
async fn evaluate(command: &Commands, director: Arc<dyn TextGenerator>) -> Result<()> {
    let Commands::Evaluate { question, response, context } = command else {
        return Ok(());
    };
    let scores = LlmEvaluator::new(director).evaluate(question, response, context).await;
    for (dimension, grade) in scores.dimensions() {
        println!("{}: {}/5", dimension, grade.score);
        println!("  {}", grade.reasoning);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = cli.resolve_config()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    let ollama = Arc::new(OllamaClient::new(config.llm.clone()));

    if !cli.command.uses_store() {
        return evaluate(&cli.command, ollama).await;
    }

    let store: Arc<dyn GenomeStore> = Arc::new(JsonGenomeStore::open(config.store.pool_path()).await?);
    let catalog = GenomeCatalog::new(store.clone());

    match cli.command {
        Commands::Run { max_iterations, threshold, request } => {
            if let Some(n) = max_iterations {
                config.evolution.max_iterations = n;
            }
            if let Some(t) = threshold {
                config.evolution.threshold = t;
            }
            if let Some(r) = request {
                config.evolution.request = r;
            }

            let engine = ConvergenceLoop::new(store, agents(ollama, &config))
                .with_config(config.evolution.clone());
            let outcome = engine.run().await?;

            match outcome.status {
                CycleStatus::Converged => println!(
                    "Converged on {} after {} iteration(s)",
                    outcome.genome_id, outcome.iterations
                ),
                _ => println!(
                    "Exhausted {} iteration(s) without convergence; latest is {}",
                    outcome.iterations, outcome.genome_id
                ),
            }
            if !outcome.generations.is_empty() {
                let ids: Vec<_> = outcome.generations.iter().map(|id| id.as_str()).collect();
                println!("  New generations: {}", ids.join(", "));
            }
            if let Some(scores) = outcome.last_scores {
                println!("  Last scores: {}", scores.summary());
            }
        }
        Commands::Evolve { request, genome } => {
            let request = request.unwrap_or_else(|| config.evolution.request.clone());
            let service = EvolutionService::new(store, agents(ollama, &config));
            let report = service.evolve_once(&request, genome.as_deref()).await?;
            print_json(&report)?;
        }
        Commands::Ask { question, genome } => {
            let service = EvolutionService::new(store, agents(ollama, &config));
            let answer = service.answer(&question, genome.as_deref()).await?;
            print_json(&answer)?;
        }
        // Handled before the store is opened.
        Commands::Evaluate { .. } => {}
        Commands::Versions => {
            print_json(&catalog.list().await)?;
        }
        Commands::Show { id } => {
            print_json(&catalog.fetch(&id).await?)?;
        }
        Commands::Latest => {
            print_json(&catalog.latest().await)?;
        }
        Commands::Health => {
            let report = catalog.health().await;
            print_json(&report)?;
            match ollama.health_check().await {
                Ok(true) => info!("Ollama reachable at {}", config.llm.base_url),
                Ok(false) => warn!("Ollama at {} answered with an error", config.llm.base_url),
                Err(e) => warn!("Ollama at {} unreachable: {}", config.llm.base_url, e),
            }
        }
    }

    Ok(())
}
