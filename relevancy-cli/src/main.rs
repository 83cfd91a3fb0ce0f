// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Relevancy CLI
//!
//! Scores JSON Lines question-answering datasets with the answer relevancy metric.

mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::{LLMConfig, Provider, RelevancyConfig};
use relevancy_evals::llm_client::{AnthropicClient, OpenAIClient};
use relevancy_evals::{AnswerRelevancy, Dataset, EmbeddingClient, LLMClient};
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "relevancy")]
#[command(about = "Relevancy - answer relevancy scoring for QA datasets", long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose mode
    #[arg(short, long)]
    verbose: bool,

    /// Output as JSON (machine-readable)
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score a JSON Lines dataset with "question" and "answer" fields
    Score {
        /// Input dataset (.jsonl)
        #[arg(short, long)]
        input: PathBuf,

        /// Output dataset (.jsonl); stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output column name
        #[arg(long)]
        name: Option<String>,

        /// Rows per batch
        #[arg(long)]
        batch_size: Option<usize>,

        /// Candidate questions generated per answer
        #[arg(long)]
        strictness: Option<usize>,
    },

    /// Print the resolved configuration (API keys masked)
    Config,
}

/// Aggregate view of a score column
#[derive(Debug, Clone, PartialEq, Serialize)]
struct ScoreSummary {
    column: String,
    rows: usize,
    /// Rows whose score is null (non-finite)
    undefined: usize,
    mean: Option<f64>,
    min: Option<f64>,
    max: Option<f64>,
}

impl ScoreSummary {
    fn from_dataset(dataset: &Dataset, column: &str) -> Result<Self> {
        let values = dataset.column_values(column)?;
        let scores: Vec<f64> = values.iter().filter_map(|v| v.as_f64()).collect();

        let mean = if scores.is_empty() {
            None
        } else {
            Some(scores.iter().sum::<f64>() / scores.len() as f64)
        };

        Ok(Self {
            column: column.to_string(),
            rows: values.len(),
            undefined: values.len() - scores.len(),
            mean,
            min: scores.iter().copied().reduce(f64::min),
            max: scores.iter().copied().reduce(f64::max),
        })
    }

    fn render(&self) -> String {
        let fmt = |v: Option<f64>| v.map(|x| format!("{:.4}", x)).unwrap_or_else(|| "-".to_string());
        format!(
            "✓ Scored {} rows into '{}'\n  mean: {}  min: {}  max: {}  undefined: {}",
            self.rows,
            self.column,
            fmt(self.mean),
            fmt(self.min),
            fmt(self.max),
            self.undefined
        )
    }
}

fn build_clients(config: &LLMConfig) -> Result<(Arc<dyn LLMClient>, Arc<dyn EmbeddingClient>)> {
    let openai_key = config
        .openai_api_key
        .clone()
        .context("OpenAI API key is required for embeddings")?;

    let mut openai = OpenAIClient::new(openai_key, config.generation_model())
        .with_embedding_model(config.embedding_model.clone());
    if let Some(base_url) = &config.base_url {
        openai = openai.with_base_url(base_url.clone());
    }
    let openai = Arc::new(openai);

    let llm: Arc<dyn LLMClient> = match config.provider {
        Provider::OpenAI => openai.clone(),
        Provider::Anthropic => {
            let key = config
                .anthropic_api_key
                .clone()
                .context("Anthropic API key is required for the anthropic provider")?;
            Arc::new(AnthropicClient::new(key, config.generation_model()))
        }
    };
    let embeddings: Arc<dyn EmbeddingClient> = openai;

    Ok((llm, embeddings))
}

async fn handle_score(
    config: RelevancyConfig,
    input: PathBuf,
    output: Option<PathBuf>,
    json_output: bool,
) -> Result<()> {
    config.validate()?;

    let file = File::open(&input).with_context(|| format!("Failed to open dataset {:?}", input))?;
    let dataset = Dataset::from_jsonl_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse dataset {:?}", input))?;
    info!(rows = dataset.len(), "Loaded dataset from {:?}", input);

    let (llm, embeddings) = build_clients(&config.llm)?;
    info!(
        generation_model = llm.model_name(),
        embedding_model = %config.llm.embedding_model,
        strictness = config.metric.strictness,
        batch_size = config.metric.batch_size,
        "Scoring answer relevancy"
    );

    let metric = AnswerRelevancy::new(llm, embeddings).with_config(config.metric.clone());
    let scored = metric.score(&dataset).await.context("Scoring failed")?;
    let summary = ScoreSummary::from_dataset(&scored, &config.metric.name)?;

    let report = if json_output {
        serde_json::to_string_pretty(&summary)?
    } else {
        summary.render()
    };

    match output {
        Some(path) => {
            let file = File::create(&path)
                .with_context(|| format!("Failed to create output {:?}", path))?;
            scored.to_jsonl_writer(BufWriter::new(file))?;
            info!("Wrote scored dataset to {:?}", path);
            println!("{}", report);
        }
        None => {
            // stdout carries the dataset
            scored.to_jsonl_writer(std::io::stdout().lock())?;
            eprintln!("{}", report);
        }
    }

    Ok(())
}

fn handle_config(config: &RelevancyConfig, json_output: bool) -> Result<()> {
    let masked = config.masked();
    if json_output {
        println!("{}", serde_json::to_string_pretty(&masked)?);
    } else {
        println!("{}", toml::to_string_pretty(&masked)?);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let mut config =
        RelevancyConfig::load(cli.config.clone()).context("Failed to load configuration")?;

    match cli.command {
        Commands::Score {
            input,
            output,
            name,
            batch_size,
            strictness,
        } => {
            // Flags override file and environment
            if let Some(name) = name {
                config.metric.name = name;
            }
            if let Some(batch_size) = batch_size {
                config.metric.batch_size = batch_size;
            }
            if let Some(strictness) = strictness {
                config.metric.strictness = strictness;
            }
            handle_score(config, input, output, cli.json).await
        }
        Commands::Config => handle_config(&config, cli.json),
    }
}
