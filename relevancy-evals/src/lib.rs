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

//! # Answer Relevancy Evaluation
//!
//! Scores how well a generated answer addresses its question.
//!
//! ## How it works
//!
//! - A generation model reverse-engineers `strictness` candidate questions
//!   from each answer (one-shot prompt)
//! - The original question and the candidates are embedded
//! - The score is the maximum cosine similarity between the question and
//!   any candidate
//!
//! Rows are processed in contiguous batches, sequentially, and the score is
//! appended to the dataset as a new column.
//!
//! ## Example
//!
//! ```rust,ignore
//! use relevancy_evals::{AnswerRelevancy, Dataset};
//! use relevancy_evals::llm_client::OpenAIClient;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let client = Arc::new(OpenAIClient::new(
//!         std::env::var("OPENAI_API_KEY").unwrap(),
//!         "gpt-4o-mini".to_string(),
//!     ));
//!
//!     let metric = AnswerRelevancy::new(client.clone(), client).with_strictness(3);
//!
//!     let dataset = Dataset::from_qa_pairs([(
//!         "Where is the Eiffel Tower?",
//!         "The Eiffel Tower is in Paris.",
//!     )]);
//!     let scored = metric.score(&dataset).await.unwrap();
//! }
//! ```

use thiserror::Error;

pub mod batching;
pub mod config;
pub mod dataset;
pub mod evaluation;
pub mod llm_client;
pub mod metrics;
pub mod prompts;
pub mod similarity;

pub use batching::batches;
pub use config::AnswerRelevancyConfig;
pub use dataset::{Dataset, EvalRecord};
pub use evaluation::{evaluate, EvaluationMode, Metric};
pub use llm_client::{EmbedError, EmbeddingClient, LLMClient, LLMError};
pub use metrics::{AnswerRelevancy, RelevancyResult};
pub use prompts::{ChatMessage, ChatPrompt, ChatRole};
pub use similarity::{cosine_similarities, max_similarity};

/// Errors that can occur during evaluation
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("LLM client error: {0}")]
    LLMClientError(#[from] LLMError),

    #[error("Embedding client error: {0}")]
    EmbeddingError(#[from] EmbedError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
