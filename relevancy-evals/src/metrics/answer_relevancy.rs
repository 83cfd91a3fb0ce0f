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

//! Answer relevancy via reverse question generation
//!
//! 1. Generate `strictness` questions the answer could be responding to
//! 2. Embed the original question and the generated ones
//! 3. Score = max cosine similarity between the original and any candidate
//!
//! Answers with incomplete, redundant or off-topic content produce
//! candidates that drift from the original question and score lower.

use crate::{
    batching::batches,
    config::AnswerRelevancyConfig,
    dataset::Dataset,
    evaluation::{EvaluationMode, Metric},
    llm_client::{EmbeddingClient, LLMClient, TokenUsage},
    prompts::{question_generation_prompt, ChatPrompt},
    similarity::{cosine_similarities, max_similarity},
    EvalError,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Answer relevancy metric
///
/// Rows are scored in contiguous batches of `batch_size`, one batch at a
/// time. Non-finite scores are written to the output column as `null`.
pub struct AnswerRelevancy {
    config: AnswerRelevancyConfig,
    llm_client: Arc<dyn LLMClient>,
    embedding_client: Arc<dyn EmbeddingClient>,
}

/// Single-record result with the intermediate candidates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelevancyResult {
    pub score: f64,
    pub generated_questions: Vec<String>,
    pub similarities: Vec<f64>,
}

impl AnswerRelevancy {
    pub fn new(llm_client: Arc<dyn LLMClient>, embedding_client: Arc<dyn EmbeddingClient>) -> Self {
        Self {
            config: AnswerRelevancyConfig::default(),
            llm_client,
            embedding_client,
        }
    }

    pub fn with_config(mut self, config: AnswerRelevancyConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.config.batch_size = batch_size;
        self
    }

    pub fn with_strictness(mut self, strictness: usize) -> Self {
        self.config.strictness = strictness;
        self
    }

    pub fn config(&self) -> &AnswerRelevancyConfig {
        &self.config
    }

    /// Score every row and append the score column
    pub async fn score(&self, dataset: &Dataset) -> Result<Dataset, EvalError> {
        self.config.validate()?;
        EvaluationMode::Qa.check(dataset)?;
        if dataset.has_column(&self.config.name) {
            return Err(EvalError::InvalidInput(format!(
                "column '{}' already exists",
                self.config.name
            )));
        }

        let ranges = batches(dataset.len(), self.config.batch_size)?;
        let total_batches = ranges.len();
        let (input_cost, output_cost) = self.llm_client.cost_per_token();

        let mut scores = Vec::with_capacity(dataset.len());
        for (idx, range) in ranges.into_iter().enumerate() {
            let batch = dataset.select(range)?;
            let (batch_scores, usage) = self.score_batch(&batch).await?;
            scores.extend(batch_scores);

            info!(
                metric = %self.config.name,
                batch = idx + 1,
                total_batches,
                rows_scored = scores.len(),
                tokens = usage.total_tokens,
                cost_usd = usage.calculate_cost(input_cost, output_cost),
                "Scored batch"
            );
        }

        let undefined = scores.iter().filter(|s| !s.is_finite()).count();
        if undefined > 0 {
            warn!(
                metric = %self.config.name,
                undefined,
                "Scores are undefined for some rows (zero-norm embedding)"
            );
        }

        dataset
            .clone()
            .add_column(&self.config.name, scores.into_iter().map(Value::from).collect())
    }

    async fn score_batch(&self, batch: &Dataset) -> Result<(Vec<f64>, TokenUsage), EvalError> {
        let records = batch.records()?;
        let prompts: Vec<ChatPrompt> = records
            .iter()
            .map(|record| question_generation_prompt(record.answer))
            .collect();

        debug!(
            prompts = prompts.len(),
            n = self.config.strictness,
            model = self.llm_client.model_name(),
            "Generating candidate questions"
        );
        let responses = self
            .llm_client
            .generate(&prompts, self.config.strictness)
            .await?;

        if responses.len() != records.len() {
            return Err(EvalError::InvalidInput(format!(
                "Expected {} generation results, got {}",
                records.len(),
                responses.len()
            )));
        }

        let mut usage = TokenUsage::default();
        let mut scores = Vec::with_capacity(records.len());
        for (record, response) in records.iter().zip(responses) {
            usage.add(&response.usage);
            let candidates = response.texts();
            let similarities = self.calculate_similarity(record.question, &candidates).await?;
            scores.push(Self::reduce(&similarities)?);
        }

        Ok((scores, usage))
    }

    fn reduce(similarities: &[f64]) -> Result<f64, EvalError> {
        max_similarity(similarities).ok_or_else(|| {
            EvalError::InvalidInput("No candidate questions were generated".to_string())
        })
    }

    fn check_candidate_count(&self, candidates: &[String]) -> Result<(), EvalError> {
        if candidates.is_empty() {
            return Err(EvalError::InvalidInput(
                "No candidate questions were generated".to_string(),
            ));
        }
        if candidates.len() != self.config.strictness {
            warn!(
                expected = self.config.strictness,
                actual = candidates.len(),
                "Generation client returned an unexpected number of candidates"
            );
        }
        Ok(())
    }

    /// Cosine similarity of `question` against each generated question.
    ///
    /// One embedding call for the question, one batched call for the candidates.
    pub async fn calculate_similarity(
        &self,
        question: &str,
        generated_questions: &[String],
    ) -> Result<Vec<f64>, EvalError> {
        self.check_candidate_count(generated_questions)?;

        let question_vec = self.embedding_client.embed_query(question).await?;
        let candidate_vecs = self
            .embedding_client
            .embed_documents(generated_questions)
            .await?;

        if candidate_vecs.len() != generated_questions.len() {
            return Err(EvalError::InvalidInput(format!(
                "Expected {} embeddings, got {}",
                generated_questions.len(),
                candidate_vecs.len()
            )));
        }

        cosine_similarities(&question_vec, &candidate_vecs)
    }

    /// Generate the candidate questions for one answer
    pub async fn generate_questions(&self, answer: &str) -> Result<Vec<String>, EvalError> {
        let prompt = question_generation_prompt(answer);
        let response = self
            .llm_client
            .complete(&prompt, self.config.strictness)
            .await?;
        Ok(response.texts())
    }

    /// Score a single (question, answer) pair, keeping the candidates
    pub async fn score_record(
        &self,
        question: &str,
        answer: &str,
    ) -> Result<RelevancyResult, EvalError> {
        self.config.validate()?;

        let generated_questions = self.generate_questions(answer).await?;
        let similarities = self
            .calculate_similarity(question, &generated_questions)
            .await?;
        let score = Self::reduce(&similarities)?;

        Ok(RelevancyResult {
            score,
            generated_questions,
            similarities,
        })
    }
}

#[async_trait]
impl Metric for AnswerRelevancy {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn evaluation_mode(&self) -> EvaluationMode {
        EvaluationMode::Qa
    }

    async fn score(&self, dataset: &Dataset) -> Result<Dataset, EvalError> {
        AnswerRelevancy::score(self, dataset).await
    }
}
