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

//! Scripted clients for metric tests

use crate::llm_client::{
    EmbedError, EmbeddingClient, Generation, LLMClient, LLMError, LLMResponse, TokenUsage,
};
use crate::prompts::ChatPrompt;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Returns canned candidate questions keyed by the answer in the prompt
pub struct ScriptedLLMClient {
    candidates: HashMap<String, Vec<String>>,
    requested_n: Mutex<Vec<usize>>,
    generate_calls: AtomicUsize,
}

impl ScriptedLLMClient {
    pub fn new() -> Self {
        Self {
            candidates: HashMap::new(),
            requested_n: Mutex::new(Vec::new()),
            generate_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_answer(mut self, answer: &str, candidates: &[&str]) -> Self {
        self.candidates.insert(
            answer.to_string(),
            candidates.iter().map(|c| c.to_string()).collect(),
        );
        self
    }

    /// `n` of every complete() call, in call order
    pub fn requested_n(&self) -> Vec<usize> {
        self.requested_n.lock().unwrap().clone()
    }

    pub fn generate_calls(&self) -> usize {
        self.generate_calls.load(Ordering::SeqCst)
    }

    fn answer_in(prompt: &ChatPrompt) -> Option<&str> {
        let content = &prompt.messages.last()?.content;
        let (_, tail) = content.rsplit_once("Answer:")?;
        tail.strip_suffix("\nQuestion:\n")
    }
}

#[async_trait]
impl LLMClient for ScriptedLLMClient {
    async fn complete(&self, prompt: &ChatPrompt, n: usize) -> Result<LLMResponse, LLMError> {
        self.requested_n.lock().unwrap().push(n);

        let answer = Self::answer_in(prompt)
            .ok_or_else(|| LLMError::InvalidResponse("unrecognised prompt".to_string()))?;
        let candidates = self
            .candidates
            .get(answer)
            .ok_or_else(|| LLMError::ApiError(format!("no script for answer '{}'", answer)))?;

        Ok(LLMResponse {
            generations: candidates
                .iter()
                .take(n)
                .map(|text| Generation { text: text.clone() })
                .collect(),
            usage: TokenUsage {
                prompt_tokens: 100,
                completion_tokens: 10,
                total_tokens: 110,
            },
            model: "scripted".to_string(),
        })
    }

    async fn generate(
        &self,
        prompts: &[ChatPrompt],
        n: usize,
    ) -> Result<Vec<LLMResponse>, LLMError> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        let mut responses = Vec::with_capacity(prompts.len());
        for prompt in prompts {
            responses.push(self.complete(prompt, n).await?);
        }
        Ok(responses)
    }

    fn model_name(&self) -> &str {
        "scripted"
    }

    fn cost_per_token(&self) -> (f64, f64) {
        (0.000001, 0.000002)
    }
}

/// Maps known texts to fixed vectors; unknown text is an error
pub struct LookupEmbeddingClient {
    embeddings: HashMap<String, Vec<f64>>,
    query_calls: AtomicUsize,
    document_calls: AtomicUsize,
}

impl LookupEmbeddingClient {
    pub fn new() -> Self {
        Self {
            embeddings: HashMap::new(),
            query_calls: AtomicUsize::new(0),
            document_calls: AtomicUsize::new(0),
        }
    }

    pub fn with(mut self, text: &str, vector: &[f64]) -> Self {
        self.embeddings.insert(text.to_string(), vector.to_vec());
        self
    }

    pub fn query_calls(&self) -> usize {
        self.query_calls.load(Ordering::SeqCst)
    }

    pub fn document_calls(&self) -> usize {
        self.document_calls.load(Ordering::SeqCst)
    }

    fn lookup(&self, text: &str) -> Result<Vec<f64>, EmbedError> {
        self.embeddings
            .get(text)
            .cloned()
            .ok_or_else(|| EmbedError::ApiError(format!("Text not found in mock: {}", text)))
    }
}

#[async_trait]
impl EmbeddingClient for LookupEmbeddingClient {
    async fn embed_query(&self, text: &str) -> Result<Vec<f64>, EmbedError> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        self.lookup(text)
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f64>>, EmbedError> {
        self.document_calls.fetch_add(1, Ordering::SeqCst);
        texts.iter().map(|t| self.lookup(t)).collect()
    }
}
