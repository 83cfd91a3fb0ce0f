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

//! Generation and embedding client abstractions

use crate::prompts::{ChatPrompt, ChatRole};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Trait for text generation clients
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Sample `n` independent completions for one prompt
    async fn complete(&self, prompt: &ChatPrompt, n: usize) -> Result<LLMResponse, LLMError>;

    /// Sample `n` completions for each prompt, one response per prompt in order.
    /// Default implementation calls complete() for each prompt
    async fn generate(
        &self,
        prompts: &[ChatPrompt],
        n: usize,
    ) -> Result<Vec<LLMResponse>, LLMError> {
        let mut responses = Vec::with_capacity(prompts.len());
        for prompt in prompts {
            responses.push(self.complete(prompt, n).await?);
        }
        Ok(responses)
    }

    /// Get model name
    fn model_name(&self) -> &str;

    /// Get cost per token (input, output)
    fn cost_per_token(&self) -> (f64, f64);
}

/// A single sampled completion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Generation {
    pub text: String,
}

/// Response from LLM: every completion sampled for one prompt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMResponse {
    pub generations: Vec<Generation>,
    pub usage: TokenUsage,
    pub model: String,
}

impl LLMResponse {
    /// Completion texts in sampling order
    pub fn texts(&self) -> Vec<String> {
        self.generations.iter().map(|g| g.text.clone()).collect()
    }
}

/// Token usage information
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl TokenUsage {
    /// Calculate cost based on per-token pricing
    pub fn calculate_cost(&self, cost_per_input: f64, cost_per_output: f64) -> f64 {
        (self.prompt_tokens as f64 * cost_per_input)
            + (self.completion_tokens as f64 * cost_per_output)
    }

    pub fn add(&mut self, other: &TokenUsage) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.total_tokens += other.total_tokens;
    }
}

/// Errors from LLM clients
#[derive(Debug, Error)]
pub enum LLMError {
    #[error("API error: {0}")]
    ApiError(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors from embedding clients
#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("API error: {0}")]
    ApiError(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Trait for embedding clients
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Embed a single query text
    async fn embed_query(&self, text: &str) -> Result<Vec<f64>, EmbedError>;

    /// Embed a batch of texts, one vector per text in order
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f64>>, EmbedError>;
}

fn parse_usage(usage_data: &serde_json::Value, input_key: &str, output_key: &str) -> TokenUsage {
    let prompt_tokens = usage_data[input_key].as_u64().unwrap_or(0) as u32;
    let completion_tokens = usage_data[output_key].as_u64().unwrap_or(0) as u32;
    TokenUsage {
        prompt_tokens,
        completion_tokens,
        total_tokens: usage_data["total_tokens"]
            .as_u64()
            .map(|t| t as u32)
            .unwrap_or(prompt_tokens + completion_tokens),
    }
}

/// OpenAI client implementation (chat completions + embeddings)
pub struct OpenAIClient {
    api_key: String,
    model: String,
    embedding_model: String,
    temperature: f64,
    base_url: String,
    client: reqwest::Client,
}

impl OpenAIClient {
    pub const DEFAULT_EMBEDDING_MODEL: &'static str = "text-embedding-ada-002";

    pub fn new(api_key: String, model: String) -> Self {
        Self {
            api_key,
            model,
            embedding_model: Self::DEFAULT_EMBEDDING_MODEL.to_string(),
            temperature: 1.0,
            base_url: "https://api.openai.com/v1".to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_embedding_model(mut self, embedding_model: String) -> Self {
        self.embedding_model = embedding_model;
        self
    }
}

#[async_trait]
impl EmbeddingClient for OpenAIClient {
    async fn embed_query(&self, text: &str) -> Result<Vec<f64>, EmbedError> {
        let embeddings = self.embed_documents(&[text.to_string()]).await?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| EmbedError::ApiError("No embedding returned".to_string()))
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f64>>, EmbedError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = serde_json::json!({
            "model": self.embedding_model,
            "input": texts
        });

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                return Err(EmbedError::RateLimitExceeded);
            }
            return Err(EmbedError::ApiError(error_text));
        }

        let response_data: serde_json::Value = response.json().await?;

        let mut items: Vec<(u64, Vec<f64>)> = Vec::new();
        if let Some(data) = response_data["data"].as_array() {
            for (position, item) in data.iter().enumerate() {
                if let Some(embedding_vec) = item["embedding"].as_array() {
                    let vec = embedding_vec
                        .iter()
                        .map(|v| {
                            v.as_f64().ok_or_else(|| {
                                EmbedError::ApiError(format!(
                                    "Non-numeric embedding value at position {}: {}",
                                    position, v
                                ))
                            })
                        })
                        .collect::<Result<Vec<f64>, EmbedError>>()?;
                    let index = item["index"].as_u64().unwrap_or(position as u64);
                    items.push((index, vec));
                }
            }
        }
        items.sort_by_key(|(index, _)| *index);

        if items.len() != texts.len() {
            return Err(EmbedError::ApiError(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                items.len()
            )));
        }

        Ok(items.into_iter().map(|(_, vec)| vec).collect())
    }
}

#[async_trait]
impl LLMClient for OpenAIClient {
    async fn complete(&self, prompt: &ChatPrompt, n: usize) -> Result<LLMResponse, LLMError> {
        let request = serde_json::json!({
            "model": self.model,
            "messages": prompt.messages,
            "n": n,
            "temperature": self.temperature
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                return Err(LLMError::RateLimitExceeded);
            }
            return Err(LLMError::ApiError(error_text));
        }

        let response_data: serde_json::Value = response.json().await?;

        let choices = response_data["choices"]
            .as_array()
            .ok_or(LLMError::InvalidResponse("Missing choices".to_string()))?;

        let generations = choices
            .iter()
            .map(|choice| {
                choice["message"]["content"]
                    .as_str()
                    .map(|text| Generation {
                        text: text.to_string(),
                    })
                    .ok_or(LLMError::InvalidResponse("Missing content".to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(LLMResponse {
            generations,
            usage: parse_usage(&response_data["usage"], "prompt_tokens", "completion_tokens"),
            model: self.model.clone(),
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn cost_per_token(&self) -> (f64, f64) {
        match self.model.as_str() {
            "gpt-4o" => (0.0000025, 0.000010),        // $2.50/$10 per 1M
            "gpt-4o-mini" => (0.00000015, 0.0000006), // $0.15/$0.60 per 1M
            "gpt-4-turbo" => (0.000010, 0.000030),    // $10/$30 per 1M
            "gpt-3.5-turbo" => (0.0000005, 0.0000015),
            _ => (0.00000015, 0.0000006), // Default to mini pricing
        }
    }
}

/// Anthropic Claude client implementation
///
/// The messages API has no `n` parameter, so `n` completions cost `n` requests.
pub struct AnthropicClient {
    api_key: String,
    model: String,
    temperature: f64,
    max_tokens: u32,
    base_url: String,
    client: reqwest::Client,
}

impl AnthropicClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            api_key,
            model,
            temperature: 1.0,
            max_tokens: 256,
            base_url: "https://api.anthropic.com/v1".to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    async fn sample_once(&self, prompt: &ChatPrompt) -> Result<(Generation, TokenUsage), LLMError> {
        let messages: Vec<&crate::prompts::ChatMessage> = prompt
            .messages
            .iter()
            .filter(|m| m.role != ChatRole::System)
            .collect();

        let mut request = serde_json::json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "messages": messages,
            "temperature": self.temperature
        });
        if let Some(system) = prompt.system_text() {
            request["system"] = serde_json::Value::String(system);
        }

        let response = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                return Err(LLMError::RateLimitExceeded);
            }
            return Err(LLMError::ApiError(error_text));
        }

        let response_data: serde_json::Value = response.json().await?;

        let text = response_data["content"][0]["text"]
            .as_str()
            .ok_or(LLMError::InvalidResponse("Missing content".to_string()))?
            .to_string();

        Ok((
            Generation { text },
            parse_usage(&response_data["usage"], "input_tokens", "output_tokens"),
        ))
    }
}

#[async_trait]
impl LLMClient for AnthropicClient {
    async fn complete(&self, prompt: &ChatPrompt, n: usize) -> Result<LLMResponse, LLMError> {
        let mut generations = Vec::with_capacity(n);
        let mut usage = TokenUsage::default();

        for _ in 0..n {
            let (generation, sample_usage) = self.sample_once(prompt).await?;
            generations.push(generation);
            usage.add(&sample_usage);
        }

        Ok(LLMResponse {
            generations,
            usage,
            model: self.model.clone(),
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn cost_per_token(&self) -> (f64, f64) {
        match self.model.as_str() {
            "claude-sonnet-4.5" | "claude-3-5-sonnet-20241022" => {
                (0.000003, 0.000015) // $3/$15 per 1M
            }
            "claude-3-5-haiku-20241022" => {
                (0.0000008, 0.000004) // $0.80/$4 per 1M
            }
            _ => (0.000003, 0.000015),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompts::question_generation_prompt;
    use mockito::Matcher;

    #[test]
    fn test_token_usage_cost() {
        let usage = TokenUsage {
            prompt_tokens: 100,
            completion_tokens: 50,
            total_tokens: 150,
        };

        // 100 * 0.00000015 + 50 * 0.0000006 = 0.000015 + 0.00003 = 0.000045
        let cost = usage.calculate_cost(0.00000015, 0.0000006);
        assert!((cost - 0.000045).abs() < 0.0000001);
    }

    #[test]
    fn test_token_usage_add() {
        let mut total = TokenUsage::default();
        total.add(&TokenUsage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        });
        total.add(&TokenUsage {
            prompt_tokens: 1,
            completion_tokens: 1,
            total_tokens: 2,
        });
        assert_eq!(total.total_tokens, 17);
        assert_eq!(total.prompt_tokens, 11);
    }

    #[test]
    fn test_openai_cost_per_token() {
        let client = OpenAIClient::new("test".to_string(), "gpt-4o-mini".to_string());
        let (input, output) = client.cost_per_token();

        assert_eq!(input, 0.00000015);
        assert_eq!(output, 0.0000006);
    }

    #[tokio::test]
    async fn test_openai_requests_n_completions() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "model": "gpt-4o-mini",
                "n": 3
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                serde_json::json!({
                    "choices": [
                        {"index": 0, "message": {"role": "assistant", "content": "Q one?"}},
                        {"index": 1, "message": {"role": "assistant", "content": "Q two?"}},
                        {"index": 2, "message": {"role": "assistant", "content": "Q three?"}}
                    ],
                    "usage": {"prompt_tokens": 90, "completion_tokens": 12, "total_tokens": 102}
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = OpenAIClient::new("sk-test".to_string(), "gpt-4o-mini".to_string())
            .with_base_url(server.url());
        let response = client
            .complete(&question_generation_prompt("An answer."), 3)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(response.texts(), vec!["Q one?", "Q two?", "Q three?"]);
        assert_eq!(response.usage.total_tokens, 102);
    }

    #[tokio::test]
    async fn test_openai_rate_limit() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(429)
            .with_body("slow down")
            .create_async()
            .await;

        let client = OpenAIClient::new("sk-test".to_string(), "gpt-4o-mini".to_string())
            .with_base_url(server.url());
        let err = client
            .complete(&question_generation_prompt("An answer."), 1)
            .await
            .unwrap_err();

        assert!(matches!(err, LLMError::RateLimitExceeded));
    }

    #[tokio::test]
    async fn test_openai_embeddings_follow_index_order() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/embeddings")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "model": "text-embedding-ada-002"
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                serde_json::json!({
                    "data": [
                        {"index": 1, "embedding": [0.0, 1.0]},
                        {"index": 0, "embedding": [1.0, 0.0]}
                    ]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = OpenAIClient::new("sk-test".to_string(), "gpt-4o-mini".to_string())
            .with_base_url(server.url());
        let vectors = client
            .embed_documents(&["first".to_string(), "second".to_string()])
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[tokio::test]
    async fn test_openai_embedding_count_mismatch() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/embeddings")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"data": [{"index": 0, "embedding": [1.0]}]}"#)
            .create_async()
            .await;

        let client = OpenAIClient::new("sk-test".to_string(), "gpt-4o-mini".to_string())
            .with_base_url(server.url());
        let err = client
            .embed_documents(&["a".to_string(), "b".to_string()])
            .await
            .unwrap_err();

        assert!(matches!(err, EmbedError::ApiError(ref msg) if msg.contains("Expected 2")));
    }

    #[tokio::test]
    async fn test_openai_embedding_non_numeric_value() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/embeddings")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"data": [{"index": 0, "embedding": [0.5, "oops", 0.25]}]}"#)
            .create_async()
            .await;

        let client = OpenAIClient::new("sk-test".to_string(), "gpt-4o-mini".to_string())
            .with_base_url(server.url());
        let err = client.embed_query("a").await.unwrap_err();

        assert!(matches!(err, EmbedError::ApiError(ref msg) if msg.contains("Non-numeric")));
    }

    #[tokio::test]
    async fn test_empty_embedding_batch_skips_request() {
        // Unroutable base URL: any request would fail
        let client = OpenAIClient::new("sk-test".to_string(), "gpt-4o-mini".to_string())
            .with_base_url("http://127.0.0.1:1".to_string());
        let vectors = client.embed_documents(&[]).await.unwrap();
        assert!(vectors.is_empty());
    }

    #[tokio::test]
    async fn test_anthropic_samples_n_times() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/messages")
            .match_header("x-api-key", "ak-test")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                serde_json::json!({
                    "content": [{"type": "text", "text": "Which mission?"}],
                    "usage": {"input_tokens": 80, "output_tokens": 4}
                })
                .to_string(),
            )
            .expect(3)
            .create_async()
            .await;

        let client = AnthropicClient::new(
            "ak-test".to_string(),
            "claude-3-5-haiku-20241022".to_string(),
        )
        .with_base_url(server.url());
        let response = client
            .complete(&question_generation_prompt("An answer."), 3)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(response.generations.len(), 3);
        assert_eq!(response.usage.prompt_tokens, 240);
        assert_eq!(response.usage.total_tokens, 252);
    }
}
