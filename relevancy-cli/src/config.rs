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

use anyhow::Result;
use relevancy_evals::AnswerRelevancyConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Relevancy CLI configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RelevancyConfig {
    #[serde(default)]
    pub metric: AnswerRelevancyConfig,

    #[serde(default)]
    pub llm: LLMConfig,
}

/// Which service generates candidate questions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    OpenAI,
    Anthropic,
}

impl FromStr for Provider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAI),
            "anthropic" => Ok(Provider::Anthropic),
            other => anyhow::bail!("Unknown LLM provider: {}", other),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LLMConfig {
    /// Generation provider (embeddings always use OpenAI)
    #[serde(default = "default_provider")]
    pub provider: Provider,

    /// OpenAI API key
    pub openai_api_key: Option<String>,

    /// Anthropic API key
    pub anthropic_api_key: Option<String>,

    /// OpenAI-compatible base URL (e.g., a local proxy)
    pub base_url: Option<String>,

    /// Generation model; defaults per provider
    pub generation_model: Option<String>,

    /// Embedding model
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
}

fn default_provider() -> Provider {
    Provider::OpenAI
}

fn default_embedding_model() -> String {
    "text-embedding-ada-002".to_string()
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            openai_api_key: None,
            anthropic_api_key: None,
            base_url: None,
            generation_model: None,
            embedding_model: default_embedding_model(),
        }
    }
}

impl LLMConfig {
    /// Configured generation model, or the provider default
    pub fn generation_model(&self) -> String {
        match (&self.generation_model, self.provider) {
            (Some(model), _) => model.clone(),
            (None, Provider::OpenAI) => "gpt-4o-mini".to_string(),
            (None, Provider::Anthropic) => "claude-3-5-haiku-20241022".to_string(),
        }
    }
}

impl RelevancyConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from environment variables
    ///
    /// Supported environment variables:
    /// - OPENAI_API_KEY / ANTHROPIC_API_KEY: API keys
    /// - RELEVANCY_LLM_PROVIDER: openai | anthropic (default: openai)
    /// - RELEVANCY_BASE_URL: OpenAI-compatible base URL
    /// - RELEVANCY_GENERATION_MODEL: generation model
    /// - RELEVANCY_EMBEDDING_MODEL: embedding model (default: text-embedding-ada-002)
    /// - RELEVANCY_METRIC_NAME: output column (default: answer_relevancy)
    /// - RELEVANCY_BATCH_SIZE: rows per batch (default: 15)
    /// - RELEVANCY_STRICTNESS: questions per answer (default: 3)
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Override fields whose environment variable is set
    fn apply_env(&mut self) {
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            self.llm.openai_api_key = Some(key);
        }

        if let Ok(key) = std::env::var("ANTHROPIC_API_KEY") {
            self.llm.anthropic_api_key = Some(key);
        }

        if let Ok(provider) = std::env::var("RELEVANCY_LLM_PROVIDER") {
            match provider.parse() {
                Ok(val) => self.llm.provider = val,
                Err(e) => tracing::warn!("Ignoring RELEVANCY_LLM_PROVIDER: {}", e),
            }
        }

        if let Ok(base_url) = std::env::var("RELEVANCY_BASE_URL") {
            self.llm.base_url = Some(base_url);
        }

        if let Ok(model) = std::env::var("RELEVANCY_GENERATION_MODEL") {
            self.llm.generation_model = Some(model);
        }

        if let Ok(model) = std::env::var("RELEVANCY_EMBEDDING_MODEL") {
            self.llm.embedding_model = model;
        }

        if let Ok(name) = std::env::var("RELEVANCY_METRIC_NAME") {
            self.metric.name = name;
        }

        if let Ok(batch_size) = std::env::var("RELEVANCY_BATCH_SIZE") {
            if let Ok(val) = batch_size.parse() {
                self.metric.batch_size = val;
            }
        }

        if let Ok(strictness) = std::env::var("RELEVANCY_STRICTNESS") {
            if let Ok(val) = strictness.parse() {
                self.metric.strictness = val;
            }
        }
    }

    /// Load configuration with priority: env > file > defaults
    pub fn load(config_file: Option<PathBuf>) -> Result<Self> {
        let mut config = if let Some(path) = config_file {
            if path.exists() {
                tracing::info!("Loading configuration from file: {:?}", path);
                Self::from_file(&path)?
            } else {
                tracing::warn!("Config file not found: {:?}, using defaults", path);
                Self::default()
            }
        } else {
            Self::default()
        };

        config.apply_env();

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.metric.validate()?;

        if self.llm.openai_api_key.is_none() {
            anyhow::bail!("OpenAI API key is required for embeddings (set OPENAI_API_KEY)");
        }

        if self.llm.provider == Provider::Anthropic && self.llm.anthropic_api_key.is_none() {
            anyhow::bail!("Anthropic provider selected but ANTHROPIC_API_KEY is not set");
        }

        Ok(())
    }

    /// Copy with API keys replaced, safe to print
    pub fn masked(&self) -> Self {
        let mut config = self.clone();
        let mask = |key: &mut Option<String>| {
            if key.is_some() {
                *key = Some("***".to_string());
            }
        };
        mask(&mut config.llm.openai_api_key);
        mask(&mut config.llm.anthropic_api_key);
        config
    }
}
