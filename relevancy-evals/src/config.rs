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

use crate::EvalError;
use serde::{Deserialize, Serialize};

/// Answer relevancy metric configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AnswerRelevancyConfig {
    /// Output column name
    #[serde(default = "default_name")]
    pub name: String,

    /// Rows per processed chunk
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Candidate questions generated per answer. 3 to 5 works well.
    #[serde(default = "default_strictness")]
    pub strictness: usize,
}

fn default_name() -> String {
    "answer_relevancy".to_string()
}

fn default_batch_size() -> usize {
    15
}

fn default_strictness() -> usize {
    3
}

impl Default for AnswerRelevancyConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            batch_size: default_batch_size(),
            strictness: default_strictness(),
        }
    }
}

impl AnswerRelevancyConfig {
    pub fn validate(&self) -> Result<(), EvalError> {
        if self.name.trim().is_empty() {
            return Err(EvalError::InvalidConfig(
                "name must not be empty".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(EvalError::InvalidConfig(
                "batch_size must be at least 1".to_string(),
            ));
        }
        if self.strictness == 0 {
            return Err(EvalError::InvalidConfig(
                "strictness must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
