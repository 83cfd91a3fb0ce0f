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

//! Metric trait and the dataset-level runner

use crate::dataset::{Dataset, ANSWER_COLUMN, QUESTION_COLUMN};
use crate::EvalError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Which dataset columns a metric reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationMode {
    /// question + answer
    Qa,
}

impl EvaluationMode {
    pub fn required_columns(&self) -> &'static [&'static str] {
        match self {
            EvaluationMode::Qa => &[QUESTION_COLUMN, ANSWER_COLUMN],
        }
    }

    /// Error on the first required column the dataset lacks
    pub fn check(&self, dataset: &Dataset) -> Result<(), EvalError> {
        match self
            .required_columns()
            .iter()
            .find(|column| !dataset.has_column(column))
        {
            Some(column) => Err(EvalError::MissingColumn(column.to_string())),
            None => Ok(()),
        }
    }
}

/// Core trait for dataset-level metrics
#[async_trait]
pub trait Metric: Send + Sync {
    /// Output column name
    fn name(&self) -> &str;

    fn evaluation_mode(&self) -> EvaluationMode;

    /// Score every row; returns the dataset with `name()` appended
    async fn score(&self, dataset: &Dataset) -> Result<Dataset, EvalError>;
}

/// Apply metrics in order, each appending its own column.
///
/// Required columns and output column names are checked before any model is called.
pub async fn evaluate(
    dataset: &Dataset,
    metrics: &[Arc<dyn Metric>],
) -> Result<Dataset, EvalError> {
    let mut outputs: Vec<&str> = Vec::with_capacity(metrics.len());
    for metric in metrics {
        metric.evaluation_mode().check(dataset)?;
        let name = metric.name();
        if dataset.has_column(name) || outputs.contains(&name) {
            return Err(EvalError::InvalidInput(format!(
                "column '{}' already exists",
                name
            )));
        }
        outputs.push(name);
    }

    let mut scored = dataset.clone();
    for metric in metrics {
        info!(metric = metric.name(), rows = scored.len(), "Evaluating metric");
        scored = metric.score(&scored).await?;
    }
    Ok(scored)
}
