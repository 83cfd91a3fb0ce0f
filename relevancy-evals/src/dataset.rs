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

//! In-memory evaluation table
//!
//! Rows are JSON objects; columns keep first-seen order. Columns the metrics
//! do not read are carried through untouched.

use crate::EvalError;
use serde_json::{Map, Value};
use std::io::{BufRead, Write};
use std::ops::Range;

/// Column holding the original question
pub const QUESTION_COLUMN: &str = "question";

/// Column holding the generated answer
pub const ANSWER_COLUMN: &str = "answer";

/// Tabular dataset of evaluation rows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Map<String, Value>>,
}

/// A (question, answer) pair borrowed from a dataset row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalRecord<'a> {
    pub question: &'a str,
    pub answer: &'a str,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a dataset from JSON object rows
    pub fn from_rows(rows: Vec<Map<String, Value>>) -> Self {
        let mut columns: Vec<String> = Vec::new();
        for row in &rows {
            for key in row.keys() {
                if !columns.iter().any(|c| c == key) {
                    columns.push(key.clone());
                }
            }
        }
        Self { columns, rows }
    }

    /// Build a two-column (question, answer) dataset
    pub fn from_qa_pairs<I, Q, A>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (Q, A)>,
        Q: Into<String>,
        A: Into<String>,
    {
        let rows = pairs
            .into_iter()
            .map(|(question, answer)| {
                let mut row = Map::new();
                row.insert(QUESTION_COLUMN.to_string(), Value::String(question.into()));
                row.insert(ANSWER_COLUMN.to_string(), Value::String(answer.into()));
                row
            })
            .collect();

        Self {
            columns: vec![QUESTION_COLUMN.to_string(), ANSWER_COLUMN.to_string()],
            rows,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Map<String, Value>] {
        &self.rows
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Read a column as text, in row order
    pub fn column_text(&self, name: &str) -> Result<Vec<String>, EvalError> {
        Ok(self.column_str(name)?.into_iter().map(str::to_string).collect())
    }

    /// Raw column values, in row order. Rows missing the key yield `Null`.
    pub fn column_values(&self, name: &str) -> Result<Vec<&Value>, EvalError> {
        if !self.has_column(name) {
            return Err(EvalError::MissingColumn(name.to_string()));
        }
        Ok(self
            .rows
            .iter()
            .map(|row| row.get(name).unwrap_or(&Value::Null))
            .collect())
    }

    fn column_str(&self, name: &str) -> Result<Vec<&str>, EvalError> {
        self.column_values(name)?
            .into_iter()
            .enumerate()
            .map(|(idx, value)| {
                value.as_str().ok_or_else(|| {
                    EvalError::InvalidInput(format!(
                        "row {}: column '{}' is not text (got {})",
                        idx, name, value
                    ))
                })
            })
            .collect()
    }

    /// (question, answer) view of every row
    pub fn records(&self) -> Result<Vec<EvalRecord<'_>>, EvalError> {
        let questions = self.column_str(QUESTION_COLUMN)?;
        let answers = self.column_str(ANSWER_COLUMN)?;
        Ok(questions
            .into_iter()
            .zip(answers)
            .map(|(question, answer)| EvalRecord { question, answer })
            .collect())
    }

    /// Contiguous slice of rows as a new dataset
    pub fn select(&self, range: Range<usize>) -> Result<Dataset, EvalError> {
        if range.start > range.end || range.end > self.rows.len() {
            return Err(EvalError::InvalidInput(format!(
                "row range {:?} out of bounds for {} rows",
                range,
                self.rows.len()
            )));
        }
        Ok(Dataset {
            columns: self.columns.clone(),
            rows: self.rows[range].to_vec(),
        })
    }

    /// Append a column. One value per row, in row order.
    pub fn add_column(mut self, name: &str, values: Vec<Value>) -> Result<Dataset, EvalError> {
        if self.has_column(name) {
            return Err(EvalError::InvalidInput(format!(
                "column '{}' already exists",
                name
            )));
        }
        if values.len() != self.rows.len() {
            return Err(EvalError::InvalidInput(format!(
                "column '{}' has {} values for {} rows",
                name,
                values.len(),
                self.rows.len()
            )));
        }

        for (row, value) in self.rows.iter_mut().zip(values) {
            row.insert(name.to_string(), value);
        }
        self.columns.push(name.to_string());
        Ok(self)
    }

    /// Parse JSON Lines: one object per line, blank lines skipped
    pub fn from_jsonl_reader<R: BufRead>(reader: R) -> Result<Dataset, EvalError> {
        let mut rows = Vec::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Value>(&line)? {
                Value::Object(row) => rows.push(row),
                other => {
                    return Err(EvalError::InvalidInput(format!(
                        "line {}: expected a JSON object, got {}",
                        idx + 1,
                        other
                    )))
                }
            }
        }
        Ok(Dataset::from_rows(rows))
    }

    /// Write JSON Lines, one row per line
    pub fn to_jsonl_writer<W: Write>(&self, mut writer: W) -> Result<(), EvalError> {
        for row in &self.rows {
            serde_json::to_writer(&mut writer, row)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        Ok(())
    }
}
