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

//! Cosine similarity between a query vector and a set of candidate vectors

use crate::EvalError;
use ndarray::{Array2, ArrayView1, Axis};

/// Cosine similarity of `question` against every candidate, in candidate order.
///
/// Norms are not guarded: a zero-norm vector on either side produces NaN for
/// the affected entries.
pub fn cosine_similarities(question: &[f64], candidates: &[Vec<f64>]) -> Result<Vec<f64>, EvalError> {
    let dim = question.len();
    let question = ArrayView1::from(question);

    let mut matrix = Array2::<f64>::zeros((candidates.len(), dim));
    for (mut row, candidate) in matrix.rows_mut().into_iter().zip(candidates) {
        if candidate.len() != dim {
            return Err(EvalError::DimensionMismatch {
                expected: dim,
                actual: candidate.len(),
            });
        }
        row.assign(&ArrayView1::from(candidate.as_slice()));
    }

    let dots = matrix.dot(&question);
    let question_norm = question.dot(&question).sqrt();
    let norms = matrix.map_axis(Axis(1), |row| row.dot(&row).sqrt()) * question_norm;

    Ok((dots / norms).to_vec())
}

/// Largest similarity. NaN anywhere makes the result NaN; `None` when empty.
pub fn max_similarity(similarities: &[f64]) -> Option<f64> {
    let mut iter = similarities.iter().copied();
    let first = iter.next()?;
    Some(iter.fold(first, |acc, s| {
        if acc.is_nan() || s.is_nan() {
            f64::NAN
        } else {
            acc.max(s)
        }
    }))
}
