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
use std::ops::Range;

/// Split `0..len` into contiguous ranges of at most `batch_size` rows.
///
/// The last range holds the remainder, so `batches(32, 15)` yields
/// `[0..15, 15..30, 30..32]`.
pub fn batches(len: usize, batch_size: usize) -> Result<Vec<Range<usize>>, EvalError> {
    if batch_size == 0 {
        return Err(EvalError::InvalidConfig(
            "batch_size must be at least 1".to_string(),
        ));
    }

    Ok((0..len)
        .step_by(batch_size)
        .map(|start| start..(start + batch_size).min(len))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_default_batch_size_on_32_rows() {
        let ranges = batches(32, 15).unwrap();
        assert_eq!(ranges, vec![0..15, 15..30, 30..32]);
    }

    #[test]
    fn test_exact_multiple() {
        assert_eq!(batches(30, 15).unwrap(), vec![0..15, 15..30]);
    }

    #[test]
    fn test_empty_and_small() {
        assert!(batches(0, 15).unwrap().is_empty());
        assert_eq!(batches(3, 15).unwrap(), vec![0..3]);
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        assert!(matches!(batches(10, 0), Err(EvalError::InvalidConfig(_))));
    }

    proptest! {
        #[test]
        fn prop_ranges_cover_every_row_once(len in 0usize..500, batch_size in 1usize..64) {
            let ranges = batches(len, batch_size).unwrap();

            let mut next = 0;
            for range in &ranges {
                prop_assert_eq!(range.start, next);
                prop_assert!(range.end > range.start);
                prop_assert!(range.end - range.start <= batch_size);
                next = range.end;
            }
            prop_assert_eq!(next, len);
            prop_assert_eq!(ranges.len(), (len + batch_size - 1) / batch_size);
        }
    }
}
