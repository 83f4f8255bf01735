// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Reconstruction of the logical k-by-64 bit matrix from sparse plus window
//! state.

use crate::pair_table::PairTable;

pub(crate) fn count_bits_set(matrix: &[u64]) -> u32 {
    matrix.iter().map(|row| row.count_ones()).sum()
}

/// Produces the full-size bit matrix corresponding to the given low-level
/// state.
///
/// Warning: this runs in several places, including transitional moments
/// during which the sketch invariants involving flavor and offset are out of
/// whack and are in fact being re-imposed. Therefore it must interpret the
/// low-level state "as is" rather than consult the flavor or offset policy.
pub(crate) fn bit_matrix_of(
    lg_k: u8,
    window_offset: u8,
    sliding_window: &[u8],
    table: &PairTable,
) -> Vec<u64> {
    debug_assert!(window_offset <= 56);
    let k = 1usize << lg_k;

    // Fill the matrix with default rows in which the "early zone" is all
    // ones. This is what keeps the routine O(k) as opposed to O(C).
    let default_row = (1u64 << window_offset) - 1;
    let mut matrix = vec![default_row; k];

    if !sliding_window.is_empty() {
        // window mode: set the window bits, trusting the given offset
        for (row, &bits) in matrix.iter_mut().zip(sliding_window) {
            *row |= (bits as u64) << window_offset;
        }
    }

    for &row_col in table.slots() {
        if row_col != u32::MAX {
            let col = row_col & 63;
            let row = (row_col >> 6) as usize;
            // Flip the specified matrix bit from its default value.
            // In the "early" zone the bit changes from 1 to 0.
            // In the "late" zone the bit changes from 0 to 1.
            matrix[row] ^= 1 << col;
        }
    }

    matrix
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sparse_state() {
        // offset 0, no window: the matrix holds exactly the stored pairs
        let mut table = PairTable::new(2, 6 + 4);
        let pairs = [(0u32, 0u32), (0, 5), (3, 63), (15, 7)];
        for &(row, col) in &pairs {
            assert!(table.maybe_insert((row << 6) | col));
        }

        let matrix = bit_matrix_of(4, 0, &[], &table);
        assert_eq!(matrix.len(), 16);
        assert_eq!(count_bits_set(&matrix), pairs.len() as u32);
        assert_eq!(matrix[0], (1 << 0) | (1 << 5));
        assert_eq!(matrix[3], 1 << 63);
        assert_eq!(matrix[15], 1 << 7);
    }

    #[test]
    fn test_windowed_state() {
        // offset 4: rows default to four early ones, the window byte lands at
        // bits [4, 12), table entries flip either zone
        let mut table = PairTable::new(2, 6 + 4);
        table.maybe_insert(2 << 6); // surprising zero at (2, 0)
        table.maybe_insert((5 << 6) | 20); // surprising one at (5, 20)

        let mut window = vec![0u8; 16];
        window[1] = 0b1000_0001;

        let matrix = bit_matrix_of(4, 4, &window, &table);
        assert_eq!(matrix[0], 0b1111);
        assert_eq!(matrix[1], 0b1111 | (0b1000_0001 << 4));
        assert_eq!(matrix[2], 0b1110, "early-zone bit 0 must flip to zero");
        assert_eq!(matrix[5], 0b1111 | (1 << 20));
    }
}
