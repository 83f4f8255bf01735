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

use crate::DEFAULT_LG_K;
use crate::MAX_LG_K;
use crate::MIN_LG_K;
use crate::common::NumStdDev;
use crate::common::canonical_double;
use crate::estimator::hip_confidence_lb;
use crate::estimator::hip_confidence_ub;
use crate::estimator::icon_confidence_lb;
use crate::estimator::icon_confidence_ub;
use crate::estimator::icon_estimate;
use crate::flavor::Flavor;
use crate::flavor::determine_correct_offset;
use crate::flavor::determine_flavor;
use crate::hash;
use crate::hash::DEFAULT_UPDATE_SEED;
use crate::hash::compute_seed_hash;
use crate::hip::HipRegister;
use crate::matrix::bit_matrix_of;
use crate::matrix::count_bits_set;
use crate::pair_table::PairTable;

/// A Compressed Probabilistic Counting sketch.
///
/// See the [crate level documentation](crate) for more.
///
/// All state is exclusively owned, so [`Clone`] produces a fully independent
/// deep copy.
#[derive(Debug, Clone)]
pub struct CpcSketch {
    // immutable config variables
    pub(crate) lg_k: u8,
    pub(crate) seed: u64,
    pub(crate) seed_hash: u16,

    // sketch state
    /// Part of a speed optimization: the smallest column that could still
    /// yield a novel coupon.
    pub(crate) first_interesting_column: u8,
    /// The number of coupons collected so far.
    pub(crate) num_coupons: u32,
    /// All coupons while sparse; only the surprising ones once windowed.
    pub(crate) surprising_value_table: Option<PairTable>,
    /// Derivable from num_coupons, but made explicit for speed.
    pub(crate) window_offset: u8,
    /// Size K bytes in window mode (flavor >= HYBRID), empty before that.
    pub(crate) sliding_window: Vec<u8>,

    // estimator state
    /// Whether the sketch state came from a merge.
    ///
    /// If `false`, the HIP (Historic Inverse Probability) estimator is used.
    /// If `true`, the HIP accumulators are invalid and the ICON estimator is
    /// the fallback.
    pub(crate) merge_flag: bool,
    /// Accumulators backing the HIP estimator.
    pub(crate) hip: HipRegister,
}

impl Default for CpcSketch {
    fn default() -> Self {
        Self::new(DEFAULT_LG_K)
    }
}

impl CpcSketch {
    /// Creates a new `CpcSketch` with the given `lg_k` and the default seed.
    ///
    /// # Panics
    ///
    /// Panics if `lg_k` is not in the range `[4, 26]`.
    pub fn new(lg_k: u8) -> Self {
        Self::with_seed(lg_k, DEFAULT_UPDATE_SEED)
    }

    /// Creates a new `CpcSketch` with the given `lg_k` and `seed`.
    ///
    /// A seed of 0 is remapped to the default seed.
    ///
    /// # Panics
    ///
    /// Panics if `lg_k` is not in the range `[4, 26]`, or the computed seed
    /// hash is zero.
    pub fn with_seed(lg_k: u8, seed: u64) -> Self {
        assert!(
            (MIN_LG_K..=MAX_LG_K).contains(&lg_k),
            "lg_k out of range; got {lg_k}",
        );
        let seed = if seed == 0 { DEFAULT_UPDATE_SEED } else { seed };

        Self {
            lg_k,
            seed,
            seed_hash: compute_seed_hash(seed),
            first_interesting_column: 0,
            num_coupons: 0,
            surprising_value_table: None,
            window_offset: 0,
            sliding_window: vec![],
            merge_flag: false,
            hip: HipRegister::new(lg_k),
        }
    }

    /// Return the parameter lg_k.
    pub fn lg_k(&self) -> u8 {
        self.lg_k
    }

    /// Returns true if the sketch is empty.
    pub fn is_empty(&self) -> bool {
        self.num_coupons == 0
    }

    /// Returns the number of coupons collected so far.
    ///
    /// This is primarily for testing and validation purposes; it is not a
    /// cardinality estimate.
    pub fn num_coupons(&self) -> u32 {
        self.num_coupons
    }

    /// Returns the current representational regime of the sketch.
    pub fn flavor(&self) -> Flavor {
        determine_flavor(self.lg_k, self.num_coupons)
    }

    /// Returns the best estimate of the cardinality of the sketch.
    pub fn estimate(&self) -> f64 {
        if !self.merge_flag {
            self.hip.estimate()
        } else {
            icon_estimate(self.lg_k, self.num_coupons)
        }
    }

    /// Returns the best estimate of the lower bound of the confidence interval given `kappa`.
    pub fn lower_bound(&self, kappa: NumStdDev) -> f64 {
        if !self.merge_flag {
            hip_confidence_lb(self.lg_k, self.num_coupons, self.hip.estimate(), kappa)
        } else {
            icon_confidence_lb(self.lg_k, self.num_coupons, kappa)
        }
    }

    /// Returns the best estimate of the upper bound of the confidence interval given `kappa`.
    pub fn upper_bound(&self, kappa: NumStdDev) -> f64 {
        if !self.merge_flag {
            hip_confidence_ub(self.lg_k, self.num_coupons, self.hip.estimate(), kappa)
        } else {
            icon_confidence_ub(self.lg_k, self.num_coupons, kappa)
        }
    }

    /// Resets this sketch to empty, retaining `lg_k` and the seed.
    pub fn reset(&mut self) {
        self.first_interesting_column = 0;
        self.num_coupons = 0;
        self.surprising_value_table = None;
        self.window_offset = 0;
        self.sliding_window = vec![];
        self.merge_flag = false;
        self.hip = HipRegister::new(self.lg_k);
    }
}

// The typed update surface. Each input kind is reduced to a little-endian
// byte stream, mixed under the configured seed, and fed to the coupon engine.
impl CpcSketch {
    /// Presents the given unsigned 64-bit integer as a potential unique item.
    pub fn update_u64(&mut self, datum: u64) {
        let (h0, h1) = hash::hash_u64(datum, self.seed);
        self.hash_update(h0, h1);
    }

    /// Presents the given signed 64-bit integer as a potential unique item.
    pub fn update_i64(&mut self, datum: i64) {
        self.update_u64(datum as u64);
    }

    /// Presents the given double as a potential unique item.
    ///
    /// Plus and minus zero are treated as the same value, and all NaN bit
    /// patterns are treated as the same value. NaN and the infinities are
    /// otherwise ordinary, distinct inputs.
    pub fn update_f64(&mut self, datum: f64) {
        let (h0, h1) = hash::hash_u64(canonical_double(datum), self.seed);
        self.hash_update(h0, h1);
    }

    /// Presents the given float as a potential unique item, after widening
    /// it to a double.
    pub fn update_f32(&mut self, datum: f32) {
        self.update_f64(datum as f64);
    }

    /// Presents the given text as a potential unique item, hashed through
    /// its UTF-8 bytes. An empty string is a no-op.
    ///
    /// Note: this does not produce the same coupons as [`Self::update_chars`]
    /// over the equivalent code units. Pick one representation and stay with
    /// it for the life of the stored sketches.
    pub fn update_str(&mut self, datum: &str) {
        self.update_bytes(datum.as_bytes());
    }

    /// Presents the given byte sequence as a potential unique item. An empty
    /// slice is a no-op.
    pub fn update_bytes(&mut self, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        let (h0, h1) = hash::hash_bytes(data, self.seed);
        self.hash_update(h0, h1);
    }

    /// Presents the given UTF-16 code units as a potential unique item, two
    /// bytes per unit. An empty slice is a no-op.
    pub fn update_chars(&mut self, data: &[u16]) {
        if data.is_empty() {
            return;
        }
        let (h0, h1) = hash::hash_u16s(data, self.seed);
        self.hash_update(h0, h1);
    }

    /// Presents the given 32-bit integer sequence as a potential unique
    /// item. An empty slice is a no-op.
    pub fn update_i32_slice(&mut self, data: &[i32]) {
        if data.is_empty() {
            return;
        }
        let (h0, h1) = hash::hash_i32s(data, self.seed);
        self.hash_update(h0, h1);
    }

    /// Presents the given 64-bit integer sequence as a potential unique
    /// item. An empty slice is a no-op.
    pub fn update_i64_slice(&mut self, data: &[i64]) {
        if data.is_empty() {
            return;
        }
        let (h0, h1) = hash::hash_i64s(data, self.seed);
        self.hash_update(h0, h1);
    }
}

// The coupon engine: derives (row, col) from the 128-bit hash and routes it
// through the sparse or windowed path, promoting representations as the
// coupon count crosses the flavor boundaries.
impl CpcSketch {
    fn hash_update(&mut self, h0: u64, h1: u64) {
        let k_mask = (1u64 << self.lg_k) - 1;
        let col = h1.leading_zeros(); // 0 <= col <= 64
        let col = if col > 63 { 63 } else { col as u8 }; // clip so that 0 <= col <= 63
        let row = (h0 & k_mask) as u32;
        let mut row_col = (row << 6) | (col as u32);
        // Avoid the hash table's "empty" value, which is the pair
        // (2^26 - 1, 63), by changing it to (2^26 - 2, 63). This effectively
        // merges the two cells and cannot occur at all when lg_k < 26.
        if row_col == u32::MAX {
            row_col ^= 1 << 6;
        }
        self.row_col_update(row_col);
    }

    fn row_col_update(&mut self, row_col: u32) {
        let col = (row_col & 63) as u8;
        if col < self.first_interesting_column {
            // important speed optimization
            return;
        }

        if self.num_coupons == 0 {
            // promote EMPTY to SPARSE
            self.surprising_value_table = Some(PairTable::new(2, 6 + self.lg_k));
        }

        if self.sliding_window.is_empty() {
            self.update_sparse(row_col);
        } else {
            self.update_windowed(row_col);
        }
    }

    fn table(&mut self) -> &mut PairTable {
        self.surprising_value_table
            .as_mut()
            .expect("surprising value table must be initialized")
    }

    fn update_sparse(&mut self, row_col: u32) {
        let k = 1u64 << self.lg_k;
        let c32pre = (self.num_coupons as u64) << 5;
        debug_assert!(c32pre < 3 * k); // C < 3K/32, in other words, flavor == SPARSE
        let is_novel = self.table().maybe_insert(row_col);
        if is_novel {
            self.num_coupons += 1;
            self.hip.admit(self.lg_k, (row_col & 63) as u8);
            let c32post = (self.num_coupons as u64) << 5;
            if c32post >= 3 * k {
                self.promote_sparse_to_windowed();
            }
        }
    }

    /// In terms of flavor, this promotes SPARSE to HYBRID.
    fn promote_sparse_to_windowed(&mut self) {
        debug_assert_eq!(self.window_offset, 0);

        let k = 1u64 << self.lg_k;
        let c32 = (self.num_coupons as u64) << 5;
        // at lg_k = 4 the initial table capacity lets the sparse phase
        // overshoot the boundary by a few coupons
        debug_assert!((c32 == 3 * k) || ((self.lg_k == 4) && (c32 > 3 * k)));

        self.sliding_window.resize(k as usize, 0);

        let old_table = self
            .surprising_value_table
            .replace(PairTable::new(2, 6 + self.lg_k))
            .expect("surprising value table must be initialized");
        for &row_col in old_table.slots() {
            if row_col != u32::MAX {
                let col = (row_col & 63) as u8;
                if col < 8 {
                    let row = (row_col >> 6) as usize;
                    self.sliding_window[row] |= 1 << col;
                } else {
                    // cannot use must_insert(), because it doesn't provide for growth
                    let is_novel = self.table().maybe_insert(row_col);
                    debug_assert!(is_novel);
                }
            }
        }
    }

    /// The flavor here is HYBRID, PINNED, or SLIDING.
    fn update_windowed(&mut self, row_col: u32) {
        debug_assert!(self.window_offset <= 56);
        let k = 1u64 << self.lg_k;
        let c32pre = (self.num_coupons as u64) << 5;
        debug_assert!(c32pre >= 3 * k); // C >= 3K/32, in other words flavor >= HYBRID
        let c8pre = (self.num_coupons as u64) << 3;
        let w8pre = (self.window_offset as u64) << 3;
        debug_assert!(c8pre < (27 + w8pre) * k); // C < (K * 27/8) + (K * windowOffset)

        let is_novel;
        let col = (row_col & 63) as u8;
        if col < self.window_offset {
            // track the surprising 0's "before" the window
            is_novel = self.table().maybe_delete(row_col); // inverted logic
        } else if col < self.window_offset + 8 {
            // track the 8 bits inside the window
            let row = (row_col >> 6) as usize;
            let old_bits = self.sliding_window[row];
            let new_bits = old_bits | (1 << (col - self.window_offset));
            is_novel = old_bits != new_bits;
            self.sliding_window[row] = new_bits;
        } else {
            // track the surprising 1's "after" the window
            is_novel = self.table().maybe_insert(row_col); // normal logic
        }

        if is_novel {
            self.num_coupons += 1;
            self.hip.admit(self.lg_k, col);
            let c8post = (self.num_coupons as u64) << 3;
            if c8post >= (27 + w8pre) * k && self.window_offset < 56 {
                self.move_window();
                debug_assert!((1..=56).contains(&self.window_offset));
                let w8post = (self.window_offset as u64) << 3;
                debug_assert!(c8post < (27 + w8post) * k); // C < (K * 27/8) + (K * windowOffset)
            }
        }
    }

    /// Moves the sliding window one column to the left, rewriting the table
    /// in O(k) time.
    fn move_window(&mut self) {
        let new_offset = self.window_offset + 1;
        debug_assert!(new_offset <= 56);
        debug_assert_eq!(
            new_offset,
            determine_correct_offset(self.lg_k, self.num_coupons)
        );

        let k = 1usize << self.lg_k;

        // Construct the full-sized bit matrix that corresponds to the sketch
        let bit_matrix = self.build_bit_matrix();

        // refresh the KXP register on every 8th window shift
        if (new_offset & 0x7) == 0 {
            self.hip.refresh_kxp(&bit_matrix);
        }

        self.table().clear(); // the new number of surprises will be about the same

        let mask_for_clearing_window = (0xFFu64 << new_offset) ^ u64::MAX;
        let mask_for_flipping_early_zone = (1u64 << new_offset) - 1;

        let mut all_surprises_ored = 0u64;
        for i in 0..k {
            let mut pattern = bit_matrix[i];
            self.sliding_window[i] = ((pattern >> new_offset) & 0xFF) as u8;
            pattern &= mask_for_clearing_window;
            // The following line converts surprising 0's to 1's in the "early zone",
            // (and vice versa, which is essential for this procedure's O(k) time cost).
            pattern ^= mask_for_flipping_early_zone;
            all_surprises_ored |= pattern; // a cheap way to recalculate first_interesting_column
            while pattern != 0 {
                let col = pattern.trailing_zeros();
                pattern ^= 1 << col; // erase the 1
                let row_col = ((i as u32) << 6) | col;
                let is_novel = self.table().maybe_insert(row_col);
                debug_assert!(is_novel);
            }
        }

        self.window_offset = new_offset;
        self.first_interesting_column = all_surprises_ored.trailing_zeros() as u8;
        if self.first_interesting_column > new_offset {
            self.first_interesting_column = new_offset; // corner case
        }
    }

    pub(crate) fn build_bit_matrix(&self) -> Vec<u64> {
        match &self.surprising_value_table {
            Some(table) => {
                bit_matrix_of(self.lg_k, self.window_offset, &self.sliding_window, table)
            }
            // an empty sketch has an all-zero matrix
            None => vec![0; 1 << self.lg_k],
        }
    }
}

// validation methods
impl CpcSketch {
    /// Checks the sketch's internal invariants.
    ///
    /// Verifies that the reconstructed bit matrix carries exactly
    /// `num_coupons` one-bits, that the window offset agrees with the offset
    /// policy, and that the storage layout matches the flavor. This is
    /// primarily for testing and validation purposes.
    pub fn validate(&self) -> bool {
        let num_bits_set = count_bits_set(&self.build_bit_matrix());
        if num_bits_set != self.num_coupons {
            return false;
        }
        if self.window_offset != determine_correct_offset(self.lg_k, self.num_coupons) {
            return false;
        }
        if self.first_interesting_column > self.window_offset {
            return false;
        }
        match self.flavor() {
            Flavor::Empty => self.surprising_value_table.is_none() && self.sliding_window.is_empty(),
            Flavor::Sparse => {
                let table_holds_all = self
                    .surprising_value_table
                    .as_ref()
                    .is_some_and(|table| table.num_items() == self.num_coupons);
                table_holds_all && self.sliding_window.is_empty()
            }
            _ => {
                self.surprising_value_table.is_some()
                    && self.sliding_window.len() == (1 << self.lg_k)
            }
        }
    }
}
