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

//! The snapshot boundary between the live sketch and the serialization
//! codec.
//!
//! A [`SketchState`] is the flat, codec-ready view of everything a live
//! sketch knows: the scalars, the window bytes, and the surprising-value
//! pairs extracted in sorted order. The compression codec encodes this view;
//! reconstruction validates it against the caller's seed and re-imposes the
//! live invariants.

use crate::CpcSketch;
use crate::MAX_LG_K;
use crate::MIN_LG_K;
use crate::error::Error;
use crate::flavor::Flavor;
use crate::flavor::determine_correct_offset;
use crate::flavor::determine_flavor;
use crate::hash::DEFAULT_UPDATE_SEED;
use crate::hash::compute_seed_hash;
use crate::hip::HipRegister;
use crate::pair_table::PairTable;
use crate::pair_table::introspective_insertion_sort;

/// A codec-ready snapshot of a live sketch.
#[derive(Debug, Clone, PartialEq)]
pub struct SketchState {
    /// Log2 of the configured number of rows.
    pub lg_k: u8,
    /// 16-bit fingerprint of the update seed; reconstruction refuses state
    /// fingerprinted under a different seed.
    pub seed_hash: u16,
    /// The number of coupons collected.
    pub num_coupons: u32,
    /// Column offset of the per-row 8-bit window.
    pub window_offset: u8,
    /// Smallest column that could still yield a novel coupon.
    pub first_interesting_column: u8,
    /// True iff the state came from a merge; the HIP accumulators are then
    /// invalid and estimation falls back to ICON.
    pub merge_flag: bool,
    /// The HIP `kxp` register.
    pub kxp: f64,
    /// The accumulated HIP estimate.
    pub hip_est_accum: f64,
    /// The K window bytes; absent below the HYBRID flavor.
    pub sliding_window: Option<Vec<u8>>,
    /// The surprising-value pairs in ascending order; absent only when the
    /// sketch is empty.
    pub surprising_values: Option<Vec<u32>>,
}

impl CpcSketch {
    /// Captures the codec-facing snapshot of this sketch.
    pub fn state(&self) -> SketchState {
        let surprising_values = self.surprising_value_table.as_ref().map(|table| {
            let mut pairs = table.unwrapping_get_items();
            introspective_insertion_sort(&mut pairs);
            pairs
        });
        let sliding_window = if self.sliding_window.is_empty() {
            None
        } else {
            Some(self.sliding_window.clone())
        };

        SketchState {
            lg_k: self.lg_k,
            seed_hash: self.seed_hash,
            num_coupons: self.num_coupons,
            window_offset: self.window_offset,
            first_interesting_column: self.first_interesting_column,
            merge_flag: self.merge_flag,
            kxp: self.hip.kxp(),
            hip_est_accum: self.hip.estimate(),
            sliding_window,
            surprising_values,
        }
    }

    /// Reconstructs a live sketch from a snapshot.
    ///
    /// A seed of 0 is remapped to the default seed, mirroring construction.
    /// Fails if the snapshot's seed fingerprint disagrees with the supplied
    /// seed, or if the snapshot violates the flavor/storage invariants.
    pub fn from_state(state: &SketchState, seed: u64) -> Result<CpcSketch, Error> {
        let seed = if seed == 0 { DEFAULT_UPDATE_SEED } else { seed };

        if !(MIN_LG_K..=MAX_LG_K).contains(&state.lg_k) {
            return Err(
                Error::invalid_argument("lg_k out of range").with_context("lg_k", state.lg_k)
            );
        }
        let seed_hash = compute_seed_hash(seed);
        if state.seed_hash != seed_hash {
            return Err(Error::seed_mismatch(seed_hash, state.seed_hash));
        }
        if state.first_interesting_column > 63 {
            return Err(Error::invalid_state("first_interesting_column out of range")
                .with_context("first_interesting_column", state.first_interesting_column));
        }
        let correct_offset = determine_correct_offset(state.lg_k, state.num_coupons);
        if state.window_offset != correct_offset {
            return Err(
                Error::invalid_state("window offset disagrees with the coupon count")
                    .with_context("window_offset", state.window_offset)
                    .with_context("expected", correct_offset),
            );
        }

        let k = 1usize << state.lg_k;
        let flavor = determine_flavor(state.lg_k, state.num_coupons);
        let (table, window) = match flavor {
            Flavor::Empty => {
                if state.sliding_window.is_some() || state.surprising_values.is_some() {
                    return Err(Error::invalid_state(
                        "an empty snapshot must carry neither window nor pairs",
                    ));
                }
                (None, vec![])
            }
            Flavor::Sparse => {
                if state.sliding_window.is_some() {
                    return Err(Error::invalid_state("a sparse snapshot carries no window"));
                }
                let pairs = state
                    .surprising_values
                    .as_ref()
                    .ok_or_else(|| Error::invalid_state("a sparse snapshot requires its pairs"))?;
                if pairs.len() != state.num_coupons as usize {
                    return Err(Error::invalid_state(
                        "sparse pair count disagrees with the coupon count",
                    )
                    .with_context("pairs", pairs.len())
                    .with_context("num_coupons", state.num_coupons));
                }
                let table = PairTable::from_slots(state.lg_k, state.num_coupons, pairs.clone());
                (Some(table), vec![])
            }
            _ => {
                let window = state
                    .sliding_window
                    .as_ref()
                    .ok_or_else(|| Error::invalid_state("a windowed snapshot requires a window"))?;
                if window.len() != k {
                    return Err(Error::invalid_state("window length must be K")
                        .with_context("window_len", window.len())
                        .with_context("k", k));
                }
                let pairs = state
                    .surprising_values
                    .as_ref()
                    .ok_or_else(|| Error::invalid_state("a windowed snapshot requires its pairs"))?;
                let table = PairTable::from_slots(state.lg_k, pairs.len() as u32, pairs.clone());
                (Some(table), window.clone())
            }
        };

        let sketch = CpcSketch {
            lg_k: state.lg_k,
            seed,
            seed_hash,
            first_interesting_column: state.first_interesting_column,
            num_coupons: state.num_coupons,
            surprising_value_table: table,
            window_offset: state.window_offset,
            sliding_window: window,
            merge_flag: state.merge_flag,
            hip: HipRegister::from_parts(state.kxp, state.hip_est_accum),
        };
        if !sketch.validate() {
            return Err(Error::invalid_state(
                "snapshot does not reconstruct a coherent sketch",
            ));
        }
        Ok(sketch)
    }
}
