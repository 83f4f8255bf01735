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

//! Flavor policy: the pure mapping from `(lgK, numCoupons)` to the sketch's
//! representational regime and to the correct sliding-window offset.

/// The representational regime of a sketch.
///
/// The flavor is a pure function of the configured size and the number of
/// collected coupons; it never regresses as the coupon count grows.
#[derive(Debug, Copy, Clone, Ord, PartialOrd, Eq, PartialEq)]
pub enum Flavor {
    /// No coupons collected yet: no table, no window.
    Empty,
    /// `1 <= C < 3K/32`: every coupon lives in the pair table.
    Sparse,
    /// `3K/32 <= C < K/2`: the window exists alongside the table.
    Hybrid,
    /// `K/2 <= C < 27K/8`. (NB: 27/8 = 3 + 3/8.)
    Pinned,
    /// `27K/8 <= C`: the window starts advancing across the columns.
    Sliding,
}

pub(crate) fn determine_flavor(lg_k: u8, num_coupons: u32) -> Flavor {
    let k = 1u64 << lg_k;
    let c = num_coupons as u64;
    if c == 0 {
        Flavor::Empty
    } else if (c << 5) < 3 * k {
        Flavor::Sparse
    } else if (c << 1) < k {
        Flavor::Hybrid
    } else if (c << 3) < 27 * k {
        Flavor::Pinned
    } else {
        Flavor::Sliding
    }
}

/// The window offset that a sketch with this coupon count must have.
///
/// `offset = max(0, (8C - 19K) / 8K)`, clamped to the window ceiling of 56.
pub(crate) fn determine_correct_offset(lg_k: u8, num_coupons: u32) -> u8 {
    let k = 1i64 << lg_k;
    let tmp = ((num_coupons as i64) << 3) - 19 * k; // 8C - 19K
    if tmp < 0 {
        return 0;
    }
    let offset = tmp >> (lg_k + 3); // tmp / 8K
    if offset > 56 { 56 } else { offset as u8 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flavor_boundaries() {
        // k = 1024: boundaries at 96 (3k/32), 512 (k/2), 3456 (27k/8)
        assert_eq!(determine_flavor(10, 0), Flavor::Empty);
        assert_eq!(determine_flavor(10, 1), Flavor::Sparse);
        assert_eq!(determine_flavor(10, 95), Flavor::Sparse);
        assert_eq!(determine_flavor(10, 96), Flavor::Hybrid);
        assert_eq!(determine_flavor(10, 511), Flavor::Hybrid);
        assert_eq!(determine_flavor(10, 512), Flavor::Pinned);
        assert_eq!(determine_flavor(10, 3455), Flavor::Pinned);
        assert_eq!(determine_flavor(10, 3456), Flavor::Sliding);
    }

    #[test]
    fn test_flavor_never_regresses() {
        for lg_k in [4u8, 5, 10] {
            let mut last = Flavor::Empty;
            for c in 0..(64u32 << lg_k) {
                let flavor = determine_flavor(lg_k, c);
                assert!(flavor >= last, "flavor regressed at lg_k={lg_k}, c={c}");
                last = flavor;
            }
        }
    }

    #[test]
    fn test_offset_formula() {
        // below 19K/8 the offset is pinned at zero
        assert_eq!(determine_correct_offset(10, 0), 0);
        assert_eq!(determine_correct_offset(10, 2431), 0);
        // first advance at C = 27K/8
        assert_eq!(determine_correct_offset(10, 3455), 0);
        assert_eq!(determine_correct_offset(10, 3456), 1);
        // saturated matrix stays within the window ceiling
        assert_eq!(determine_correct_offset(10, 64 << 10), 56);
        assert_eq!(determine_correct_offset(26, u32::MAX), 56);
    }

    #[test]
    fn test_offset_is_monotone_and_bounded() {
        for lg_k in [4u8, 8] {
            let mut last = 0;
            for c in 0..(64u32 << lg_k) {
                let offset = determine_correct_offset(lg_k, c);
                assert!(offset >= last);
                assert!(offset <= 56);
                last = offset;
            }
        }
    }
}
