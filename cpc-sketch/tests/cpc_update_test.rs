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

use cpc_sketch::CpcSketch;
use cpc_sketch::Flavor;
use cpc_sketch::NumStdDev;
use googletest::assert_that;
use googletest::prelude::ge;
use googletest::prelude::le;
use googletest::prelude::near;

// HIP relative error at lg_k = 11 is about 1.3 percent; allow three sigma
const RELATIVE_ERROR_FOR_LG_K_11: f64 = 0.04;

#[test]
fn test_empty() {
    let sketch = CpcSketch::new(11);
    assert!(sketch.is_empty());
    assert_eq!(sketch.estimate(), 0.0);
    assert_eq!(sketch.lower_bound(NumStdDev::One), 0.0);
    assert_eq!(sketch.upper_bound(NumStdDev::One), 0.0);
    assert_eq!(sketch.flavor(), Flavor::Empty);
    assert!(sketch.validate());
}

#[test]
fn test_one_value() {
    let mut sketch = CpcSketch::new(11);
    sketch.update_i64(1);
    assert!(!sketch.is_empty());
    assert_eq!(sketch.estimate(), 1.0);
    assert_eq!(sketch.flavor(), Flavor::Sparse);
    assert_that!(sketch.estimate(), ge(sketch.lower_bound(NumStdDev::One)));
    assert_that!(sketch.estimate(), le(sketch.upper_bound(NumStdDev::One)));
    assert!(sketch.validate());
}

#[test]
fn test_many_values() {
    let mut sketch = CpcSketch::new(11);
    for i in 0..10000i64 {
        sketch.update_i64(i);
    }
    assert!(!sketch.is_empty());
    assert_that!(
        sketch.estimate(),
        near(10000.0, RELATIVE_ERROR_FOR_LG_K_11 * 10000.0)
    );
    assert_that!(sketch.estimate(), ge(sketch.lower_bound(NumStdDev::One)));
    assert_that!(sketch.estimate(), le(sketch.upper_bound(NumStdDev::One)));
    assert!(sketch.validate());
}

#[test]
fn test_sparse_phase_tracks_every_coupon() {
    let mut sketch = CpcSketch::new(11);
    for i in 0..10i64 {
        sketch.update_i64(i);
    }
    assert_eq!(sketch.flavor(), Flavor::Sparse);
    // hash collisions may merge a coupon or two, but no more
    assert!((9..=10).contains(&sketch.num_coupons()));
    assert!(sketch.estimate() > 0.0);
    assert!(sketch.validate());
}

#[test]
fn test_empty_inputs_are_noops() {
    let mut sketch = CpcSketch::new(11);
    sketch.update_str("");
    sketch.update_bytes(&[]);
    sketch.update_chars(&[]);
    sketch.update_i32_slice(&[]);
    sketch.update_i64_slice(&[]);
    assert!(sketch.is_empty());
    assert_eq!(sketch.num_coupons(), 0);
    assert_eq!(sketch.estimate(), 0.0);
}

#[test]
fn test_double_canonicalization() {
    let mut positive = CpcSketch::new(11);
    let mut negative = CpcSketch::new(11);
    positive.update_f64(0.0);
    negative.update_f64(-0.0);
    assert_eq!(positive.state(), negative.state());

    let mut quiet = CpcSketch::new(11);
    let mut scrambled = CpcSketch::new(11);
    quiet.update_f64(f64::NAN);
    scrambled.update_f64(f64::from_bits(0x7ff8000000000001));
    assert_eq!(quiet.state(), scrambled.state());

    // infinities stay distinct values
    let mut infinities = CpcSketch::new(11);
    infinities.update_f64(f64::INFINITY);
    infinities.update_f64(f64::NEG_INFINITY);
    assert_eq!(infinities.num_coupons(), 2);
}

#[test]
fn test_text_and_code_units_hash_differently() {
    let mut text = CpcSketch::new(11);
    let mut units = CpcSketch::new(11);
    text.update_str("abc");
    units.update_chars(&[0x61, 0x62, 0x63]);
    assert_eq!(text.num_coupons(), 1);
    assert_eq!(units.num_coupons(), 1);
    assert_ne!(text.state(), units.state());
}

#[test]
fn test_updates_are_idempotent() {
    let mut once = CpcSketch::new(9);
    let mut twice = CpcSketch::new(9);
    for i in 0..2000i64 {
        once.update_i64(i);
        twice.update_i64(i);
    }
    for i in 0..2000i64 {
        twice.update_i64(i);
    }
    // re-presenting the same stream admits no coupons and leaves even the
    // floating-point accumulators untouched
    assert_eq!(once.state(), twice.state());
}

#[test]
fn test_flavor_progression() {
    let mut sketch = CpcSketch::new(10);
    let mut seen = vec![sketch.flavor()];
    for i in 0..20000i64 {
        sketch.update_i64(i);
        let flavor = sketch.flavor();
        if *seen.last().unwrap() != flavor {
            seen.push(flavor);
        }
    }
    assert_eq!(
        seen,
        vec![
            Flavor::Empty,
            Flavor::Sparse,
            Flavor::Hybrid,
            Flavor::Pinned,
            Flavor::Sliding
        ]
    );
    assert!(sketch.validate());
}

#[test]
fn test_small_k_reaches_sliding() {
    let mut sketch = CpcSketch::new(4);
    for i in 0..1000i64 {
        sketch.update_i64(i);
    }
    assert_eq!(sketch.flavor(), Flavor::Sliding);
    assert!(sketch.validate());
}

#[test]
fn test_estimate_survives_window_shifts() {
    // at lg_k = 6 a 100k stream pushes the window offset past 8, so this
    // exercises the KXP refresh as well as the shifts themselves
    let mut sketch = CpcSketch::new(6);
    for i in 0..100_000i64 {
        sketch.update_i64(i);
    }
    assert_eq!(sketch.flavor(), Flavor::Sliding);
    assert!(sketch.validate());
    assert_that!(sketch.estimate(), near(100_000.0, 30_000.0));
}

#[test]
fn test_estimate_is_monotone() {
    let mut sketch = CpcSketch::new(9);
    let mut last = 0.0;
    for i in 0..5000i64 {
        sketch.update_i64(i);
        let estimate = sketch.estimate();
        assert_that!(estimate, ge(last));
        last = estimate;
    }
}

#[test]
fn test_validate_across_sizes() {
    for lg_k in [4u8, 7, 11, 14] {
        let mut sketch = CpcSketch::new(lg_k);
        for i in 0..3000i64 {
            sketch.update_i64(i);
            if i % 500 == 0 {
                assert!(sketch.validate(), "invariants broken at lg_k={lg_k}, i={i}");
            }
        }
        assert!(sketch.validate(), "invariants broken at lg_k={lg_k}");
    }
}

#[test]
fn test_clone_is_deeply_isolated() {
    let mut sketch = CpcSketch::new(8);
    for i in 0..500i64 {
        sketch.update_i64(i);
    }
    let snapshot = sketch.state();
    let copy = sketch.clone();

    for i in 500..1000i64 {
        sketch.update_i64(i);
    }
    assert_eq!(copy.state(), snapshot);
    assert!(sketch.num_coupons() > copy.num_coupons());
}

#[test]
fn test_reset_retains_configuration() {
    let mut sketch = CpcSketch::with_seed(9, 1234);
    for i in 0..5000i64 {
        sketch.update_i64(i);
    }
    sketch.reset();
    assert!(sketch.is_empty());
    assert_eq!(sketch.estimate(), 0.0);
    assert_eq!(sketch.flavor(), Flavor::Empty);
    assert!(sketch.validate());

    let mut fresh = CpcSketch::with_seed(9, 1234);
    for i in 0..100i64 {
        sketch.update_i64(i);
        fresh.update_i64(i);
    }
    assert_eq!(sketch.state(), fresh.state());
}

#[test]
fn test_zero_seed_is_remapped_to_default() {
    let mut zero_seeded = CpcSketch::with_seed(11, 0);
    let mut default_seeded = CpcSketch::new(11);
    for i in 0..100i64 {
        zero_seeded.update_i64(i);
        default_seeded.update_i64(i);
    }
    assert_eq!(zero_seeded.state(), default_seeded.state());
}

#[test]
fn test_bounds_are_ordered_by_kappa() {
    let mut sketch = CpcSketch::new(11);
    for i in 0..10000i64 {
        sketch.update_i64(i);
    }
    let estimate = sketch.estimate();
    let lb1 = sketch.lower_bound(NumStdDev::One);
    let lb2 = sketch.lower_bound(NumStdDev::Two);
    let lb3 = sketch.lower_bound(NumStdDev::Three);
    let ub1 = sketch.upper_bound(NumStdDev::One);
    let ub2 = sketch.upper_bound(NumStdDev::Two);
    let ub3 = sketch.upper_bound(NumStdDev::Three);
    assert_that!(lb3, le(lb2));
    assert_that!(lb2, le(lb1));
    assert_that!(lb1, le(estimate));
    assert_that!(estimate, le(ub1));
    assert_that!(ub1, le(ub2));
    assert_that!(ub2, le(ub3));
}

#[test]
#[should_panic(expected = "lg_k out of range")]
fn test_lg_k_too_small_panics() {
    let _ = CpcSketch::new(3);
}

#[test]
#[should_panic(expected = "lg_k out of range")]
fn test_lg_k_too_large_panics() {
    let _ = CpcSketch::new(27);
}
