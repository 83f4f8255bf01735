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

//! Support types shared across the sketch core.

mod num_std_dev;
pub use self::num_std_dev::NumStdDev;

pub(crate) mod inv_pow2_table;

/// Canonicalize double value for cross-language hash compatibility.
pub(crate) fn canonical_double(value: f64) -> u64 {
    if value.is_nan() {
        // Java's Double.doubleToLongBits() NaN value
        0x7ff8000000000000u64
    } else {
        // -0.0 + 0.0 == +0.0 under IEEE754 roundTiesToEven rounding mode,
        // which Rust guarantees. Thus, by adding a positive zero we
        // canonicalize signed zero without any branches in one instruction.
        (value + 0.0).to_bits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_double() {
        assert_eq!(canonical_double(0.0), canonical_double(-0.0));
        assert_eq!(canonical_double(f64::NAN), 0x7ff8000000000000);
        assert_eq!(
            canonical_double(f64::from_bits(0x7ff8000000000001)),
            0x7ff8000000000000
        );
        assert_ne!(canonical_double(1.0), canonical_double(-1.0));
        assert_eq!(canonical_double(f64::INFINITY), f64::INFINITY.to_bits());
    }
}
