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

//! Input hashing: the seeded 128-bit mixer and the typed input adapters.
//!
//! Every typed input is reduced to a little-endian byte stream before mixing,
//! so a given logical value produces the same coupon on every platform.

mod murmurhash;

use std::hash::Hasher;

pub(crate) use self::murmurhash::MurmurHash3X64128;

/// The seed 9001 used in the sketch update methods is a prime number that was chosen very early
/// on in experimental testing.
///
/// Choosing a seed is somewhat arbitrary, and the author cannot prove that this particular seed
/// is somehow superior to other seeds. There was some early Internet discussion that a seed of 0
/// did not produce as clean avalanche diagrams as non-zero seeds, but this may have been more
/// related to the MurmurHash2 release, which did have some issues. As far as the author can
/// determine, MurmurHash3 does not have these problems.
///
/// In order to perform set operations on two sketches it is critical that the same hash function
/// and seed are identical for both sketches, otherwise the assumed 1:1 relationship between the
/// original source key value and the hashed bit string would be violated. Once you have developed
/// a history of stored sketches you are stuck with it.
pub(crate) const DEFAULT_UPDATE_SEED: u64 = 9001;

/// Computes the 16-bit fingerprint of an update seed.
///
/// The fingerprint travels with snapshots so that reconstruction can refuse
/// state produced under a different seed. The seed itself is hashed under
/// seed 0, and a fingerprint of 0 is reserved.
///
/// # Panics
///
/// Panics if the seed hashes to 0; pick a different seed.
pub(crate) fn compute_seed_hash(seed: u64) -> u16 {
    let (h0, _) = hash_u64(seed, 0);
    let seed_hash = (h0 & 0xFFFF) as u16;
    assert!(
        seed_hash != 0,
        "the provided seed ({seed}) hashes to zero, which is reserved; use a different seed"
    );
    seed_hash
}

/// Hashes the 8 little-endian bytes of `datum`.
pub(crate) fn hash_u64(datum: u64, seed: u64) -> (u64, u64) {
    hash_bytes(&datum.to_le_bytes(), seed)
}

pub(crate) fn hash_bytes(data: &[u8], seed: u64) -> (u64, u64) {
    let mut hasher = MurmurHash3X64128::with_seed(seed);
    hasher.write(data);
    hasher.finish128()
}

/// Hashes UTF-16 code units, two little-endian bytes per unit.
///
/// Deliberately not equivalent to hashing the same text as UTF-8 bytes.
pub(crate) fn hash_u16s(data: &[u16], seed: u64) -> (u64, u64) {
    let mut hasher = MurmurHash3X64128::with_seed(seed);
    for unit in data {
        hasher.write(&unit.to_le_bytes());
    }
    hasher.finish128()
}

pub(crate) fn hash_i32s(data: &[i32], seed: u64) -> (u64, u64) {
    let mut hasher = MurmurHash3X64128::with_seed(seed);
    for datum in data {
        hasher.write(&datum.to_le_bytes());
    }
    hasher.finish128()
}

pub(crate) fn hash_i64s(data: &[i64], seed: u64) -> (u64, u64) {
    let mut hasher = MurmurHash3X64128::with_seed(seed);
    for datum in data {
        hasher.write(&datum.to_le_bytes());
    }
    hasher.finish128()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_hash_is_stable() {
        assert_eq!(compute_seed_hash(9001), compute_seed_hash(9001));
        assert_ne!(compute_seed_hash(9001), compute_seed_hash(9002));
        assert_ne!(compute_seed_hash(DEFAULT_UPDATE_SEED), 0);
    }

    #[test]
    fn test_element_hashing_matches_byte_stream() {
        // Streaming element-by-element must equal one write of the
        // concatenated little-endian bytes.
        let values = [1i64, -7, i64::MAX, 0];
        let mut bytes = vec![];
        for v in values {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        assert_eq!(hash_i64s(&values, 9001), hash_bytes(&bytes, 9001));

        let units = [0x61u16, 0x62, 0x6311];
        let mut bytes = vec![];
        for u in units {
            bytes.extend_from_slice(&u.to_le_bytes());
        }
        assert_eq!(hash_u16s(&units, 9001), hash_bytes(&bytes, 9001));
    }
}
