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

//! Compressed Probabilistic Counting sketch.
//!
//! This is a unique-counting sketch that implements the Compressed Probabilistic Counting (CPC,
//! a.k.a. FM85) algorithms developed by Kevin Lang in his paper [Back to the Future: an Even More
//! Nearly Optimal Cardinality Estimation Algorithm](https://arxiv.org/abs/1708.06839).
//!
//! This sketch is extremely space-efficient when serialized. In an apples-to-apples empirical
//! comparison against compressed HyperLogLog sketches, this algorithm simultaneously wins on
//! the two dimensions of the space/accuracy tradeoff and produces sketches that are smaller than
//! the entropy of HLL, so no possible implementation of compressed HLL can match its space
//! efficiency for a given accuracy.
//!
//! This crate implements the *live* sketch: the coupon-collection state machine, its sparse and
//! sliding-window representations, and the incrementally maintained
//! [Historic Inverse Probability (HIP)](https://arxiv.org/abs/1306.3284) estimator. Sketches that
//! were reconstructed from merged state fall back to the ICON estimator, which depends only on the
//! configured size and the coupon count and therefore survives set operations.
//!
//! The compression codec operates on the [`SketchState`] snapshot that a live sketch exposes; the
//! compressed wire format itself lives outside this crate.
//!
//! For additional security the sketch can be configured with a user-specified hash seed.

#![deny(missing_docs)]

pub mod error;

mod common;
mod estimator;
mod flavor;
mod hash;
mod hip;
mod matrix;
mod pair_table;
mod sketch;
mod state;

pub use self::common::NumStdDev;
pub use self::flavor::Flavor;
pub use self::sketch::CpcSketch;
pub use self::state::SketchState;

/// Default log2 of K.
pub const DEFAULT_LG_K: u8 = 11;
/// Min log2 of K.
pub(crate) const MIN_LG_K: u8 = 4;
/// Max log2 of K.
pub(crate) const MAX_LG_K: u8 = 26;
