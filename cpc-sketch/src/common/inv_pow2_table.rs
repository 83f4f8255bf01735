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

/// Exact values of `2^-i` for `i` in `[0, 64]`.
///
/// Every entry is a normal, exactly representable double, so the table is
/// assembled from exponent bits rather than repeated division.
pub(crate) const INVERSE_POWERS_OF_2: [f64; 65] = {
    let mut table = [0.0f64; 65];
    let mut i = 0;
    while i < table.len() {
        table[i] = f64::from_bits((1023 - i as u64) << 52);
        i += 1;
    }
    table
};
