// Copyright contributors to the qcounts project
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Conversion between the encodings of measurement histograms.
//!
//! Backends report measurement outcomes as sparse maps from an outcome key to
//! a count or probability. Some use hex keys (`"0x4"`), others fixed-width
//! binary keys (`"00100"`, possibly with register separators). This crate
//! translates hex keys to binary keys and materializes binary-keyed
//! histograms as dense arrays indexed by outcome value.

pub mod convert;
pub use convert::{binary_index, densify, densify_with, rekey_hex, rekey_hex_with};

pub mod histogram;
pub use histogram::{Collision, CountsError, DenseHistogram, Histogram, outcome_key};

pub mod marginal;
pub use marginal::marginalize;

mod weight;
pub use weight::Weight;
