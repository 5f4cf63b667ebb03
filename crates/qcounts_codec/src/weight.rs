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

use std::fmt::{Debug, Display};

/// Numeric kind of the weights stored in a histogram.
///
/// The weight type is chosen by the caller, statically, for the whole
/// histogram. Counts are usually `u64`, quasi-probabilities `f64`.
pub trait Weight: Copy + PartialEq + PartialOrd + Debug + Display {
    /// Additive identity, used for outcomes that were never observed.
    const ZERO: Self;

    /// Sum of two weights, `None` if an integer weight overflows.
    fn checked_add(self, rhs: Self) -> Option<Self>;

    fn to_f64(self) -> f64;
}

macro_rules! impl_integer_weight {
    ($($t:ty),*) => {
        $(
            impl Weight for $t {
                const ZERO: Self = 0;

                #[inline]
                fn checked_add(self, rhs: Self) -> Option<Self> {
                    <$t>::checked_add(self, rhs)
                }

                #[inline]
                fn to_f64(self) -> f64 {
                    self as f64
                }
            }
        )*
    };
}

macro_rules! impl_float_weight {
    ($($t:ty),*) => {
        $(
            impl Weight for $t {
                const ZERO: Self = 0.0;

                #[inline]
                fn checked_add(self, rhs: Self) -> Option<Self> {
                    Some(self + rhs)
                }

                #[inline]
                fn to_f64(self) -> f64 {
                    self as f64
                }
            }
        )*
    };
}

impl_integer_weight!(u32, u64, usize, i64);
impl_float_weight!(f32, f64);
