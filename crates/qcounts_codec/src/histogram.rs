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

use std::{
    collections::{BTreeMap, btree_map},
    fmt::{Display, Formatter},
    mem,
    ops::Index,
};

use qcounts_common::{FmtOptions, fmt_map};
use serde::{Deserialize, Serialize};

use crate::weight::Weight;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CountsError {
    /// The key is not valid text in the given radix.
    InvalidKey { key: String, radix: u32 },
    /// Two source keys encode the same outcome and collisions are rejected.
    DuplicateOutcome { key: String, outcome: String },
    /// The key encodes a value that does not fit in `num_bits` bits.
    OutOfRange { key: String, num_bits: u32 },
    /// A marginal bit index is not smaller than the key width.
    BitIndexOutOfRange { index: usize, width: usize },
    /// Binary keys of a histogram have different widths.
    KeyWidthMismatch {
        key: String,
        expected: usize,
        found: usize,
    },
    /// A dense histogram with `2^num_bits` entries cannot be addressed.
    WidthTooLarge { num_bits: u32 },
    /// Adding the weight stored under `key` overflows the weight type.
    WeightOverflow { key: String },
}

impl Display for CountsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidKey { key, radix } => {
                write!(f, "key {key:?} is not a valid base-{radix} outcome")
            }
            Self::DuplicateOutcome { key, outcome } => write!(
                f,
                "key {key:?} encodes outcome {outcome} which is already present"
            ),
            Self::OutOfRange { key, num_bits } => {
                write!(f, "key {key:?} does not fit in {num_bits} bits")
            }
            Self::BitIndexOutOfRange { index, width } => {
                write!(f, "bit index {index} out of range for {width}-bit outcomes")
            }
            Self::KeyWidthMismatch {
                key,
                expected,
                found,
            } => write!(
                f,
                "key {key:?} has {found} bits, expected {expected} like the other keys"
            ),
            Self::WidthTooLarge { num_bits } => {
                write!(f, "cannot allocate a dense histogram for {num_bits} bits")
            }
            Self::WeightOverflow { key } => {
                write!(f, "adding the weight of key {key:?} overflows")
            }
        }
    }
}

impl std::error::Error for CountsError {}

/// What to do when two source keys encode the same outcome.
///
/// Genuine backend output never produces collisions, but mixing leading-zero
/// variants (`"0x4"` and `"0x04"`) or register separators (`"0 1"` and `"01"`)
/// does. The default keeps the last write, where "last" is the
/// lexicographically largest source key. Whether silently dropping the other
/// weights is ever wanted is an open question, so stricter policies exist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Collision {
    #[default]
    Overwrite,
    Reject,
    Sum,
}

/// Sparse measurement histogram: outcome key to weight.
///
/// Keys iterate in lexicographic order, so all conversions are deterministic.
/// The weight type defaults to `f64`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Histogram<W = f64> {
    counts: BTreeMap<String, W>,
}

impl<W: Weight> Histogram<W> {
    pub fn new() -> Self {
        Self {
            counts: BTreeMap::new(),
        }
    }

    /// Insert a weight, returning the previous weight of the key.
    pub fn insert(&mut self, key: impl Into<String>, weight: W) -> Option<W> {
        self.counts.insert(key.into(), weight)
    }

    /// Add `weight` to the weight stored under `key`.
    ///
    /// On overflow the stored weight is left unchanged.
    pub fn accumulate(&mut self, key: impl Into<String>, weight: W) -> Result<(), CountsError> {
        match self.counts.entry(key.into()) {
            btree_map::Entry::Vacant(entry) => {
                entry.insert(weight);
            }
            btree_map::Entry::Occupied(mut entry) => {
                let sum = entry.get().checked_add(weight).ok_or_else(|| {
                    CountsError::WeightOverflow {
                        key: entry.key().clone(),
                    }
                })?;
                entry.insert(sum);
            }
        }
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<W> {
        self.counts.get(key).copied()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.counts.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, W)> {
        self.counts.iter().map(|(k, w)| (k.as_str(), *w))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.counts.keys().map(String::as_str)
    }

    /// Sum of all weights, zero for an empty histogram.
    pub fn total(&self) -> Result<W, CountsError> {
        self.iter().try_fold(W::ZERO, |total, (key, w)| {
            total.checked_add(w).ok_or_else(|| CountsError::WeightOverflow {
                key: key.to_string(),
            })
        })
    }

    pub fn into_inner(self) -> BTreeMap<String, W> {
        self.counts
    }
}

impl<W> From<BTreeMap<String, W>> for Histogram<W> {
    fn from(counts: BTreeMap<String, W>) -> Self {
        Self { counts }
    }
}

impl<K: Into<String>, W: Weight, const N: usize> From<[(K, W); N]> for Histogram<W> {
    fn from(entries: [(K, W); N]) -> Self {
        entries.into_iter().collect()
    }
}

impl<K: Into<String>, W: Weight> FromIterator<(K, W)> for Histogram<W> {
    fn from_iter<I: IntoIterator<Item = (K, W)>>(iter: I) -> Self {
        Self {
            counts: iter.into_iter().map(|(k, w)| (k.into(), w)).collect(),
        }
    }
}

impl<W> IntoIterator for Histogram<W> {
    type Item = (String, W);
    type IntoIter = btree_map::IntoIter<String, W>;

    fn into_iter(self) -> Self::IntoIter {
        self.counts.into_iter()
    }
}

impl<W: Weight> Display for Histogram<W> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let options = FmtOptions {
            precision: None,
            add_braces: true,
        };
        write!(f, "{}", fmt_map(self.iter(), options))
    }
}

/// Render `index` as a binary key of `num_bits` characters, MSB first.
///
/// A zero-bit register has the single key `"0"`. Panics if `index` needs more
/// than `num_bits` bits.
pub fn outcome_key(index: usize, num_bits: u32) -> String {
    assert!(
        index.checked_shr(num_bits).unwrap_or(0) == 0,
        "outcome {index} does not fit in {num_bits} bits"
    );
    let width = (num_bits as usize).max(1);
    format!("{index:0width$b}")
}

/// Dense histogram with `2^num_bits` weights, indexed by outcome value.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseHistogram<W = f64> {
    num_bits: u32,
    values: Vec<W>,
}

impl<W: Weight> DenseHistogram<W> {
    /// All-zero dense histogram over `num_bits` bits.
    pub fn zeros(num_bits: u32) -> Result<Self, CountsError> {
        let len = dense_len::<W>(num_bits)?;
        Ok(Self {
            num_bits,
            values: vec![W::ZERO; len],
        })
    }

    pub fn num_bits(&self) -> u32 {
        self.num_bits
    }

    /// Always `2^num_bits`.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// A dense histogram holds at least the all-zero outcome.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<W> {
        self.values.get(index).copied()
    }

    pub fn as_slice(&self) -> &[W] {
        &self.values
    }

    pub fn into_vec(self) -> Vec<W> {
        self.values
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = W> + '_ {
        self.values.iter().copied()
    }

    /// Sum of all weights; an overflow names the outcome at which it happened.
    pub fn total(&self) -> Result<W, CountsError> {
        self.values
            .iter()
            .enumerate()
            .try_fold(W::ZERO, |total, (index, &w)| {
                total
                    .checked_add(w)
                    .ok_or_else(|| CountsError::WeightOverflow {
                        key: outcome_key(index, self.num_bits),
                    })
            })
    }

    /// Index of the largest weight; the lowest index wins ties.
    pub fn argmax(&self) -> usize {
        self.values
            .iter()
            .enumerate()
            .fold((0, self.values[0]), |(best, max), (i, &w)| {
                if w > max { (i, w) } else { (best, max) }
            })
            .0
    }

    /// Weights divided by the total weight. An all-zero histogram stays zero.
    ///
    /// The total is accumulated in `f64`, so integer counts cannot overflow here.
    pub fn normalized(&self) -> DenseHistogram<f64> {
        let total: f64 = self.values.iter().map(|w| w.to_f64()).sum();
        let values = self
            .values
            .iter()
            .map(|w| {
                if total == 0.0 {
                    0.0
                } else {
                    w.to_f64() / total
                }
            })
            .collect();
        DenseHistogram {
            num_bits: self.num_bits,
            values,
        }
    }

    /// Sparse binary-keyed histogram with the non-zero entries.
    pub fn to_counts(&self) -> Histogram<W> {
        self.values
            .iter()
            .enumerate()
            .filter(|(_, w)| **w != W::ZERO)
            .map(|(i, w)| (outcome_key(i, self.num_bits), *w))
            .collect()
    }

    pub(crate) fn values_mut(&mut self) -> &mut [W] {
        &mut self.values
    }
}

impl<W> Index<usize> for DenseHistogram<W> {
    type Output = W;

    fn index(&self, index: usize) -> &W {
        &self.values[index]
    }
}

impl<W: Weight> Display for DenseHistogram<W> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}]",
            self.values
                .iter()
                .map(|w| w.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

/// Number of entries for `num_bits`, checked against what a `Vec<W>` can hold.
fn dense_len<W>(num_bits: u32) -> Result<usize, CountsError> {
    1usize
        .checked_shl(num_bits)
        .filter(|len| {
            len.checked_mul(mem::size_of::<W>())
                .is_some_and(|bytes| bytes <= isize::MAX as usize)
        })
        .ok_or(CountsError::WidthTooLarge { num_bits })
}

#[cfg(test)]
mod tests {
    use super::{CountsError, DenseHistogram, Histogram, outcome_key};

    #[test]
    fn histogram_iterates_in_key_order() {
        let counts = Histogram::from([("11", 3u64), ("00", 1), ("01", 2)]);
        let keys: Vec<&str> = counts.keys().collect();
        assert_eq!(keys, vec!["00", "01", "11"]);
        assert_eq!(counts.total(), Ok(6));
        assert_eq!(counts.to_string(), "{00: 1, 01: 2, 11: 3}");
    }

    #[test]
    fn accumulate_adds_weights() {
        let mut counts: Histogram<u64> = Histogram::new();
        counts.accumulate("0", 2).unwrap();
        counts.accumulate("0", 3).unwrap();
        counts.accumulate("1", 1).unwrap();
        assert_eq!(counts.get("0"), Some(5));
        assert_eq!(counts.get("1"), Some(1));
        assert_eq!(counts.get("2"), None);
    }

    #[test]
    fn accumulate_rejects_overflow_and_keeps_weight() {
        let mut counts: Histogram<u64> = Histogram::new();
        counts.accumulate("1", u64::MAX).unwrap();
        let err = counts.accumulate("1", 1).expect_err("u64::MAX + 1 overflows");
        assert_eq!(
            err,
            CountsError::WeightOverflow {
                key: "1".to_string()
            }
        );
        assert_eq!(counts.get("1"), Some(u64::MAX));
    }

    #[test]
    fn total_reports_overflowing_key() {
        let counts = Histogram::from([("0", u64::MAX), ("1", 1)]);
        assert_eq!(
            counts.total(),
            Err(CountsError::WeightOverflow {
                key: "1".to_string()
            })
        );
        assert_eq!(
            counts.total().unwrap_err().to_string(),
            "adding the weight of key \"1\" overflows"
        );
    }

    #[test]
    fn insert_replaces_and_into_inner_keeps_order() {
        let mut counts: Histogram<u64> = Histogram::new();
        assert_eq!(counts.insert("10", 4), None);
        assert_eq!(counts.insert("01", 2), None);
        assert_eq!(counts.insert("10", 7), Some(4));
        assert!(counts.contains_key("01"));
        assert!(!counts.contains_key("11"));

        let inner = counts.into_inner();
        let entries: Vec<(&str, u64)> = inner.iter().map(|(k, w)| (k.as_str(), *w)).collect();
        assert_eq!(entries, vec![("01", 2), ("10", 7)]);
    }

    #[test]
    fn histogram_deserializes_from_json_object() {
        let counts: Histogram<u64> = serde_json::from_str(r#"{"0x0": 8182, "0x4": 10}"#).unwrap();
        assert_eq!(counts.len(), 2);
        assert_eq!(counts.get("0x4"), Some(10));
        assert_eq!(
            serde_json::to_string(&counts).unwrap(),
            r#"{"0x0":8182,"0x4":10}"#
        );
    }

    #[test]
    fn empty_histogram_total_is_zero() {
        let counts: Histogram<f64> = Histogram::new();
        assert!(counts.is_empty());
        assert_eq!(counts.total(), Ok(0.0));
    }

    #[test]
    fn outcome_key_is_zero_padded() {
        assert_eq!(outcome_key(4, 5), "00100");
        assert_eq!(outcome_key(0, 3), "000");
        assert_eq!(outcome_key(7, 3), "111");
        assert_eq!(outcome_key(0, 0), "0");
    }

    #[test]
    #[should_panic]
    fn outcome_key_rejects_oversized_index() {
        outcome_key(8, 3);
    }

    #[test]
    fn zeros_has_power_of_two_length() {
        for n in 0..8 {
            let dense: DenseHistogram<u64> = DenseHistogram::zeros(n).unwrap();
            assert_eq!(dense.len(), 1 << n);
            assert!(dense.iter().all(|w| w == 0));
        }
    }

    #[test]
    fn zeros_rejects_unaddressable_width() {
        let err = DenseHistogram::<f64>::zeros(usize::BITS).expect_err("2^BITS overflows");
        assert_eq!(err, CountsError::WidthTooLarge { num_bits: usize::BITS });

        let err = DenseHistogram::<u64>::zeros(usize::BITS - 1).expect_err("too many bytes");
        assert_eq!(
            err,
            CountsError::WidthTooLarge {
                num_bits: usize::BITS - 1
            }
        );
    }

    #[test]
    fn normalized_and_argmax() {
        let mut dense: DenseHistogram<u64> = DenseHistogram::zeros(2).unwrap();
        dense.values_mut()[1] = 3;
        dense.values_mut()[2] = 1;
        assert_eq!(dense.argmax(), 1);
        assert_eq!(dense.normalized().as_slice(), &[0.0, 0.75, 0.25, 0.0]);
        assert_eq!(dense.to_string(), "[0, 3, 1, 0]");

        assert_eq!(dense.total(), Ok(4));

        let zeros: DenseHistogram<u64> = DenseHistogram::zeros(1).unwrap();
        assert_eq!(zeros.argmax(), 0);
        assert_eq!(zeros.normalized().as_slice(), &[0.0, 0.0]);
    }

    #[test]
    fn normalized_counts_near_integer_limit() {
        let mut dense: DenseHistogram<u64> = DenseHistogram::zeros(1).unwrap();
        dense.values_mut()[0] = u64::MAX;
        dense.values_mut()[1] = 1;
        assert_eq!(
            dense.total(),
            Err(CountsError::WeightOverflow {
                key: "1".to_string()
            })
        );

        let probabilities = dense.normalized();
        assert!(probabilities[0] > 0.999_999);
        assert!(probabilities[1] > 0.0);
        assert!((probabilities.total().unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn to_counts_skips_zero_weights() {
        let mut dense: DenseHistogram<f64> = DenseHistogram::zeros(3).unwrap();
        dense.values_mut()[5] = 0.5;
        dense.values_mut()[0] = 0.5;
        assert_eq!(
            dense.to_counts(),
            Histogram::from([("000", 0.5), ("101", 0.5)])
        );
    }
}
