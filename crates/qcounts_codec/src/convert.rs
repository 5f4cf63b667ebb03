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

//! Re-keying of hex histograms and materialization of dense histograms.

use std::collections::{BTreeMap, btree_map::Entry};

use log::{debug, trace};

use crate::{
    histogram::{Collision, CountsError, DenseHistogram, Histogram},
    weight::Weight,
};

const fn generate_lookup_table() -> [&'static str; 103] {
    let mut lookup = [""; 103];
    lookup[b'0' as usize] = "0000";
    lookup[b'1' as usize] = "0001";
    lookup[b'2' as usize] = "0010";
    lookup[b'3' as usize] = "0011";
    lookup[b'4' as usize] = "0100";
    lookup[b'5' as usize] = "0101";
    lookup[b'6' as usize] = "0110";
    lookup[b'7' as usize] = "0111";
    lookup[b'8' as usize] = "1000";
    lookup[b'9' as usize] = "1001";
    lookup[b'A' as usize] = "1010";
    lookup[b'B' as usize] = "1011";
    lookup[b'C' as usize] = "1100";
    lookup[b'D' as usize] = "1101";
    lookup[b'E' as usize] = "1110";
    lookup[b'F' as usize] = "1111";
    lookup[b'a' as usize] = "1010";
    lookup[b'b' as usize] = "1011";
    lookup[b'c' as usize] = "1100";
    lookup[b'd' as usize] = "1101";
    lookup[b'e' as usize] = "1110";
    lookup[b'f' as usize] = "1111";
    lookup
}

static HEX_TO_BIN_LUT: [&str; 103] = generate_lookup_table();

/// Expand a hex key (`0x` prefix optional) into its binary digits, four per hex digit.
fn hex_to_bin(key: &str) -> Result<String, CountsError> {
    let invalid = || CountsError::InvalidKey {
        key: key.to_string(),
        radix: 16,
    };
    let trimmed = key.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    if digits.is_empty() {
        return Err(invalid());
    }
    let mut bits = String::with_capacity(4 * digits.len());
    for byte in digits.bytes() {
        match HEX_TO_BIN_LUT.get(byte as usize) {
            Some(nibble) if !nibble.is_empty() => bits.push_str(nibble),
            _ => return Err(invalid()),
        }
    }
    Ok(bits)
}

/// Binary digits of `key` with whitespace removed, checked to be `0`/`1` only.
fn binary_digits(key: &str) -> Result<Vec<u8>, CountsError> {
    let digits: Vec<u8> = key
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| match c {
            '0' => Ok(0),
            '1' => Ok(1),
            _ => Err(()),
        })
        .collect::<Result<_, _>>()
        .map_err(|_| CountsError::InvalidKey {
            key: key.to_string(),
            radix: 2,
        })?;
    if digits.is_empty() {
        return Err(CountsError::InvalidKey {
            key: key.to_string(),
            radix: 2,
        });
    }
    Ok(digits)
}

/// Left-pad `bits` to `num_bits` characters, dropping leading zeros first.
///
/// A zero-bit register still renders its single outcome as `"0"`.
fn fit_width(key: &str, bits: &str, num_bits: u32) -> Result<String, CountsError> {
    let significant = bits.trim_start_matches('0');
    if significant.len() > num_bits as usize {
        return Err(CountsError::OutOfRange {
            key: key.to_string(),
            num_bits,
        });
    }
    let width = (num_bits as usize).max(1);
    Ok(format!("{significant:0>width$}"))
}

/// Convert a hex-keyed histogram to fixed-width binary keys with the default
/// collision policy.
///
/// ```
/// use qcounts_codec::{Histogram, rekey_hex};
///
/// let counts = Histogram::from([("0x0", 8182u64), ("0x4", 10)]);
/// let binary = rekey_hex(&counts, 3).unwrap();
/// assert_eq!(binary, Histogram::from([("000", 8182), ("100", 10)]));
/// ```
pub fn rekey_hex<W: Weight>(
    counts: &Histogram<W>,
    num_bits: u32,
) -> Result<Histogram<W>, CountsError> {
    rekey_hex_with(counts, num_bits, Collision::default())
}

/// Convert a hex-keyed histogram to binary keys of exactly `num_bits` characters.
///
/// Keys whose value needs more than `num_bits` bits are rejected.
pub fn rekey_hex_with<W: Weight>(
    counts: &Histogram<W>,
    num_bits: u32,
    collision: Collision,
) -> Result<Histogram<W>, CountsError> {
    let mut out: BTreeMap<String, W> = BTreeMap::new();
    for (key, weight) in counts.iter() {
        let outcome = fit_width(key, &hex_to_bin(key)?, num_bits)?;
        trace!("Re-keyed {} to {}", key, outcome);
        match out.entry(outcome) {
            Entry::Vacant(entry) => {
                entry.insert(weight);
            }
            Entry::Occupied(mut entry) => match collision {
                Collision::Overwrite => {
                    debug!(
                        "Key {} overwrites outcome {} ({} -> {})",
                        key,
                        entry.key(),
                        entry.get(),
                        weight
                    );
                    entry.insert(weight);
                }
                Collision::Reject => {
                    return Err(CountsError::DuplicateOutcome {
                        key: key.to_string(),
                        outcome: entry.key().clone(),
                    });
                }
                Collision::Sum => {
                    let sum = entry.get().checked_add(weight).ok_or_else(|| {
                        CountsError::WeightOverflow {
                            key: key.to_string(),
                        }
                    })?;
                    entry.insert(sum);
                }
            },
        }
    }
    Ok(out.into())
}

/// Index encoded by a binary key, checked against `num_bits`.
///
/// Whitespace is stripped first. Leading zeros beyond `num_bits` characters are
/// accepted when the value still fits.
pub fn binary_index(key: &str, num_bits: u32) -> Result<usize, CountsError> {
    let digits = binary_digits(key)?;
    let first_one = digits.iter().position(|&b| b == 1).unwrap_or(digits.len());
    let significant = &digits[first_one..];
    // Widths at or above usize::BITS are rejected when the dense array is allocated.
    if significant.len() > num_bits as usize || significant.len() >= usize::BITS as usize {
        return Err(CountsError::OutOfRange {
            key: key.to_string(),
            num_bits,
        });
    }
    Ok(significant
        .iter()
        .fold(0usize, |index, &bit| (index << 1) | bit as usize))
}

/// Materialize a binary-keyed histogram as a dense array with the default
/// collision policy.
///
/// ```
/// use qcounts_codec::{Histogram, densify};
///
/// let counts = Histogram::from([("1", 100u64)]);
/// assert_eq!(densify(&counts, 2).unwrap().as_slice(), &[0, 100, 0, 0]);
/// ```
pub fn densify<W: Weight>(
    counts: &Histogram<W>,
    num_bits: u32,
) -> Result<DenseHistogram<W>, CountsError> {
    densify_with(counts, num_bits, Collision::default())
}

/// Materialize a binary-keyed histogram as a dense array of `2^num_bits` weights.
///
/// Outcomes missing from `counts` are zero. The whole histogram is validated
/// before a result is returned.
pub fn densify_with<W: Weight>(
    counts: &Histogram<W>,
    num_bits: u32,
    collision: Collision,
) -> Result<DenseHistogram<W>, CountsError> {
    let mut dense = DenseHistogram::zeros(num_bits)?;
    // Source key per written index, only needed to report rejected collisions.
    let mut written: BTreeMap<usize, &str> = BTreeMap::new();
    let values = dense.values_mut();
    for (key, weight) in counts.iter() {
        let index = binary_index(key, num_bits)?;
        match collision {
            Collision::Overwrite => values[index] = weight,
            Collision::Sum => {
                values[index] = values[index].checked_add(weight).ok_or_else(|| {
                    CountsError::WeightOverflow {
                        key: key.to_string(),
                    }
                })?;
            }
            Collision::Reject => {
                if let Some(previous) = written.insert(index, key) {
                    debug!("Keys {} and {} both encode index {}", previous, key, index);
                    return Err(CountsError::DuplicateOutcome {
                        key: key.to_string(),
                        outcome: index.to_string(),
                    });
                }
                values[index] = weight;
            }
        }
    }
    trace!(
        "Densified {} entries into {} outcomes",
        counts.len(),
        dense.len()
    );
    Ok(dense)
}
