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

use log::trace;

use crate::{
    histogram::{CountsError, Histogram},
    weight::Weight,
};

fn strip_separators(key: &str) -> String {
    key.replace([' ', '_'], "")
}

/// Marginal histogram over the classical bits in `indices`.
///
/// Bit 0 is the rightmost character of a key. The first listed index becomes
/// the rightmost character of the marginal key, and weights of keys that
/// agree on the selected bits are summed. With `indices == None` the keys are
/// only stripped of register separators (`' '` and `'_'`).
///
/// ```
/// use qcounts_codec::{Histogram, marginalize};
///
/// let counts = Histogram::from([("101", 1u64), ("111", 2), ("001", 4)]);
/// let marginal = marginalize(&counts, Some(&[2])).unwrap();
/// assert_eq!(marginal, Histogram::from([("0", 4), ("1", 3)]));
/// ```
pub fn marginalize<W: Weight>(
    counts: &Histogram<W>,
    indices: Option<&[usize]>,
) -> Result<Histogram<W>, CountsError> {
    let mut out: Histogram<W> = Histogram::new();
    let mut width = None;
    for (key, weight) in counts.iter() {
        let bits = strip_separators(key);
        if bits.is_empty() || bits.bytes().any(|b| b != b'0' && b != b'1') {
            return Err(CountsError::InvalidKey {
                key: key.to_string(),
                radix: 2,
            });
        }
        let clbit_size = *width.get_or_insert(bits.len());
        if bits.len() != clbit_size {
            return Err(CountsError::KeyWidthMismatch {
                key: key.to_string(),
                expected: clbit_size,
                found: bits.len(),
            });
        }

        let new_key = match indices {
            Some(indices) => {
                let key_arr = bits.as_bytes();
                indices
                    .iter()
                    .map(|&bit| {
                        if bit >= clbit_size {
                            return Err(CountsError::BitIndexOutOfRange {
                                index: bit,
                                width: clbit_size,
                            });
                        }
                        Ok(key_arr[clbit_size - bit - 1] as char)
                    })
                    .rev()
                    .collect::<Result<String, _>>()?
            }
            None => bits,
        };
        out.accumulate(new_key, weight)?;
    }
    trace!(
        "Marginalized {} keys onto {} outcomes",
        counts.len(),
        out.len()
    );
    Ok(out)
}
