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

//! End-to-end tests for the histogram pipeline.
//!
//! Raw hex counts are re-keyed, densified, marginalized and batched the way a
//! post-processing script would chain them.

use qcounts_codec::{
    Collision, CountsError, DenseHistogram, Histogram, densify, densify_with, marginalize,
    outcome_key, rekey_hex,
};
use qcounts_common::partition;

// ---------------------------------------------------------------------------
// Shared fixture
// ---------------------------------------------------------------------------

/// Three runs of a five-qubit experiment reported with hex keys.
fn hex_runs() -> Vec<Histogram<u64>> {
    vec![
        Histogram::from([("0x0", 8182), ("0x4", 10)]),
        Histogram::from([("0x0", 4137), ("0x4", 4055)]),
        Histogram::from([("0x0", 263), ("0x4", 7929)]),
    ]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn rekeyed_runs_marginalize_onto_bit_two() {
    let expected = [
        Histogram::from([("0", 8182), ("1", 10)]),
        Histogram::from([("0", 4137), ("1", 4055)]),
        Histogram::from([("0", 263), ("1", 7929)]),
    ];
    for (run, expected) in hex_runs().iter().zip(expected) {
        let binary = rekey_hex(run, 5).expect("all keys fit in five bits");
        assert!(binary.keys().all(|k| k.len() == 5));
        let marginal = marginalize(&binary, Some(&[2])).expect("bit 2 exists");
        assert_eq!(marginal, expected);
    }
}

#[test]
fn rekeyed_runs_densify_with_conserved_shots() {
    for run in hex_runs() {
        let dense = densify(&rekey_hex(&run, 5).unwrap(), 5).unwrap();
        assert_eq!(dense.len(), 32);
        assert_eq!(dense.total(), Ok(8192));
        assert_eq!(dense[0] + dense[4], 8192);
    }
}

#[test]
fn normalized_dense_histogram_is_a_distribution() {
    let run = &hex_runs()[1];
    let dense = densify(&rekey_hex(run, 3).unwrap(), 3).unwrap();
    let probabilities: DenseHistogram<f64> = dense.normalized();
    assert!((probabilities.total().unwrap() - 1.0).abs() < 1e-12);
    assert_eq!(probabilities.argmax(), 0);
    assert_eq!(dense.to_counts(), rekey_hex(run, 3).unwrap());
}

#[test]
fn densify_in_batches_covers_every_outcome() {
    let num_bits = 6;
    let counts: Histogram<u64> = (0..1usize << num_bits)
        .map(|i| (outcome_key(i, num_bits), i as u64 + 1))
        .collect();
    let dense = densify(&counts, num_bits).unwrap();

    let mut seen = 0;
    for block in partition(dense.len(), 10).unwrap() {
        let batch = &dense.as_slice()[block.range()];
        assert_eq!(batch.len(), block.len());
        seen += batch.iter().sum::<u64>();
    }
    assert_eq!(Ok(seen), counts.total());
}

#[test]
fn failed_conversion_reports_offending_key() {
    let counts = Histogram::from([("0 0 1", 1u64), ("1 0 0 1", 2)]);
    let err = densify_with(&counts, 3, Collision::Sum).expect_err("1001 needs four bits");
    assert_eq!(
        err,
        CountsError::OutOfRange {
            key: "1 0 0 1".to_string(),
            num_bits: 3
        }
    );
    assert_eq!(err.to_string(), "key \"1 0 0 1\" does not fit in 3 bits");
}
