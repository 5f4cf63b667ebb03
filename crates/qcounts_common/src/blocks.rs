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

//! Split an index range into contiguous fixed-size blocks.
//!
//! Used to batch work over large outcome or shot ranges, e.g.
//! `partition(5, 2)` yields `[0, 2)`, `[2, 4)` and `[4, 5)`.

use std::{
    fmt::{Display, Formatter},
    iter::FusedIterator,
    ops::Range,
};

use log::trace;
use serde::{Deserialize, Serialize};

/// Half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Block {
    pub start: usize,
    pub end: usize,
}

impl Block {
    pub fn new(start: usize, end: usize) -> Self {
        assert!(start <= end, "block start {start} exceeds end {end}");
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}

impl From<Block> for Range<usize> {
    fn from(block: Block) -> Self {
        block.range()
    }
}

impl From<Block> for (usize, usize) {
    fn from(block: Block) -> Self {
        (block.start, block.end)
    }
}

impl Display for Block {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionError {
    ZeroBlockSize { size: usize },
}

impl Display for PartitionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ZeroBlockSize { size } => {
                write!(f, "invalid argument: cannot split size {size} into blocks of size 0")
            }
        }
    }
}

impl std::error::Error for PartitionError {}

/// Lazy iterator over the blocks of a partition.
#[derive(Debug, Clone)]
pub struct Blocks {
    size: usize,
    block_size: usize,
    next_start: usize,
}

impl Iterator for Blocks {
    type Item = Block;

    fn next(&mut self) -> Option<Block> {
        if self.next_start >= self.size {
            return None;
        }
        let start = self.next_start;
        // The last block is clamped to `size`, which also avoids overflow near usize::MAX.
        let end = start + self.block_size.min(self.size - start);
        self.next_start = end;
        Some(Block { start, end })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.size - self.next_start).div_ceil(self.block_size);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Blocks {}

impl FusedIterator for Blocks {}

/// Iterate over the blocks of `[0, size)` with at most `block_size` elements each.
///
/// The block size is validated before anything else, so `blocks(0, 0)` is an
/// error rather than an empty iterator.
pub fn blocks(size: usize, block_size: usize) -> Result<Blocks, PartitionError> {
    if block_size == 0 {
        return Err(PartitionError::ZeroBlockSize { size });
    }
    Ok(Blocks {
        size,
        block_size,
        next_start: 0,
    })
}

/// Split `[0, size)` into `ceil(size / block_size)` contiguous blocks.
///
/// Every block has length `block_size` except possibly the last one.
pub fn partition(size: usize, block_size: usize) -> Result<Vec<Block>, PartitionError> {
    let out: Vec<Block> = blocks(size, block_size)?.collect();
    trace!(
        "Partitioned {} into {} blocks of size {}",
        size,
        out.len(),
        block_size
    );
    Ok(out)
}
