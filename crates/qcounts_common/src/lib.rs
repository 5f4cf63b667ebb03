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

pub mod blocks;
pub use blocks::{Block, Blocks, PartitionError, blocks, partition};

pub mod format;
pub use format::{
    FmtOptions, LatexCell, LatexError, LatexMode, LatexOptions, array_to_latex, fmt_map,
};

pub mod timing;
pub use timing::MeasureTime;
