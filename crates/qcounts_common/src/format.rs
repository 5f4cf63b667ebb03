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

//! Plain-text renderings of histograms and small numeric tables.

use std::fmt::{Display, Formatter, Write};

/// Options for [`fmt_map`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FmtOptions {
    /// Decimals used for values. Integer values ignore it.
    pub precision: Option<usize>,
    pub add_braces: bool,
}

impl Default for FmtOptions {
    fn default() -> Self {
        Self {
            precision: Some(2),
            add_braces: true,
        }
    }
}

/// Format key/value pairs as `{k: v, k: v}` in iteration order.
pub fn fmt_map<K, V>(entries: impl IntoIterator<Item = (K, V)>, options: FmtOptions) -> String
where
    K: Display,
    V: Display,
{
    let body = entries
        .into_iter()
        .map(|(k, v)| match options.precision {
            Some(p) => format!("{k}: {v:.p$}"),
            None => format!("{k}: {v}"),
        })
        .collect::<Vec<_>>()
        .join(", ");
    if options.add_braces {
        format!("{{{body}}}")
    } else {
        body
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LatexMode {
    #[default]
    Tabular,
    PSmallMatrix,
    PMatrix,
}

impl Display for LatexMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Tabular => "tabular",
            Self::PSmallMatrix => "psmallmatrix",
            Self::PMatrix => "pmatrix",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LatexOptions {
    /// Emit the `\begin`/`\end` environment lines.
    pub header: bool,
    pub mode: LatexMode,
    /// Row indices followed by `\hline`.
    pub hlines: Vec<usize>,
    /// Vertical space in ex inserted after each `\hline`.
    pub hline_space: Option<f64>,
    /// Fixed number of decimals for floating-point cells, so `Some(2)` renders
    /// `1.5` as `1.50`. Unlike printf's `%g`, trailing zeros are kept. Text
    /// and integer cells are never affected; `None` uses each cell's `Display`.
    pub precision: Option<usize>,
    /// `%` comment lines placed before the table.
    pub comments: Vec<String>,
    /// Column alignment for `tabular`; the last character fills the remaining columns.
    pub column_alignment: String,
}

impl Default for LatexOptions {
    fn default() -> Self {
        Self {
            header: true,
            mode: LatexMode::Tabular,
            hlines: Vec::new(),
            hline_space: None,
            precision: None,
            comments: Vec::new(),
            column_alignment: "c".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LatexError {
    RaggedRows {
        row: usize,
        expected: usize,
        found: usize,
    },
}

impl Display for LatexError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RaggedRows {
                row,
                expected,
                found,
            } => write!(
                f,
                "row {row} has {found} columns, expected {expected} like the first row"
            ),
        }
    }
}

impl std::error::Error for LatexError {}

/// A value that can be placed in a LaTeX table cell.
pub trait LatexCell {
    /// Render the cell. Only floating-point cells honour `precision`.
    fn latex(&self, precision: Option<usize>) -> String;
}

macro_rules! impl_exact_cell {
    ($($t:ty),*) => {
        $(
            impl LatexCell for $t {
                fn latex(&self, _precision: Option<usize>) -> String {
                    self.to_string()
                }
            }
        )*
    };
}

macro_rules! impl_float_cell {
    ($($t:ty),*) => {
        $(
            impl LatexCell for $t {
                fn latex(&self, precision: Option<usize>) -> String {
                    match precision {
                        Some(p) => format!("{self:.p$}"),
                        None => self.to_string(),
                    }
                }
            }
        )*
    };
}

impl_exact_cell!(String, &str, i32, i64, u32, u64, usize);
impl_float_cell!(f32, f64);

/// Render a row-major table as a LaTeX `tabular` or matrix environment.
pub fn array_to_latex<T: LatexCell>(
    rows: &[Vec<T>],
    options: &LatexOptions,
) -> Result<String, LatexError> {
    let columns = rows.first().map_or(0, |r| r.len());
    if let Some((row, r)) = rows
        .iter()
        .enumerate()
        .find(|(_, r)| r.len() != columns)
    {
        return Err(LatexError::RaggedRows {
            row,
            expected: columns,
            found: r.len(),
        });
    }

    let mut out = String::new();
    for comment in &options.comments {
        // Writing to a String cannot fail.
        let _ = writeln!(out, "% {comment}");
    }
    if options.header {
        match options.mode {
            LatexMode::Tabular => {
                let alignment = column_alignment(&options.column_alignment, columns);
                let _ = writeln!(out, "\\begin{{tabular}}{{{alignment}}}");
            }
            mode => {
                let _ = writeln!(out, "\\begin{{{mode}}}");
            }
        }
    }
    for (i, row) in rows.iter().enumerate() {
        let cells = row
            .iter()
            .map(|cell| cell.latex(options.precision))
            .collect::<Vec<_>>()
            .join(" & ");
        out.push_str(&cells);
        if i + 1 < rows.len() || !options.header {
            out.push_str("  \\\\\n");
        } else {
            out.push_str("  \n");
        }
        if options.hlines.contains(&i) {
            out.push_str("\\hline\n");
            if let Some(space) = options.hline_space {
                let _ = write!(out, "\\rule[+{space:.2}ex]{{0pt}}{{0pt}}");
            }
        }
    }
    if options.header {
        match options.mode {
            LatexMode::Tabular => out.push_str("\\end{tabular}"),
            mode => {
                let _ = writeln!(out, "\\end{{{mode}}}");
            }
        }
    }
    Ok(out)
}

fn column_alignment(alignment: &str, columns: usize) -> String {
    let given = alignment.chars().count();
    match alignment.chars().last() {
        Some(last) if given == 1 => last.to_string().repeat(columns),
        Some(last) if given < columns => {
            let mut out = alignment.to_string();
            out.extend(std::iter::repeat_n(last, columns - given));
            out
        }
        _ => alignment.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{FmtOptions, LatexError, LatexMode, LatexOptions, array_to_latex, fmt_map};

    #[test]
    fn fmt_map_uses_two_decimals_by_default() {
        assert_eq!(fmt_map([("a", 1.0)], FmtOptions::default()), "{a: 1.00}");
        assert_eq!(
            fmt_map([("x", 0.126), ("y", 2.0)], FmtOptions::default()),
            "{x: 0.13, y: 2.00}"
        );
    }

    #[test]
    fn fmt_map_without_braces_or_precision() {
        let options = FmtOptions {
            precision: None,
            add_braces: false,
        };
        assert_eq!(fmt_map([(1, 10), (2, 20)], options), "1: 10, 2: 20");
        assert_eq!(fmt_map(Vec::<(u8, u8)>::new(), FmtOptions::default()), "{}");
    }

    #[test]
    fn tabular_with_header() {
        let rows = vec![vec![1, 2], vec![3, 4]];
        let latex = array_to_latex(&rows, &LatexOptions::default()).unwrap();
        assert_eq!(
            latex,
            "\\begin{tabular}{cc}\n1 & 2  \\\\\n3 & 4  \n\\end{tabular}"
        );
    }

    #[test]
    fn tabular_without_header_terminates_every_row() {
        let rows = vec![vec!["a", "b"], vec!["c", "d"]];
        let options = LatexOptions {
            header: false,
            ..Default::default()
        };
        let latex = array_to_latex(&rows, &options).unwrap();
        assert_eq!(latex, "a & b  \\\\\nc & d  \\\\\n");
    }

    #[test]
    fn precision_leaves_text_cells_intact() {
        let rows = vec![vec!["outcome", "weight"]];
        let options = LatexOptions {
            header: false,
            precision: Some(2),
            ..Default::default()
        };
        let latex = array_to_latex(&rows, &options).unwrap();
        assert_eq!(latex, "outcome & weight  \\\\\n");

        let rows = vec![vec![7u64, 12]];
        let latex = array_to_latex(&rows, &options).unwrap();
        assert_eq!(latex, "7 & 12  \\\\\n");

        let rows = vec![vec![1.5f64, 0.126]];
        let latex = array_to_latex(&rows, &options).unwrap();
        assert_eq!(latex, "1.50 & 0.13  \\\\\n");
    }

    #[test]
    fn matrix_modes_with_comments_and_hlines() {
        let rows = vec![vec![0.5, 1.0], vec![2.0, 3.26]];
        let options = LatexOptions {
            mode: LatexMode::PMatrix,
            hlines: vec![0],
            hline_space: Some(1.0),
            comments: vec!["generated".to_string()],
            precision: Some(1),
            ..Default::default()
        };
        let latex = array_to_latex(&rows, &options).unwrap();
        assert_eq!(
            latex,
            "% generated\n\\begin{pmatrix}\n0.5 & 1.0  \\\\\n\\hline\n\\rule[+1.00ex]{0pt}{0pt}2.0 & 3.3  \n\\end{pmatrix}\n"
        );
    }

    #[test]
    fn column_alignment_repeats_last_character() {
        let rows = vec![vec![1, 2, 3, 4]];
        let options = LatexOptions {
            column_alignment: "lr".to_string(),
            ..Default::default()
        };
        let latex = array_to_latex(&rows, &options).unwrap();
        assert!(latex.starts_with("\\begin{tabular}{lrrr}\n"));
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let rows = vec![vec![1, 2], vec![3]];
        let err = array_to_latex(&rows, &LatexOptions::default())
            .expect_err("must reject rows of different length");
        assert_eq!(
            err,
            LatexError::RaggedRows {
                row: 1,
                expected: 2,
                found: 1
            }
        );
    }
}
