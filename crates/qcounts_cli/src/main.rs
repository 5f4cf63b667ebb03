// Copyright contributors to the qcounts project

use std::{
    error::Error,
    fmt::{Display, Formatter},
    io::{self, Read, Write},
};

use clap::{Parser, Subcommand, ValueEnum};
use log::{debug, info};
use qcounts_codec::{
    Collision, CountsError, DenseHistogram, Histogram, Weight, densify_with, marginalize,
    outcome_key, rekey_hex_with,
};
use qcounts_common::{LatexOptions, MeasureTime, array_to_latex, blocks};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Deserializer;

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum CollisionChoices {
    Overwrite,
    Reject,
    Sum,
}

impl CollisionChoices {
    fn collision(self) -> Collision {
        match self {
            Self::Overwrite => Collision::Overwrite,
            Self::Reject => Collision::Reject,
            Self::Sum => Collision::Sum,
        }
    }
}

/// Numeric type of the weights read from the input.
#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum KindChoices {
    Int,
    Float,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum FormatChoices {
    Json,
    Csv,
    Latex,
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Log the time spent on the command
    #[arg(long, global = true)]
    timing: bool,
    #[arg(long, global = true, value_enum, default_value_t = KindChoices::Float)]
    kind: KindChoices,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
enum Commands {
    /// Convert hex-keyed histograms to binary keys of BITS characters
    Rekey {
        bits: u32,
        #[arg(long, value_enum, default_value_t = CollisionChoices::Overwrite)]
        collision: CollisionChoices,
    },
    /// Expand binary-keyed histograms to arrays of 2^BITS weights
    Densify {
        bits: u32,
        #[arg(long, value_enum, default_value_t = CollisionChoices::Overwrite)]
        collision: CollisionChoices,
        /// Divide every weight by the total weight of its histogram
        #[arg(long)]
        normalize: bool,
        #[arg(short, long, value_enum, default_value_t = FormatChoices::Json)]
        format: FormatChoices,
    },
    /// Marginalize binary-keyed histograms onto the given classical bits
    Marginal {
        #[arg(long, value_delimiter = ',')]
        indices: Option<Vec<usize>>,
    },
    /// Split [0, SIZE) into contiguous blocks of at most BLOCK_SIZE
    Blocks { size: usize, block_size: usize },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Self::Rekey { .. } => "rekey",
            Self::Densify { .. } => "densify",
            Self::Marginal { .. } => "marginal",
            Self::Blocks { .. } => "blocks",
        }
    }
}

/// A conversion error together with the position of the histogram in the input stream.
#[derive(Debug)]
struct StreamError {
    position: usize,
    source: CountsError,
}

impl Display for StreamError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "histogram {}: {}", self.position, self.source)
    }
}

impl Error for StreamError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.source)
    }
}

#[derive(Debug, Serialize)]
struct DenseRow<T> {
    histogram: usize,
    index: usize,
    outcome: String,
    weight: T,
}

/// Histograms streamed from `reader`, one JSON object each.
fn histograms<W: Weight + DeserializeOwned>(
    reader: impl Read,
) -> impl Iterator<Item = serde_json::Result<Histogram<W>>> {
    Deserializer::from_reader(reader).into_iter::<Histogram<W>>()
}

/// Convert every histogram and write the results as JSON lines.
///
/// Conversion errors abort the stream. A failing writer (e.g. a closed pipe)
/// only stops it.
fn run_json_lines<W, T>(
    reader: impl Read,
    out: &mut impl Write,
    mut convert: impl FnMut(&Histogram<W>) -> Result<T, CountsError>,
) -> Result<(), Box<dyn Error>>
where
    W: Weight + DeserializeOwned,
    T: Serialize,
{
    for (position, counts) in histograms::<W>(reader).enumerate() {
        let counts = counts?;
        debug!("Histogram {}: {}", position, counts);
        let converted = convert(&counts).map_err(|source| StreamError { position, source })?;
        let line = serde_json::to_string(&converted)?;
        if let Err(err) = writeln!(out, "{line}") {
            debug!("Encountered error while writing to stdout: {:?}", err);
            break;
        }
    }
    Ok(())
}

fn run_densify<W, T>(
    reader: impl Read,
    out: &mut impl Write,
    bits: u32,
    collision: Collision,
    format: FormatChoices,
    finish: impl Fn(DenseHistogram<W>) -> DenseHistogram<T>,
) -> Result<(), Box<dyn Error>>
where
    W: Weight + DeserializeOwned,
    T: Weight + Serialize,
{
    let mut dense_histograms =
        histograms::<W>(reader)
            .enumerate()
            .map(|(position, counts)| -> Result<_, Box<dyn Error>> {
                let dense = densify_with(&counts?, bits, collision)
                    .map_err(|source| StreamError { position, source })?;
                debug!(
                    "Histogram {}: most likely outcome {}",
                    position,
                    outcome_key(dense.argmax(), bits)
                );
                Ok((position, finish(dense)))
            });

    match format {
        FormatChoices::Json => {
            for item in dense_histograms {
                let (_, dense) = item?;
                let line = serde_json::to_string(dense.as_slice())?;
                if let Err(err) = writeln!(out, "{line}") {
                    debug!("Encountered error while writing to stdout: {:?}", err);
                    break;
                }
            }
        }
        FormatChoices::Csv => {
            let mut wtr = csv::Writer::from_writer(out);
            // Stop on first error
            let err = dense_histograms.try_for_each(|item| {
                let (histogram, dense) = item?;
                for (index, weight) in dense.iter().enumerate() {
                    wtr.serialize(DenseRow {
                        histogram,
                        index,
                        outcome: outcome_key(index, bits),
                        weight,
                    })?;
                }
                Ok::<_, Box<dyn Error>>(())
            });
            err?;
            wtr.flush()?;
        }
        FormatChoices::Latex => {
            for item in dense_histograms {
                let (position, dense) = item?;
                let rows: Vec<Vec<String>> = dense
                    .iter()
                    .enumerate()
                    .map(|(index, weight)| vec![outcome_key(index, bits), weight.to_string()])
                    .collect();
                let options = LatexOptions {
                    comments: vec![format!("histogram {position}")],
                    column_alignment: "lr".to_string(),
                    ..Default::default()
                };
                let latex = array_to_latex(&rows, &options)?;
                if let Err(err) = writeln!(out, "{latex}") {
                    debug!("Encountered error while writing to stdout: {:?}", err);
                    break;
                }
            }
        }
    }
    Ok(())
}

fn run_blocks(
    out: &mut impl Write,
    size: usize,
    block_size: usize,
) -> Result<(), Box<dyn Error>> {
    let blocks = blocks(size, block_size)?;
    info!("Splitting {} into {} blocks", size, blocks.len());
    let mut wtr = csv::Writer::from_writer(out);
    // Stop on first error
    let err = blocks
        .into_iter()
        .try_for_each(|block| wtr.serialize(block))
        .and_then(|_| wtr.flush().map_err(csv::Error::from));
    debug!("Finished writing blocks: {:?}", err);
    Ok(())
}

fn run_with_kind<W, T>(
    command: Commands,
    reader: impl Read,
    out: &mut impl Write,
    normalized: impl Fn(DenseHistogram<W>) -> DenseHistogram<T>,
) -> Result<(), Box<dyn Error>>
where
    W: Weight + DeserializeOwned + Serialize,
    T: Weight + Serialize,
{
    match command {
        Commands::Rekey { bits, collision } => run_json_lines::<W, _>(reader, out, |counts| {
            rekey_hex_with(counts, bits, collision.collision())
        }),
        Commands::Densify {
            bits,
            collision,
            normalize,
            format,
        } => {
            if normalize {
                run_densify::<W, T>(reader, out, bits, collision.collision(), format, normalized)
            } else {
                run_densify::<W, W>(reader, out, bits, collision.collision(), format, |d| d)
            }
        }
        Commands::Marginal { indices } => run_json_lines::<W, _>(reader, out, |counts| {
            marginalize(counts, indices.as_deref())
        }),
        Commands::Blocks { size, block_size } => run_blocks(out, size, block_size),
    }
}

fn run(
    command: Commands,
    kind: KindChoices,
    reader: impl Read,
    out: &mut impl Write,
) -> Result<(), Box<dyn Error>> {
    match kind {
        KindChoices::Int => {
            run_with_kind::<u64, f64>(command, reader, out, |dense| dense.normalized())
        }
        KindChoices::Float => {
            run_with_kind::<f64, f64>(command, reader, out, |dense| dense.normalized())
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    // By default log INFO.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let _timer = cli
        .timing
        .then(|| MeasureTime::new(format!("{}:", cli.command.name())));

    let reader = io::stdin().lock();
    let mut stdout = io::stdout().lock();
    run(cli.command, cli.kind, reader, &mut stdout)
}
