use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;
use std::process;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use brc_rs::format::write_results;
use brc_rs::{BrcError, Stage};
use brc_rs::pipeline::{PipelineConfig, aggregate_file, default_workers};
use brc_rs::reader::ReadStrategy;

#[derive(Parser)]
#[command(
    name = "fbrc",
    version,
    about = "Print min/mean/max per station of a `station;value` measurements file"
)]
struct Cli {
    /// Measurements file, one `key;value` record per line
    #[arg(default_value = "data/measurements.txt")]
    input: PathBuf,

    /// Number of worker threads [default: available CPUs]
    #[arg(short = 'w', long = "workers")]
    workers: Option<usize>,

    /// Target chunk size in bytes [default: file size / workers, at most 64 MiB with --strategy read]
    #[arg(short = 'c', long = "chunk-size", value_name = "BYTES")]
    chunk_size: Option<u64>,

    /// How chunk bytes are brought into memory
    #[arg(long = "strategy", value_enum, default_value_t = Strategy::Mmap)]
    strategy: Strategy,

    /// Write the result line to FILE instead of standard output
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    output: Option<PathBuf>,

    /// Log phase timings to standard error
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Strategy {
    /// Memory-map each chunk
    Mmap,
    /// Seek and read each chunk into a buffer
    Read,
}

impl From<Strategy> for ReadStrategy {
    fn from(s: Strategy) -> Self {
        match s {
            Strategy::Mmap => ReadStrategy::Mmap,
            Strategy::Read => ReadStrategy::Read,
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "info" } else { "warn" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    let config = PipelineConfig {
        workers: cli.workers.unwrap_or_else(default_workers),
        chunk_size: cli.chunk_size,
        strategy: cli.strategy.into(),
        ..PipelineConfig::default()
    };

    let result = aggregate_file(&cli.input, &config)?;

    let started = std::time::Instant::now();
    match &cli.output {
        Some(path) => {
            let output_err = |e| BrcError::io(Stage::Output, path, e);
            let file = File::create(path).map_err(output_err)?;
            write_results(&mut BufWriter::new(file), &result.stations).map_err(output_err)?;
        }
        None => {
            let stdout = io::stdout();
            let mut out = BufWriter::new(stdout.lock());
            write_results(&mut out, &result.stations)
                .map_err(|e| BrcError::io(Stage::Output, "standard output", e))?;
        }
    }

    let stats = &result.stats;
    info!(
        phase = "output",
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Chunks: {}, CPUs: {}/{}, Process: {:.2}s, Merge: {:.2}s",
        stats.chunks,
        stats.workers,
        default_workers(),
        stats.aggregate.as_secs_f64(),
        stats.merge.as_secs_f64(),
    );
    Ok(())
}

fn main() {
    brc_rs::common::reset_sigpipe();
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(&cli) {
        if let Some(err) = e.downcast_ref::<BrcError>() {
            debug!(stage = %err.stage(), "run failed");
        }
        eprintln!("fbrc: {}", e);
        process::exit(1);
    }
}
