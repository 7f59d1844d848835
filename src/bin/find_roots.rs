//! # find-roots
//!
//! Samples a cubic polynomial into compressed super-chunks and finds its roots by
//! scanning for sign changes, reporting compression ratios and phase throughput.
//!
//! ```bash
//! find-roots --nchunks 50 --codec zstd --clevel 5 --parallel -v
//! find-roots --config pipeline.json --json
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;
use log::LevelFilter;

use superchunk::observability::init_logging;
use superchunk::{
    CodecKind, FilterKind, PhaseTiming, PipelineConfig, PipelineReport, SchunkError, SchunkStats,
    TransformMode, VectorPipeline,
};

/// Find the roots of (x-1.35)(x-4.45)(x-8.5) over [0, 10) using compressed chunks.
#[derive(Parser, Debug)]
#[command(name = "find-roots")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON pipeline configuration; flags below override its values
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Number of chunks to generate
    #[arg(long)]
    nchunks: Option<usize>,

    /// Elements per chunk
    #[arg(long)]
    chunk_len: Option<usize>,

    /// Block codec: none, lz4 or zstd
    #[arg(long)]
    codec: Option<CodecKind>,

    /// Compression level (0-9)
    #[arg(long)]
    clevel: Option<u8>,

    /// Mantissa bits kept by the truncation filter (0 disables it)
    #[arg(long)]
    trunc_bits: Option<u8>,

    /// Threads for block compression and the parallel transform
    #[arg(long)]
    nthreads: Option<usize>,

    /// Transform chunks in parallel batches
    #[arg(long)]
    parallel: bool,

    /// Print the report as JSON instead of text
    #[arg(long)]
    json: bool,

    /// Append log output to this file instead of stderr
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,

    /// Verbosity level (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    /// Loads the base configuration and applies the command-line overrides.
    fn pipeline_config(&self) -> Result<PipelineConfig, SchunkError> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_json_file(path)?,
            None => PipelineConfig::default(),
        };

        if let Some(nchunks) = self.nchunks {
            config.nchunks = nchunks;
        }
        if let Some(chunk_len) = self.chunk_len {
            config.schunk.chunk_len = chunk_len;
        }
        if let Some(codec) = self.codec {
            config.schunk.codec = codec;
        }
        if let Some(clevel) = self.clevel {
            config.schunk.clevel = clevel;
        }
        if let Some(nthreads) = self.nthreads {
            config.schunk.nthreads = nthreads;
        }
        if let Some(bits) = self.trunc_bits {
            config
                .schunk
                .filters
                .retain(|f| !matches!(f, FilterKind::TruncPrec { .. }));
            if bits > 0 {
                config.schunk.filters.insert(0, FilterKind::TruncPrec { bits });
            }
        }
        if self.parallel {
            config.transform_mode = TransformMode::ChunkParallel;
        }

        config.validate()?;
        Ok(config)
    }
}

const MB: f64 = 1024.0 * 1024.0;

fn print_phase(label: &str, timing: &PhaseTiming) {
    println!(
        "{:<24} {:>8.3} s, {:>8.1} MB/s",
        label.bold(),
        timing.elapsed.as_secs_f64(),
        timing.throughput_mib_s()
    );
}

fn print_stats(label: &str, stats: &SchunkStats) {
    println!(
        "{:<24} {:>8.1} MB -> {:.1} MB ({})",
        label.bold(),
        stats.logical_bytes as f64 / MB,
        stats.compressed_bytes as f64 / MB,
        format!("{:.1}x", stats.ratio()).green()
    );
}

fn print_report(report: &PipelineReport) {
    print_phase("Creation of X values:", &report.generation);
    print_stats("Compression of X:", &report.x_stats);
    print_phase("Computing Y polynomial:", &report.transform);
    print_stats("Compression of Y:", &report.y_stats);

    let roots: Vec<String> = report.roots.iter().map(|r| format!("{:.16}", r)).collect();
    println!("{} {}", "Roots found at:".bold(), roots.join(", ").cyan());
    print_phase("Find root time:", &report.scan);

    if !report.skipped_chunks.is_empty() {
        println!(
            "{} {:?}",
            "Skipped undecodable chunks:".yellow().bold(),
            report.skipped_chunks
        );
    }
}

fn run(cli: &Cli) -> Result<(), SchunkError> {
    let level = match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    init_logging(level, cli.log_file.as_deref())?;

    let config = cli.pipeline_config()?;
    log::info!(
        "running {} chunks of {} elements ({} level {}, filters {:?}, {} threads)",
        config.nchunks,
        config.schunk.chunk_len,
        config.schunk.codec,
        config.schunk.clevel,
        config.schunk.filters,
        config.schunk.nthreads
    );

    let report = VectorPipeline::new(config)?.run()?;
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}
