use std::{
    io::{self, BufWriter, Write},
    path::PathBuf,
};

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use log::debug;

use lru_csim::{Cache, CacheConfig, TraceReader, report, run_trace};

/// Replays a Valgrind memory trace against an LRU set-associative cache.
#[derive(Debug, Parser)]
#[command(
    name = "csim",
    after_help = concat!(
        "Examples:\n",
        "  csim -s 4 -E 1 -b 4 -t traces/yi.trace\n",
        "  csim -v -s 8 -E 2 -b 4 -t traces/yi.trace",
    )
)]
struct Args {
    /// Print the outcome of every operation
    #[arg(short = 'v')]
    verbose: bool,

    /// Number of set index bits (2^s sets)
    #[arg(short = 's', value_name = "num")]
    set_bits: u32,

    /// Number of lines per set
    #[arg(short = 'E', value_name = "num")]
    lines_per_set: usize,

    /// Number of block offset bits (2^b-byte blocks)
    #[arg(short = 'b', value_name = "num")]
    block_bits: u32,

    /// Trace file
    #[arg(short = 't', value_name = "file")]
    trace: PathBuf,

    /// Also write "<hits> <misses> <evictions>" to this file
    #[arg(long, value_name = "file")]
    results: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init_from_env(Env::default().filter_or("CSIM_LOG", "warn"));
    let args = Args::parse();

    let config = CacheConfig::new(args.set_bits, args.lines_per_set, args.block_bits);
    let mut cache = Cache::new(config).context("Invalid cache configuration")?;
    let reader = TraceReader::open(&args.trace)?;
    debug!("replaying {} on {}", args.trace.display(), cache.config());

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let stats = run_trace(&mut cache, reader, |op, outcome| {
        if args.verbose {
            report::write_verbose(&mut out, op, outcome)?;
        }
        Ok(())
    })?;

    writeln!(out, "{}", report::summary_line(&stats))?;
    out.flush()?;

    if let Some(path) = &args.results {
        report::write_results(path, &stats)?;
    }
    Ok(())
}
