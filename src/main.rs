//! Categorical benchmark CLI
//!
//! Runs one scenario over the configuration sweep and writes
//! `categorical_bench_<FLAG>.json`.

use anyhow::{Context, Result};
use categorical_bench::device::{self, FixedMemory, MemoryInfo};
use categorical_bench::harness::{DEFAULT_AXIS, DEFAULT_REPEAT};
use categorical_bench::pool::DEFAULT_POOL_FRACTION;
use categorical_bench::results::{self, ResultTable};
use categorical_bench::stats::format_seconds;
use categorical_bench::{Engine, Harness, PoolConfig, Scenario, Sweep};
use clap::Parser;
use std::path::PathBuf;

/// Categorical column operation benchmarks
#[derive(Parser, Debug)]
#[command(name = "categorical-bench")]
#[command(about = "Time categorical column operations across a sweep of row counts and cardinalities", long_about = None)]
#[command(version)]
struct Args {
    /// Label for this run; output goes to categorical_bench_<FLAG>.json
    #[arg(value_name = "FLAG")]
    flag: String,

    /// Operation to time
    #[arg(short, long, value_enum, default_value_t = Scenario::Fillna)]
    scenario: Scenario,

    /// Trials per configuration
    #[arg(short, long, default_value_t = DEFAULT_REPEAT)]
    repeat: usize,

    /// Row counts to sweep (comma separated)
    #[arg(long, value_delimiter = ',', default_values_t = DEFAULT_AXIS)]
    rows: Vec<usize>,

    /// Cardinalities to sweep (comma separated)
    #[arg(long, value_delimiter = ',', default_values_t = DEFAULT_AXIS)]
    categories: Vec<usize>,

    /// Fraction of free device memory given to the pool
    #[arg(long, default_value_t = DEFAULT_POOL_FRACTION)]
    pool_fraction: f64,

    /// Disable the memory pool
    #[arg(long)]
    no_pool: bool,

    /// Free memory in bytes, instead of querying the device
    #[arg(long, value_name = "BYTES")]
    free_memory: Option<u64>,

    /// Device ordinal to query
    #[arg(short, long, default_value_t = 0)]
    device: u32,

    /// Directory for the result table and report
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Also write a Markdown report
    #[arg(long)]
    report: bool,

    /// Log per-configuration speedup against a previous result table
    #[arg(long, value_name = "JSON")]
    compare: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logger
    if args.verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Info)
            .init();
    }

    log::info!("Categorical Benchmark v{}", env!("CARGO_PKG_VERSION"));

    results::validate_label(&args.flag)?;
    let sweep = Sweep::new(args.rows.clone(), args.categories.clone())?;

    let (config, device_info) = resolve_pool(&args)?;
    let engine = Engine::new(config);
    engine.warm_up().context("Warm-up failed")?;

    let harness = Harness::new(&engine, args.repeat)?;
    log::info!(
        "Scenario: {} ({} trials per configuration)",
        args.scenario,
        harness.repeat()
    );

    let outcome = harness.run(args.scenario, &sweep)?;

    let output = results::output_path(&args.output_dir, &args.flag);
    outcome.table.save(&output)?;

    if args.report {
        let report = results::generate_report(
            args.scenario.name(),
            &args.flag,
            &device_info,
            &outcome.table,
            &outcome.summaries,
        );
        results::save_report(&report, &results::report_path(&args.output_dir, &args.flag))?;
    }

    if let Some(baseline) = &args.compare {
        let baseline = ResultTable::load(baseline)?;
        log_comparison(&outcome.table, &baseline);
    }

    log::info!("Peak pool usage: {} bytes", engine.pool().peak());

    Ok(())
}

/// Work out the pool configuration and a description of where it came from
fn resolve_pool(args: &Args) -> Result<(PoolConfig, String)> {
    if args.no_pool {
        log::info!("Memory pool disabled");
        return Ok((PoolConfig::disabled(), "host (no pool)".to_string()));
    }

    let source: Option<Box<dyn MemoryInfo>> = match args.free_memory {
        Some(bytes) => Some(Box::new(FixedMemory(bytes)) as Box<dyn MemoryInfo>),
        None => device::default_source(args.device)
            .with_context(|| format!("Failed to open device {}", args.device))?,
    };

    let Some(source) = source else {
        log::warn!("No device backend available and no --free-memory given; pool disabled");
        return Ok((PoolConfig::disabled(), "host (no pool)".to_string()));
    };

    let device_info = source.describe();
    log::info!("Device: {}", device_info);

    let free = source.free_memory()?;
    let config = PoolConfig::from_free_memory(free, args.pool_fraction)?;
    log::info!(
        "Pool: {} bytes ({:.0}% of {} bytes free)",
        config.initial_pool_size,
        args.pool_fraction * 100.0,
        free
    );
    Ok((config, device_info))
}

fn log_comparison(current: &ResultTable, baseline: &ResultTable) {
    let speedups = current.speedup_over(baseline);
    if speedups.is_empty() {
        log::warn!("No configurations in common with the baseline");
        return;
    }
    for ((rows, cats), speedup) in speedups.iter() {
        let now = current.get(rows, cats).unwrap_or_default();
        log::info!(
            "rows={} cats={}: {} ({:.2}x vs baseline)",
            rows,
            cats,
            format_seconds(now),
            speedup
        );
    }
}
