//! ReplayLab CLI — index stats and config-driven replay runs.
//!
//! Commands:
//! - `stats` — build the candle index for a CSV file and report its span
//! - `run` — execute a replay from a TOML config file and print the
//!   metric report (text or JSON)

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use replaylab_core::data::CandleStore;
use replaylab_runner::{MetricCategory, MetricReport, PerformanceSummary, ReplayConfig};

#[derive(Parser)]
#[command(
    name = "replaylab",
    about = "ReplayLab — market replay and order-execution simulator"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the candle index for a CSV file and print its span.
    Stats {
        /// Candle CSV file (timestamp,open,high,low,close,volume).
        file: PathBuf,
    },
    /// Execute a replay from a TOML config file.
    Run {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Emit the metric report as JSON instead of text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Stats { file } => stats(&file),
        Commands::Run { config, json } => run(&config, json),
    }
}

fn stats(file: &Path) -> Result<()> {
    let mut store = CandleStore::new(file);
    let len = store
        .len()
        .with_context(|| format!("indexing {}", file.display()))?;

    println!("candles: {len}");
    if let (Some(first), Some(last)) = (store.first_time()?, store.last_time()?) {
        println!("first:   {first}");
        println!("last:    {last}");
    }
    println!("skipped: {} line(s)", store.skipped_lines());
    Ok(())
}

fn run(config_path: &Path, json: bool) -> Result<()> {
    let config = ReplayConfig::load(config_path)?;
    let mut sim = config.build_simulation();
    sim.initialize()
        .with_context(|| format!("initializing replay of {}", config.data_file.display()))?;

    // Demonstration driver: enter on the first candle, hold to the end.
    // Real strategies drive the same surface from outside.
    sim.buy(&config.symbol, 1.0)?;
    while sim.forward()? {}
    sim.close_all_positions()?;

    let summary = PerformanceSummary::compute(sim.trade_history());
    let report = MetricReport::new(&summary, sim.balance());
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("run {}", config.run_id());
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &MetricReport) {
    for category in [
        MetricCategory::Basic,
        MetricCategory::Trading,
        MetricCategory::Risk,
    ] {
        println!("{}:", category.label());
        for metric in report.in_category(category) {
            println!("  {:<24} {}", metric.kind.label(), metric.value);
        }
    }
}
