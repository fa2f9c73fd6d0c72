//! GridLab CLI: run, batch and synthetic-data commands.
//!
//! Commands:
//! - `run`: execute one simulation from a TOML config file
//! - `batch`: apply one config to many bar files in parallel
//! - `synthetic`: write seeded random-walk bars as CSV

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::NaiveDateTime;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use gridlab_core::engine::OrderSlotPolicy;
use gridlab_runner::data_loader::parse_timestamp;
use gridlab_runner::export::write_bars_csv;
use gridlab_runner::{
    generate_bars, run_batch, run_simulation, RunSummary, SimulationConfig, SyntheticConfig,
};

#[derive(Parser)]
#[command(
    name = "gridlab",
    about = "GridLab CLI: bar-driven order execution simulator"
)]
struct Cli {
    /// Debug logging (overridden by RUST_LOG).
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one simulation from a TOML config file.
    Run {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Bar CSV, overriding `data.path`.
        #[arg(long)]
        data: Option<PathBuf>,

        /// Augmented CSV output, overriding `data.output`.
        #[arg(long)]
        output: Option<PathBuf>,

        /// JSON summary output, overriding `data.summary`.
        #[arg(long)]
        summary: Option<PathBuf>,

        /// Print the summary as JSON instead of a table.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Apply one config to many bar files.
    Batch {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Bar CSV files. The symbol is taken from each file name.
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Directory for per-symbol trade CSVs and summaries.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,

        /// Run files one after another.
        #[arg(long, default_value_t = false)]
        sequential: bool,
    },
    /// Write seeded synthetic bars as CSV.
    Synthetic {
        /// Number of bars.
        #[arg(long, default_value_t = 500)]
        bars: usize,

        /// RNG seed.
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// First bar timestamp (YYYY-MM-DD HH:MM:SS).
        #[arg(long)]
        start: Option<String>,

        /// Minutes between bars.
        #[arg(long, default_value_t = 15)]
        interval: i64,

        /// Opening price of the first bar.
        #[arg(long, default_value_t = 100.0)]
        start_price: f64,

        /// Largest per-bar move as a fraction of price.
        #[arg(long, default_value_t = 0.003)]
        volatility: f64,

        /// Output CSV path.
        #[arg(long)]
        output: PathBuf,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "gridlab=debug" } else { "gridlab=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run {
            config,
            data,
            output,
            summary,
            json,
        } => run_cmd(&config, data, output, summary, json),
        Commands::Batch {
            config,
            files,
            output_dir,
            sequential,
        } => batch_cmd(&config, &files, &output_dir, !sequential),
        Commands::Synthetic {
            bars,
            seed,
            start,
            interval,
            start_price,
            volatility,
            output,
        } => {
            let mut synthetic = SyntheticConfig {
                bars,
                seed,
                interval_minutes: interval,
                start_price,
                volatility,
                ..SyntheticConfig::default()
            };
            if let Some(start) = start {
                synthetic.start = parse_start(&start)?;
            }
            synthetic_cmd(&synthetic, &output)
        }
    }
}

fn run_cmd(
    config_path: &Path,
    data: Option<PathBuf>,
    output: Option<PathBuf>,
    summary: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let mut config = SimulationConfig::load(config_path)
        .with_context(|| format!("failed to load config {}", config_path.display()))?;
    if data.is_some() {
        config.data.path = data;
    }
    if output.is_some() {
        config.data.output = output;
    }
    if summary.is_some() {
        config.data.summary = summary;
    }

    let outcome = run_simulation(&config)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome.summary)?);
    } else {
        print_summary(&outcome.summary, config.broker.slot_policy);
    }

    if let Some(path) = &config.data.output {
        outcome.write_csv(path)?;
        tracing::info!(path = %path.display(), "trade log written");
        println!("Trade log written to: {}", path.display());
    }
    if let Some(path) = &config.data.summary {
        outcome.write_summary(path)?;
        tracing::info!(path = %path.display(), "summary written");
        println!("Summary written to: {}", path.display());
    }
    Ok(())
}

fn batch_cmd(config_path: &Path, files: &[PathBuf], output_dir: &Path, parallel: bool) -> Result<()> {
    let config = SimulationConfig::load(config_path)
        .with_context(|| format!("failed to load config {}", config_path.display()))?;
    let report = run_batch(&config, files, parallel);

    println!();
    println!(
        "{:<12} {:>6} {:>6} {:>7} {:>14} {:>12}",
        "Symbol", "Bars", "Fills", "Trades", "Balance", "Commission"
    );
    println!("{}", "-".repeat(62));
    for (item, outcome) in report.succeeded() {
        let s = &outcome.summary;
        println!(
            "{:<12} {:>6} {:>6} {:>7} {:>14.2} {:>12.2}",
            item.symbol, s.bar_count, s.fill_count, s.trade_count, s.final_balance, s.total_commission
        );
        outcome.write_csv(&output_dir.join(format!("{}_trades.csv", item.symbol)))?;
        outcome.write_summary(&output_dir.join(format!("{}_summary.json", item.symbol)))?;
        tracing::info!(symbol = %item.symbol, dir = %output_dir.display(), "batch outputs written");
    }
    for (item, err) in report.failed() {
        tracing::error!(path = %item.path.display(), error = %err, "batch item not written");
        eprintln!("Error for {}: {err}", item.path.display());
    }
    println!();
    println!("Results saved to: {}", output_dir.display());

    if report.failure_count() > 0 {
        bail!(
            "{} of {} file(s) failed",
            report.failure_count(),
            report.items.len()
        );
    }
    Ok(())
}

fn synthetic_cmd(config: &SyntheticConfig, output: &Path) -> Result<()> {
    if config.bars == 0 {
        bail!("--bars must be at least 1");
    }
    if !(config.start_price.is_finite() && config.start_price > 0.0) {
        bail!("--start-price must be positive, got {}", config.start_price);
    }
    let bars = generate_bars(config);
    write_bars_csv(output, &bars)?;
    println!(
        "Wrote {} bars (seed {}) to {}",
        bars.len(),
        config.seed,
        output.display()
    );
    Ok(())
}

fn parse_start(value: &str) -> Result<NaiveDateTime> {
    parse_timestamp(value).with_context(|| format!("invalid --start timestamp '{value}'"))
}

fn print_summary(summary: &RunSummary, slot_policy: OrderSlotPolicy) {
    println!();
    println!("=== Simulation Result ===");
    println!("Symbol:         {}", summary.symbol);
    println!("Mode:           {}", summary.mode);
    if summary.mode == gridlab_runner::Mode::DoubleTrend {
        println!("Order slots:    {slot_policy:?}");
    }
    println!("Bars:           {}", summary.bar_count);
    println!(
        "Events:         {} scheduled, {} handled",
        summary.events_scheduled, summary.events_handled
    );
    println!("Fills:          {}", summary.fill_count);
    println!(
        "Trades:         {} ({} winning)",
        summary.trade_count, summary.winning_trades
    );
    println!();
    println!("--- Account ---");
    println!("Final Balance:  {:.2}", summary.final_balance);
    println!("Commission:     {:.2}", summary.total_commission);
    println!("Final Position: {}", summary.final_position);
    println!("Run:            {}", summary.fingerprint.short_id());
    if summary.insane_bars > 0 {
        println!();
        println!("WARNING: {} bar(s) with inconsistent OHLC values", summary.insane_bars);
    }
    println!();
}
