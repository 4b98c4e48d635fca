//! Theoretical-value option backtesting CLI
//!
//! # Usage
//!
//! ```bash
//! # Generate a synthetic snapshot file
//! theo-backtest sample --output data/sample.csv
//!
//! # Backtest it with the closed-form model
//! theo-backtest run --input data/sample.csv --output results/bsm.csv
//!
//! # Same data, Monte Carlo model, settings from a config file
//! theo-backtest run --input data/sample.csv --config config/default.toml --model monte_carlo
//!
//! # Price one contract with both models
//! theo-backtest price --spot 100 --strike 100 --maturity 1 --rate 0.05 --vol 0.2
//!
//! # Sample data -> backtest -> metrics in one go
//! theo-backtest demo
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use theo_backtest::config::AppConfig;
use theo_backtest::data::{
    write_metrics_json, write_results_csv, write_snapshots_csv, SampleConfig, SampleDataGenerator,
    SnapshotLoader,
};
use theo_backtest::metrics::{MetricsCalculator, PerformanceMetrics};
use theo_backtest::pricing::{BlackScholes, MonteCarlo, MonteCarloConfig, OptionPricer};
use theo_backtest::{BacktestConfig, BacktestResult, Backtester, ContractParams, OptionType};

const SEPARATOR: &str = "============================================================";

#[derive(Parser)]
#[command(name = "theo-backtest")]
#[command(about = "Backtest option pricing models against observed market prices")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a backtest over a snapshot CSV
    Run {
        /// Snapshot CSV file
        #[arg(short, long)]
        input: PathBuf,

        /// Pricing model (bsm or monte_carlo)
        #[arg(short, long)]
        model: Option<String>,

        /// Option type priced for every row (call or put)
        #[arg(long)]
        option_type: Option<String>,

        /// Path to TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Write result rows to this CSV
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write metrics to this JSON file
        #[arg(long)]
        metrics_json: Option<PathBuf>,

        /// Monte Carlo paths per row
        #[arg(long)]
        simulations: Option<usize>,

        /// Monte Carlo time steps per path
        #[arg(long)]
        steps: Option<usize>,

        /// Monte Carlo seed
        #[arg(long)]
        seed: Option<u64>,

        /// Degenerate-row policy (fail or limit)
        #[arg(long)]
        on_degenerate: Option<String>,
    },

    /// Generate synthetic snapshot data
    Sample {
        /// Output CSV file
        #[arg(short, long, default_value = "data/sample.csv")]
        output: PathBuf,

        /// Number of business days
        #[arg(long, default_value_t = 100)]
        days: usize,

        /// Random seed
        #[arg(long, default_value_t = 0)]
        seed: u64,

        /// First calendar day (YYYY-MM-DD)
        #[arg(long, default_value = "2022-01-01")]
        start: String,
    },

    /// Price a single contract with both models
    Price {
        #[arg(long)]
        spot: f64,

        #[arg(long)]
        strike: f64,

        /// Time to maturity in years
        #[arg(long)]
        maturity: f64,

        #[arg(long)]
        rate: f64,

        #[arg(long)]
        vol: f64,

        #[arg(long, default_value = "call")]
        option_type: String,

        #[arg(long, default_value_t = 10_000)]
        simulations: usize,

        #[arg(long, default_value_t = 252)]
        steps: usize,

        #[arg(long, default_value_t = 0)]
        seed: u64,
    },

    /// Sample data, closed-form backtest and metrics in one run
    Demo {
        /// Write result rows to this CSV
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Random seed for the sample data
        #[arg(long, default_value_t = 0)]
        seed: u64,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("theo_backtest=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            input,
            model,
            option_type,
            config,
            output,
            metrics_json,
            simulations,
            steps,
            seed,
            on_degenerate,
        } => {
            let mut app = match config {
                Some(path) => AppConfig::load(&path)
                    .with_context(|| format!("Failed to load config {}", path.display()))?,
                None => AppConfig::default(),
            };

            // Command-line flags override the file
            if let Some(model) = model {
                app.backtest.model = model;
            }
            if let Some(option_type) = option_type {
                app.backtest.option_type = option_type;
            }
            if let Some(policy) = on_degenerate {
                app.backtest.on_degenerate = policy;
            }
            if let Some(n) = simulations {
                app.monte_carlo.num_simulations = n;
            }
            if let Some(n) = steps {
                app.monte_carlo.num_steps = n;
            }
            if let Some(seed) = seed {
                app.monte_carlo.seed = seed;
            }

            let backtest_config = app
                .to_backtest_config()
                .context("Invalid backtest configuration")?;
            cmd_run(input, backtest_config, output, metrics_json)?;
        }
        Commands::Sample {
            output,
            days,
            seed,
            start,
        } => {
            let start_date = NaiveDate::parse_from_str(&start, "%Y-%m-%d")
                .context("Invalid start date format")?;
            let config = SampleConfig {
                days,
                seed,
                start_date,
                ..Default::default()
            };
            let snapshots = SampleDataGenerator::new(config)
                .generate()
                .context("Failed to generate sample data")?;
            write_snapshots_csv(&output, &snapshots)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            println!("Wrote {} snapshots to {}", snapshots.len(), output.display());
        }
        Commands::Price {
            spot,
            strike,
            maturity,
            rate,
            vol,
            option_type,
            simulations,
            steps,
            seed,
        } => {
            let option_type: OptionType = option_type.parse()?;
            let contract = ContractParams::new(spot, strike, maturity, rate, vol, option_type);
            let mc_config = MonteCarloConfig {
                num_simulations: simulations,
                num_steps: steps,
                seed,
            };
            cmd_price(&contract, mc_config)?;
        }
        Commands::Demo { output, seed } => {
            cmd_demo(output, seed)?;
        }
    }

    Ok(())
}

fn cmd_run(
    input: PathBuf,
    config: BacktestConfig,
    output: Option<PathBuf>,
    metrics_json: Option<PathBuf>,
) -> Result<()> {
    let snapshots = SnapshotLoader::new()
        .load_csv(&input)
        .with_context(|| format!("Failed to load {}", input.display()))?;

    let result = Backtester::new(config)
        .run(&snapshots)
        .context("Backtest failed")?;
    let metrics = MetricsCalculator::calculate(&result).context("Failed to compute metrics")?;

    report(&result, &metrics);

    if let Some(path) = output {
        write_results_csv(&path, &result)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }
    if let Some(path) = metrics_json {
        write_metrics_json(&path, &metrics)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }
    Ok(())
}

fn cmd_price(contract: &ContractParams, mc_config: MonteCarloConfig) -> Result<()> {
    println!("{}", SEPARATOR);
    println!(
        "{} S={} K={} T={} r={} sigma={}",
        contract.option_type,
        contract.spot,
        contract.strike,
        contract.maturity,
        contract.rate,
        contract.volatility
    );
    println!("{}", SEPARATOR);

    match BlackScholes.price(contract) {
        Ok(price) => println!("BSM:         {:.6}", price),
        Err(e) => println!("BSM:         undefined ({})", e),
    }

    let estimate = MonteCarlo::new(mc_config)
        .estimate(contract)
        .context("Monte Carlo pricing failed")?;
    println!(
        "Monte Carlo: {:.6} +/- {:.6} ({} paths)",
        estimate.price, estimate.std_error, estimate.num_simulations
    );
    Ok(())
}

fn cmd_demo(output: Option<PathBuf>, seed: u64) -> Result<()> {
    let snapshots = SampleDataGenerator::new(SampleConfig {
        seed,
        ..Default::default()
    })
    .generate()
    .context("Failed to generate sample data")?;

    let result = Backtester::new(BacktestConfig::default())
        .run(&snapshots)
        .context("Backtest failed")?;
    let metrics = MetricsCalculator::calculate(&result).context("Failed to compute metrics")?;

    report(&result, &metrics);

    if let Some(path) = output {
        write_results_csv(&path, &result)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }
    Ok(())
}

fn report(result: &BacktestResult, metrics: &PerformanceMetrics) {
    println!("{}", SEPARATOR);
    println!("{}", result.summary());
    println!("{}", SEPARATOR);
    for (key, value) in metrics.entries() {
        println!("{}: {}", key, value);
    }
}
