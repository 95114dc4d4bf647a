//! Backtest CLI
//!
//! Runs candle backtests from a config file or `BACKTEST_*` environment variables.

use std::path::PathBuf;

use anyhow::{Context, Result};
use backtester::{
    export, load_candles, performance_rating, AtrSignalSource, BacktestResult, BacktestRunner,
};
use clap::{Args, Parser, Subcommand};
use market_core::BacktestConfig;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "backtest-cli", about = "Candle strategy backtester")]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a backtest over a candle file
    Run(RunArgs),
    /// List the built-in strategies
    Strategies,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Path to CSV or JSON candle data
    #[arg(long)]
    candles: PathBuf,

    /// Config file (TOML/JSON/YAML); environment only if omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Strategy to run, overriding the config
    #[arg(long)]
    strategy: Option<String>,

    /// Evaluate these strategies in parallel (comma-separated)
    #[arg(long, value_delimiter = ',')]
    strategies: Vec<String>,

    /// Run walk-forward analysis
    #[arg(long)]
    walk_forward: bool,

    /// Attach Monte Carlo resampling
    #[arg(long)]
    monte_carlo: bool,

    /// Attach stress scenarios
    #[arg(long)]
    stress_test: bool,

    /// Scale out at each target
    #[arg(long)]
    partial_exits: bool,

    /// Seed for reproducible Monte Carlo runs
    #[arg(long)]
    seed: Option<u64>,

    /// Write the full result as JSON
    #[arg(long)]
    output_json: Option<PathBuf>,

    /// Write the trade ledger as CSV
    #[arg(long)]
    output_csv: Option<PathBuf>,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "backtest_cli=info,backtester=info".into()),
        )
        .with(cli.json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!cli.json_logs).then(tracing_subscriber::fmt::layer))
        .init();

    match cli.command {
        Command::Run(args) => run(args),
        Command::Strategies => {
            for name in AtrSignalSource::default().strategies() {
                println!("{}", name);
            }
            Ok(())
        }
    }
}

fn run(args: RunArgs) -> Result<()> {
    let config = load_config(&args)?;

    let candles = load_candles(&args.candles)
        .with_context(|| format!("Failed to load candles from {}", args.candles.display()))?;

    let source = AtrSignalSource::default();
    let runner = BacktestRunner::new(config, &source);
    let result = runner.run(&candles).context("Backtest failed")?;

    print_summary(&result);

    if let Some(path) = &args.output_json {
        export::write_json(&result, path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }
    if let Some(path) = &args.output_csv {
        export::write_csv(&result, path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }

    Ok(())
}

fn load_config(args: &RunArgs) -> Result<BacktestConfig> {
    let mut config = match &args.config {
        Some(path) => BacktestConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => BacktestConfig::from_env().context("Failed to load config from environment")?,
    };

    if let Some(strategy) = &args.strategy {
        config.strategy = strategy.clone();
    }
    if !args.strategies.is_empty() {
        config.strategies = args.strategies.clone();
        config.enable_parallel = true;
    }
    config.use_walk_forward |= args.walk_forward;
    config.enable_monte_carlo |= args.monte_carlo;
    config.enable_stress_test |= args.stress_test;
    config.enable_partial_exits |= args.partial_exits;
    if args.seed.is_some() {
        config.monte_carlo_seed = args.seed;
    }

    info!(
        symbol = %config.symbol,
        interval = %config.interval,
        strategy = %config.strategy,
        "Loaded configuration"
    );
    Ok(config)
}

fn print_summary(result: &BacktestResult) {
    println!("Strategy:       {}", result.strategy_name);
    println!("Rating:         {}", performance_rating(result));
    println!("Trades:         {} ({} won, {} lost)", result.total_trades, result.winning_trades, result.losing_trades);
    println!("Win rate:       {:.2}%", result.win_rate);
    println!("Return:         {:.2}%", result.return_percent);
    println!("Profit factor:  {:.2}", result.profit_factor);
    println!("Max drawdown:   {:.2}%", result.max_drawdown);
    println!("Sharpe:         {:.2}", result.sharpe_ratio);
    println!("Final balance:  {:.2}", result.final_balance);
    println!("Duration:       {}", result.duration);

    if let Some(mc) = &result.monte_carlo {
        println!(
            "Monte Carlo:    mean {:.2}%, 5th {:.2}%, 95th {:.2}%, ruin {:.1}%",
            mc.mean_return, mc.percentile_5, mc.percentile_95, mc.probability_ruin
        );
    }
    if let Some(wf) = &result.walk_forward {
        println!(
            "Walk-forward:   {} periods, out-of-sample win rate {:.2}%, consistency {:.1}",
            wf.periods.len(),
            wf.out_of_sample_win_rate,
            wf.consistency
        );
    }
    if let Some(st) = &result.stress_test {
        println!(
            "Stress:         high vol {:.2}%, low vol {:.2}%, crash {:.2}%, rally {:.2}%",
            st.high_volatility_return,
            st.low_volatility_return,
            st.crash_scenario_return,
            st.rally_scenario_return
        );
    }
}
