//! Proplab CLI — run backtests and challenge evaluations, sweep grids.
//!
//! Commands:
//! - `run` — execute a backtest from a TOML config and a CSV bar file;
//!   prints the performance report and writes JSON/CSV artifacts
//! - `sweep` — expand (or sample) the parameter grid and rank the results

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use proplab_core::engine::challenge::ChallengeStatus;
use proplab_runner::sweep::{ParamGrid, ParamSweep};
use proplab_runner::{load_feed, run_backtest, save_artifacts, BacktestResult, RunConfig};

#[derive(Parser)]
#[command(name = "proplab", about = "Proplab — prop-firm challenge backtesting engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a backtest (or challenge evaluation) from a TOML config.
    Run {
        /// Path to the TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Path to the CSV bar file (OHLC + indicator columns).
        #[arg(long)]
        data: PathBuf,

        /// Output directory for result artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,

        /// Skip writing artifacts; print the report only.
        #[arg(long, default_value_t = false)]
        no_artifacts: bool,
    },
    /// Sweep the parameter grid over the same data.
    Sweep {
        /// Path to the base TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Path to the CSV bar file.
        #[arg(long)]
        data: PathBuf,

        /// Randomly sample this many grid points instead of the full grid.
        #[arg(long)]
        samples: Option<usize>,

        /// Seed for grid sampling.
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// How many top results to print.
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            data,
            output_dir,
            no_artifacts,
        } => cmd_run(&config, &data, &output_dir, no_artifacts),
        Commands::Sweep {
            config,
            data,
            samples,
            seed,
            top,
        } => cmd_sweep(&config, &data, samples, seed, top),
    }
}

fn load_config(path: &Path) -> Result<RunConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    RunConfig::from_toml(&raw).with_context(|| format!("parsing config {}", path.display()))
}

fn cmd_run(config: &Path, data: &Path, output_dir: &Path, no_artifacts: bool) -> Result<()> {
    let config = load_config(config)?;
    let feed = load_feed(data).with_context(|| format!("loading bars {}", data.display()))?;
    let result = run_backtest(&config, &feed)?;

    print_report(&result);

    if !no_artifacts {
        let json_path = save_artifacts(output_dir, &result)?;
        println!("\nArtifacts written to {}", json_path.display());
    }
    Ok(())
}

fn cmd_sweep(
    config: &Path,
    data: &Path,
    samples: Option<usize>,
    seed: u64,
    top: usize,
) -> Result<()> {
    let base = load_config(config)?;
    let feed = load_feed(data).with_context(|| format!("loading bars {}", data.display()))?;

    let grid = ParamGrid::default_grid();
    let configs = match samples {
        Some(n) => grid.sample(&base, n, seed),
        None => grid.generate_configs(&base),
    };
    println!("Sweeping {} configurations over {} bars...", configs.len(), feed.len());

    let results = ParamSweep::new().sweep(&feed, &configs)?;

    println!(
        "\n{:<6} {:>10} {:>9} {:>9} {:>8} {:>8} {:>7}",
        "rank", "net", "return%", "pf", "win%", "maxdd%", "trades"
    );
    for (rank, result) in results.top_n(top).iter().enumerate() {
        let m = &result.metrics;
        println!(
            "{:<6} {:>10.2} {:>9.2} {:>9.2} {:>8.1} {:>8.2} {:>7}",
            rank + 1,
            m.net_profit,
            m.total_return * 100.0,
            m.profit_factor,
            m.win_rate * 100.0,
            m.max_drawdown * 100.0,
            m.trade_count,
        );
    }
    Ok(())
}

fn print_report(result: &BacktestResult) {
    let m = &result.metrics;
    let initial = result.config.initial_capital;

    println!("{:=^70}", " BACKTEST REPORT ");

    println!("\n{:-^70}", " CAPITAL ");
    println!("  Initial Capital:     ${:>14.2}", initial);
    println!("  Final Equity:        ${:>14.2}", result.final_equity);
    println!("  Net Profit/Loss:     ${:>14.2}", m.net_profit);
    println!("  Total Return:        {:>14.2}%", m.total_return * 100.0);

    println!("\n{:-^70}", " TRADES ");
    println!("  Total Trades:        {:>15}", m.trade_count);
    println!("  Winning Trades:      {:>15}", m.winning_trades);
    println!("  Losing Trades:       {:>15}", m.losing_trades);
    println!("  Win Rate:            {:>14.2}%", m.win_rate * 100.0);

    println!("\n{:-^70}", " PROFITABILITY ");
    println!("  Profit Factor:       {:>15.2}", m.profit_factor);
    println!("  Avg Win:             ${:>14.2}", m.avg_win);
    println!("  Avg Loss:            ${:>14.2}", m.avg_loss);
    println!("  Risk/Reward:         {:>15.2}", m.risk_reward);

    println!("\n{:-^70}", " RISK ");
    println!("  Sharpe Ratio:        {:>15.2}", m.sharpe);
    println!("  Max Drawdown:        {:>14.2}%", m.max_drawdown * 100.0);

    println!("\n{:-^70}", " COSTS ");
    println!("  Total Costs:         ${:>14.2}", m.total_costs);
    println!("  Spread:              ${:>14.2}", m.total_spread_cost);
    println!("  Commission:          ${:>14.2}", m.total_commission);
    println!("  Slippage:            ${:>14.2}", m.total_slippage);

    println!("\n{:-^70}", " EXITS ");
    println!("  Stop Loss:           {:>15}", m.exits.stop_loss);
    println!("  Take Profit:         {:>15}", m.exits.take_profit);
    println!("  Trailing Stop:       {:>15}", m.exits.trailing_stop);
    println!("  Signal Reversal:     {:>15}", m.exits.signal_reversal);
    println!("  Time Exit:           {:>15}", m.exits.time_exit);
    println!("  End of Data:         {:>15}", m.exits.end_of_data);
    println!("  Stop Out:            {:>15}", m.exits.stop_out);

    println!("\n{:-^70}", " DIAGNOSTICS ");
    println!("  Skipped Signals:     {:>15}", result.counters.skipped_signals);
    println!("  Margin Rejected:     {:>15}", result.counters.margin_rejected);
    println!(
        "  Volatility Floors:   {:>15}",
        result.counters.volatility_floor_substitutions
    );

    if let Some(outcome) = &result.challenge {
        println!("\n{:-^70}", " CHALLENGE ");
        let status = match outcome.status {
            ChallengeStatus::Passed => "PASSED".to_string(),
            ChallengeStatus::Failed(reason) => format!("FAILED ({reason:?})"),
            ChallengeStatus::TimedOut => "TIMED OUT".to_string(),
            ChallengeStatus::Running => "INCOMPLETE".to_string(),
        };
        println!("  Status:              {:>15}", status);
        println!("  Terminal Bar:        {:>15}", outcome.terminal_bar);
        println!("  Terminal Time:       {:>15}", outcome.terminal_time.format("%Y-%m-%d %H:%M"));
        println!("  Profit:              {:>14.2}%", outcome.profit_fraction * 100.0);
    }

    println!("\n{:=^70}", "");
}
