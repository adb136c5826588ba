//! Performance metrics — pure functions over trades and the equity curve.
//!
//! Every metric is a pure function: trade list and/or equity values in,
//! scalar out. Zero/empty behavior is defined once and applied uniformly:
//! - no trades: `win_rate = 0`, `profit_factor = 0`, `risk_reward = 0`
//! - zero gross loss with profits: `profit_factor = +inf`
//! - zero return variance: `sharpe = 0`
//! - flat/empty/rising curve: `max_drawdown = 0`
//!
//! A completed run always yields a full metrics record, even with zero
//! trades, so reporting never special-cases the empty run.

use serde::{Deserialize, Serialize};

use proplab_core::domain::{equity_values, ClosedTrade, EquityPoint, ExitReason};

/// Trading periods per year used for annualization.
const PERIODS_PER_YEAR: f64 = 252.0;

/// Exit-reason breakdown of a trade list.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ExitCounts {
    pub stop_loss: usize,
    pub take_profit: usize,
    pub trailing_stop: usize,
    pub signal_reversal: usize,
    pub time_exit: usize,
    pub end_of_data: usize,
    pub stop_out: usize,
    pub challenge_exit: usize,
}

impl ExitCounts {
    pub fn tally(trades: &[ClosedTrade]) -> Self {
        let mut counts = Self::default();
        for trade in trades {
            match trade.exit_reason {
                ExitReason::StopLoss => counts.stop_loss += 1,
                ExitReason::TakeProfit => counts.take_profit += 1,
                ExitReason::TrailingStop => counts.trailing_stop += 1,
                ExitReason::SignalReversal => counts.signal_reversal += 1,
                ExitReason::TimeExit => counts.time_exit += 1,
                ExitReason::EndOfData => counts.end_of_data += 1,
                ExitReason::StopOut => counts.stop_out += 1,
                ExitReason::ChallengeExit => counts.challenge_exit += 1,
            }
        }
        counts
    }
}

/// Aggregate performance metrics for a single run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetrics {
    pub total_return: f64,
    pub net_profit: f64,

    pub trade_count: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate: f64,

    pub gross_profit: f64,
    pub gross_loss: f64,
    /// May be +inf (profits, zero losses); persists as null in JSON.
    #[serde(with = "maybe_infinite")]
    pub profit_factor: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    /// May be +inf (wins, zero losses); persists as null in JSON.
    #[serde(with = "maybe_infinite")]
    pub risk_reward: f64,

    pub max_drawdown: f64,
    pub sharpe: f64,

    pub total_spread_cost: f64,
    pub total_commission: f64,
    pub total_slippage: f64,
    pub total_costs: f64,

    pub exits: ExitCounts,
}

impl RunMetrics {
    /// Compute all metrics from the trade list and equity curve.
    pub fn compute(trades: &[ClosedTrade], curve: &[EquityPoint], initial_capital: f64) -> Self {
        let equity = equity_values(curve);

        let gross_profit: f64 = trades
            .iter()
            .filter(|t| t.net_pnl > 0.0)
            .map(|t| t.net_pnl)
            .sum();
        let gross_loss: f64 = trades
            .iter()
            .filter(|t| t.net_pnl < 0.0)
            .map(|t| t.net_pnl.abs())
            .sum();

        let winning_trades = trades.iter().filter(|t| t.is_winner()).count();
        let losing_trades = trades.iter().filter(|t| t.net_pnl < 0.0).count();

        let total_spread_cost: f64 = trades.iter().map(|t| t.spread_cost).sum();
        let total_commission: f64 = trades.iter().map(|t| t.commission).sum();
        let total_slippage: f64 = trades.iter().map(|t| t.slippage).sum();

        let net_profit: f64 = trades.iter().map(|t| t.net_pnl).sum();

        Self {
            total_return: if initial_capital > 0.0 {
                net_profit / initial_capital
            } else {
                0.0
            },
            net_profit,
            trade_count: trades.len(),
            winning_trades,
            losing_trades,
            win_rate: win_rate(trades),
            gross_profit,
            gross_loss,
            profit_factor: profit_factor(trades),
            avg_win: if winning_trades > 0 {
                gross_profit / winning_trades as f64
            } else {
                0.0
            },
            avg_loss: if losing_trades > 0 {
                gross_loss / losing_trades as f64
            } else {
                0.0
            },
            risk_reward: risk_reward(trades),
            max_drawdown: max_drawdown(&equity),
            sharpe: sharpe_ratio(&equity),
            total_spread_cost,
            total_commission,
            total_slippage,
            total_costs: total_spread_cost + total_commission + total_slippage,
            exits: ExitCounts::tally(trades),
        }
    }
}

/// JSON has no Infinity: non-finite ratios persist as null and load back
/// as +inf (the only non-finite value the metrics produce).
mod maybe_infinite {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else {
            serializer.serialize_none()
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::INFINITY))
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Win rate: fraction of trades with positive net P&L. Zero with no trades.
pub fn win_rate(trades: &[ClosedTrade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let winners = trades.iter().filter(|t| t.is_winner()).count();
    winners as f64 / trades.len() as f64
}

/// Profit factor: gross profit / gross loss.
///
/// `+inf` when there are profits and no losses; `0.0` when there are no
/// trades or no profits.
pub fn profit_factor(trades: &[ClosedTrade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let gross_profit: f64 = trades
        .iter()
        .filter(|t| t.net_pnl > 0.0)
        .map(|t| t.net_pnl)
        .sum();
    let gross_loss: f64 = trades
        .iter()
        .filter(|t| t.net_pnl < 0.0)
        .map(|t| t.net_pnl.abs())
        .sum();

    if gross_loss < 1e-12 {
        return if gross_profit > 0.0 { f64::INFINITY } else { 0.0 };
    }
    gross_profit / gross_loss
}

/// Risk:reward ratio: average win / average loss.
///
/// `+inf` when there are wins and no losses; `0.0` otherwise degenerate.
pub fn risk_reward(trades: &[ClosedTrade]) -> f64 {
    let wins: Vec<f64> = trades
        .iter()
        .filter(|t| t.net_pnl > 0.0)
        .map(|t| t.net_pnl)
        .collect();
    let losses: Vec<f64> = trades
        .iter()
        .filter(|t| t.net_pnl < 0.0)
        .map(|t| t.net_pnl.abs())
        .collect();

    if wins.is_empty() {
        return 0.0;
    }
    if losses.is_empty() {
        return f64::INFINITY;
    }
    let avg_win = wins.iter().sum::<f64>() / wins.len() as f64;
    let avg_loss = losses.iter().sum::<f64>() / losses.len() as f64;
    if avg_loss < 1e-12 {
        return f64::INFINITY;
    }
    avg_win / avg_loss
}

/// Maximum drawdown as a positive fraction of the running peak
/// (0.15 = a 15% drawdown). Zero for flat, rising, or empty curves.
pub fn max_drawdown(equity: &[f64]) -> f64 {
    if equity.len() < 2 {
        return 0.0;
    }
    let mut peak = equity[0];
    let mut max_dd = 0.0_f64;

    for &eq in equity {
        if eq > peak {
            peak = eq;
        }
        if peak > 0.0 {
            let dd = (peak - eq) / peak;
            if dd > max_dd {
                max_dd = dd;
            }
        }
    }
    max_dd
}

/// Annualized Sharpe ratio from per-bar returns.
///
/// `sharpe = mean(returns) / std(returns) * sqrt(252)`. Zero when the
/// variance is zero or there are fewer than two points.
pub fn sharpe_ratio(equity: &[f64]) -> f64 {
    let returns = bar_returns(equity);
    if returns.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(&returns);
    let std = std_dev(&returns);
    if std < 1e-15 {
        return 0.0;
    }
    (mean / std) * PERIODS_PER_YEAR.sqrt()
}

/// Per-bar simple returns from an equity curve.
pub fn bar_returns(equity: &[f64]) -> Vec<f64> {
    if equity.len() < 2 {
        return Vec::new();
    }
    equity
        .windows(2)
        .map(|w| if w[0] > 0.0 { (w[1] - w[0]) / w[0] } else { 0.0 })
        .collect()
}

pub(crate) fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}
