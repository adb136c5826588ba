//! ClosedTrade — a completed round-trip trade with its cost breakdown.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::position::Side;

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
    TrailingStop,
    SignalReversal,
    TimeExit,
    EndOfData,
    /// Forced liquidation: margin level fell below the stop-out threshold.
    StopOut,
    /// Forced close when challenge rules reached a terminal state.
    ChallengeExit,
}

/// A completed round-trip trade record: entry -> exit.
///
/// Append-only: the engine never mutates past entries. Cost fields are
/// round-trip totals (entry side plus exit side).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClosedTrade {
    pub side: Side,

    // ── Entry ──
    pub entry_bar: usize,
    pub entry_time: DateTime<Utc>,
    pub entry_price: f64,

    // ── Exit ──
    pub exit_bar: usize,
    pub exit_time: DateTime<Utc>,
    pub exit_price: f64,
    pub exit_reason: ExitReason,

    // ── Size ──
    pub quantity: f64,

    // ── PnL ──
    pub gross_pnl: f64,
    pub spread_cost: f64,
    pub commission: f64,
    pub slippage: f64,
    pub net_pnl: f64,
}

impl ClosedTrade {
    pub fn is_winner(&self) -> bool {
        self.net_pnl > 0.0
    }

    pub fn bars_held(&self) -> usize {
        self.exit_bar.saturating_sub(self.entry_bar)
    }

    /// Return on the trade as a fraction of entry cost.
    pub fn return_pct(&self) -> f64 {
        if self.entry_price == 0.0 || self.quantity == 0.0 {
            return 0.0;
        }
        self.net_pnl / (self.entry_price * self.quantity)
    }
}
