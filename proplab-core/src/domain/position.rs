//! Position — the single open position and its trailing-stop state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::costs::CostBreakdown;

/// Direction of a position or entry intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    pub fn opposite(&self) -> Side {
        match self {
            Side::Long => Side::Short,
            Side::Short => Side::Long,
        }
    }
}

/// The one open position. The engine holds at most one at any time —
/// no hedging, no pyramiding.
///
/// `quantity` is always positive; `side` carries the direction.
/// `trailing_anchor` ratchets to the most favorable price seen since entry
/// (highest high for longs, lowest low for shorts). `trailing_stop` stays
/// `None` until the activation threshold is reached, then only tightens.
#[derive(Debug, Clone)]
pub struct Position {
    pub side: Side,
    pub quantity: f64,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub trailing_anchor: f64,
    pub trailing_stop: Option<f64>,
    pub opened_at_bar: usize,
    pub entry_time: DateTime<Utc>,
    /// Entry-side transaction costs, settled into the trade record at exit.
    pub entry_costs: CostBreakdown,
}

impl Position {
    /// Unrealized P&L at the given mark price.
    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        match self.side {
            Side::Long => (price - self.entry_price) * self.quantity,
            Side::Short => (self.entry_price - price) * self.quantity,
        }
    }

    /// The effective protective stop: the tighter of the fixed stop and the
    /// trailing stop. The trailing stop may only tighten risk, never widen it.
    pub fn effective_stop(&self) -> f64 {
        match (self.side, self.trailing_stop) {
            (Side::Long, Some(trail)) => self.stop_loss.max(trail),
            (Side::Short, Some(trail)) => self.stop_loss.min(trail),
            (_, None) => self.stop_loss,
        }
    }

    /// True when the effective stop comes from the trailing stop rather than
    /// the fixed stop. Decides the exit reason on a stop fill.
    pub fn stop_is_trailing(&self) -> bool {
        match (self.side, self.trailing_stop) {
            (Side::Long, Some(trail)) => trail > self.stop_loss,
            (Side::Short, Some(trail)) => trail < self.stop_loss,
            (_, None) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn long_position() -> Position {
        Position {
            side: Side::Long,
            quantity: 2.0,
            entry_price: 100.0,
            stop_loss: 95.0,
            take_profit: 110.0,
            trailing_anchor: 100.0,
            trailing_stop: None,
            opened_at_bar: 3,
            entry_time: Utc.with_ymd_and_hms(2024, 1, 2, 14, 0, 0).unwrap(),
            entry_costs: CostBreakdown::zero(),
        }
    }

    #[test]
    fn side_opposite() {
        assert_eq!(Side::Long.opposite(), Side::Short);
        assert_eq!(Side::Short.opposite(), Side::Long);
    }

    #[test]
    fn unrealized_pnl_long() {
        let pos = long_position();
        assert_eq!(pos.unrealized_pnl(104.0), 8.0);
        assert_eq!(pos.unrealized_pnl(97.0), -6.0);
    }

    #[test]
    fn unrealized_pnl_short() {
        let mut pos = long_position();
        pos.side = Side::Short;
        assert_eq!(pos.unrealized_pnl(95.0), 10.0);
        assert_eq!(pos.unrealized_pnl(103.0), -6.0);
    }

    #[test]
    fn effective_stop_without_trail_is_fixed() {
        let pos = long_position();
        assert_eq!(pos.effective_stop(), 95.0);
        assert!(!pos.stop_is_trailing());
    }

    #[test]
    fn effective_stop_long_takes_tighter() {
        let mut pos = long_position();
        pos.trailing_stop = Some(98.0);
        assert_eq!(pos.effective_stop(), 98.0);
        assert!(pos.stop_is_trailing());

        // A trailing stop below the fixed stop must not loosen it.
        pos.trailing_stop = Some(90.0);
        assert_eq!(pos.effective_stop(), 95.0);
        assert!(!pos.stop_is_trailing());
    }

    #[test]
    fn effective_stop_short_takes_tighter() {
        let mut pos = long_position();
        pos.side = Side::Short;
        pos.stop_loss = 105.0;
        pos.trailing_stop = Some(102.0);
        assert_eq!(pos.effective_stop(), 102.0);
        assert!(pos.stop_is_trailing());

        pos.trailing_stop = Some(108.0);
        assert_eq!(pos.effective_stop(), 105.0);
        assert!(!pos.stop_is_trailing());
    }
}
