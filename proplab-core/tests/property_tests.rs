//! Property tests for simulator invariants.
//!
//! 1. Equity identity — final equity equals initial capital plus the sum of
//!    net P&L, with zero unrealized exposure at the end.
//! 2. Single position — the trade log strictly alternates open/close with
//!    no overlapping bar ranges.
//! 3. Trailing ratchet — the effective stop only tightens.

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;

use proplab_core::domain::{Bar, Position, Side};
use proplab_core::engine::costs::{CostModel, CostParams};
use proplab_core::engine::{SimulatorConfig, TradeSimulator};
use proplab_core::feed::IndicatorFeed;
use proplab_core::indicators::IndicatorValues;
use proplab_core::signals::{EntryIntent, SignalGenerator};
use proplab_core::sizers::RiskSizer;

/// Build a sane bar path from a seed walk of per-bar deltas.
fn bars_from_walk(deltas: &[f64]) -> Vec<Bar> {
    let start = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    let mut close = 100.0_f64;
    let mut prev_close = close;
    deltas
        .iter()
        .enumerate()
        .map(|(i, &delta)| {
            close = (close + delta).max(5.0);
            let open = prev_close;
            let high = open.max(close) + 0.4;
            let low = (open.min(close) - 0.4).max(1.0);
            prev_close = close;
            Bar {
                timestamp: start + Duration::hours(i as i64),
                open,
                high,
                low,
                close,
            }
        })
        .collect()
}

/// Fires alternating long/short intents every `period` bars.
struct Periodic {
    period: usize,
}

impl SignalGenerator for Periodic {
    fn name(&self) -> &str {
        "periodic"
    }

    fn warmup_bars(&self) -> usize {
        1
    }

    fn evaluate(
        &self,
        bars: &[Bar],
        bar_index: usize,
        _indicators: &IndicatorValues,
    ) -> Option<EntryIntent> {
        if bar_index == 0 || bar_index % self.period != 0 {
            return None;
        }
        let direction = if (bar_index / self.period) % 2 == 0 {
            Side::Long
        } else {
            Side::Short
        };
        let close = bars[bar_index].close;
        Some(EntryIntent::from_volatility(
            direction,
            bar_index,
            close,
            close * 0.02,
            1.5,
            3.0,
        ))
    }
}

fn run_walk(deltas: &[f64], period: usize, costs: CostModel) -> proplab_core::engine::RunResult {
    let bars = bars_from_walk(deltas);
    let n = bars.len();
    let mut iv = IndicatorValues::new();
    iv.insert(
        "atr",
        bars.iter().map(|b| (b.close * 0.02).max(0.1)).collect::<Vec<_>>(),
    );
    let feed = IndicatorFeed::new(bars, iv).unwrap();
    let signal = Periodic { period };
    let sim = TradeSimulator::new(
        &feed,
        &signal,
        RiskSizer::new(0.02, 1.0),
        costs,
        SimulatorConfig::default(),
    );
    let result = sim.run();
    assert_eq!(result.equity_curve.len(), n);
    result
}

proptest! {
    /// final equity == initial capital + sum(net_pnl), for any walk,
    /// frictionless or with realistic costs.
    #[test]
    fn equity_identity_holds(
        deltas in prop::collection::vec(-3.0..3.0_f64, 10..120),
        period in 2..8_usize,
        with_costs in prop::bool::ANY,
    ) {
        let costs = if with_costs {
            CostModel::Realistic(CostParams {
                spread_per_unit: 0.05,
                commission_per_lot: 2.0,
                slippage_per_unit: 0.01,
                leverage: 100.0,
                min_lot: 0.01,
                lot_units: 1.0,
                margin_usage_cap: 0.9,
                stop_out_level: 0.05,
                floor_to_min_lot: false,
            })
        } else {
            CostModel::frictionless()
        };
        let result = run_walk(&deltas, period, costs);

        let total: f64 = result.trades.iter().map(|t| t.net_pnl).sum();
        prop_assert!(
            (result.final_equity - (10_000.0 + total)).abs() < 1e-6,
            "identity violated: final {} vs expected {}",
            result.final_equity,
            10_000.0 + total
        );
    }

    /// Trades never overlap: strictly alternating open/close, each entry
    /// after the previous exit (no same-bar re-entry).
    #[test]
    fn trades_never_overlap(
        deltas in prop::collection::vec(-3.0..3.0_f64, 10..120),
        period in 2..8_usize,
    ) {
        let result = run_walk(&deltas, period, CostModel::frictionless());

        for window in result.trades.windows(2) {
            prop_assert!(
                window[1].entry_bar > window[0].exit_bar,
                "trade opened at bar {} before the previous one closed at bar {}",
                window[1].entry_bar,
                window[0].exit_bar
            );
        }
        for trade in &result.trades {
            prop_assert!(trade.exit_bar >= trade.entry_bar);
            prop_assert!(trade.net_pnl.is_finite());
            prop_assert!(trade.quantity > 0.0);
        }
    }

    /// Equity marks are finite everywhere and fully realized at the end.
    #[test]
    fn equity_curve_is_finite(
        deltas in prop::collection::vec(-3.0..3.0_f64, 10..80),
        period in 2..6_usize,
    ) {
        let result = run_walk(&deltas, period, CostModel::frictionless());
        for point in &result.equity_curve {
            prop_assert!(point.equity.is_finite());
        }
        prop_assert_eq!(
            result.equity_curve.last().unwrap().equity,
            result.final_equity
        );
    }
}

// ── Trailing ratchet ─────────────────────────────────────────────────

proptest! {
    /// For longs, applying the engine's ratchet rule over arbitrary raw
    /// trail levels yields a non-decreasing effective stop.
    #[test]
    fn ratchet_long_effective_stop_never_loosens(
        raw_trails in prop::collection::vec(50.0..150.0_f64, 1..30),
    ) {
        let mut pos = Position {
            side: Side::Long,
            quantity: 10.0,
            entry_price: 100.0,
            stop_loss: 90.0,
            take_profit: 200.0,
            trailing_anchor: 100.0,
            trailing_stop: None,
            opened_at_bar: 0,
            entry_time: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
            entry_costs: proplab_core::engine::costs::CostBreakdown::zero(),
        };

        let mut last = pos.effective_stop();
        for raw in raw_trails {
            pos.trailing_stop = Some(match pos.trailing_stop {
                Some(t) => t.max(raw),
                None => raw,
            });
            let effective = pos.effective_stop();
            prop_assert!(
                effective >= last,
                "long effective stop loosened: {effective} < {last}"
            );
            last = effective;
        }
    }

    /// For shorts, the effective stop is non-increasing.
    #[test]
    fn ratchet_short_effective_stop_never_loosens(
        raw_trails in prop::collection::vec(50.0..150.0_f64, 1..30),
    ) {
        let mut pos = Position {
            side: Side::Short,
            quantity: 10.0,
            entry_price: 100.0,
            stop_loss: 110.0,
            take_profit: 20.0,
            trailing_anchor: 100.0,
            trailing_stop: None,
            opened_at_bar: 0,
            entry_time: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
            entry_costs: proplab_core::engine::costs::CostBreakdown::zero(),
        };

        let mut last = pos.effective_stop();
        for raw in raw_trails {
            pos.trailing_stop = Some(match pos.trailing_stop {
                Some(t) => t.min(raw),
                None => raw,
            });
            let effective = pos.effective_stop();
            prop_assert!(
                effective <= last,
                "short effective stop loosened: {effective} > {last}"
            );
            last = effective;
        }
    }
}
