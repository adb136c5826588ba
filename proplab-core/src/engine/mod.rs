//! Trade simulation — the bar-by-bar single-position state machine.
//!
//! One pass per bar, exits strictly before entries, at most one open
//! position at any time. Exit precedence inside a bar:
//!
//! 1. stop-out (forced liquidation, margin-aware cost models only)
//! 2. effective stop (fixed stop vs. trailing stop, whichever is tighter)
//! 3. take-profit
//! 4. signal reversal (policy flag)
//! 5. time exit (optional holding-period cap)
//!
//! When both the stop and the target sit inside a bar's range, the stop
//! fires — OHLC bars cannot order intrabar prices, so the engine assumes the
//! adverse path. A position closed this bar is never replaced within the
//! same bar.

pub mod challenge;
pub mod costs;

use serde::{Deserialize, Serialize};

use crate::domain::{Bar, ClosedTrade, EquityPoint, ExitReason, Position, Side};
use crate::feed::IndicatorFeed;
use crate::signals::{EntryIntent, SignalGenerator};
use crate::sizers::RiskSizer;

use self::challenge::{ChallengeOutcome, ChallengeRules, ChallengeTracker};
use self::costs::CostModel;

/// Simulator-level parameters (trailing stop management, exit policies).
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    pub initial_capital: f64,
    /// Indicator column holding the volatility unit (e.g. "atr").
    pub volatility_key: String,
    /// Trailing stop distance in volatility units from the anchor.
    pub trail_mult: f64,
    /// Favorable move (in volatility units from entry) before the trailing
    /// stop arms.
    pub trail_activation_mult: f64,
    /// Close on an opposite-direction signal vote.
    pub allow_signal_reversal_exit: bool,
    /// Optional holding-period cap in bars.
    pub max_holding_bars: Option<usize>,
    /// Floor for broken volatility values, as a fraction of the close.
    pub volatility_floor_fraction: f64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            initial_capital: 10_000.0,
            volatility_key: "atr".to_string(),
            trail_mult: 2.5,
            trail_activation_mult: 1.0,
            allow_signal_reversal_exit: true,
            max_holding_bars: None,
            volatility_floor_fraction: 0.01,
        }
    }
}

/// Diagnostic counters accumulated over a run.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RunCounters {
    /// Signals dropped by fail-closed sizing or lot rounding.
    pub skipped_signals: u32,
    /// Entries rejected by the margin gate.
    pub margin_rejected: u32,
    /// Bars where a broken volatility value was floored.
    pub volatility_floor_substitutions: u32,
}

/// Everything a single simulation run produces.
#[derive(Debug, Clone)]
pub struct RunResult {
    pub trades: Vec<ClosedTrade>,
    pub equity_curve: Vec<EquityPoint>,
    pub final_equity: f64,
    pub counters: RunCounters,
    /// Present when the run was wrapped in challenge rules.
    pub challenge: Option<ChallengeOutcome>,
}

/// Mutable run state threaded through the bar loop.
struct SimState {
    cash: f64,
    position: Option<Position>,
    trades: Vec<ClosedTrade>,
    equity: Vec<EquityPoint>,
    counters: RunCounters,
}

impl SimState {
    fn new(initial_capital: f64) -> Self {
        Self {
            cash: initial_capital,
            position: None,
            trades: Vec::new(),
            equity: Vec::new(),
            counters: RunCounters::default(),
        }
    }
}

/// The single-position trade simulator.
///
/// Deterministic: the same feed and configuration always produce the same
/// trades and equity curve. Owns no shared state, so independent instances
/// can run in parallel without synchronization.
pub struct TradeSimulator<'a> {
    feed: &'a IndicatorFeed,
    signal: &'a dyn SignalGenerator,
    sizer: RiskSizer,
    costs: CostModel,
    config: SimulatorConfig,
}

impl<'a> TradeSimulator<'a> {
    pub fn new(
        feed: &'a IndicatorFeed,
        signal: &'a dyn SignalGenerator,
        sizer: RiskSizer,
        costs: CostModel,
        config: SimulatorConfig,
    ) -> Self {
        assert!(config.initial_capital > 0.0, "initial_capital must be positive");
        assert!(config.trail_mult > 0.0, "trail_mult must be positive");
        assert!(
            config.trail_activation_mult >= 0.0,
            "trail_activation_mult must be non-negative"
        );
        assert!(
            config.volatility_floor_fraction > 0.0,
            "volatility_floor_fraction must be positive"
        );
        Self {
            feed,
            signal,
            sizer,
            costs,
            config,
        }
    }

    /// Run the full bar range.
    pub fn run(&self) -> RunResult {
        self.run_internal(None)
    }

    /// Run under challenge rules; stops at the first terminal state.
    pub fn run_challenge(&self, rules: ChallengeRules) -> RunResult {
        self.run_internal(Some(rules))
    }

    fn run_internal(&self, rules: Option<ChallengeRules>) -> RunResult {
        let bars = self.feed.bars();
        let mut state = SimState::new(self.config.initial_capital);
        let mut tracker = rules.map(|r| ChallengeTracker::new(r, self.config.initial_capital));
        let mut challenge = None;

        for (i, bar) in bars.iter().enumerate() {
            self.process_bar(&mut state, i, bar);

            if let Some(tracker) = tracker.as_mut() {
                let equity = state.equity.last().map(|p| p.equity).unwrap_or(state.cash);
                let status = tracker.on_bar(bar.timestamp, equity, state.trades.len());
                if status.is_terminal() {
                    if let Some(pos) = state.position.take() {
                        self.close_position(
                            &mut state,
                            pos,
                            i,
                            bar,
                            bar.close,
                            ExitReason::ChallengeExit,
                        );
                        if let Some(last) = state.equity.last_mut() {
                            last.equity = state.cash;
                        }
                    }
                    challenge = Some(ChallengeOutcome {
                        status,
                        terminal_bar: i,
                        terminal_time: bar.timestamp,
                        profit_fraction: tracker.profit_fraction(state.cash),
                    });
                    break;
                }
            }
        }

        // End of data: no dangling unrealized exposure.
        if let Some(pos) = state.position.take() {
            let last_index = bars.len() - 1;
            let last_bar = &bars[last_index];
            self.close_position(
                &mut state,
                pos,
                last_index,
                last_bar,
                last_bar.close,
                ExitReason::EndOfData,
            );
            if let Some(last) = state.equity.last_mut() {
                last.equity = state.cash;
            }
        }

        let final_equity = state.equity.last().map(|p| p.equity).unwrap_or(state.cash);
        RunResult {
            trades: state.trades,
            equity_curve: state.equity,
            final_equity,
            counters: state.counters,
            challenge,
        }
    }

    fn process_bar(&self, state: &mut SimState, i: usize, bar: &Bar) {
        let was_open = state.position.is_some();

        if was_open {
            self.manage_position(state, i, bar);
        } else if let Some(intent) = self.signal.evaluate(self.feed.bars(), i, self.feed.indicators())
        {
            self.try_open(state, i, bar, intent);
        }

        let unrealized = state
            .position
            .as_ref()
            .map_or(0.0, |p| p.unrealized_pnl(bar.close));
        state.equity.push(EquityPoint {
            bar_index: i,
            timestamp: bar.timestamp,
            equity: state.cash + unrealized,
        });
    }

    /// Exit logic for an open position, in priority order.
    fn manage_position(&self, state: &mut SimState, i: usize, bar: &Bar) {
        let volatility = self.volatility_at(&mut state.counters, i, bar.close);
        let cash = state.cash;

        let decision = {
            let Some(pos) = state.position.as_mut() else {
                return;
            };
            let mut decision: Option<(f64, ExitReason)> = None;

            // Stop-out overrides every other exit rule.
            if let Some(level) = self.costs.stop_out_level() {
                let margin = self.costs.required_margin(pos.quantity, bar.close);
                if margin > 0.0 && (cash + pos.unrealized_pnl(bar.close)) / margin < level {
                    decision = Some((bar.close, ExitReason::StopOut));
                }
            }

            if decision.is_none() {
                // Ratchet the anchor to the most favorable price seen.
                match pos.side {
                    Side::Long => pos.trailing_anchor = pos.trailing_anchor.max(bar.high),
                    Side::Short => pos.trailing_anchor = pos.trailing_anchor.min(bar.low),
                }

                // Arm and advance the trailing stop once the activation
                // threshold is cleared. The stop only ever tightens.
                let activation = self.config.trail_activation_mult * volatility;
                let armed = match pos.side {
                    Side::Long => pos.trailing_anchor >= pos.entry_price + activation,
                    Side::Short => pos.trailing_anchor <= pos.entry_price - activation,
                };
                if armed {
                    let raw = match pos.side {
                        Side::Long => pos.trailing_anchor - self.config.trail_mult * volatility,
                        Side::Short => pos.trailing_anchor + self.config.trail_mult * volatility,
                    };
                    pos.trailing_stop = Some(match (pos.side, pos.trailing_stop) {
                        (Side::Long, Some(t)) => t.max(raw),
                        (Side::Short, Some(t)) => t.min(raw),
                        (_, None) => raw,
                    });
                }

                let stop = pos.effective_stop();
                let (stop_hit, target_hit) = match pos.side {
                    Side::Long => (bar.low <= stop, bar.high >= pos.take_profit),
                    Side::Short => (bar.high >= stop, bar.low <= pos.take_profit),
                };

                if stop_hit {
                    // A bar that gaps through the level fills at the open.
                    let fill = match pos.side {
                        Side::Long if bar.open < stop => bar.open,
                        Side::Short if bar.open > stop => bar.open,
                        _ => stop,
                    };
                    let reason = if pos.stop_is_trailing() {
                        ExitReason::TrailingStop
                    } else {
                        ExitReason::StopLoss
                    };
                    decision = Some((fill, reason));
                } else if target_hit {
                    let fill = match pos.side {
                        Side::Long if bar.open > pos.take_profit => bar.open,
                        Side::Short if bar.open < pos.take_profit => bar.open,
                        _ => pos.take_profit,
                    };
                    decision = Some((fill, ExitReason::TakeProfit));
                } else if self.config.allow_signal_reversal_exit {
                    if let Some(intent) =
                        self.signal.evaluate(self.feed.bars(), i, self.feed.indicators())
                    {
                        if intent.direction == pos.side.opposite() {
                            decision = Some((bar.close, ExitReason::SignalReversal));
                        }
                    }
                }

                if decision.is_none() {
                    if let Some(max_hold) = self.config.max_holding_bars {
                        if i.saturating_sub(pos.opened_at_bar) >= max_hold {
                            decision = Some((bar.close, ExitReason::TimeExit));
                        }
                    }
                }
            }

            decision
        };

        if let Some((price, reason)) = decision {
            let Some(pos) = state.position.take() else {
                return;
            };
            self.close_position(state, pos, i, bar, price, reason);
        }
    }

    /// Entry pipeline: sizer, lot grid, margin gate, open.
    fn try_open(&self, state: &mut SimState, i: usize, bar: &Bar, intent: EntryIntent) {
        let Some(sized) = self.sizer.size(&intent, state.cash) else {
            state.counters.skipped_signals += 1;
            log::debug!("bar {i}: signal skipped (degenerate sizing)");
            return;
        };

        let Some(quantity) = self.costs.round_to_lot(sized.quantity) else {
            state.counters.skipped_signals += 1;
            log::debug!("bar {i}: signal skipped (size below minimum lot)");
            return;
        };

        let entry_costs = self.costs.costs(quantity, true);
        if !self
            .costs
            .margin_allows(quantity, intent.reference_price, entry_costs.total, state.cash)
        {
            state.counters.margin_rejected += 1;
            log::debug!("bar {i}: entry rejected (margin cap)");
            return;
        }

        state.cash -= entry_costs.total;
        state.position = Some(Position {
            side: intent.direction,
            quantity,
            entry_price: intent.reference_price,
            stop_loss: sized.stop_loss,
            take_profit: sized.take_profit,
            trailing_anchor: intent.reference_price,
            trailing_stop: None,
            opened_at_bar: i,
            entry_time: bar.timestamp,
            entry_costs,
        });
    }

    fn close_position(
        &self,
        state: &mut SimState,
        pos: Position,
        exit_bar: usize,
        bar: &Bar,
        exit_price: f64,
        exit_reason: ExitReason,
    ) {
        let gross_pnl = pos.unrealized_pnl(exit_price);
        let exit_costs = self.costs.costs(pos.quantity, false);
        let net_pnl = gross_pnl - pos.entry_costs.total - exit_costs.total;

        state.cash += gross_pnl - exit_costs.total;
        state.trades.push(ClosedTrade {
            side: pos.side,
            entry_bar: pos.opened_at_bar,
            entry_time: pos.entry_time,
            entry_price: pos.entry_price,
            exit_bar,
            exit_time: bar.timestamp,
            exit_price,
            exit_reason,
            quantity: pos.quantity,
            gross_pnl,
            spread_cost: pos.entry_costs.spread_cost + exit_costs.spread_cost,
            commission: pos.entry_costs.commission + exit_costs.commission,
            slippage: pos.entry_costs.slippage + exit_costs.slippage,
            net_pnl,
        });
    }

    /// Volatility unit at a bar, floored when the column is broken.
    fn volatility_at(&self, counters: &mut RunCounters, i: usize, close: f64) -> f64 {
        match self
            .feed
            .indicators()
            .get(&self.config.volatility_key, i)
        {
            Some(v) if v.is_finite() && v > 0.0 => v,
            raw => {
                let floor = close * self.config.volatility_floor_fraction;
                counters.volatility_floor_substitutions += 1;
                log::warn!(
                    "bar {i}: volatility column '{}' unusable ({raw:?}); flooring to {floor}",
                    self.config.volatility_key
                );
                floor
            }
        }
    }
}
