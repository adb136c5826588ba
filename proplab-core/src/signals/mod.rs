//! Signal generation — maps a bar index to an optional directional entry intent.
//!
//! Signals are account-agnostic: they receive bar history and indicator
//! values, never equity or position state. Implementations may only read
//! indices `<= bar_index` — reading ahead is look-ahead bias and a defect.

pub mod ema_crossover;
pub mod macd_cross;
pub mod rsi_reversal;

pub use ema_crossover::EmaCrossover;
pub use macd_cross::MacdCross;
pub use rsi_reversal::RsiReversal;

use crate::domain::{Bar, Side};
use crate::indicators::IndicatorValues;

/// A directional entry intent for a single bar.
///
/// Ephemeral: produced by a generator for one bar, consumed immediately by
/// the sizer or discarded. Stop and target are derived from the volatility
/// unit at the signal bar; the sizer and simulator consume them as-is.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntryIntent {
    pub direction: Side,
    pub bar_index: usize,
    pub reference_price: f64,
    pub suggested_stop: f64,
    pub suggested_target: f64,
    /// Volatility unit (e.g. an ATR value) the levels were derived from.
    pub volatility: f64,
}

impl EntryIntent {
    /// Build an intent with stop/target at `reference ∓/± mult × volatility`.
    pub fn from_volatility(
        direction: Side,
        bar_index: usize,
        reference_price: f64,
        volatility: f64,
        stop_mult: f64,
        target_mult: f64,
    ) -> Self {
        let (suggested_stop, suggested_target) = match direction {
            Side::Long => (
                reference_price - stop_mult * volatility,
                reference_price + target_mult * volatility,
            ),
            Side::Short => (
                reference_price + stop_mult * volatility,
                reference_price - target_mult * volatility,
            ),
        };
        Self {
            direction,
            bar_index,
            reference_price,
            suggested_stop,
            suggested_target,
            volatility,
        }
    }
}

/// Stop/target level parameters shared by the concrete generators.
#[derive(Debug, Clone)]
pub struct LevelParams {
    /// Indicator column holding the volatility unit (e.g. "atr").
    pub volatility_key: String,
    pub stop_mult: f64,
    pub target_mult: f64,
}

impl LevelParams {
    pub fn new(volatility_key: impl Into<String>, stop_mult: f64, target_mult: f64) -> Self {
        assert!(stop_mult > 0.0, "stop_mult must be positive");
        assert!(target_mult > 0.0, "target_mult must be positive");
        Self {
            volatility_key: volatility_key.into(),
            stop_mult,
            target_mult,
        }
    }

    /// Fetch the volatility unit at a bar; `None` on missing/NaN/non-positive
    /// values — a signal does not fire on broken volatility data.
    pub(crate) fn volatility_at(
        &self,
        indicators: &IndicatorValues,
        bar_index: usize,
    ) -> Option<f64> {
        match indicators.get(&self.volatility_key, bar_index) {
            Some(v) if v.is_finite() && v > 0.0 => Some(v),
            _ => None,
        }
    }
}

impl Default for LevelParams {
    fn default() -> Self {
        Self::new("atr", 1.5, 3.0)
    }
}

/// Trait for signal generators.
///
/// # Architecture invariant
/// Generators never see equity or position state — the signature admits only
/// bar history and precomputed indicator values, and only indices
/// `<= bar_index` may be read.
pub trait SignalGenerator: Send + Sync {
    /// Human-readable name (e.g., "ema_crossover").
    fn name(&self) -> &str;

    /// Number of bars needed before this generator can produce output.
    fn warmup_bars(&self) -> usize;

    /// Evaluate at `bar_index`. Returns `Some(EntryIntent)` if the rule
    /// fires, `None` otherwise.
    fn evaluate(
        &self,
        bars: &[Bar],
        bar_index: usize,
        indicators: &IndicatorValues,
    ) -> Option<EntryIntent>;
}

/// Combines independent signal rules with a strict vote.
///
/// Each member votes Long/Short by returning an intent. Agreement returns
/// the first agreeing intent; conflicting directions in the same bar cancel
/// to `None` — no trade on disagreement, never a default direction.
pub struct CompositeSignal {
    members: Vec<Box<dyn SignalGenerator>>,
}

impl CompositeSignal {
    pub fn new(members: Vec<Box<dyn SignalGenerator>>) -> Self {
        assert!(!members.is_empty(), "composite signal needs at least one member");
        Self { members }
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }
}

impl SignalGenerator for CompositeSignal {
    fn name(&self) -> &str {
        "composite"
    }

    fn warmup_bars(&self) -> usize {
        self.members.iter().map(|m| m.warmup_bars()).max().unwrap_or(0)
    }

    fn evaluate(
        &self,
        bars: &[Bar],
        bar_index: usize,
        indicators: &IndicatorValues,
    ) -> Option<EntryIntent> {
        let mut agreed: Option<EntryIntent> = None;
        for member in &self.members {
            if let Some(intent) = member.evaluate(bars, bar_index, indicators) {
                match agreed {
                    None => agreed = Some(intent),
                    Some(first) if first.direction != intent.direction => return None,
                    Some(_) => {}
                }
            }
        }
        agreed
    }
}
