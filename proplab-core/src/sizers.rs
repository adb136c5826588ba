//! Risk-based position sizing.
//!
//! Classic fixed-fractional risk: risk a set fraction of equity per trade,
//! with the stop distance supplied by the signal's volatility-derived levels.
//! A hard notional cap bounds tail risk from wide stops.

use crate::signals::EntryIntent;

/// A sized entry: concrete quantity plus the levels it was sized against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizedEntry {
    pub quantity: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
}

/// Fixed-fractional risk sizer.
///
/// # Formula
/// ```text
/// risk_amount = equity * risk_fraction
/// quantity    = risk_amount / |reference_price - suggested_stop|
/// cap         = equity * max_position_fraction / reference_price
/// ```
///
/// Fails closed: a zero, negative, or non-finite risk distance produces no
/// trade rather than a division by zero or an unbounded position.
#[derive(Debug, Clone, Copy)]
pub struct RiskSizer {
    risk_fraction: f64,
    max_position_fraction: f64,
}

impl RiskSizer {
    pub fn new(risk_fraction: f64, max_position_fraction: f64) -> Self {
        assert!(
            risk_fraction > 0.0 && risk_fraction < 1.0,
            "risk_fraction must be in (0, 1)"
        );
        assert!(
            max_position_fraction > 0.0,
            "max_position_fraction must be positive"
        );
        Self {
            risk_fraction,
            max_position_fraction,
        }
    }

    pub fn risk_fraction(&self) -> f64 {
        self.risk_fraction
    }

    /// Size an entry intent against current equity. `None` means no trade.
    pub fn size(&self, intent: &EntryIntent, equity: f64) -> Option<SizedEntry> {
        if equity <= 0.0 || !equity.is_finite() {
            return None;
        }
        if !intent.reference_price.is_finite() || intent.reference_price <= 0.0 {
            return None;
        }

        let risk_per_unit = (intent.reference_price - intent.suggested_stop).abs();
        if !risk_per_unit.is_finite() || risk_per_unit <= 0.0 {
            return None;
        }

        let risk_amount = equity * self.risk_fraction;
        let raw = risk_amount / risk_per_unit;
        let cap = equity * self.max_position_fraction / intent.reference_price;
        let quantity = raw.min(cap);

        if !quantity.is_finite() || quantity <= 0.0 {
            return None;
        }

        Some(SizedEntry {
            quantity,
            stop_loss: intent.suggested_stop,
            take_profit: intent.suggested_target,
        })
    }
}
