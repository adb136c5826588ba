//! Cost model — spread, commission, slippage, lot and margin constraints.
//!
//! Spread is charged on entry only; commission is split half per side;
//! slippage is charged per side at its mean value so runs stay
//! deterministic. Lot granularity and the margin gate are enforced before a
//! trade is allowed to open; the stop-out level drives forced liquidation.

use serde::{Deserialize, Serialize};

/// Per-side transaction cost breakdown.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub spread_cost: f64,
    pub commission: f64,
    pub slippage: f64,
    pub total: f64,
}

impl CostBreakdown {
    pub fn zero() -> Self {
        Self {
            spread_cost: 0.0,
            commission: 0.0,
            slippage: 0.0,
            total: 0.0,
        }
    }
}

/// Parameters of the realistic cost model.
///
/// Defaults match retail XAU/USD conditions: $0.30 spread, $7 per standard
/// lot round trip, $0.05 slippage, 100:1 leverage, 0.01 micro lots of
/// 100 units each.
#[derive(Debug, Clone, PartialEq)]
pub struct CostParams {
    /// Spread cost per unit traded, charged on entry.
    pub spread_per_unit: f64,
    /// Commission per standard lot, round trip (half per side).
    pub commission_per_lot: f64,
    /// Average slippage cost per unit, per side.
    pub slippage_per_unit: f64,
    /// Account leverage (e.g. 100.0 for 100:1).
    pub leverage: f64,
    /// Minimum tradeable lot size (e.g. 0.01).
    pub min_lot: f64,
    /// Units per lot (e.g. 100 oz of gold per lot).
    pub lot_units: f64,
    /// Fraction of equity that margin plus entry costs may consume.
    pub margin_usage_cap: f64,
    /// Margin level below which the position is force-liquidated.
    pub stop_out_level: f64,
    /// Bump sub-minimum sizes up to the minimum lot instead of skipping
    /// them (the margin gate still decides affordability).
    pub floor_to_min_lot: bool,
}

impl Default for CostParams {
    fn default() -> Self {
        Self {
            spread_per_unit: 0.30,
            commission_per_lot: 7.0,
            slippage_per_unit: 0.05,
            leverage: 100.0,
            min_lot: 0.01,
            lot_units: 100.0,
            margin_usage_cap: 0.9,
            stop_out_level: 0.2,
            floor_to_min_lot: false,
        }
    }
}

/// Pluggable transaction-cost and margin model.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum CostModel {
    /// No costs, no lot granularity, no margin limits.
    #[default]
    Frictionless,
    Realistic(CostParams),
}

impl CostModel {
    pub fn frictionless() -> Self {
        CostModel::Frictionless
    }

    /// Transaction costs for filling `quantity` units on one side.
    pub fn costs(&self, quantity: f64, is_entry: bool) -> CostBreakdown {
        match self {
            CostModel::Frictionless => CostBreakdown::zero(),
            CostModel::Realistic(p) => {
                let quantity = quantity.abs();
                let lots = quantity / p.lot_units;
                let spread_cost = if is_entry { quantity * p.spread_per_unit } else { 0.0 };
                let commission = lots * (p.commission_per_lot / 2.0);
                let slippage = quantity * p.slippage_per_unit;
                CostBreakdown {
                    spread_cost,
                    commission,
                    slippage,
                    total: spread_cost + commission + slippage,
                }
            }
        }
    }

    /// Round a raw unit quantity to the lot grid.
    ///
    /// Returns `None` when the risk-implied size is below the minimum lot —
    /// the signal is skipped rather than forced up, unless
    /// `floor_to_min_lot` is set.
    pub fn round_to_lot(&self, quantity: f64) -> Option<f64> {
        match self {
            CostModel::Frictionless => (quantity > 0.0).then_some(quantity),
            CostModel::Realistic(p) => {
                let lots = quantity / p.lot_units;
                if lots < p.min_lot {
                    if p.floor_to_min_lot && lots > 0.0 {
                        return Some(p.min_lot * p.lot_units);
                    }
                    return None;
                }
                let lots = (lots / p.min_lot).round() * p.min_lot;
                Some(lots * p.lot_units)
            }
        }
    }

    /// Margin required to hold `quantity` units at `price`.
    pub fn required_margin(&self, quantity: f64, price: f64) -> f64 {
        match self {
            CostModel::Frictionless => 0.0,
            CostModel::Realistic(p) => quantity.abs() * price / p.leverage,
        }
    }

    /// Whether equity covers the margin for an entry plus its costs.
    pub fn margin_allows(&self, quantity: f64, price: f64, entry_costs: f64, equity: f64) -> bool {
        match self {
            CostModel::Frictionless => true,
            CostModel::Realistic(p) => {
                self.required_margin(quantity, price) + entry_costs <= equity * p.margin_usage_cap
            }
        }
    }

    /// Stop-out margin level, when the model enforces one.
    pub fn stop_out_level(&self) -> Option<f64> {
        match self {
            CostModel::Frictionless => None,
            CostModel::Realistic(p) => Some(p.stop_out_level),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn realistic() -> CostModel {
        CostModel::Realistic(CostParams::default())
    }

    #[test]
    fn frictionless_is_free() {
        let model = CostModel::frictionless();
        let costs = model.costs(500.0, true);
        assert_eq!(costs.total, 0.0);
        assert_eq!(model.round_to_lot(3.7), Some(3.7));
        assert_eq!(model.required_margin(500.0, 2000.0), 0.0);
        assert!(model.margin_allows(500.0, 2000.0, 0.0, 1.0));
        assert_eq!(model.stop_out_level(), None);
    }

    #[test]
    fn entry_costs_include_spread() {
        let model = realistic();
        // 1 lot = 100 units: spread 100 * 0.30 = 30, commission 3.5, slippage 5.
        let costs = model.costs(100.0, true);
        assert!((costs.spread_cost - 30.0).abs() < 1e-10);
        assert!((costs.commission - 3.5).abs() < 1e-10);
        assert!((costs.slippage - 5.0).abs() < 1e-10);
        assert!((costs.total - 38.5).abs() < 1e-10);
    }

    #[test]
    fn exit_costs_skip_spread() {
        let model = realistic();
        let costs = model.costs(100.0, false);
        assert_eq!(costs.spread_cost, 0.0);
        assert!((costs.commission - 3.5).abs() < 1e-10);
        assert!((costs.total - 8.5).abs() < 1e-10);
    }

    #[test]
    fn lot_rounding_to_grid() {
        let model = realistic();
        // 3.7 units = 0.037 lots -> rounds to 0.04 lots = 4 units.
        assert_eq!(model.round_to_lot(3.7), Some(4.0));
        // 1.26 units = 0.0126 lots -> rounds to 0.01 lots = 1 unit.
        assert_eq!(model.round_to_lot(1.26), Some(1.0));
    }

    #[test]
    fn below_min_lot_is_skipped() {
        let model = realistic();
        // 0.5 units = 0.005 lots < 0.01 min lot.
        assert_eq!(model.round_to_lot(0.5), None);
    }

    #[test]
    fn floor_to_min_lot_policy_bumps_instead() {
        let model = CostModel::Realistic(CostParams {
            floor_to_min_lot: true,
            ..CostParams::default()
        });
        // 0.005 lots floors to 0.01 lots = 1 unit.
        assert_eq!(model.round_to_lot(0.5), Some(1.0));
        assert_eq!(model.round_to_lot(0.0), None);
    }

    #[test]
    fn margin_requirement() {
        let model = realistic();
        // 5 units at 2000 with 100:1 leverage -> 100 margin.
        assert!((model.required_margin(5.0, 2000.0) - 100.0).abs() < 1e-10);
    }

    #[test]
    fn margin_gate_rejects_oversized_entry() {
        let model = realistic();
        // 500 units at 2000 -> 10_000 margin > 1_000 * 0.9.
        assert!(!model.margin_allows(500.0, 2000.0, 0.0, 1_000.0));
        assert!(model.margin_allows(5.0, 2000.0, 38.5, 1_000.0));
    }

    #[test]
    fn stop_out_level_exposed() {
        assert_eq!(realistic().stop_out_level(), Some(0.2));
    }
}
