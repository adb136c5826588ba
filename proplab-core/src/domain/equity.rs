//! Equity curve — one mark per simulated bar, including unrealized P&L.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single equity mark.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EquityPoint {
    pub bar_index: usize,
    pub timestamp: DateTime<Utc>,
    /// Capital including unrealized P&L of any open position.
    pub equity: f64,
}

/// Strip an equity curve down to its raw values.
pub fn equity_values(curve: &[EquityPoint]) -> Vec<f64> {
    curve.iter().map(|p| p.equity).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn values_preserve_order() {
        let t = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let curve = vec![
            EquityPoint { bar_index: 0, timestamp: t, equity: 10_000.0 },
            EquityPoint { bar_index: 1, timestamp: t, equity: 10_050.0 },
        ];
        assert_eq!(equity_values(&curve), vec![10_000.0, 10_050.0]);
    }
}
