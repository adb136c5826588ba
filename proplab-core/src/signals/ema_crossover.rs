//! EMA crossover signal — fast EMA crossing slow EMA, gated by a trend EMA.
//!
//! Fires Long when the fast EMA crosses above the slow EMA while the close
//! is above the trend EMA; Short on the mirrored cross below. The trend gate
//! keeps countertrend crosses out.
//!
//! Requires precomputed `ema_{fast}`, `ema_{slow}`, `ema_{trend}` columns
//! plus the volatility column named in `LevelParams`.

use crate::domain::{Bar, Side};
use crate::indicators::IndicatorValues;

use super::{EntryIntent, LevelParams, SignalGenerator};

/// EMA crossover generator.
#[derive(Debug, Clone)]
pub struct EmaCrossover {
    pub fast_period: usize,
    pub slow_period: usize,
    pub trend_period: usize,
    levels: LevelParams,
    fast_key: String,
    slow_key: String,
    trend_key: String,
}

impl EmaCrossover {
    pub fn new(fast_period: usize, slow_period: usize, trend_period: usize, levels: LevelParams) -> Self {
        assert!(fast_period >= 1, "fast_period must be >= 1");
        assert!(slow_period > fast_period, "slow_period must be > fast_period");
        assert!(trend_period >= slow_period, "trend_period must be >= slow_period");
        Self {
            fast_period,
            slow_period,
            trend_period,
            levels,
            fast_key: format!("ema_{fast_period}"),
            slow_key: format!("ema_{slow_period}"),
            trend_key: format!("ema_{trend_period}"),
        }
    }

    /// The aggressive fast/slow/trend stack from the prop-challenge setup.
    pub fn default_params() -> Self {
        Self::new(3, 8, 21, LevelParams::default())
    }
}

impl SignalGenerator for EmaCrossover {
    fn name(&self) -> &str {
        "ema_crossover"
    }

    fn warmup_bars(&self) -> usize {
        self.trend_period
    }

    fn evaluate(
        &self,
        bars: &[Bar],
        bar_index: usize,
        indicators: &IndicatorValues,
    ) -> Option<EntryIntent> {
        if bar_index == 0 || bar_index < self.warmup_bars() {
            return None;
        }

        let bar = &bars[bar_index];
        if bar.close.is_nan() {
            return None;
        }

        let fast_cur = indicators.get(&self.fast_key, bar_index)?;
        let slow_cur = indicators.get(&self.slow_key, bar_index)?;
        let fast_prev = indicators.get(&self.fast_key, bar_index - 1)?;
        let slow_prev = indicators.get(&self.slow_key, bar_index - 1)?;
        let trend = indicators.get(&self.trend_key, bar_index)?;
        if fast_cur.is_nan()
            || slow_cur.is_nan()
            || fast_prev.is_nan()
            || slow_prev.is_nan()
            || trend.is_nan()
        {
            return None;
        }

        let volatility = self.levels.volatility_at(indicators, bar_index)?;

        // Cross up with price above the trend EMA.
        if fast_cur > slow_cur && fast_prev <= slow_prev && bar.close > trend {
            return Some(EntryIntent::from_volatility(
                Side::Long,
                bar_index,
                bar.close,
                volatility,
                self.levels.stop_mult,
                self.levels.target_mult,
            ));
        }

        // Cross down with price below the trend EMA.
        if fast_cur < slow_cur && fast_prev >= slow_prev && bar.close < trend {
            return Some(EntryIntent::from_volatility(
                Side::Short,
                bar_index,
                bar.close,
                volatility,
                self.levels.stop_mult,
                self.levels.target_mult,
            ));
        }

        None
    }
}
