//! MACD crossover signal — MACD line crossing its signal line, trend gated.
//!
//! Fires Long when the MACD line crosses above its signal line with the close
//! above the trend EMA; Short on the mirrored cross below.
//!
//! Requires `macd` and `macd_signal` columns and `ema_{trend}`, plus the
//! volatility column named in `LevelParams`.

use crate::domain::{Bar, Side};
use crate::indicators::IndicatorValues;

use super::{EntryIntent, LevelParams, SignalGenerator};

const MACD_KEY: &str = "macd";
const MACD_SIGNAL_KEY: &str = "macd_signal";

/// MACD line/signal-line crossover generator.
#[derive(Debug, Clone)]
pub struct MacdCross {
    pub trend_period: usize,
    /// Bars the slow MACD leg needs before output stabilizes.
    pub warmup: usize,
    levels: LevelParams,
    trend_key: String,
}

impl MacdCross {
    pub fn new(trend_period: usize, warmup: usize, levels: LevelParams) -> Self {
        assert!(warmup >= 1, "warmup must be >= 1");
        Self {
            trend_period,
            warmup,
            levels,
            trend_key: format!("ema_{trend_period}"),
        }
    }

    /// Standard 12/26/9 MACD columns with the 21-bar trend gate.
    pub fn default_params() -> Self {
        Self::new(21, 26, LevelParams::default())
    }
}

impl SignalGenerator for MacdCross {
    fn name(&self) -> &str {
        "macd_cross"
    }

    fn warmup_bars(&self) -> usize {
        self.warmup.max(self.trend_period)
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

        let macd_cur = indicators.get(MACD_KEY, bar_index)?;
        let sig_cur = indicators.get(MACD_SIGNAL_KEY, bar_index)?;
        let macd_prev = indicators.get(MACD_KEY, bar_index - 1)?;
        let sig_prev = indicators.get(MACD_SIGNAL_KEY, bar_index - 1)?;
        let trend = indicators.get(&self.trend_key, bar_index)?;
        if macd_cur.is_nan()
            || sig_cur.is_nan()
            || macd_prev.is_nan()
            || sig_prev.is_nan()
            || trend.is_nan()
        {
            return None;
        }

        let volatility = self.levels.volatility_at(indicators, bar_index)?;

        if macd_cur > sig_cur && macd_prev <= sig_prev && bar.close > trend {
            return Some(EntryIntent::from_volatility(
                Side::Long,
                bar_index,
                bar.close,
                volatility,
                self.levels.stop_mult,
                self.levels.target_mult,
            ));
        }

        if macd_cur < sig_cur && macd_prev >= sig_prev && bar.close < trend {
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
