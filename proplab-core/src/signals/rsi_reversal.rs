//! RSI extreme-reversal signal — oversold/overbought snap-back, trend gated.
//!
//! Fires Long when the previous bar's RSI was below the oversold level and
//! the current bar's RSI has recovered above the recovery threshold, with the
//! close above the trend EMA. Short is the mirror image. The recovery
//! requirement avoids catching a falling knife on the extreme bar itself.
//!
//! Requires `rsi_{period}` and `ema_{trend}` columns plus the volatility
//! column named in `LevelParams`.

use crate::domain::{Bar, Side};
use crate::indicators::IndicatorValues;

use super::{EntryIntent, LevelParams, SignalGenerator};

/// RSI extreme-reversal generator.
#[derive(Debug, Clone)]
pub struct RsiReversal {
    pub rsi_period: usize,
    pub trend_period: usize,
    pub oversold: f64,
    pub oversold_recovery: f64,
    pub overbought: f64,
    pub overbought_recovery: f64,
    levels: LevelParams,
    rsi_key: String,
    trend_key: String,
}

impl RsiReversal {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        rsi_period: usize,
        trend_period: usize,
        oversold: f64,
        oversold_recovery: f64,
        overbought: f64,
        overbought_recovery: f64,
        levels: LevelParams,
    ) -> Self {
        assert!(rsi_period >= 2, "rsi_period must be >= 2");
        assert!(
            oversold < oversold_recovery && oversold_recovery < overbought_recovery
                && overbought_recovery < overbought,
            "thresholds must satisfy oversold < oversold_recovery < overbought_recovery < overbought"
        );
        Self {
            rsi_period,
            trend_period,
            oversold,
            oversold_recovery,
            overbought,
            overbought_recovery,
            levels,
            rsi_key: format!("rsi_{rsi_period}"),
            trend_key: format!("ema_{trend_period}"),
        }
    }

    /// Fast RSI(7) with the 25/30 and 75/70 thresholds.
    pub fn default_params() -> Self {
        Self::new(7, 21, 25.0, 30.0, 75.0, 70.0, LevelParams::default())
    }
}

impl SignalGenerator for RsiReversal {
    fn name(&self) -> &str {
        "rsi_reversal"
    }

    fn warmup_bars(&self) -> usize {
        self.rsi_period.max(self.trend_period)
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

        let rsi_cur = indicators.get(&self.rsi_key, bar_index)?;
        let rsi_prev = indicators.get(&self.rsi_key, bar_index - 1)?;
        let trend = indicators.get(&self.trend_key, bar_index)?;
        if rsi_cur.is_nan() || rsi_prev.is_nan() || trend.is_nan() {
            return None;
        }

        let volatility = self.levels.volatility_at(indicators, bar_index)?;

        // Oversold bounce in an uptrend.
        if rsi_prev < self.oversold && rsi_cur > self.oversold_recovery && bar.close > trend {
            return Some(EntryIntent::from_volatility(
                Side::Long,
                bar_index,
                bar.close,
                volatility,
                self.levels.stop_mult,
                self.levels.target_mult,
            ));
        }

        // Overbought fade in a downtrend.
        if rsi_prev > self.overbought && rsi_cur < self.overbought_recovery && bar.close < trend {
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
