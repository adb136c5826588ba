//! Look-ahead contamination tests.
//!
//! A signal evaluated at bar `i` must depend only on data at indices `<= i`:
//! truncating the series right after `i`, or corrupting every later value,
//! must not change the output.

use chrono::{Duration, TimeZone, Utc};
use proplab_core::domain::Bar;
use proplab_core::indicators::IndicatorValues;
use proplab_core::signals::{
    EmaCrossover, EntryIntent, LevelParams, MacdCross, RsiReversal, SignalGenerator,
};

fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
    let start = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| Bar {
            timestamp: start + Duration::hours(i as i64),
            open: close - 0.25,
            high: close + 0.5,
            low: close - 0.5,
            close,
        })
        .collect()
}

fn truncate(iv: &IndicatorValues, len: usize) -> IndicatorValues {
    let mut out = IndicatorValues::new();
    for (name, series) in iv.iter() {
        out.insert(name, series[..len].to_vec());
    }
    out
}

fn corrupt_future(iv: &IndicatorValues, from: usize) -> IndicatorValues {
    let mut out = IndicatorValues::new();
    for (name, series) in iv.iter() {
        let mut series = series.to_vec();
        for v in series.iter_mut().skip(from) {
            *v = 9_999.0;
        }
        out.insert(name, series);
    }
    out
}

fn assert_no_lookahead(
    sig: &dyn SignalGenerator,
    bars: &[Bar],
    iv: &IndicatorValues,
    eval_bar: usize,
) -> Option<EntryIntent> {
    let full = sig.evaluate(bars, eval_bar, iv);

    let truncated_bars = &bars[..=eval_bar];
    let truncated_iv = truncate(iv, eval_bar + 1);
    let truncated = sig.evaluate(truncated_bars, eval_bar, &truncated_iv);
    assert_eq!(
        full, truncated,
        "{}: truncating future bars changed the signal at bar {eval_bar}",
        sig.name()
    );

    let corrupted_iv = corrupt_future(iv, eval_bar + 1);
    let corrupted = sig.evaluate(bars, eval_bar, &corrupted_iv);
    assert_eq!(
        full, corrupted,
        "{}: corrupting future indicator values changed the signal at bar {eval_bar}",
        sig.name()
    );

    full
}

#[test]
fn ema_crossover_sees_no_future() {
    let n = 40;
    let bars = bars_from_closes(&vec![100.0; n]);
    let mut fast = vec![95.0; n];
    for v in fast.iter_mut().skip(30) {
        *v = 99.0;
    }
    let mut iv = IndicatorValues::new();
    iv.insert("ema_3", fast);
    iv.insert("ema_8", vec![98.0; n]);
    iv.insert("ema_21", vec![90.0; n]);
    iv.insert("atr", vec![2.0; n]);

    let sig = EmaCrossover::new(3, 8, 21, LevelParams::default());
    // Check the firing bar and several silent bars.
    for eval_bar in [25, 29, 30, 31, 35] {
        assert_no_lookahead(&sig, &bars, &iv, eval_bar);
    }
    // The cross bar does fire.
    assert!(sig.evaluate(&bars, 30, &iv).is_some());
}

#[test]
fn rsi_reversal_sees_no_future() {
    let n = 40;
    let bars = bars_from_closes(&vec![100.0; n]);
    let mut rsi = vec![50.0; n];
    rsi[29] = 20.0;
    rsi[30] = 35.0;
    let mut iv = IndicatorValues::new();
    iv.insert("rsi_7", rsi);
    iv.insert("ema_21", vec![90.0; n]);
    iv.insert("atr", vec![2.0; n]);

    let sig = RsiReversal::default_params();
    for eval_bar in [25, 29, 30, 31, 35] {
        assert_no_lookahead(&sig, &bars, &iv, eval_bar);
    }
    assert!(sig.evaluate(&bars, 30, &iv).is_some());
}

#[test]
fn macd_cross_sees_no_future() {
    let n = 40;
    let bars = bars_from_closes(&vec![100.0; n]);
    let mut macd = vec![-0.5; n];
    for v in macd.iter_mut().skip(30) {
        *v = 0.5;
    }
    let mut iv = IndicatorValues::new();
    iv.insert("macd", macd);
    iv.insert("macd_signal", vec![0.0; n]);
    iv.insert("ema_21", vec![90.0; n]);
    iv.insert("atr", vec![2.0; n]);

    let sig = MacdCross::default_params();
    for eval_bar in [27, 29, 30, 31, 35] {
        assert_no_lookahead(&sig, &bars, &iv, eval_bar);
    }
    assert!(sig.evaluate(&bars, 30, &iv).is_some());
}
