//! CSV bar loading — OHLC columns plus arbitrary indicator columns.
//!
//! Required columns: `timestamp, open, high, low, close`. Every other
//! numeric column becomes an indicator series under its header name (e.g.
//! `ema_3`, `rsi_7`, `atr`). Empty indicator cells load as NaN (warmup);
//! malformed OHLC cells fail the load. Feed validation (monotonic
//! timestamps, sane OHLC) runs before anything simulates.

use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use thiserror::Error;

use proplab_core::domain::Bar;
use proplab_core::feed::{FeedError, IndicatorFeed};
use proplab_core::indicators::IndicatorValues;

/// Data loading errors.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing required column '{0}'")]
    MissingColumn(&'static str),

    #[error("row {row}: unparseable timestamp '{value}'")]
    BadTimestamp { row: usize, value: String },

    #[error("row {row}, column '{column}': unparseable number '{value}'")]
    BadNumber {
        row: usize,
        column: String,
        value: String,
    },

    #[error(transparent)]
    Feed(#[from] FeedError),
}

const TIMESTAMP: &str = "timestamp";
const OHLC: [&str; 4] = ["open", "high", "low", "close"];

/// Load a validated feed from a CSV file.
pub fn load_feed(path: &Path) -> Result<IndicatorFeed, LoadError> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();

    let find = |name: &'static str| -> Result<usize, LoadError> {
        headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
            .ok_or(LoadError::MissingColumn(name))
    };

    let ts_idx = find(TIMESTAMP)?;
    let ohlc_idx = [find(OHLC[0])?, find(OHLC[1])?, find(OHLC[2])?, find(OHLC[3])?];

    // Everything else is an indicator column.
    let indicator_cols: Vec<(usize, String)> = headers
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != ts_idx && !ohlc_idx.contains(i))
        .map(|(i, h)| (i, h.to_string()))
        .collect();

    let mut bars = Vec::new();
    let mut columns: Vec<Vec<f64>> = vec![Vec::new(); indicator_cols.len()];

    for (row_number, record) in reader.records().enumerate() {
        let record = record?;
        let row = row_number + 2; // 1-based, after the header

        let raw_ts = record.get(ts_idx).unwrap_or("");
        let timestamp = parse_timestamp(raw_ts).ok_or_else(|| LoadError::BadTimestamp {
            row,
            value: raw_ts.to_string(),
        })?;

        let mut ohlc = [0.0_f64; 4];
        for (slot, (&idx, name)) in ohlc.iter_mut().zip(ohlc_idx.iter().zip(OHLC)) {
            let raw = record.get(idx).unwrap_or("");
            *slot = raw.trim().parse().map_err(|_| LoadError::BadNumber {
                row,
                column: name.to_string(),
                value: raw.to_string(),
            })?;
        }

        bars.push(Bar {
            timestamp,
            open: ohlc[0],
            high: ohlc[1],
            low: ohlc[2],
            close: ohlc[3],
        });

        for (col, (idx, name)) in columns.iter_mut().zip(&indicator_cols) {
            let raw = record.get(*idx).unwrap_or("").trim();
            let value = if raw.is_empty() {
                f64::NAN
            } else {
                raw.parse().map_err(|_| LoadError::BadNumber {
                    row,
                    column: name.clone(),
                    value: raw.to_string(),
                })?
            };
            col.push(value);
        }
    }

    let mut indicators = IndicatorValues::new();
    for (column, (_, name)) in columns.into_iter().zip(&indicator_cols) {
        indicators.insert(name.clone(), column);
    }

    log::info!(
        "loaded {} bars with {} indicator columns from {}",
        bars.len(),
        indicator_cols.len(),
        path.display()
    );

    Ok(IndicatorFeed::new(bars, indicators)?)
}

/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS`, and bare dates (midnight UTC).
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(DateTime::from_naive_utc_and_offset(naive, Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date
            .and_hms_opt(0, 0, 0)
            .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc));
    }
    None
}
