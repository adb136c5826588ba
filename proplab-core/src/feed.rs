//! IndicatorFeed — validated bars plus precomputed indicator columns.
//!
//! Validation runs once at construction. A feed that constructs successfully
//! is safe to simulate over: timestamps strictly increase, every bar passes
//! OHLC sanity checks, and every indicator column has one value per bar.
//! Invalid input fails fast here, never mid-simulation.

use thiserror::Error;

use crate::domain::Bar;
use crate::indicators::IndicatorValues;

/// Input-data validation errors.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("bar series is empty")]
    Empty,

    #[error("timestamps not strictly increasing at bar {index}")]
    NonMonotonicTimestamp { index: usize },

    #[error("invalid OHLC at bar {index} (open {open}, high {high}, low {low}, close {close})")]
    InsaneBar {
        index: usize,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
    },

    #[error("indicator '{name}' has {len} values for {bars} bars")]
    LengthMismatch { name: String, len: usize, bars: usize },
}

/// Read-only bundle of bars and their indicator columns.
#[derive(Debug, Clone)]
pub struct IndicatorFeed {
    bars: Vec<Bar>,
    indicators: IndicatorValues,
}

impl IndicatorFeed {
    /// Validate and bundle bars with their indicator columns.
    pub fn new(bars: Vec<Bar>, indicators: IndicatorValues) -> Result<Self, FeedError> {
        if bars.is_empty() {
            return Err(FeedError::Empty);
        }

        for (index, bar) in bars.iter().enumerate() {
            if !bar.is_sane() {
                return Err(FeedError::InsaneBar {
                    index,
                    open: bar.open,
                    high: bar.high,
                    low: bar.low,
                    close: bar.close,
                });
            }
            if index > 0 && bar.timestamp <= bars[index - 1].timestamp {
                return Err(FeedError::NonMonotonicTimestamp { index });
            }
        }

        for (name, series) in indicators.iter() {
            if series.len() != bars.len() {
                return Err(FeedError::LengthMismatch {
                    name: name.to_string(),
                    len: series.len(),
                    bars: bars.len(),
                });
            }
        }

        Ok(Self { bars, indicators })
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn indicators(&self) -> &IndicatorValues {
        &self.indicators
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}
