//! Precomputed indicator values container.
//!
//! Indicator computation happens outside the engine (a technical-analysis
//! library, extra CSV columns, or literal vectors in tests). The engine only
//! consumes columns: one f64 per bar, `NaN` during warmup.

use std::collections::BTreeMap;

/// Columnar container for precomputed indicator series.
///
/// Built once before the bar loop, then queried by `(name, bar_index)`
/// during the loop. Backed by a BTreeMap so iteration order is stable.
#[derive(Debug, Clone, Default)]
pub struct IndicatorValues {
    series: BTreeMap<String, Vec<f64>>,
}

impl IndicatorValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a named indicator series.
    pub fn insert(&mut self, name: impl Into<String>, values: Vec<f64>) {
        self.series.insert(name.into(), values);
    }

    /// Get the indicator value at a specific bar index.
    pub fn get(&self, name: &str, bar_index: usize) -> Option<f64> {
        self.series.get(name).and_then(|v| v.get(bar_index).copied())
    }

    /// Get the full series for a named indicator.
    pub fn get_series(&self, name: &str) -> Option<&[f64]> {
        self.series.get(name).map(|v| v.as_slice())
    }

    /// Iterate over `(name, series)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.series.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Names of all stored series.
    pub fn names(&self) -> Vec<&str> {
        self.series.keys().map(|k| k.as_str()).collect()
    }

    /// Number of indicator series stored.
    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}
