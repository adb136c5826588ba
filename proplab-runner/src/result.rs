//! BacktestResult — the serializable artifact of a single run.

use serde::{Deserialize, Serialize};

use proplab_core::domain::{ClosedTrade, EquityPoint};
use proplab_core::engine::challenge::ChallengeOutcome;
use proplab_core::engine::RunCounters;

use crate::config::RunConfig;
use crate::metrics::RunMetrics;

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of a single backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// Content hash of the config that produced this result.
    pub run_id: String,
    pub config: RunConfig,

    pub metrics: RunMetrics,
    pub trades: Vec<ClosedTrade>,
    pub equity_curve: Vec<EquityPoint>,
    pub final_equity: f64,
    pub bar_count: usize,
    pub counters: RunCounters,

    /// Terminal challenge state, when challenge rules were configured.
    pub challenge: Option<ChallengeOutcome>,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}
