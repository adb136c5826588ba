//! Proplab Runner — orchestration around the core engine.
//!
//! Configuration (TOML), CSV data loading with fail-fast validation,
//! metrics aggregation, result artifacts, and parallel parameter sweeps.

pub mod config;
pub mod data_loader;
pub mod export;
pub mod metrics;
pub mod result;
pub mod runner;
pub mod sweep;

pub use config::{ConfigError, RunConfig, RunId};
pub use data_loader::{load_feed, LoadError};
pub use export::save_artifacts;
pub use metrics::RunMetrics;
pub use result::BacktestResult;
pub use runner::{run_backtest, run_from_csv, RunError};
pub use sweep::{ParamGrid, ParamSweep, SweepResults};
