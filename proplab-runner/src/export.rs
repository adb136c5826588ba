//! Result artifacts — JSON result, trades CSV, equity CSV.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use proplab_core::domain::{ClosedTrade, EquityPoint};

use crate::result::BacktestResult;

/// Artifact writing errors.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Write the full result set into `dir`: `<run_id>.json`,
/// `<run_id>_trades.csv`, `<run_id>_equity.csv`. Returns the JSON path.
pub fn save_artifacts(dir: &Path, result: &BacktestResult) -> Result<PathBuf, ExportError> {
    fs::create_dir_all(dir)?;

    let short_id = &result.run_id[..16.min(result.run_id.len())];
    let json_path = dir.join(format!("{short_id}.json"));
    let file = fs::File::create(&json_path)?;
    serde_json::to_writer_pretty(file, result)?;

    write_trades_csv(&dir.join(format!("{short_id}_trades.csv")), &result.trades)?;
    write_equity_csv(&dir.join(format!("{short_id}_equity.csv")), &result.equity_curve)?;

    Ok(json_path)
}

/// One row per closed trade.
pub fn write_trades_csv(path: &Path, trades: &[ClosedTrade]) -> Result<(), ExportError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record([
        "entry_bar",
        "entry_time",
        "exit_bar",
        "exit_time",
        "side",
        "entry_price",
        "exit_price",
        "quantity",
        "gross_pnl",
        "net_pnl",
        "spread_cost",
        "commission",
        "slippage",
        "exit_reason",
    ])?;
    for trade in trades {
        writer.write_record([
            trade.entry_bar.to_string(),
            trade.entry_time.to_rfc3339(),
            trade.exit_bar.to_string(),
            trade.exit_time.to_rfc3339(),
            format!("{:?}", trade.side).to_lowercase(),
            trade.entry_price.to_string(),
            trade.exit_price.to_string(),
            trade.quantity.to_string(),
            trade.gross_pnl.to_string(),
            trade.net_pnl.to_string(),
            trade.spread_cost.to_string(),
            trade.commission.to_string(),
            trade.slippage.to_string(),
            format!("{:?}", trade.exit_reason),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// One row per equity mark.
pub fn write_equity_csv(path: &Path, curve: &[EquityPoint]) -> Result<(), ExportError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["bar_index", "timestamp", "equity"])?;
    for point in curve {
        writer.write_record([
            point.bar_index.to_string(),
            point.timestamp.to_rfc3339(),
            point.equity.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}
