//! Domain types: bars, positions, trades, equity marks.

pub mod bar;
pub mod equity;
pub mod position;
pub mod trade;

pub use bar::Bar;
pub use equity::{equity_values, EquityPoint};
pub use position::{Position, Side};
pub use trade::{ClosedTrade, ExitReason};
