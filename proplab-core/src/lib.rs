//! Proplab Core — engine, domain types, signals, sizing, challenge rules.
//!
//! This crate contains the heart of the backtesting engine:
//! - Domain types (bars, positions, closed trades, equity marks)
//! - Validated indicator feed (fail-fast input checks)
//! - Signal generators with a strict-vote combinator
//! - Fixed-fractional risk sizing with a hard notional cap
//! - The single-position bar-by-bar trade simulator
//! - Transaction-cost/margin model and challenge (pass/fail/timeout) rules
//!
//! No I/O happens here; loading bars and persisting results live in the
//! runner crate.

pub mod domain;
pub mod engine;
pub mod feed;
pub mod indicators;
pub mod signals;
pub mod sizers;
