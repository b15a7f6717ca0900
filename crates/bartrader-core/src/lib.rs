//! Core types and traits for the bar-driven trading engine.
//!
//! This crate provides the foundational building blocks including:
//! - Bar, candle and candle-series types
//! - Order intent and position state types
//! - The error taxonomy shared by every worker
//! - Port traits for the broker and market data, and the
//!   candle-builder / signal-detector capability pair

pub mod error;
pub mod traits;
pub mod types;

pub use error::{TradingError, TradingResult};
pub use traits::*;
pub use types::*;
