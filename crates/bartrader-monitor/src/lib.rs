//! Logging and produced-event reporting.
//!
//! - [`setup_logging`] installs the `tracing` subscriber
//! - [`LogEventSink`] reports candles and orders to the log
//! - [`CsvAuditLog`] appends them to per-strategy CSV files
//! - [`FanoutSink`] combines several sinks

mod audit;
mod logging;
mod sink;

pub use audit::CsvAuditLog;
pub use logging::setup_logging;
pub use sink::{FanoutSink, LogEventSink};
