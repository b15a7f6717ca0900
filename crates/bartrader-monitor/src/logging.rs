//! Logging setup.

use std::ffi::OsString;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Setup logging with the given level, on stdout and optionally a file.
///
/// `RUST_LOG` overrides `level`. The file, when given, always receives JSON
/// lines through a non-blocking writer; keep the returned guard alive until
/// exit so buffered lines are flushed.
pub fn setup_logging(level: &str, json: bool, file: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let stdout = if json {
        fmt::layer().json().boxed()
    } else {
        fmt::layer().pretty().boxed()
    };

    let (file_layer, guard) = match file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .map(|n| n.to_os_string())
                .unwrap_or_else(|| OsString::from("bartrader.log"));
            let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .json()
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout)
        .with(file_layer)
        .init();
    guard
}
