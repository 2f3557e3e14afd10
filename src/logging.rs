//! Tracing setup.
//!
//! Console output always; a daily-rolling file when a trace directory is
//! configured. `RUST_LOG` overrides the default `info` level.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// File name prefix for rolled trace files.
const TRACE_FILE_PREFIX: &str = "daily-tracker.log";

/// Initialize logging with the default `info` level.
///
/// Keep the returned guard alive for the life of the process; dropping it
/// stops the background file writer.
pub fn init(trace_dir: Option<&Path>) -> Option<WorkerGuard> {
    init_with_level("info", trace_dir)
}

/// Initialize logging with a specific default level.
pub fn init_with_level(default_level: &str, trace_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let (file_layer, guard) = match trace_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, TRACE_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(file_layer)
        .init();

    guard
}

/// Initialize logging for tests. Safe to call more than once.
#[cfg(test)]
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(EnvFilter::new("debug"))
        .try_init();
}
