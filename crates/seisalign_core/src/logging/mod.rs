//! Logging setup for applications embedding the alignment engines.
//!
//! The engines only emit `tracing` events:
//! - `info`: run start and finish
//! - `debug`: per-iteration convergence scores
//! - `warn`: zero-filled windows, deselected traces, non-convergence
//! - `trace`: per-pair correlation results
//!
//! Nothing is printed until the application installs a subscriber, either
//! its own or one of the helpers below.
//!
//! # Example
//!
//! ```no_run
//! use seisalign_core::logging::{init_file_tracing, LogLevel};
//!
//! // Keep the guard alive, or buffered lines are lost on exit
//! let _guard = init_file_tracing(".logs", LogLevel::Debug).unwrap();
//! tracing::info!("alignment session started");
//! ```

mod types;

pub use types::LogLevel;

use std::fs;
use std::io;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// File name used by [`init_file_tracing`].
pub const LOG_FILE_NAME: &str = "seisalign.log";

/// Initialize a global tracing subscriber writing to stderr.
///
/// Respects `RUST_LOG`, falling back to `default_level`. Does nothing if a
/// global subscriber is already installed.
pub fn init_tracing(default_level: LogLevel) {
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(false))
        .with(env_filter(default_level))
        .try_init();
}

/// Initialize a global subscriber writing to stderr and to a log file in
/// `log_dir`.
///
/// The file is written by a background thread; the returned guard flushes
/// it when dropped.
pub fn init_file_tracing(
    log_dir: impl AsRef<Path>,
    default_level: LogLevel,
) -> io::Result<WorkerGuard> {
    let log_dir = log_dir.as_ref();
    fs::create_dir_all(log_dir)?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(LOG_FILE_NAME)
        .build(log_dir)
        .map_err(io::Error::other)?;
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true);

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(false))
        .with(file_layer)
        .with(env_filter(default_level))
        .try_init();

    Ok(guard)
}

/// Initialize tracing for tests (only logs warnings and above).
#[cfg(test)]
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_test_writer()
        .try_init();
}

fn env_filter(default_level: LogLevel) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.directive()))
}
