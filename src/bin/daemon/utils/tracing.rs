//! Tracing Utilities Module
//!
//! This module contains tracing functionality for the paas daemon,
//! including logging configuration with optional file output.

use paas::{PaasError, Result};
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::OnceLock;
use tracing::warn;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Keeps the non-blocking writer flushing for the lifetime of the program
static WORKER_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

fn env_filter() -> EnvFilter {
    // Default to info level if RUST_LOG is not set
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

fn open_log_file(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().append(true).create(true).open(path)
}

/// Initializes the tracing subscriber with console output and, when
/// `log_file` is given and can be opened, a plain-text copy appended to it
///
/// # Arguments
/// * `log_file` - Optional log file location
///
/// # Returns
/// * `Result<()>` - Err if a global subscriber is already set
pub fn setup_tracing(log_file: Option<&Path>) -> Result<()> {
    let mut file_error = None;
    let file_layer = match log_file.map(|path| (path, open_log_file(path))) {
        Some((_, Ok(file))) => {
            let (non_blocking, guard) = tracing_appender::non_blocking::NonBlocking::new(file);
            let _ = WORKER_GUARD.set(guard);

            Some(
                fmt::layer()
                    .with_writer(non_blocking)
                    .with_ansi(false)
                    .with_filter(env_filter()),
            )
        }
        Some((path, Err(e))) => {
            file_error = Some(format!("{}: {}", path.display(), e));
            None
        }
        None => None,
    };

    // Logs go to stderr so the ansi surface owns stdout
    let console_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_ansi(true)
        .with_filter(env_filter());

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .map_err(|e| PaasError::Config(format!("Failed to initialize tracing subscriber: {}", e)))?;

    if let Some(reason) = file_error {
        warn!("Cannot open log file {}, logging to the console only", reason);
    }
    Ok(())
}
