//! Tracing subscriber setup.
//!
//! Events go to stderr, so stdout stays free for command output. `RUST_LOG`
//! overrides the default `info` filter. With a log file, the same events are
//! also appended to it through a non-blocking writer; the caller holds the
//! returned guard until it is done logging, and dropping it flushes the file.

use crate::domain::error::SigtraderError;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::PathBuf;
use tracing_appender::non_blocking;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{prelude::*, EnvFilter};

pub fn init_tracing(log_file: Option<PathBuf>) -> Result<Option<WorkerGuard>, SigtraderError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_target(false);

    if let Some(path) = log_file {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let (non_blocking_writer, guard) = non_blocking(file);
        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking_writer)
            .with_ansi(false);
        tracing_subscriber::registry()
            .with(filter)
            .with(stderr_layer)
            .with(file_layer)
            .try_init()
            .map_err(|e| SigtraderError::Io(io::Error::other(e)))?;
        Ok(Some(guard))
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(stderr_layer)
            .try_init()
            .map_err(|e| SigtraderError::Io(io::Error::other(e)))?;
        Ok(None)
    }
}
