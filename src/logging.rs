//! Tracing subscriber setup.
use crate::{
    config::ApplicationConfig,
    data::storage::ensure_parent_dir,
    error::{AppResult, ScanError},
};
use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over `log_level`. Events go to stderr and, when
/// `log_file` is set, are also written to that file without colour codes. The
/// file is truncated, so it only holds the current run.
pub fn init(config: &ApplicationConfig) -> AppResult<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.log_level)
            .map_err(|e| ScanError::Logging(format!("Invalid log level: {}", e)))?,
    };

    let file_layer = match &config.log_file {
        Some(path) => {
            let file = open_log_file(path)?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .boxed(),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init()
        .map_err(|e| ScanError::Logging(e.to_string()))
}


/// Create or truncate the log file, creating its directory if needed.
fn open_log_file(path: &Path) -> std::io::Result<File> {
    ensure_parent_dir(path)?;
    OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
}
