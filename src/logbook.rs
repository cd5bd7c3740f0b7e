//! Log setup
//!
//! Every event goes to the console and, without ANSI colors, to an
//! append-only log file. Both sinks carry timestamps.

use crate::error::{Error, Result};
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber
///
/// `RUST_LOG` overrides the default level (`info`, or `debug` when verbose).
pub fn init(log_file: &Path, verbose: bool) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .map_err(|e| Error::LogFile {
            path: log_file.to_path_buf(),
            source: e,
        })?;

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_filter(filter(verbose));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .with_filter(filter(verbose));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| Error::Io(std::io::Error::other(e)))?;

    Ok(())
}

/// Console-only subscriber for one-shot commands
pub fn init_console(verbose: bool) {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_filter(filter(verbose)),
        )
        .try_init();
}

fn filter(verbose: bool) -> EnvFilter {
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unwritable_log_file() {
        let err = init(Path::new("/nonexistent/dir/hostwatch.log"), false).unwrap_err();
        assert!(matches!(err, Error::LogFile { .. }));
        assert_eq!(err.exit_code(), 4);
    }
}
