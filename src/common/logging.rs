//! Logging and tracing configuration
//!
//! Every run-log entry is mirrored into `tracing`, so the subscriber set up
//! here decides what reaches stderr and, optionally, a log file.

use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use super::config::LoggingConfig;
use super::paths;

/// Keeps the file writer alive; drop it only when the process exits
pub struct LogGuard {
    _file: Option<WorkerGuard>,
    /// Where the log file is written, when enabled
    pub file_path: Option<PathBuf>,
}

fn stderr_layer<S>() -> impl tracing_subscriber::Layer<S>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
}

/// Initialize tracing for the CLI (stderr logging, optional file)
///
/// Logs are controlled by the `RUST_LOG` environment variable, falling back
/// to the configured filter.
pub fn init_cli(config: &LoggingConfig) -> LogGuard {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .unwrap_or_else(|_| EnvFilter::new("repro=info,warn"));

    if config.file {
        if let Some(log_dir) = paths::log_dir() {
            if std::fs::create_dir_all(&log_dir).is_ok() {
                let appender = tracing_appender::rolling::never(&log_dir, "repro.log");
                let (writer, guard) = tracing_appender::non_blocking(appender);

                let file_layer = fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true);

                let _ = tracing_subscriber::registry()
                    .with(filter)
                    .with(file_layer)
                    .with(stderr_layer())
                    .try_init();

                return LogGuard {
                    _file: Some(guard),
                    file_path: Some(log_dir.join("repro.log")),
                };
            }
            eprintln!("Warning: Could not create log directory {}", log_dir.display());
        }
    }

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer())
        .try_init();

    LogGuard {
        _file: None,
        file_path: None,
    }
}
