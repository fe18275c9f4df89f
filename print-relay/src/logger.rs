//! Logging Infrastructure
//!
//! Console output always; a daily rolling file as well when a log directory
//! is configured and exists.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// File name prefix of the rolling log files
const LOG_FILE_PREFIX: &str = "print-relay";

/// Initialize the logger with optional file output
///
/// `RUST_LOG` takes precedence over `log_level`. The returned guard flushes
/// the file writer on drop and must be held for the life of the process.
pub fn init_logger_with_file(log_level: &str, log_dir: Option<&str>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let console = tracing_subscriber::fmt::layer()
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_target(false);

    let file_writer = log_dir
        .map(Path::new)
        .filter(|dir| dir.is_dir())
        .map(|dir| {
            tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX))
        });

    match file_writer {
        Some((writer, guard)) => {
            let file = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(writer);
            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(console)
                .with(file)
                .try_init();
            Some(guard)
        }
        None => {
            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(console)
                .try_init();
            None
        }
    }
}
