//! Logging Infrastructure
//!
//! `tracing` subscriber setup. `RUST_LOG` wins over the configured level when set.

use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Initialize the logger at `info`
pub fn init_logger() {
    init_logger_with_file(None, None);
}

/// Initialize the logger at `level` (e.g. "debug", "switchboard_client=trace")
pub fn init_logger_with_level(level: &str) {
    init_logger_with_file(Some(level), None);
}

/// Initialize the logger with an optional level and daily rolling file output
///
/// Safe to call more than once; later calls are ignored.
pub fn init_logger_with_file(log_level: Option<&str>, log_dir: Option<&Path>) {
    let level = log_level.unwrap_or("info");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_target(false);

    if let Some(dir) = log_dir
        && dir.exists()
    {
        let file_appender = tracing_appender::rolling::daily(dir, "switchboard-client");
        let _ = builder.with_writer(file_appender).try_init();
        return;
    }

    let _ = builder.try_init();
}

/// Initialize from a [`crate::ClientConfig`]
pub fn init_from_config(config: &crate::ClientConfig) {
    init_logger_with_file(Some(&config.log_level), config.log_dir.as_deref());
}
