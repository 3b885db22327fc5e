//! Logging service

use crate::models::LogLevel;
use tracing_subscriber::EnvFilter;

/// Filter directive for the given level, covering the library and the CLI
pub fn filter_directive(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Error => "chef_core=error,chef=error",
        LogLevel::Warn => "chef_core=warn,chef=warn",
        LogLevel::Info => "chef_core=info,chef=info",
        LogLevel::Debug => "chef_core=debug,chef=debug",
        LogLevel::Trace => "chef_core=trace,chef=trace",
    }
}

/// Initialize logging to stderr. `RUST_LOG` overrides the configured level.
/// Calling it twice is harmless; the second subscriber is ignored.
pub fn init_logging(level: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(level)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Log a failed operation with the command that triggered it
pub fn log_error(error: &str, context: Option<&str>) {
    tracing::error!(
        error = error,
        context = context.unwrap_or(""),
        "Operation failed"
    );
}
