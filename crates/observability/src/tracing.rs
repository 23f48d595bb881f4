//! Tracing/logging initialization.
//!
//! Logs go to stderr so command output on stdout stays machine-readable.

use tracing_subscriber::EnvFilter;

/// Output format of the process-wide subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per event.
    #[default]
    Json,
    /// Human-readable single lines.
    Compact,
}

/// Initialize JSON tracing/logging for the process.
///
/// `RUST_LOG` wins when set; otherwise `default_filter` applies.
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init(default_filter: &str) {
    init_with(default_filter, LogFormat::Json);
}

pub fn init_with(default_filter: &str, format: LogFormat) {
    let filter = build_filter(EnvFilter::try_from_default_env().ok(), default_filter);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let _ = match format {
        LogFormat::Json => builder
            .json()
            .with_timer(tracing_subscriber::fmt::time::SystemTime)
            .try_init(),
        LogFormat::Compact => builder.compact().try_init(),
    };
}

fn build_filter(from_env: Option<EnvFilter>, default_filter: &str) -> EnvFilter {
    from_env
        .or_else(|| EnvFilter::try_new(default_filter).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}
