//! Tracing subscriber initialisation for the `gm-staking` binary.
//!
//! Logs go to stderr through a compact `fmt` layer so that command output on
//! stdout stays machine-readable. The filter defaults to `info` and is
//! overridden by `RUST_LOG`.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

const DEFAULT_FILTER: &str = "info";

#[derive(Debug, Clone, Default)]
pub struct Telemetry {
    name: Option<String>,
    version: Option<String>,
}

impl Telemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Install the global subscriber. A second call leaves the first subscriber in place.
    pub fn register(self) -> Self {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
        let log_file = std::env::var("LOG_FILE").is_ok_and(|v| v == "1");

        let stderr = tracing_subscriber::fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_file(log_file)
            .with_line_number(log_file)
            .with_filter(filter);

        match tracing_subscriber::registry().with(stderr).try_init() {
            Ok(()) => tracing::debug!(
                name = self.name.as_deref().unwrap_or("unknown"),
                version = self.version.as_deref().unwrap_or("unknown"),
                "logging started"
            ),
            Err(e) => eprintln!("tracing subscriber already installed: {e}"),
        }
        self
    }
}
