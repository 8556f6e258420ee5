// Telemetry Module
//
// Console logging for the slim binary. Logs go to stderr so that command
// output on stdout stays machine-readable.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Configuration for logging
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name attached to the startup log line
    pub service_name: String,
    /// Whether to enable console logging
    pub enable_console: bool,
    /// Log filter (e.g., "info", "debug", "slim_parallel=debug")
    pub log_filter: Option<String>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "slim".to_string(),
            enable_console: true,
            log_filter: None,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables
    ///
    /// Environment variables:
    /// - `SLIM_SERVICE_NAME`: Service name (default: "slim")
    /// - `RUST_LOG` or `LOG_LEVEL`: Log filter
    /// - `SLIM_LOG_CONSOLE`: Set to "false" to silence console logging
    pub fn from_env() -> Self {
        Self {
            service_name: std::env::var("SLIM_SERVICE_NAME")
                .unwrap_or_else(|_| "slim".to_string()),
            enable_console: std::env::var("SLIM_LOG_CONSOLE")
                .map(|v| v.to_lowercase() != "false")
                .unwrap_or(true),
            log_filter: std::env::var("RUST_LOG")
                .ok()
                .or_else(|| std::env::var("LOG_LEVEL").ok()),
        }
    }

    /// Filter built from `log_filter`, falling back to "info"
    pub fn env_filter(&self) -> EnvFilter {
        self.log_filter
            .as_ref()
            .and_then(|f| EnvFilter::try_new(f).ok())
            .unwrap_or_else(|| EnvFilter::new("info"))
    }
}

/// Initialize the global tracing subscriber
///
/// Must be called once, before any command runs.
pub fn init_telemetry(config: TelemetryConfig) {
    let console_layer = if config.enable_console {
        Some(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_filter(config.env_filter()),
        )
    } else {
        None
    };

    tracing_subscriber::registry().with(console_layer).init();

    tracing::debug!(service = %config.service_name, "Telemetry initialized");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TelemetryConfig::default();
        assert_eq!(config.service_name, "slim");
        assert!(config.enable_console);
        assert!(config.log_filter.is_none());
        assert_eq!(config.env_filter().to_string(), "info");
    }

    #[test]
    fn test_custom_filter() {
        let config = TelemetryConfig {
            log_filter: Some("slim_parallel=debug".to_string()),
            ..Default::default()
        };
        assert_eq!(config.env_filter().to_string(), "slim_parallel=debug");
    }

    #[test]
    fn test_invalid_filter_falls_back_to_info() {
        let config = TelemetryConfig {
            log_filter: Some("slim=loud".to_string()),
            ..Default::default()
        };
        assert_eq!(config.env_filter().to_string(), "info");
    }
}
