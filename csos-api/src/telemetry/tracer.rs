//! Tracing Subscriber Initialization
//!
//! Logs go to stdout through `tracing-subscriber`, filtered by `RUST_LOG`
//! and formatted as JSON (default) or human-readable text.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{ApiError, ApiResult};

const DEFAULT_FILTER: &str = "csos_api=debug,csos_storage=debug,tower_http=info,info";

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

impl std::str::FromStr for LogFormat {
    type Err = std::convert::Infallible;

    /// Anything other than `pretty`/`text` selects JSON.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "pretty" | "text" => LogFormat::Pretty,
            _ => LogFormat::Json,
        })
    }
}

/// Telemetry configuration from environment variables.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name attached to the startup log
    pub service_name: String,
    pub service_version: String,
    /// Environment (production, staging, development)
    pub environment: String,
    pub log_format: LogFormat,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "csos-api".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            environment: "development".to_string(),
            log_format: LogFormat::default(),
        }
    }
}

impl TelemetryConfig {
    /// # Environment Variables
    /// - `CSOS_SERVICE_NAME` (default: csos-api)
    /// - `CSOS_ENVIRONMENT` (default: development)
    /// - `CSOS_LOG_FORMAT`: `json` or `pretty` (default: json)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            service_name: std::env::var("CSOS_SERVICE_NAME").unwrap_or(defaults.service_name),
            service_version: defaults.service_version,
            environment: std::env::var("CSOS_ENVIRONMENT").unwrap_or(defaults.environment),
            log_format: std::env::var("CSOS_LOG_FORMAT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_default(),
        }
    }
}

/// Install the global tracing subscriber. Call once, before any logging.
pub fn init_tracing(config: &TelemetryConfig) -> ApiResult<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = match config.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .try_init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init(),
    };
    result.map_err(|e| ApiError::internal_error(format!("Failed to init subscriber: {}", e)))?;

    tracing::info!(
        service_name = %config.service_name,
        version = %config.service_version,
        environment = %config.environment,
        log_format = ?config.log_format,
        "Telemetry initialized"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_env::{EnvVarGuard, ENV_MUTEX};

    #[test]
    fn test_log_format_parsing() {
        assert_eq!("pretty".parse::<LogFormat>(), Ok(LogFormat::Pretty));
        assert_eq!(" TEXT ".parse::<LogFormat>(), Ok(LogFormat::Pretty));
        assert_eq!("json".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!("anything".parse::<LogFormat>(), Ok(LogFormat::Json));
    }

    #[test]
    fn test_telemetry_config_from_env() {
        let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        let _format = EnvVarGuard::set("CSOS_LOG_FORMAT", Some("pretty"));
        let _env = EnvVarGuard::set("CSOS_ENVIRONMENT", None);
        let _name = EnvVarGuard::set("CSOS_SERVICE_NAME", None);

        let config = TelemetryConfig::from_env();
        assert_eq!(config.service_name, "csos-api");
        assert_eq!(config.environment, "development");
        assert_eq!(config.log_format, LogFormat::Pretty);
    }
}
