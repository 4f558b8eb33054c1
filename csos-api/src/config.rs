//! API Configuration Module
//!
//! Configuration is read from environment variables. The backend URL and
//! service credential are required and checked before anything is built;
//! everything else has a development default.

use std::path::PathBuf;
use std::time::Duration;

use csos_core::{ConfigError, RULES_BUCKET};
use csos_storage::RuleCacheConfig;
use secrecy::{ExposeSecret, SecretString};

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match env_var(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
            field: key.to_string(),
            value: raw.clone(),
            reason: format!("expected a {}", std::any::type_name::<T>()),
        }),
    }
}

// ============================================================================
// BACKEND CONFIGURATION
// ============================================================================

/// Connection settings for the managed backend (storage + REST).
#[derive(Clone)]
pub struct BackendConfig {
    /// Base URL, e.g. `https://xyzcompany.supabase.co`.
    pub url: String,
    /// Service role key used for storage and role queries.
    pub service_role_key: SecretString,
    /// Per-request timeout for backend calls.
    pub timeout: Duration,
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("url", &self.url)
            .field("service_role_key", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl BackendConfig {
    /// Load from the environment.
    ///
    /// # Environment Variables
    /// - `SUPABASE_URL` (required)
    /// - `SUPABASE_SERVICE_ROLE_KEY` (required)
    /// - `CSOS_STORAGE_TIMEOUT_SECS`: backend request timeout (default: 10)
    pub fn from_env() -> Result<Self, ConfigError> {
        let url = env_var("SUPABASE_URL").ok_or_else(|| ConfigError::MissingRequired {
            field: "SUPABASE_URL".to_string(),
        })?;
        let key =
            env_var("SUPABASE_SERVICE_ROLE_KEY").ok_or_else(|| ConfigError::MissingRequired {
                field: "SUPABASE_SERVICE_ROLE_KEY".to_string(),
            })?;

        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue {
                field: "SUPABASE_URL".to_string(),
                value: url,
                reason: "must start with http:// or https://".to_string(),
            });
        }

        let timeout_secs: u64 = parse_env("CSOS_STORAGE_TIMEOUT_SECS", 10)?;

        Ok(Self {
            url: url.trim().trim_end_matches('/').to_string(),
            service_role_key: SecretString::new(key.into()),
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    pub fn new(url: impl Into<String>, service_role_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            service_role_key: SecretString::new(service_role_key.into().into()),
            timeout: Duration::from_secs(10),
        }
    }

    /// Whether the service key is set, without exposing it.
    pub fn has_service_key(&self) -> bool {
        !self.service_role_key.expose_secret().is_empty()
    }
}

// ============================================================================
// RULES CONFIGURATION
// ============================================================================

/// Where rules live and how long they are cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RulesConfig {
    /// Storage bucket, also the local subdirectory name.
    pub bucket: String,
    /// Local root holding `<bucket>/<file>.yaml` fallbacks.
    pub local_dir: PathBuf,
    /// Cache entry TTL.
    pub ttl: Duration,
}

impl Default for RulesConfig {
    fn default() -> Self {
        let cache = RuleCacheConfig::default();
        Self {
            bucket: RULES_BUCKET.to_string(),
            local_dir: PathBuf::from("."),
            ttl: cache.ttl,
        }
    }
}

impl RulesConfig {
    /// # Environment Variables
    /// - `CSOS_RULES_BUCKET`: storage bucket (default: `rules`)
    /// - `CSOS_RULES_DIR`: local fallback root (default: `.`)
    /// - `CSOS_RULE_CACHE_TTL_SECS`: entry TTL (default: 300)
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let ttl_secs: u64 = parse_env("CSOS_RULE_CACHE_TTL_SECS", defaults.ttl.as_secs())?;
        Ok(Self {
            bucket: env_var("CSOS_RULES_BUCKET").unwrap_or(defaults.bucket),
            local_dir: env_var("CSOS_RULES_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.local_dir),
            ttl: Duration::from_secs(ttl_secs),
        })
    }

    pub fn cache_config(&self) -> RuleCacheConfig {
        RuleCacheConfig::new()
            .with_ttl(self.ttl)
            .with_bucket(self.bucket.clone())
    }
}

// ============================================================================
// API CONFIGURATION
// ============================================================================

/// HTTP listener and CORS settings.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Interface to bind.
    pub bind_host: String,
    /// Port to bind.
    pub port: u16,
    /// Allowed CORS origins. Empty means allow all (dev mode).
    pub cors_origins: Vec<String>,
    /// Whether to allow credentials in CORS requests.
    pub cors_allow_credentials: bool,
    /// Max age for CORS preflight cache in seconds.
    pub cors_max_age_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            port: 3000,
            cors_origins: Vec::new(),
            cors_allow_credentials: false,
            cors_max_age_secs: 86400,
        }
    }
}

impl ApiConfig {
    /// # Environment Variables
    /// - `CSOS_API_BIND`: bind host (default: 0.0.0.0)
    /// - `PORT` or `CSOS_API_PORT`: bind port (default: 3000)
    /// - `CSOS_CORS_ORIGINS`: comma-separated allowed origins (empty = allow all)
    /// - `CSOS_CORS_ALLOW_CREDENTIALS`: "true" or "false" (default: false)
    /// - `CSOS_CORS_MAX_AGE_SECS`: preflight cache duration (default: 86400)
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let port = match env_var("PORT").or_else(|| env_var("CSOS_API_PORT")) {
            None => defaults.port,
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                field: "PORT".to_string(),
                value: raw.clone(),
                reason: "expected a port number".to_string(),
            })?,
        };

        let cors_origins = env_var("CSOS_CORS_ORIGINS")
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            bind_host: env_var("CSOS_API_BIND").unwrap_or(defaults.bind_host),
            port,
            cors_origins,
            cors_allow_credentials: env_var("CSOS_CORS_ALLOW_CREDENTIALS")
                .map(|s| s.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            cors_max_age_secs: parse_env("CSOS_CORS_MAX_AGE_SECS", defaults.cors_max_age_secs)?,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_host, self.port)
    }

    /// Check if a given origin is allowed.
    pub fn is_origin_allowed(&self, origin: &str) -> bool {
        if self.cors_origins.is_empty() {
            return true;
        }
        self.cors_origins.iter().any(|allowed| {
            if allowed == origin {
                return true;
            }
            // *.example.edu matches any https subdomain
            match (allowed.strip_prefix("*."), origin.strip_prefix("https://")) {
                (Some(domain), Some(host)) => host.ends_with(&format!(".{}", domain)),
                _ => false,
            }
        })
    }
}

/// Whether `CSOS_ENVIRONMENT` names a production deployment.
pub fn is_production_environment() -> bool {
    env_var("CSOS_ENVIRONMENT")
        .map(|e| matches!(e.to_lowercase().as_str(), "production" | "prod"))
        .unwrap_or(false)
}
