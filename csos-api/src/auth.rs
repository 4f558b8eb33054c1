//! Authentication Module
//!
//! Callers authenticate with a bearer JWT (HS256, shared secret) issued by
//! the identity backend. The `sub` claim carries the user's UUID. Roles are
//! not trusted from the token; the middleware resolves them from the role
//! store after the token verifies.

use crate::config::is_production_environment;
use crate::error::{ApiError, ApiResult};
use csos_core::{is_privileged, ConfigError, UserId};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

const INSECURE_DEFAULT_SECRET: &str = "INSECURE_DEFAULT_SECRET_CHANGE_IN_PRODUCTION";

// ============================================================================
// CLOCK ABSTRACTION
// ============================================================================

/// Time source for JWT time validation.
///
/// `jsonwebtoken` only checks `exp` against the system clock; validating
/// times ourselves lets tests pin the clock.
pub trait JwtClock: Send + Sync {
    /// Current time as Unix epoch seconds. May be negative on a broken host.
    fn now_epoch_secs(&self) -> i64;
}

/// Production clock using system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl JwtClock for SystemClock {
    fn now_epoch_secs(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// Fixed clock for deterministic tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub i64);

impl JwtClock for FixedClock {
    fn now_epoch_secs(&self) -> i64 {
        self.0
    }
}

/// Test clock helpers for common scenarios.
#[cfg(test)]
pub mod test_clocks {
    use super::FixedClock;

    /// 2024-01-01 00:00:00 UTC
    pub fn valid() -> FixedClock {
        FixedClock(1704067200)
    }

    /// 2030-01-01 00:00:00 UTC
    pub fn future() -> FixedClock {
        FixedClock(1893456000)
    }
}

// ============================================================================
// JWT SECRET
// ============================================================================

/// JWT signing secret that never appears in logs.
#[derive(Clone)]
pub struct JwtSecret(SecretString);

impl JwtSecret {
    /// # Errors
    /// Returns error if the secret is empty.
    pub fn new(secret: String) -> Result<Self, ConfigError> {
        if secret.is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "CSOS_JWT_SECRET".to_string(),
            });
        }
        Ok(Self(SecretString::new(secret.into())))
    }

    /// Expose the secret value for signing and verification.
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    pub fn len(&self) -> usize {
        self.0.expose_secret().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.expose_secret().is_empty()
    }

    pub fn is_insecure_default(&self) -> bool {
        self.0.expose_secret() == INSECURE_DEFAULT_SECRET
    }
}

impl std::fmt::Debug for JwtSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "JwtSecret([REDACTED, {} chars])", self.len())
    }
}

fn build_jwt_secret(secret_str: String) -> JwtSecret {
    let normalized = if secret_str.trim().is_empty() {
        INSECURE_DEFAULT_SECRET.to_string()
    } else {
        secret_str
    };

    match JwtSecret::new(normalized) {
        Ok(secret) => secret,
        Err(_) => JwtSecret(SecretString::new(INSECURE_DEFAULT_SECRET.to_string().into())),
    }
}

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Authentication configuration.
#[derive(Clone)]
pub struct AuthConfig {
    /// Shared secret for HS256 verification
    pub jwt_secret: JwtSecret,

    /// JWT algorithm (default: HS256)
    pub jwt_algorithm: Algorithm,

    /// Lifetime of tokens minted by [`generate_jwt_token`] (default: 1 hour)
    pub jwt_expiration_secs: i64,

    /// Tolerance applied to `exp` and `nbf` (default: 60)
    pub jwt_clock_skew_secs: i64,

    /// Clock for JWT time validation
    pub clock: Arc<dyn JwtClock>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &self.jwt_secret)
            .field("jwt_algorithm", &self.jwt_algorithm)
            .field("jwt_expiration_secs", &self.jwt_expiration_secs)
            .field("jwt_clock_skew_secs", &self.jwt_clock_skew_secs)
            .field("clock", &"<JwtClock>")
            .finish()
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        let secret_str = std::env::var("CSOS_JWT_SECRET").unwrap_or_default();

        Self {
            jwt_secret: build_jwt_secret(secret_str),
            jwt_algorithm: Algorithm::HS256,
            jwt_expiration_secs: 3600,
            jwt_clock_skew_secs: 60,
            clock: Arc::new(SystemClock),
        }
    }
}

impl AuthConfig {
    /// # Environment Variables
    /// - `CSOS_JWT_SECRET`: JWT signing secret
    /// - `CSOS_JWT_EXPIRATION_SECS`: lifetime of minted tokens (default: 3600)
    /// - `CSOS_JWT_CLOCK_SKEW_SECS`: clock skew tolerance (default: 60)
    pub fn from_env() -> Self {
        let secret_str = std::env::var("CSOS_JWT_SECRET").unwrap_or_default();

        Self {
            jwt_secret: build_jwt_secret(secret_str),
            jwt_algorithm: Algorithm::HS256,
            jwt_expiration_secs: std::env::var("CSOS_JWT_EXPIRATION_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3600),
            jwt_clock_skew_secs: std::env::var("CSOS_JWT_CLOCK_SKEW_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(60),
            clock: Arc::new(SystemClock),
        }
    }

    /// Config with an explicit secret and clock.
    pub fn with_secret(secret: &str, clock: Arc<dyn JwtClock>) -> Result<Self, ConfigError> {
        Ok(Self {
            jwt_secret: JwtSecret::new(secret.to_string())?,
            jwt_algorithm: Algorithm::HS256,
            jwt_expiration_secs: 3600,
            jwt_clock_skew_secs: 60,
            clock,
        })
    }

    /// Refuse insecure secrets when `CSOS_ENVIRONMENT` is production; warn
    /// otherwise.
    pub fn validate_for_production(&self) -> Result<(), ConfigError> {
        let is_production = is_production_environment();

        if self.jwt_secret.is_insecure_default() {
            if is_production {
                return Err(ConfigError::InvalidValue {
                    field: "CSOS_JWT_SECRET".to_string(),
                    value: "[default]".to_string(),
                    reason: "a real secret is required in production".to_string(),
                });
            }
            tracing::warn!(
                "Using insecure default JWT secret. Set CSOS_JWT_SECRET before deploying."
            );
        } else if self.jwt_secret.len() < 32 {
            if is_production {
                return Err(ConfigError::InvalidValue {
                    field: "CSOS_JWT_SECRET".to_string(),
                    value: format!("[{} chars]", self.jwt_secret.len()),
                    reason: "must be at least 32 characters in production".to_string(),
                });
            }
            tracing::warn!(
                chars = self.jwt_secret.len(),
                "JWT secret is short; use at least 32 characters in production"
            );
        }

        Ok(())
    }
}

// ============================================================================
// JWT CLAIMS
// ============================================================================

/// JWT claims accepted from the identity backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user UUID)
    pub sub: String,

    /// Issued at (Unix timestamp)
    #[serde(default)]
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Not valid before (Unix timestamp)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Claims {
    pub fn new(user_id: UserId, expiration_secs: i64, clock: &dyn JwtClock) -> Self {
        let now = clock.now_epoch_secs();
        Self {
            sub: user_id.to_string(),
            iat: now,
            exp: now + expiration_secs,
            nbf: None,
            email: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// The subject as a user id.
    pub fn user_id(&self) -> ApiResult<UserId> {
        Uuid::parse_str(&self.sub)
            .map_err(|_| ApiError::invalid_token("Token subject is not a valid user id"))
    }
}

// ============================================================================
// AUTHENTICATION CONTEXT
// ============================================================================

/// Authenticated caller, injected into request extensions by the middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: UserId,
    pub email: Option<String>,
    /// Roles from the role store at request time
    pub roles: Vec<String>,
}

impl AuthContext {
    pub fn new(user_id: UserId, roles: Vec<String>) -> Self {
        Self {
            user_id,
            email: None,
            roles,
        }
    }

    pub fn with_roles(mut self, roles: Vec<String>) -> Self {
        self.roles = roles;
        self
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn has_any_role(&self, roles: &[&str]) -> bool {
        roles.iter().any(|role| self.has_role(role))
    }

    /// Holds `admin` or `super_admin`.
    pub fn is_privileged(&self) -> bool {
        is_privileged(&self.roles)
    }

    /// Fail with `Forbidden` unless the caller is privileged.
    pub fn require_privileged(&self) -> ApiResult<()> {
        if self.is_privileged() {
            Ok(())
        } else {
            Err(ApiError::forbidden("Admin or super_admin role required"))
        }
    }
}

// ============================================================================
// AUTHENTICATION FUNCTIONS
// ============================================================================

/// Check `exp` and `nbf` against `now`, allowing `leeway_secs` either way.
fn validate_claim_times(now: i64, exp: i64, nbf: Option<i64>, leeway_secs: i64) -> ApiResult<()> {
    if let Some(nbf) = nbf {
        if now + leeway_secs < nbf {
            return Err(ApiError::invalid_token("Token not yet valid (nbf)"));
        }
    }

    if exp < now - leeway_secs {
        return Err(ApiError::token_expired());
    }

    Ok(())
}

/// Verify the signature and claim times of a token.
///
/// Signature checking is left to `jsonwebtoken`; `exp`/`nbf` are checked
/// against the configured [`JwtClock`].
pub fn validate_jwt_token(config: &AuthConfig, token: &str) -> ApiResult<Claims> {
    let decoding_key = DecodingKey::from_secret(config.jwt_secret.expose().as_bytes());

    let mut validation = Validation::new(config.jwt_algorithm);
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation.required_spec_claims = std::collections::HashSet::from(["exp".to_string()]);

    let token_data =
        decode::<Claims>(token, &decoding_key, &validation).map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::InvalidToken => {
                ApiError::invalid_token("Token is invalid")
            }
            jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                ApiError::invalid_token("Token signature is invalid")
            }
            _ => ApiError::invalid_token(format!("Token validation failed: {}", e)),
        })?;

    let claims = token_data.claims;
    let now = config.clock.now_epoch_secs();

    if now < 0 {
        tracing::error!(
            timestamp = now,
            "System clock returned pre-epoch time - server time is broken"
        );
        return Err(ApiError::internal_error(
            "Server time configuration error - please contact support",
        ));
    }

    validate_claim_times(now, claims.exp, claims.nbf, config.jwt_clock_skew_secs)?;

    Ok(claims)
}

/// Mint a token for a user. Used by tests and local tooling; production
/// tokens come from the identity backend.
pub fn generate_jwt_token(
    config: &AuthConfig,
    user_id: UserId,
    email: Option<String>,
) -> ApiResult<String> {
    let mut claims = Claims::new(user_id, config.jwt_expiration_secs, &*config.clock);
    claims.email = email;

    let encoding_key = EncodingKey::from_secret(config.jwt_secret.expose().as_bytes());
    let header = Header::new(config.jwt_algorithm);

    encode(&header, &claims, &encoding_key)
        .map_err(|e| ApiError::internal_error(format!("Failed to generate token: {}", e)))
}

/// Authenticate from an `Authorization` header value.
///
/// The returned context has no roles yet.
pub fn authenticate(config: &AuthConfig, auth_header: Option<&str>) -> ApiResult<AuthContext> {
    let auth_value = auth_header.ok_or_else(|| {
        ApiError::unauthorized("Authentication required: provide an Authorization header")
    })?;

    let token = auth_value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::invalid_token("Authorization header must use Bearer scheme"))?;

    let claims = validate_jwt_token(config, token)?;
    let user_id = claims.user_id()?;

    Ok(AuthContext {
        user_id,
        email: claims.email,
        roles: Vec::new(),
    })
}

// ============================================================================
// TESTS
// ============================================================================
