//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STOREFRONT_SESSION_MAX_AGE_DAYS` - Session inactivity expiry, 1 to 3650 (default: 30)
//! - `STOREFRONT_SIGN_IN_PATH` - Where denied page requests are sent (default: /sign-in)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::net::{IpAddr, SocketAddr};

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const DEFAULT_SESSION_MAX_AGE_DAYS: i64 = 30;
const MAX_SESSION_MAX_AGE_DAYS: i64 = 3650;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: Url,
    /// Days of inactivity before a session expires
    pub session_max_age_days: i64,
    /// Path of the sign-in page
    pub sign_in_path: String,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(lookup);

        let database_url = env.database_url("STOREFRONT_DATABASE_URL")?;
        let host = env.parsed_or_default("STOREFRONT_HOST", "127.0.0.1")?;
        let port = env.parsed_or_default("STOREFRONT_PORT", "3000")?;
        let base_url = env.required("STOREFRONT_BASE_URL")?;
        let base_url = Url::parse(&base_url).map_err(|e| {
            ConfigError::InvalidEnvVar("STOREFRONT_BASE_URL".to_string(), e.to_string())
        })?;

        let session_max_age_days = env.parsed_or_default(
            "STOREFRONT_SESSION_MAX_AGE_DAYS",
            &DEFAULT_SESSION_MAX_AGE_DAYS.to_string(),
        )?;
        if !(1..=MAX_SESSION_MAX_AGE_DAYS).contains(&session_max_age_days) {
            return Err(ConfigError::InvalidEnvVar(
                "STOREFRONT_SESSION_MAX_AGE_DAYS".to_string(),
                format!("must be between 1 and {MAX_SESSION_MAX_AGE_DAYS}"),
            ));
        }

        let sign_in_path = env.or_default("STOREFRONT_SIGN_IN_PATH", "/sign-in");
        if !sign_in_path.starts_with('/') {
            return Err(ConfigError::InvalidEnvVar(
                "STOREFRONT_SIGN_IN_PATH".to_string(),
                "must start with '/'".to_string(),
            ));
        }

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            session_max_age_days,
            sign_in_path,
            sentry_dsn: env.optional("SENTRY_DSN"),
            sentry_environment: env.optional("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should carry the `Secure` attribute.
    #[must_use]
    pub fn secure_cookies(&self) -> bool {
        self.base_url.scheme() == "https"
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Env<F>(F);

impl<F: Fn(&str) -> Option<String>> Env<F> {
    /// Get a non-empty variable.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    /// Get a required environment variable.
    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    /// Get an environment variable with a default value.
    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    fn parsed_or_default<T>(&self, key: &str, default: &str) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        self.or_default(key, default)
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    }

    /// Get database URL with fallback to generic `DATABASE_URL` (used by Fly.io postgres attach).
    fn database_url(&self, primary_key: &str) -> Result<SecretString, ConfigError> {
        self.optional(primary_key)
            .or_else(|| self.optional("DATABASE_URL"))
            .map(SecretString::from)
            .ok_or_else(|| ConfigError::MissingEnvVar(primary_key.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<StorefrontConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        StorefrontConfig::from_lookup(|key| vars.get(key).cloned())
    }

    const MINIMAL: &[(&str, &str)] = &[
        ("STOREFRONT_DATABASE_URL", "postgres://localhost/prostore"),
        ("STOREFRONT_BASE_URL", "http://localhost:3000"),
    ];

    #[test]
    fn test_defaults() {
        let config = load(MINIMAL).unwrap();
        assert_eq!(config.session_max_age_days, 30);
        assert_eq!(config.sign_in_path, "/sign-in");
        assert!(config.sentry_dsn.is_none());
        assert!(!config.secure_cookies());

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
    }

    #[test]
    fn test_missing_required() {
        let err = load(&[("STOREFRONT_BASE_URL", "http://localhost:3000")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(key) if key == "STOREFRONT_DATABASE_URL"));

        let err = load(&[("STOREFRONT_DATABASE_URL", "postgres://x")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(key) if key == "STOREFRONT_BASE_URL"));
    }

    #[test]
    fn test_database_url_fallback() {
        let config = load(&[
            ("DATABASE_URL", "postgres://fly/prostore"),
            ("STOREFRONT_BASE_URL", "https://shop.example.com"),
        ])
        .unwrap();
        assert_eq!(config.database_url.expose_secret(), "postgres://fly/prostore");
        assert!(config.secure_cookies());
    }

    #[test]
    fn test_invalid_values() {
        let mut vars = MINIMAL.to_vec();
        vars.push(("STOREFRONT_PORT", "not-a-port"));
        assert!(matches!(load(&vars), Err(ConfigError::InvalidEnvVar(..))));

        let mut vars = MINIMAL.to_vec();
        vars.push(("STOREFRONT_SESSION_MAX_AGE_DAYS", "0"));
        assert!(matches!(load(&vars), Err(ConfigError::InvalidEnvVar(..))));

        let mut vars = MINIMAL.to_vec();
        vars.push(("STOREFRONT_SIGN_IN_PATH", "sign-in"));
        assert!(matches!(load(&vars), Err(ConfigError::InvalidEnvVar(..))));

        let vars = [
            ("STOREFRONT_DATABASE_URL", "postgres://x"),
            ("STOREFRONT_BASE_URL", "not a url"),
        ];
        assert!(matches!(load(&vars), Err(ConfigError::InvalidEnvVar(..))));
    }

    #[test]
    fn test_session_max_age_bounds() {
        for (value, ok) in [("1", true), ("3650", true), ("3651", false), ("-1", false)] {
            let mut vars = MINIMAL.to_vec();
            vars.push(("STOREFRONT_SESSION_MAX_AGE_DAYS", value));
            assert_eq!(load(&vars).is_ok(), ok, "{value}");
        }

        let mut vars = MINIMAL.to_vec();
        vars.push(("STOREFRONT_SESSION_MAX_AGE_DAYS", "9223372036854775807"));
        assert!(matches!(
            load(&vars),
            Err(ConfigError::InvalidEnvVar(key, _)) if key == "STOREFRONT_SESSION_MAX_AGE_DAYS"
        ));
    }

    #[test]
    fn test_overrides() {
        let mut vars = MINIMAL.to_vec();
        vars.extend([
            ("STOREFRONT_HOST", "0.0.0.0"),
            ("STOREFRONT_PORT", "8080"),
            ("STOREFRONT_SESSION_MAX_AGE_DAYS", "7"),
            ("STOREFRONT_SIGN_IN_PATH", "/login"),
            ("SENTRY_ENVIRONMENT", "staging"),
        ]);
        let config = load(&vars).unwrap();
        assert_eq!(config.socket_addr().to_string(), "0.0.0.0:8080");
        assert_eq!(config.session_max_age_days, 7);
        assert_eq!(config.sign_in_path, "/login");
        assert_eq!(config.sentry_environment.as_deref(), Some("staging"));
    }
}
