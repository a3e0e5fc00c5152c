//! Service configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `COUCHDB_URL` - Base URL of the `CouchDB` / Cloudant server (unless `STORE_BACKEND=memory`)
//!
//! ## Optional
//! - `CUSTOMER_HOST` - Bind address (default: 127.0.0.1)
//! - `CUSTOMER_PORT` - Listen port (default: 8080)
//! - `STORE_BACKEND` - `couchdb` or `memory` (default: couchdb)
//! - `COUCHDB_DATABASE` - Database name (default: customers)
//! - `COUCHDB_USERNAME` - Basic auth user
//! - `COUCHDB_PASSWORD` - Basic auth password
//! - `STORE_TIMEOUT_MS` - Per-request store timeout (default: 5000)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.0)
//! - `LOG_FORMAT` - `json` for JSON log lines (read by the binary, not this module)
//! - `RUST_LOG` - Tracing filter (default: `customer_service=info,tower_http=debug`)

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

const DEFAULT_STORE_TIMEOUT_MS: u64 = 5000;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Customer service configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Document store configuration
    pub store: StoreConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name (e.g. production, staging)
    pub sentry_environment: Option<String>,
    /// Fraction of errors sent to Sentry
    pub sentry_sample_rate: f32,
    /// Fraction of transactions sent to Sentry
    pub sentry_traces_sample_rate: f32,
}

/// Document store configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Which backend to use
    pub backend: StoreBackend,
    /// Upper bound on a single store call
    pub timeout: Duration,
}

/// Selectable store backends.
#[derive(Debug, Clone)]
pub enum StoreBackend {
    /// A `CouchDB`-protocol server.
    CouchDb(CouchDbConfig),
    /// In-process store (data is lost on exit).
    Memory,
}

/// `CouchDB` connection settings.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct CouchDbConfig {
    /// Server base URL, e.g. `https://account.cloudant.com`
    pub url: String,
    /// Database holding customer documents
    pub database: String,
    /// Basic auth user
    pub username: Option<String>,
    /// Basic auth password
    pub password: Option<SecretString>,
}

impl std::fmt::Debug for CouchDbConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CouchDbConfig")
            .field("url", &self.url)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid,
    /// or if the store password looks like a placeholder.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Same as [`ServiceConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let host = parse_env(&lookup, "CUSTOMER_HOST", "127.0.0.1")?;
        let port = parse_env(&lookup, "CUSTOMER_PORT", "8080")?;
        let store = StoreConfig::from_lookup(&lookup)?;

        Ok(Self {
            host,
            port,
            store,
            sentry_dsn: lookup("SENTRY_DSN"),
            sentry_environment: lookup("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: parse_env(&lookup, "SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: parse_env(&lookup, "SENTRY_TRACES_SAMPLE_RATE", "0.0")?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl StoreConfig {
    /// Load only the store settings from the environment.
    ///
    /// Used by the CLI, which has no listener to configure.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if store variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        Self::from_lookup(&|key: &str| std::env::var(key).ok())
    }

    fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let timeout_ms: u64 = parse_env(
            lookup,
            "STORE_TIMEOUT_MS",
            &DEFAULT_STORE_TIMEOUT_MS.to_string(),
        )?;
        if timeout_ms == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "STORE_TIMEOUT_MS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        let backend = match get_env_or_default(lookup, "STORE_BACKEND", "couchdb")
            .to_lowercase()
            .as_str()
        {
            "couchdb" | "cloudant" => StoreBackend::CouchDb(CouchDbConfig::from_lookup(lookup)?),
            "memory" => StoreBackend::Memory,
            other => {
                return Err(ConfigError::InvalidEnvVar(
                    "STORE_BACKEND".to_string(),
                    format!("unknown backend '{other}' (expected couchdb or memory)"),
                ));
            }
        };

        Ok(Self {
            backend,
            timeout: Duration::from_millis(timeout_ms),
        })
    }
}

impl CouchDbConfig {
    fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let url = get_required_env(lookup, "COUCHDB_URL")?;
        url::Url::parse(&url)
            .map_err(|e| ConfigError::InvalidEnvVar("COUCHDB_URL".to_string(), e.to_string()))?;

        let password = match lookup("COUCHDB_PASSWORD") {
            Some(value) => {
                validate_secret_strength(&value, "COUCHDB_PASSWORD")?;
                Some(SecretString::from(value))
            }
            None => None,
        };

        Ok(Self {
            url,
            database: get_env_or_default(lookup, "COUCHDB_DATABASE", "customers"),
            username: lookup("COUCHDB_USERNAME"),
            password,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<String, ConfigError> {
    lookup(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an environment variable with a default value.
fn get_env_or_default(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> String {
    lookup(key).unwrap_or_else(|| default.to_string())
}

/// Parse an environment variable (or its default) into `T`.
fn parse_env<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: &str,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(lookup, key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Validate that a secret is not an obvious placeholder.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    if secret.is_empty() {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            "must not be empty".to_string(),
        ));
    }

    let lower = secret.to_lowercase();
    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_with_memory_backend() {
        let config = ServiceConfig::from_lookup(lookup_from(&[("STORE_BACKEND", "memory")])).unwrap();

        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:8080");
        assert!(matches!(config.store.backend, StoreBackend::Memory));
        assert_eq!(config.store.timeout, Duration::from_millis(5000));
        assert!(config.sentry_dsn.is_none());
        assert!((config.sentry_sample_rate - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_couchdb_requires_url() {
        let result = ServiceConfig::from_lookup(lookup_from(&[]));
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(ref key)) if key == "COUCHDB_URL"));
    }

    #[test]
    fn test_couchdb_config() {
        let config = ServiceConfig::from_lookup(lookup_from(&[
            ("COUCHDB_URL", "http://localhost:5984"),
            ("COUCHDB_USERNAME", "service"),
            ("COUCHDB_PASSWORD", "k3Jq9!vTz@8mWp"),
            ("CUSTOMER_PORT", "9090"),
            ("STORE_TIMEOUT_MS", "250"),
        ]))
        .unwrap();

        assert_eq!(config.port, 9090);
        assert_eq!(config.store.timeout, Duration::from_millis(250));
        let StoreBackend::CouchDb(couch) = config.store.backend else {
            panic!("expected couchdb backend");
        };
        assert_eq!(couch.database, "customers");
        assert_eq!(couch.username.as_deref(), Some("service"));
        assert_eq!(
            couch.password.as_ref().map(ExposeSecret::expose_secret),
            Some("k3Jq9!vTz@8mWp")
        );
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let bad_port = ServiceConfig::from_lookup(lookup_from(&[
            ("STORE_BACKEND", "memory"),
            ("CUSTOMER_PORT", "not-a-port"),
        ]));
        assert!(matches!(bad_port, Err(ConfigError::InvalidEnvVar(ref key, _)) if key == "CUSTOMER_PORT"));

        let bad_backend = ServiceConfig::from_lookup(lookup_from(&[("STORE_BACKEND", "redis")]));
        assert!(matches!(bad_backend, Err(ConfigError::InvalidEnvVar(ref key, _)) if key == "STORE_BACKEND"));

        let zero_timeout = ServiceConfig::from_lookup(lookup_from(&[
            ("STORE_BACKEND", "memory"),
            ("STORE_TIMEOUT_MS", "0"),
        ]));
        assert!(zero_timeout.is_err());

        let bad_url = ServiceConfig::from_lookup(lookup_from(&[("COUCHDB_URL", "not a url")]));
        assert!(matches!(bad_url, Err(ConfigError::InvalidEnvVar(ref key, _)) if key == "COUCHDB_URL"));
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-password-here", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));

        assert!(validate_secret_strength("changeme123", "TEST_VAR").is_err());
        assert!(validate_secret_strength("", "TEST_VAR").is_err());
        assert!(validate_secret_strength("k3Jq9!vTz@8mWp", "TEST_VAR").is_ok());
    }

    #[test]
    fn test_couchdb_config_debug_redacts_password() {
        let config = CouchDbConfig {
            url: "http://localhost:5984".to_string(),
            database: "customers".to_string(),
            username: Some("service".to_string()),
            password: Some(SecretString::from("super_secret_password")),
        };

        let debug_output = format!("{config:?}");

        assert!(debug_output.contains("localhost:5984"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_password"));
    }
}
