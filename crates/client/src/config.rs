//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `DASHBOARD_BACKEND` - `memory`, `rest` or `postgres` (default: rest)
//! - `DASHBOARD_API_URL` - REST backend base URL (default: <http://localhost:8000>)
//! - `DASHBOARD_DATABASE_URL` - `PostgreSQL` connection string, falls back to
//!   `DATABASE_URL`; required when the backend is `postgres`
//! - `DASHBOARD_ADMIN_TOKEN` - Token that unlocks the company listing
//!   (min 32 chars, high entropy)
//! - `DASHBOARD_SESSION_FILE` - Where the client session is persisted
//!   (default: `<data dir>/saas-dashboard/session.json`)
//! - `DASHBOARD_SESSION_MAX_AGE_HOURS` - Session lifetime, `0` disables
//!   expiry (default: 720)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

use crate::session::SessionPolicy;

const DEFAULT_API_URL: &str = "http://localhost:8000";
const DEFAULT_SESSION_MAX_AGE_HOURS: &str = "720";
const MIN_ADMIN_TOKEN_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
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

/// Which backing implementation serves the data access operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    /// In-process tables; nothing survives a restart.
    Memory,
    /// The REST facade over the hosted tables.
    #[default]
    Rest,
    /// Direct access to the hosted `PostgreSQL` tables.
    Postgres,
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "stub" => Ok(Self::Memory),
            "rest" | "http" => Ok(Self::Rest),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            other => Err(format!(
                "unknown backend '{other}' (expected memory, rest or postgres)"
            )),
        }
    }
}

/// Client application configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Selected backend
    pub backend: BackendKind,
    /// Base URL of the REST backend
    pub api_base_url: Url,
    /// `PostgreSQL` connection URL (contains password)
    pub database_url: Option<SecretString>,
    /// Admin token guarding the company listing
    pub admin_token: Option<SecretString>,
    /// Session persistence settings
    pub session: SessionConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

/// Where and how long the client session is kept.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// JSON file backing the session storage area
    pub file: PathBuf,
    /// Expiry policy
    pub policy: SessionPolicy,
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is invalid, if the `postgres`
    /// backend is selected without a database URL, or if the admin token
    /// fails validation (length, placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`ClientConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        let backend = env
            .or_default("DASHBOARD_BACKEND", "rest")
            .parse::<BackendKind>()
            .map_err(|e| ConfigError::InvalidEnvVar("DASHBOARD_BACKEND".to_string(), e))?;

        let api_base_url = Url::parse(&env.or_default("DASHBOARD_API_URL", DEFAULT_API_URL))
            .map_err(|e| {
                ConfigError::InvalidEnvVar("DASHBOARD_API_URL".to_string(), e.to_string())
            })?;

        let database_url = env.database_url("DASHBOARD_DATABASE_URL");
        if backend == BackendKind::Postgres && database_url.is_none() {
            return Err(ConfigError::MissingEnvVar(
                "DASHBOARD_DATABASE_URL".to_string(),
            ));
        }

        let admin_token = match env.optional("DASHBOARD_ADMIN_TOKEN") {
            Some(value) => {
                let token = SecretString::from(value);
                validate_admin_token(&token, "DASHBOARD_ADMIN_TOKEN")?;
                Some(token)
            }
            None => None,
        };

        let session = SessionConfig::from_env(&env)?;
        let sentry_dsn = env.optional("SENTRY_DSN");

        Ok(Self {
            backend,
            api_base_url,
            database_url,
            admin_token,
            session,
            sentry_dsn,
        })
    }
}

impl SessionConfig {
    fn from_env<F>(env: &Env<F>) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file = env
            .optional("DASHBOARD_SESSION_FILE")
            .map_or_else(default_session_file, PathBuf::from);

        let hours = env
            .or_default(
                "DASHBOARD_SESSION_MAX_AGE_HOURS",
                DEFAULT_SESSION_MAX_AGE_HOURS,
            )
            .parse::<u32>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar(
                    "DASHBOARD_SESSION_MAX_AGE_HOURS".to_string(),
                    e.to_string(),
                )
            })?;

        let policy = if hours == 0 {
            SessionPolicy::never_expires()
        } else {
            SessionPolicy::expires_after(chrono::Duration::hours(i64::from(hours)))
        };

        Ok(Self { file, policy })
    }
}

fn default_session_file() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("saas-dashboard")
        .join("session.json")
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Variable lookup with the usual accessors.
struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Get an optional variable; blank values count as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    /// Get a variable with a default value.
    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    /// Get database URL with fallback to generic `DATABASE_URL`.
    fn database_url(&self, primary_key: &str) -> Option<SecretString> {
        self.optional(primary_key)
            .or_else(|| self.optional("DATABASE_URL"))
            .map(SecretString::from)
    }
}

/// Validate the admin token: long enough, not a placeholder, high entropy.
fn validate_admin_token(token: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = token.expose_secret();
    if value.len() < MIN_ADMIN_TOKEN_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_ADMIN_TOKEN_LENGTH,
                value.len()
            ),
        ));
    }
    validate_secret_strength(value, var_name)
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const STRONG_TOKEN: &str = "aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6%";

    fn load(vars: &[(&str, &str)]) -> Result<ClientConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        ClientConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.backend, BackendKind::Rest);
        assert_eq!(config.api_base_url.as_str(), "http://localhost:8000/");
        assert!(config.database_url.is_none());
        assert!(config.admin_token.is_none());
        assert!(config.session.file.ends_with("saas-dashboard/session.json"));
        assert_eq!(
            config.session.policy,
            SessionPolicy::expires_after(chrono::Duration::hours(720))
        );
    }

    #[test]
    fn test_backend_kind_parsing() {
        assert_eq!("memory".parse::<BackendKind>(), Ok(BackendKind::Memory));
        assert_eq!(" REST ".parse::<BackendKind>(), Ok(BackendKind::Rest));
        assert_eq!("postgresql".parse::<BackendKind>(), Ok(BackendKind::Postgres));
        assert!("mysql".parse::<BackendKind>().is_err());
    }

    #[test]
    fn test_postgres_requires_database_url() {
        let err = load(&[("DASHBOARD_BACKEND", "postgres")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref v) if v == "DASHBOARD_DATABASE_URL"));
    }

    #[test]
    fn test_database_url_falls_back_to_generic_var() {
        let config = load(&[
            ("DASHBOARD_BACKEND", "postgres"),
            ("DATABASE_URL", "postgres://localhost/dashboard"),
        ])
        .unwrap();
        assert_eq!(
            config.database_url.unwrap().expose_secret(),
            "postgres://localhost/dashboard"
        );
    }

    #[test]
    fn test_invalid_api_url() {
        let err = load(&[("DASHBOARD_API_URL", "not a url")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));
    }

    #[test]
    fn test_session_max_age_zero_disables_expiry() {
        let config = load(&[("DASHBOARD_SESSION_MAX_AGE_HOURS", "0")]).unwrap();
        assert_eq!(config.session.policy, SessionPolicy::never_expires());
    }

    #[test]
    fn test_session_max_age_rejects_garbage() {
        assert!(load(&[("DASHBOARD_SESSION_MAX_AGE_HOURS", "soon")]).is_err());
    }

    #[test]
    fn test_admin_token_accepted_when_strong() {
        let config = load(&[("DASHBOARD_ADMIN_TOKEN", STRONG_TOKEN)]).unwrap();
        assert_eq!(config.admin_token.unwrap().expose_secret(), STRONG_TOKEN);
    }

    #[test]
    fn test_admin_token_too_short() {
        let err = load(&[("DASHBOARD_ADMIN_TOKEN", "aB3$xY9!")]).unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_admin_token_placeholder() {
        let err = load(&[(
            "DASHBOARD_ADMIN_TOKEN",
            "your-admin-token-goes-here-0123456789",
        )])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_admin_token_low_entropy() {
        let weak = "ab".repeat(20);
        let err = load(&[("DASHBOARD_ADMIN_TOKEN", weak.as_str())]).unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_shannon_entropy() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("aaaa") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("ab") - 1.0).abs() < 0.01);
        assert!(shannon_entropy(STRONG_TOKEN) > MIN_ENTROPY_BITS_PER_CHAR);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = load(&[
            ("DASHBOARD_ADMIN_TOKEN", STRONG_TOKEN),
            ("DATABASE_URL", "postgres://user:hunter2@db/dashboard"),
        ])
        .unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains(STRONG_TOKEN));
        assert!(!debug.contains("hunter2"));
    }
}
