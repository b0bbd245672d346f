//! Secret-bearing value types.
//!
//! Both types redact themselves in `Debug` output so that logging a company
//! or a user never leaks credentials.

use core::fmt;

use serde::{Deserialize, Serialize};

/// A third-party integration secret (Shopify API key or access token).
///
/// Serializes transparently as a string because the settings form has to
/// round-trip the value, but never prints it in `Debug` output.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IntegrationSecret(String);

impl IntegrationSecret {
    /// Wrap a secret value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Get the secret value.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Convert into the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Debug for IntegrationSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("IntegrationSecret([REDACTED])")
    }
}

impl From<String> for IntegrationSecret {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for IntegrationSecret {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// An encoded password hash (PHC string format).
///
/// Opaque to everything except the password verifier. It is accepted when
/// deserializing a user but skipped when serializing one, so it never
/// travels back out over the wire.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Wrap an encoded hash.
    #[must_use]
    pub const fn new(encoded: String) -> Self {
        Self(encoded)
    }

    /// Get the encoded hash.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether a hash is present at all.
    ///
    /// Users returned by the REST backend usually arrive without one.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("PasswordHash(<none>)")
        } else {
            f.write_str("PasswordHash([REDACTED])")
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_integration_secret_debug_is_redacted() {
        let secret = IntegrationSecret::new("shpat_live_123");
        let debug = format!("{secret:?}");
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains("shpat_live_123"));
        assert_eq!(secret.expose(), "shpat_live_123");
    }

    #[test]
    fn test_integration_secret_serde_transparent() {
        let secret = IntegrationSecret::from("key");
        assert_eq!(serde_json::to_string(&secret).unwrap(), "\"key\"");
    }

    #[test]
    fn test_password_hash_debug() {
        assert_eq!(format!("{:?}", PasswordHash::default()), "PasswordHash(<none>)");
        let hash = PasswordHash::new("$argon2id$v=19$...".to_owned());
        assert!(!format!("{hash:?}").contains("argon2id"));
    }
}
