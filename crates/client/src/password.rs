//! Password hashing for backends that verify credentials themselves.
//!
//! The in-memory and direct-store backends both act as the trusted boundary
//! for credentials: passwords are hashed with a per-user random salt using
//! Argon2id and only ever compared through the verifier.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{
        PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng,
    },
};
use saas_dashboard_core::PasswordHash as StoredHash;
use thiserror::Error;

/// Errors that can occur while hashing.
#[derive(Debug, Error)]
pub enum PasswordError {
    /// The Argon2 parameters are out of range.
    #[error("invalid argon2 parameters: {0}")]
    Params(String),

    /// Hashing itself failed.
    #[error("password hashing error")]
    Hash,
}

/// Argon2id hasher with configurable cost.
#[derive(Clone)]
pub struct CredentialHasher {
    argon2: Argon2<'static>,
}

impl Default for CredentialHasher {
    fn default() -> Self {
        Self {
            argon2: Argon2::default(),
        }
    }
}

impl std::fmt::Debug for CredentialHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialHasher").finish_non_exhaustive()
    }
}

impl CredentialHasher {
    /// Build a hasher with explicit memory (KiB) and iteration costs.
    ///
    /// # Errors
    ///
    /// Returns `PasswordError::Params` if the costs are below the Argon2
    /// minimums.
    pub fn with_cost(memory_kib: u32, iterations: u32) -> Result<Self, PasswordError> {
        let params = Params::new(memory_kib, iterations, 1, None)
            .map_err(|e| PasswordError::Params(e.to_string()))?;

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// The cheapest hasher Argon2 allows. Only for tests and local stubs.
    #[must_use]
    pub fn minimal() -> Self {
        let params = Params::new(Params::MIN_M_COST, Params::MIN_T_COST, 1, None)
            .unwrap_or_default();
        Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        }
    }

    /// Hash a password with a fresh random salt.
    ///
    /// # Errors
    ///
    /// Returns `PasswordError::Hash` if Argon2 rejects the input.
    pub fn hash(&self, password: &str) -> Result<StoredHash, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);

        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| StoredHash::new(hash.to_string()))
            .map_err(|_| PasswordError::Hash)
    }

    /// Check a password against a stored hash.
    ///
    /// The cost parameters are read from the hash itself, so hashes made
    /// with other settings still verify. Empty or unparsable hashes never
    /// match.
    #[must_use]
    pub fn verify(&self, password: &str, stored: &StoredHash) -> bool {
        let Ok(parsed) = PasswordHash::new(stored.as_str()) else {
            return false;
        };

        self.argon2
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_then_verify() {
        let hasher = CredentialHasher::minimal();
        let hash = hasher.hash("correct horse").unwrap();

        assert!(hash.as_str().starts_with("$argon2id$"));
        assert!(hasher.verify("correct horse", &hash));
        assert!(!hasher.verify("battery staple", &hash));
    }

    #[test]
    fn test_salts_differ() {
        let hasher = CredentialHasher::minimal();
        let a = hasher.hash("x").unwrap();
        let b = hasher.hash("x").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_hash_never_contains_plaintext() {
        let hasher = CredentialHasher::minimal();
        let hash = hasher.hash("plaintext-password").unwrap();
        assert!(!hash.as_str().contains("plaintext-password"));
    }

    #[test]
    fn test_empty_or_garbage_hash_never_verifies() {
        let hasher = CredentialHasher::minimal();
        assert!(!hasher.verify("", &StoredHash::default()));
        assert!(!hasher.verify("x", &StoredHash::new("x".to_owned())));
    }

    #[test]
    fn test_cost_is_read_from_hash() {
        let cheap = CredentialHasher::minimal();
        let hash = cheap.hash("pw").unwrap();
        assert!(CredentialHasher::default().verify("pw", &hash));
    }

    #[test]
    fn test_with_cost_rejects_out_of_range() {
        assert!(CredentialHasher::with_cost(1, 1).is_err());
        assert!(CredentialHasher::with_cost(Params::MIN_M_COST, 1).is_ok());
    }
}
