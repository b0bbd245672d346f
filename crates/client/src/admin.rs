//! Admin capability for the company listing.
//!
//! Listing every company is an administrative operation. Callers must hold
//! an [`AdminCapability`], which can only be obtained by presenting the
//! configured admin token.

use secrecy::{ExposeSecret, SecretString};

use crate::error::DataAccessError;

/// Proof that the caller presented the admin token.
///
/// The REST backend forwards the token as a bearer credential; the other
/// backends only check that the capability exists.
#[derive(Debug, Clone)]
pub struct AdminCapability {
    token: SecretString,
}

impl AdminCapability {
    /// Grant the capability if `presented` matches the configured token.
    ///
    /// # Errors
    ///
    /// Returns `DataAccessError::Forbidden` if no admin token is configured
    /// or the presented token does not match.
    pub fn grant(
        configured: Option<&SecretString>,
        presented: &str,
    ) -> Result<Self, DataAccessError> {
        let Some(configured) = configured else {
            tracing::warn!("Admin access requested but no admin token is configured");
            return Err(DataAccessError::Forbidden(
                "Admin access is not configured".to_string(),
            ));
        };

        if !constant_time_compare(configured.expose_secret(), presented) {
            tracing::warn!("Admin access denied: token mismatch");
            return Err(DataAccessError::Forbidden("Admin access denied".to_string()));
        }

        Ok(Self {
            token: configured.clone(),
        })
    }

    /// The token to forward to a remote service.
    #[must_use]
    pub const fn token(&self) -> &SecretString {
        &self.token
    }
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}
