//! Unified data access errors with Sentry integration.
//!
//! Every backend normalizes its failures into [`DataAccessError`]. Page
//! controllers turn these into displayed messages through
//! [`DataAccessError::user_message`]; backend failures are also captured to
//! Sentry on the way.

use thiserror::Error;

/// Message shown for any credential mismatch.
pub const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// Failures of the data access operations.
///
/// Missing single-entity lookups are not represented here: they come back as
/// `Ok(None)`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DataAccessError {
    /// Malformed or missing input.
    #[error("{0}")]
    Validation(String),

    /// Credentials did not match a stored user.
    #[error("{0}")]
    Auth(String),

    /// An account with this email already exists.
    #[error("{0}")]
    Conflict(String),

    /// The entity an update targets does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The caller lacks the capability the operation requires.
    #[error("{0}")]
    Forbidden(String),

    /// Transport or server failure; the message is surfaced verbatim.
    #[error("{0}")]
    Backend(String),
}

impl DataAccessError {
    /// Credential mismatch with the standard message.
    #[must_use]
    pub fn invalid_credentials() -> Self {
        Self::Auth(INVALID_CREDENTIALS.to_string())
    }

    /// Duplicate account with the standard message.
    #[must_use]
    pub fn email_taken() -> Self {
        Self::Conflict("An account with this email already exists".to_string())
    }

    /// Whether this failure came from the transport or the server rather
    /// than from the user's input.
    #[must_use]
    pub const fn is_backend(&self) -> bool {
        matches!(self, Self::Backend(_))
    }

    /// The message to display to the user.
    ///
    /// Backend failures are captured to Sentry before the message is handed
    /// back; everything else is an expected outcome of user input.
    #[must_use]
    pub fn user_message(&self) -> String {
        if self.is_backend() {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Data access error"
            );
        }

        self.to_string()
    }
}

impl From<reqwest::Error> for DataAccessError {
    fn from(err: reqwest::Error) -> Self {
        Self::Backend(err.to_string())
    }
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of page
/// actions leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str) {
    sentry::add_breadcrumb(sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    });
}

/// Result type alias for `DataAccessError`.
pub type Result<T> = std::result::Result<T, DataAccessError>;
