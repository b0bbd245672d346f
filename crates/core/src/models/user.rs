//! Application user types and auth results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Company;
use crate::types::{CompanyId, Email, PasswordHash, UserId};

/// A user account. Every user belongs to exactly one company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppUser {
    /// Unique user ID.
    pub id: UserId,
    /// Login email, unique across all users.
    pub email: Email,
    /// Encoded password hash; empty when the backend does not disclose it.
    #[serde(default, skip_serializing)]
    pub password_hash: PasswordHash,
    /// Company that owns this user.
    pub company_id: CompanyId,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
}

/// Result of a successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResult {
    pub user: AppUser,
    /// `None` when the user's company has not been provisioned.
    pub company: Option<Company>,
}

/// Result of a successful signup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignupResult {
    pub user: AppUser,
    pub company: Company,
}
