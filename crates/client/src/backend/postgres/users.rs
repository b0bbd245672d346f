//! User repository for database operations.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use saas_dashboard_core::{AppUser, CompanyId, Email, PasswordHash, UserId};

use super::RepositoryError;

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by their email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the email in the database is invalid.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<AppUser>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            SELECT id, email, password_hash, company_id, created_at
            FROM users
            WHERE email = $1
            ",
        )
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(AppUser::try_from).transpose()
    }
}

/// Insert a user inside an open transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if the email already exists.
/// Returns `RepositoryError::Database` for other database errors.
pub async fn insert(
    conn: &mut PgConnection,
    email: &Email,
    password_hash: &PasswordHash,
    company_id: CompanyId,
) -> Result<AppUser, RepositoryError> {
    let row = sqlx::query_as::<_, UserRow>(
        r"
        INSERT INTO users (email, password_hash, company_id)
        VALUES ($1, $2, $3)
        RETURNING id, email, password_hash, company_id, created_at
        ",
    )
    .bind(email.as_str())
    .bind(password_hash.as_str())
    .bind(company_id.as_i32())
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.is_unique_violation()
        {
            return RepositoryError::Conflict(
                "An account with this email already exists".to_owned(),
            );
        }
        RepositoryError::Database(e)
    })?;

    AppUser::try_from(row)
}

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i32,
    email: String,
    password_hash: String,
    company_id: i32,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for AppUser {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: UserId::new(row.id),
            email,
            password_hash: PasswordHash::new(row.password_hash),
            company_id: CompanyId::new(row.company_id),
            created_at: row.created_at,
        })
    }
}
