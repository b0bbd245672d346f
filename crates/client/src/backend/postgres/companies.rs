//! Company repository for database operations.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use tracing::debug;

use saas_dashboard_core::{Company, CompanyId, CompanySettingsInput, IntegrationSecret};

use super::RepositoryError;

const COMPANY_COLUMNS: &str = "id, name, shopify_domain, api_key, access_token, created_at";

/// Repository for company database operations.
pub struct CompanyRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CompanyRepository<'a> {
    /// Create a new company repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a company by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: CompanyId) -> Result<Option<Company>, RepositoryError> {
        let row = sqlx::query_as::<_, CompanyRow>(&format!(
            "SELECT {COMPANY_COLUMNS} FROM companies WHERE id = $1"
        ))
        .bind(id.as_i32())
        .fetch_optional(self.pool)
        .await?;

        debug!(company_id = %id, found = row.is_some(), "Fetched company");
        Ok(row.map(Company::from))
    }

    /// List every company, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Company>, RepositoryError> {
        let rows = sqlx::query_as::<_, CompanyRow>(&format!(
            "SELECT {COMPANY_COLUMNS} FROM companies ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Company::from).collect())
    }

    /// Overwrite the Shopify credential columns of a company.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the company does not exist.
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn update_settings(
        &self,
        id: CompanyId,
        settings: &CompanySettingsInput,
    ) -> Result<Company, RepositoryError> {
        let api_key = settings.api_key();
        let access_token = settings.access_token();

        let row = sqlx::query_as::<_, CompanyRow>(&format!(
            "UPDATE companies
             SET shopify_domain = $2, api_key = $3, access_token = $4
             WHERE id = $1
             RETURNING {COMPANY_COLUMNS}"
        ))
        .bind(id.as_i32())
        .bind(settings.domain())
        .bind(api_key.as_ref().map(IntegrationSecret::expose))
        .bind(access_token.as_ref().map(IntegrationSecret::expose))
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }
}

/// Insert a company inside an open transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn insert(conn: &mut PgConnection, name: &str) -> Result<Company, RepositoryError> {
    let row = sqlx::query_as::<_, CompanyRow>(&format!(
        "INSERT INTO companies (name) VALUES ($1) RETURNING {COMPANY_COLUMNS}"
    ))
    .bind(name)
    .fetch_one(&mut *conn)
    .await?;

    Ok(row.into())
}

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct CompanyRow {
    id: i32,
    name: String,
    shopify_domain: Option<String>,
    api_key: Option<String>,
    access_token: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<CompanyRow> for Company {
    fn from(row: CompanyRow) -> Self {
        Self {
            id: CompanyId::new(row.id),
            name: row.name,
            shopify_domain: row.shopify_domain,
            api_key: row.api_key.map(IntegrationSecret::from),
            access_token: row.access_token.map(IntegrationSecret::from),
            created_at: row.created_at,
        }
    }
}
