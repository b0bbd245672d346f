//! Direct-store backend over the hosted `PostgreSQL` tables.
//!
//! ## Tables
//!
//! - `companies` - Tenants and their Shopify credentials
//! - `users` - Login accounts, one company each
//! - `dashboard_data` - JSON snapshots written by the ingestion process
//!
//! # Migrations
//!
//! Migrations are stored in `crates/client/migrations/` and run via:
//! ```bash
//! cargo run -p saas-dashboard-cli -- migrate
//! ```
//!
//! Queries are checked at runtime so the crate builds without a database.

pub mod companies;
pub mod dashboard;
pub mod users;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use saas_dashboard_core::{
    Company, CompanyId, CompanySettingsInput, DashboardData, Email, LoginResult, SignupResult,
};

pub use companies::CompanyRepository;
pub use dashboard::DashboardRepository;
pub use users::UserRepository;

use super::{Backend, NewAccount};
use crate::admin::AdminCapability;
use crate::error::{DataAccessError, Result};
use crate::password::CredentialHasher;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl From<RepositoryError> for DataAccessError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Conflict(message) => Self::Conflict(message),
            RepositoryError::NotFound => Self::NotFound("Company not found".to_string()),
            RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
                tracing::error!(error = %err, "Repository error");
                Self::Backend(err.to_string())
            }
        }
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &SecretString) -> std::result::Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Backend reading and writing the tables directly.
#[derive(Debug, Clone)]
pub struct PostgresBackend {
    pool: PgPool,
    hasher: CredentialHasher,
}

impl PostgresBackend {
    /// Connect to the database.
    ///
    /// # Errors
    ///
    /// Returns `sqlx::Error` if the pool cannot be created.
    pub async fn connect(database_url: &SecretString) -> std::result::Result<Self, sqlx::Error> {
        let pool = create_pool(database_url).await?;
        Ok(Self::from_pool(pool))
    }

    /// Wrap an existing pool.
    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self {
            pool,
            hasher: CredentialHasher::default(),
        }
    }

    /// Replace the password hasher.
    #[must_use]
    pub fn with_hasher(mut self, hasher: CredentialHasher) -> Self {
        self.hasher = hasher;
        self
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply the embedded migrations.
    ///
    /// # Errors
    ///
    /// Returns `MigrateError` if a migration fails to apply.
    pub async fn migrate(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    /// Insert a dashboard snapshot, standing in for the ingestion process.
    ///
    /// # Errors
    ///
    /// Returns `DataAccessError::Backend` if the insert fails (including an
    /// unknown company, which violates the foreign key).
    pub async fn record_dashboard_snapshot(
        &self,
        company_id: CompanyId,
        data_json: JsonValue,
        created_at: DateTime<Utc>,
    ) -> Result<DashboardData> {
        Ok(DashboardRepository::new(&self.pool)
            .insert(company_id, &data_json, created_at)
            .await?)
    }
}

#[async_trait]
impl Backend for PostgresBackend {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn signup(&self, account: &NewAccount) -> Result<SignupResult> {
        let password_hash = self
            .hasher
            .hash(account.password.expose_secret())
            .map_err(|e| DataAccessError::Backend(e.to_string()))?;

        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;
        let company = companies::insert(&mut tx, &account.company_name).await?;
        let user = users::insert(&mut tx, &account.email, &password_hash, company.id).await?;
        tx.commit().await.map_err(RepositoryError::from)?;

        Ok(SignupResult { user, company })
    }

    async fn login(&self, email: &Email, password: &SecretString) -> Result<LoginResult> {
        let user = UserRepository::new(&self.pool)
            .get_by_email(email)
            .await?
            .ok_or_else(DataAccessError::invalid_credentials)?;

        if !self
            .hasher
            .verify(password.expose_secret(), &user.password_hash)
        {
            return Err(DataAccessError::invalid_credentials());
        }

        let company = CompanyRepository::new(&self.pool)
            .get_by_id(user.company_id)
            .await?;

        Ok(LoginResult { user, company })
    }

    async fn fetch_dashboard_data(&self, company_id: CompanyId) -> Result<Option<DashboardData>> {
        Ok(DashboardRepository::new(&self.pool)
            .latest_for_company(company_id)
            .await?)
    }

    async fn fetch_company_settings(&self, company_id: CompanyId) -> Result<Option<Company>> {
        Ok(CompanyRepository::new(&self.pool)
            .get_by_id(company_id)
            .await?)
    }

    async fn save_company_settings(
        &self,
        company_id: CompanyId,
        settings: &CompanySettingsInput,
    ) -> Result<Company> {
        Ok(CompanyRepository::new(&self.pool)
            .update_settings(company_id, settings)
            .await?)
    }

    async fn fetch_companies(&self, _admin: &AdminCapability) -> Result<Vec<Company>> {
        Ok(CompanyRepository::new(&self.pool).list().await?)
    }
}
