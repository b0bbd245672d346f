//! Swappable backends behind the data access interface.
//!
//! # Backends
//!
//! - [`memory`] - In-process tables; the stub used by tests and demos
//! - [`rest`] - The REST facade over the hosted tables
//! - [`postgres`] - Direct access to the hosted `PostgreSQL` tables
//!
//! All three implement [`Backend`] with the same contract. Input has already
//! been validated by [`crate::DataAccess`] by the time a backend sees it.

pub mod memory;
pub mod postgres;
pub mod rest;

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::SecretString;
use thiserror::Error;

use saas_dashboard_core::{
    Company, CompanyId, CompanySettingsInput, DashboardData, Email, LoginResult, SignupResult,
};

use crate::admin::AdminCapability;
use crate::config::{BackendKind, ClientConfig};
use crate::error::Result;

pub use memory::InMemoryBackend;
pub use postgres::PostgresBackend;
pub use rest::RestBackend;

/// A validated signup request.
#[derive(Debug, Clone)]
pub struct NewAccount {
    /// Normalized login email.
    pub email: Email,
    /// Plaintext password; only ever handed to a hasher or sent to the
    /// trusted REST boundary.
    pub password: SecretString,
    /// Trimmed, non-empty company name.
    pub company_name: String,
}

/// Common contract of every backing implementation.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Create a company and then a user that belongs to it.
    async fn signup(&self, account: &NewAccount) -> Result<SignupResult>;

    /// Verify credentials and return the user with their company.
    async fn login(&self, email: &Email, password: &SecretString) -> Result<LoginResult>;

    /// Most recent dashboard snapshot of a company, if any.
    async fn fetch_dashboard_data(&self, company_id: CompanyId) -> Result<Option<DashboardData>>;

    /// A company by ID, if it exists.
    async fn fetch_company_settings(&self, company_id: CompanyId) -> Result<Option<Company>>;

    /// Overwrite the Shopify credential fields of a company.
    async fn save_company_settings(
        &self,
        company_id: CompanyId,
        settings: &CompanySettingsInput,
    ) -> Result<Company>;

    /// Every company, newest first.
    async fn fetch_companies(&self, admin: &AdminCapability) -> Result<Vec<Company>>;
}

/// Errors that can occur while connecting a backend.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// The HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// The database pool could not be created.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The `postgres` backend was selected without a database URL.
    #[error("No database URL configured")]
    MissingDatabaseUrl,
}

/// Build the backend selected by configuration.
///
/// # Errors
///
/// Returns `ConnectError` if the selected backend cannot be initialized.
pub async fn connect(config: &ClientConfig) -> std::result::Result<Arc<dyn Backend>, ConnectError> {
    let backend: Arc<dyn Backend> = match config.backend {
        BackendKind::Memory => Arc::new(InMemoryBackend::new()),
        BackendKind::Rest => Arc::new(RestBackend::new(config.api_base_url.clone())?),
        BackendKind::Postgres => {
            let url = config
                .database_url
                .as_ref()
                .ok_or(ConnectError::MissingDatabaseUrl)?;
            Arc::new(PostgresBackend::connect(url).await?)
        }
    };

    tracing::info!(backend = backend.name(), "Data backend ready");
    Ok(backend)
}
