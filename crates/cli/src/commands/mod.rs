//! Command implementations.

pub mod account;
pub mod admin;
pub mod migrate;
pub mod pages;

use saas_dashboard_client::backend::{self, ConnectError};
use saas_dashboard_client::session::{SessionError, StorageError};
use saas_dashboard_client::{
    AppContext, ClientConfig, DataAccess, DataAccessError, SessionContext, SharedStorage,
};
use thiserror::Error;

/// Errors surfaced to the terminal.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The backend could not be reached or built.
    #[error("Could not connect: {0}")]
    Connect(#[from] ConnectError),

    /// The session file could not be opened.
    #[error("Session storage error: {0}")]
    Storage(#[from] StorageError),

    /// The session could not be written.
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// A data access operation failed.
    #[error("{0}")]
    Data(#[from] DataAccessError),

    /// A page ended up in its error state; the message is already
    /// user-facing.
    #[error("{0}")]
    Page(String),

    /// Migrations need a database URL.
    #[error("No database URL configured (set DASHBOARD_DATABASE_URL)")]
    MissingDatabaseUrl,

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// A migration failed to apply.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Open the session file shared by every terminal.
///
/// # Errors
///
/// Returns `CommandError::Storage` if the session directory cannot be created.
pub fn open_storage(config: &ClientConfig) -> Result<SharedStorage, CommandError> {
    Ok(SharedStorage::file(&config.session.file)?)
}

/// Open this invocation's tab onto the session.
#[must_use]
pub fn open_session(config: &ClientConfig, storage: &SharedStorage) -> SessionContext {
    SessionContext::new(storage.open_tab(), config.session.policy)
}

/// Open this invocation's session tab and the configured backend.
///
/// # Errors
///
/// Returns `CommandError` if the backend is unavailable.
pub async fn connect(
    config: &ClientConfig,
    storage: &SharedStorage,
) -> Result<AppContext, CommandError> {
    let session = open_session(config, storage);
    let backend = backend::connect(config).await?;
    tracing::debug!(backend = backend.name(), "Connected");

    Ok(AppContext::new(DataAccess::new(backend), session))
}

/// Print rendered output.
#[allow(clippy::print_stdout)]
pub fn emit(text: &str) {
    println!("{text}");
}
