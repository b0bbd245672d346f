//! Database migration command.

use saas_dashboard_client::ClientConfig;
use saas_dashboard_client::backend::postgres::PostgresBackend;

use super::CommandError;

/// Apply the bundled migrations to the configured database.
///
/// # Errors
///
/// Returns `CommandError` if no database is configured, the connection
/// fails, or a migration fails.
pub async fn run(config: &ClientConfig) -> Result<(), CommandError> {
    let url = config
        .database_url
        .as_ref()
        .ok_or(CommandError::MissingDatabaseUrl)?;

    tracing::info!("Connecting to database...");
    let backend = PostgresBackend::connect(url).await?;

    tracing::info!("Running migrations...");
    backend.migrate().await?;

    tracing::info!("Migrations complete!");
    super::emit("Migrations complete.");
    Ok(())
}
