//! Administrative commands.

use saas_dashboard_client::{AdminCapability, AppContext, ClientConfig};

use super::{CommandError, emit};
use crate::render;

/// List every company.
///
/// # Errors
///
/// Returns `CommandError::Data` if the token is rejected or the listing fails.
pub async fn companies(
    ctx: &AppContext,
    config: &ClientConfig,
    token: &str,
) -> Result<(), CommandError> {
    let admin = AdminCapability::grant(config.admin_token.as_ref(), token)?;
    let companies = ctx.data.fetch_companies(&admin).await?;

    tracing::info!(count = companies.len(), "Listed companies");
    emit(&render::companies(&companies));
    Ok(())
}
