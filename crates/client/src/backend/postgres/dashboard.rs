//! Dashboard snapshot repository.

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use tracing::debug;

use saas_dashboard_core::{CompanyId, DashboardData, DashboardDataId};

use super::RepositoryError;

/// Repository for dashboard snapshots.
pub struct DashboardRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> DashboardRepository<'a> {
    /// Create a new dashboard repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// The most recent snapshot of a company.
    ///
    /// Ties on `created_at` go to the highest ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn latest_for_company(
        &self,
        company_id: CompanyId,
    ) -> Result<Option<DashboardData>, RepositoryError> {
        let row = sqlx::query_as::<_, DashboardRow>(
            r"
            SELECT id, company_id, data_json, created_at
            FROM dashboard_data
            WHERE company_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            ",
        )
        .bind(company_id.as_i32())
        .fetch_optional(self.pool)
        .await?;

        debug!(company_id = %company_id, found = row.is_some(), "Fetched dashboard data");
        Ok(row.map(DashboardData::from))
    }

    /// Insert a snapshot.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn insert(
        &self,
        company_id: CompanyId,
        data_json: &JsonValue,
        created_at: DateTime<Utc>,
    ) -> Result<DashboardData, RepositoryError> {
        let row = sqlx::query_as::<_, DashboardRow>(
            r"
            INSERT INTO dashboard_data (company_id, data_json, created_at)
            VALUES ($1, $2, $3)
            RETURNING id, company_id, data_json, created_at
            ",
        )
        .bind(company_id.as_i32())
        .bind(data_json)
        .bind(created_at)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }
}

#[derive(Debug, sqlx::FromRow)]
struct DashboardRow {
    id: i32,
    company_id: i32,
    data_json: JsonValue,
    created_at: DateTime<Utc>,
}

impl From<DashboardRow> for DashboardData {
    fn from(row: DashboardRow) -> Self {
        Self {
            id: DashboardDataId::new(row.id),
            company_id: CompanyId::new(row.company_id),
            data_json: row.data_json,
            created_at: row.created_at,
        }
    }
}
