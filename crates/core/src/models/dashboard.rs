//! Dashboard snapshot types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::types::{CompanyId, DashboardDataId};

/// A company-scoped snapshot written by the ingestion process.
///
/// The payload is arbitrary JSON; the dashboard only ever shows the most
/// recent snapshot of a company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardData {
    pub id: DashboardDataId,
    pub company_id: CompanyId,
    pub data_json: JsonValue,
    pub created_at: DateTime<Utc>,
}

impl DashboardData {
    /// The payload formatted for display.
    ///
    /// String payloads are shown as-is; anything else is pretty-printed.
    #[must_use]
    pub fn pretty_payload(&self) -> String {
        match &self.data_json {
            JsonValue::String(raw) => raw.clone(),
            other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
        }
    }
}
