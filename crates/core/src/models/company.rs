//! Company (tenant) types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{CompanyId, IntegrationSecret};

/// A tenant company.
///
/// The Shopify fields stay `None` until the company saves its settings.
/// Nothing requires the three of them to be set together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    /// Unique company ID.
    pub id: CompanyId,
    /// Display name chosen at signup.
    pub name: String,
    /// Shopify store domain (e.g. your-store.myshopify.com).
    pub shopify_domain: Option<String>,
    /// Shopify API key.
    pub api_key: Option<IntegrationSecret>,
    /// Shopify Admin API access token.
    pub access_token: Option<IntegrationSecret>,
    /// When the company was created.
    pub created_at: DateTime<Utc>,
}

impl Company {
    /// The editable settings of this company, as the settings form shows them.
    ///
    /// Unset fields come back as empty strings.
    #[must_use]
    pub fn settings(&self) -> CompanySettingsInput {
        CompanySettingsInput {
            store_domain: self.shopify_domain.clone().unwrap_or_default(),
            api_key: self
                .api_key
                .clone()
                .unwrap_or_else(|| IntegrationSecret::new("")),
            access_token: self
                .access_token
                .clone()
                .unwrap_or_else(|| IntegrationSecret::new("")),
        }
    }

    /// Whether any Shopify credential has been configured.
    #[must_use]
    pub const fn has_integration(&self) -> bool {
        self.shopify_domain.is_some() || self.api_key.is_some() || self.access_token.is_some()
    }

    /// Overwrite the three credential fields from a settings form.
    ///
    /// Empty values clear the corresponding field. Every other field is left
    /// as it was.
    pub fn apply_settings(&mut self, settings: &CompanySettingsInput) {
        self.shopify_domain = settings.domain();
        self.api_key = settings.api_key();
        self.access_token = settings.access_token();
    }
}

/// Values submitted by the settings form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanySettingsInput {
    /// Shopify store domain.
    pub store_domain: String,
    /// Shopify API key.
    pub api_key: IntegrationSecret,
    /// Shopify Admin API access token.
    pub access_token: IntegrationSecret,
}

impl CompanySettingsInput {
    /// Build settings from raw form values.
    #[must_use]
    pub fn new(
        store_domain: impl Into<String>,
        api_key: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Self {
        Self {
            store_domain: store_domain.into(),
            api_key: IntegrationSecret::new(api_key),
            access_token: IntegrationSecret::new(access_token),
        }
    }

    /// The store domain as it should be persisted (`None` when blank).
    #[must_use]
    pub fn domain(&self) -> Option<String> {
        non_blank(&self.store_domain).map(str::to_owned)
    }

    /// The API key as it should be persisted (`None` when blank).
    #[must_use]
    pub fn api_key(&self) -> Option<IntegrationSecret> {
        non_blank(self.api_key.expose()).map(IntegrationSecret::from)
    }

    /// The access token as it should be persisted (`None` when blank).
    #[must_use]
    pub fn access_token(&self) -> Option<IntegrationSecret> {
        non_blank(self.access_token.expose()).map(IntegrationSecret::from)
    }
}

fn non_blank(value: &str) -> Option<&str> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}
