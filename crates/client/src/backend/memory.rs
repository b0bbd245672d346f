//! In-memory backend.
//!
//! Keeps the three tables in process memory behind an async lock. It
//! enforces the same constraints as the hosted store (unique email, company
//! before user) and hashes passwords like the direct-store backend, so
//! tests exercise the real contract.
//!
//! Dashboard snapshots are normally written by an ingestion process outside
//! this system; [`InMemoryBackend::record_dashboard_snapshot`] stands in for
//! it.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value as JsonValue;
use tokio::sync::RwLock;

use saas_dashboard_core::{
    AppUser, Company, CompanyId, CompanySettingsInput, DashboardData, DashboardDataId, Email,
    LoginResult, SignupResult, UserId,
};

use super::{Backend, NewAccount};
use crate::admin::AdminCapability;
use crate::error::{DataAccessError, Result};
use crate::password::CredentialHasher;

#[derive(Debug, Default)]
struct Tables {
    companies: BTreeMap<CompanyId, Company>,
    users: BTreeMap<UserId, AppUser>,
    dashboard_data: Vec<DashboardData>,
    next_company_id: i32,
    next_user_id: i32,
    next_dashboard_id: i32,
}

impl Tables {
    fn user_by_email(&self, email: &Email) -> Option<&AppUser> {
        self.users.values().find(|u| &u.email == email)
    }

    fn next_company_id(&mut self) -> CompanyId {
        self.next_company_id += 1;
        CompanyId::new(self.next_company_id)
    }

    fn next_user_id(&mut self) -> UserId {
        self.next_user_id += 1;
        UserId::new(self.next_user_id)
    }

    fn next_dashboard_id(&mut self) -> DashboardDataId {
        self.next_dashboard_id += 1;
        DashboardDataId::new(self.next_dashboard_id)
    }
}

/// Backend holding every table in process memory.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    tables: RwLock<Tables>,
    hasher: CredentialHasher,
}

impl InMemoryBackend {
    /// Create an empty store with production hashing cost.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store with a specific hasher.
    #[must_use]
    pub fn with_hasher(hasher: CredentialHasher) -> Self {
        Self {
            tables: RwLock::default(),
            hasher,
        }
    }

    /// Record a dashboard snapshot for a company.
    ///
    /// # Errors
    ///
    /// Returns `DataAccessError::NotFound` if the company does not exist.
    pub async fn record_dashboard_snapshot(
        &self,
        company_id: CompanyId,
        data_json: JsonValue,
        created_at: DateTime<Utc>,
    ) -> Result<DashboardData> {
        let mut tables = self.tables.write().await;
        if !tables.companies.contains_key(&company_id) {
            return Err(DataAccessError::NotFound("Company not found".to_string()));
        }

        let record = DashboardData {
            id: tables.next_dashboard_id(),
            company_id,
            data_json,
            created_at,
        };
        tables.dashboard_data.push(record.clone());
        Ok(record)
    }

    /// Number of stored users.
    pub async fn user_count(&self) -> usize {
        self.tables.read().await.users.len()
    }

    /// Number of stored companies.
    pub async fn company_count(&self) -> usize {
        self.tables.read().await.companies.len()
    }
}

#[async_trait]
impl Backend for InMemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn signup(&self, account: &NewAccount) -> Result<SignupResult> {
        // Hash outside the lock; it is the slow part.
        let password_hash = self
            .hasher
            .hash(account.password.expose_secret())
            .map_err(|e| DataAccessError::Backend(e.to_string()))?;

        let mut tables = self.tables.write().await;
        if tables.user_by_email(&account.email).is_some() {
            return Err(DataAccessError::email_taken());
        }

        let now = Utc::now();
        let company = Company {
            id: tables.next_company_id(),
            name: account.company_name.clone(),
            shopify_domain: None,
            api_key: None,
            access_token: None,
            created_at: now,
        };
        tables.companies.insert(company.id, company.clone());

        let user = AppUser {
            id: tables.next_user_id(),
            email: account.email.clone(),
            password_hash,
            company_id: company.id,
            created_at: now,
        };
        tables.users.insert(user.id, user.clone());

        Ok(SignupResult { user, company })
    }

    async fn login(&self, email: &Email, password: &SecretString) -> Result<LoginResult> {
        let (user, company) = {
            let tables = self.tables.read().await;
            let user = tables
                .user_by_email(email)
                .ok_or_else(DataAccessError::invalid_credentials)?
                .clone();
            let company = tables.companies.get(&user.company_id).cloned();
            (user, company)
        };

        // Verify outside the lock; it is the slow part.
        if !self
            .hasher
            .verify(password.expose_secret(), &user.password_hash)
        {
            return Err(DataAccessError::invalid_credentials());
        }

        Ok(LoginResult { user, company })
    }

    async fn fetch_dashboard_data(&self, company_id: CompanyId) -> Result<Option<DashboardData>> {
        let tables = self.tables.read().await;
        Ok(tables
            .dashboard_data
            .iter()
            .filter(|d| d.company_id == company_id)
            .max_by_key(|d| (d.created_at, d.id))
            .cloned())
    }

    async fn fetch_company_settings(&self, company_id: CompanyId) -> Result<Option<Company>> {
        Ok(self.tables.read().await.companies.get(&company_id).cloned())
    }

    async fn save_company_settings(
        &self,
        company_id: CompanyId,
        settings: &CompanySettingsInput,
    ) -> Result<Company> {
        let mut tables = self.tables.write().await;
        let company = tables
            .companies
            .get_mut(&company_id)
            .ok_or_else(|| DataAccessError::NotFound("Company not found".to_string()))?;

        company.apply_settings(settings);
        Ok(company.clone())
    }

    async fn fetch_companies(&self, _admin: &AdminCapability) -> Result<Vec<Company>> {
        let tables = self.tables.read().await;
        let mut companies: Vec<Company> = tables.companies.values().cloned().collect();
        companies.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(companies)
    }
}
