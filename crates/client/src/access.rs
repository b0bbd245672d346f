//! The canonical data access interface.
//!
//! [`DataAccess`] validates input, delegates to whichever [`Backend`] was
//! configured, and keeps the session in step with successful logins and
//! signups. Page controllers never talk to a backend directly.

use std::sync::Arc;

use secrecy::SecretString;
use tracing::{debug, info, warn};

use saas_dashboard_core::{
    Company, CompanyId, CompanySettingsInput, DashboardData, Email, LoginResult, SignupResult,
    UserId,
};

use crate::admin::AdminCapability;
use crate::backend::{Backend, NewAccount};
use crate::error::{DataAccessError, Result, add_breadcrumb};
use crate::session::SessionContext;

/// Typed operations over the configured backend.
#[derive(Clone)]
pub struct DataAccess {
    backend: Arc<dyn Backend>,
    session: Option<SessionContext>,
}

impl std::fmt::Debug for DataAccess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataAccess")
            .field("backend", &self.backend.name())
            .field("session", &self.session.is_some())
            .finish()
    }
}

impl DataAccess {
    /// Wrap a backend. No session is updated until one is attached.
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            session: None,
        }
    }

    /// Establish sessions in `session` on successful login and signup.
    #[must_use]
    pub fn with_session(mut self, session: SessionContext) -> Self {
        self.session = Some(session);
        self
    }

    /// Name of the active backend.
    #[must_use]
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Create a company and its first user.
    ///
    /// # Errors
    ///
    /// - `Validation` if a field is blank or the email is malformed
    /// - `Conflict` if the email is already registered
    /// - `Backend` on transport or server failure
    pub async fn signup(
        &self,
        email: &str,
        password: &str,
        company_name: &str,
    ) -> Result<SignupResult> {
        if email.trim().is_empty() || password.is_empty() || company_name.trim().is_empty() {
            return Err(DataAccessError::Validation(
                "Email, password and company name are required".to_string(),
            ));
        }
        let email =
            Email::parse(email).map_err(|e| DataAccessError::Validation(e.to_string()))?;

        let account = NewAccount {
            email,
            password: SecretString::from(password),
            company_name: company_name.trim().to_owned(),
        };

        add_breadcrumb("auth", "signup");
        let result = self.backend.signup(&account).await?;
        info!(
            company_id = %result.company.id,
            user_id = %result.user.id,
            backend = self.backend.name(),
            "Signed up"
        );

        self.establish(result.company.id, result.user.id);
        Ok(result)
    }

    /// Verify credentials.
    ///
    /// # Errors
    ///
    /// - `Validation` if a field is blank
    /// - `Auth` if no user matches or the password is wrong
    /// - `Backend` on transport or server failure
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResult> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(DataAccessError::Validation(
                "Email and password are required".to_string(),
            ));
        }
        // An address that cannot exist cannot match a user.
        let email = Email::parse(email).map_err(|_| DataAccessError::invalid_credentials())?;
        let password = SecretString::from(password);

        add_breadcrumb("auth", "login");
        let result = match self.backend.login(&email, &password).await {
            Ok(result) => result,
            Err(e) => {
                if matches!(e, DataAccessError::Auth(_)) {
                    warn!(backend = self.backend.name(), "Login rejected");
                }
                return Err(e);
            }
        };
        info!(user_id = %result.user.id, "Logged in");

        self.establish(result.user.company_id, result.user.id);
        Ok(result)
    }

    /// The newest dashboard snapshot of a company.
    ///
    /// # Errors
    ///
    /// Returns `Backend` on transport or server failure.
    pub async fn fetch_dashboard_data(
        &self,
        company_id: CompanyId,
    ) -> Result<Option<DashboardData>> {
        let data = self.backend.fetch_dashboard_data(company_id).await?;
        debug!(company_id = %company_id, found = data.is_some(), "Dashboard data lookup");
        Ok(data)
    }

    /// A company with its current settings.
    ///
    /// # Errors
    ///
    /// Returns `Backend` on transport or server failure.
    pub async fn fetch_company_settings(&self, company_id: CompanyId) -> Result<Option<Company>> {
        let company = self.backend.fetch_company_settings(company_id).await?;
        debug!(company_id = %company_id, found = company.is_some(), "Company lookup");
        Ok(company)
    }

    /// Overwrite the Shopify credentials of a company.
    ///
    /// Blank values clear the field. Saving the same input twice leaves the
    /// company in the same state.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the company does not exist
    /// - `Backend` on transport or server failure
    pub async fn save_company_settings(
        &self,
        company_id: CompanyId,
        settings: &CompanySettingsInput,
    ) -> Result<Company> {
        add_breadcrumb("settings", "save");
        let company = self
            .backend
            .save_company_settings(company_id, settings)
            .await?;
        info!(
            company_id = %company_id,
            integration = company.has_integration(),
            "Company settings saved"
        );
        Ok(company)
    }

    /// Positional form of [`Self::save_company_settings`].
    ///
    /// # Errors
    ///
    /// Same as [`Self::save_company_settings`].
    pub async fn save_settings(
        &self,
        company_id: CompanyId,
        store_domain: &str,
        api_key: &str,
        access_token: &str,
    ) -> Result<Company> {
        let settings = CompanySettingsInput::new(store_domain, api_key, access_token);
        self.save_company_settings(company_id, &settings).await
    }

    /// Every company, newest first.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` if the backend rejects the capability and
    /// `Backend` on transport or server failure.
    pub async fn fetch_companies(&self, admin: &AdminCapability) -> Result<Vec<Company>> {
        add_breadcrumb("admin", "list companies");
        let companies = self.backend.fetch_companies(admin).await?;
        debug!(count = companies.len(), "Listed companies");
        Ok(companies)
    }

    fn establish(&self, company_id: CompanyId, user_id: UserId) {
        let Some(session) = &self.session else {
            return;
        };
        // Logged, not returned: the backend call itself succeeded.
        if let Err(e) = session.establish(company_id, user_id) {
            warn!(error = %e, "Could not persist session");
        }
    }
}
