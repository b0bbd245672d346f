//! Settings page: Shopify credentials of the active company.
//!
//! The page has two sections that load independently: the company itself
//! (loaded on mount) and the outcome of the last save. The form is kept
//! separately so that typing never races with a save.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

use saas_dashboard_core::{Company, CompanySettingsInput};

use super::{AppContext, Lifecycle, NO_SESSION_MESSAGE, PageCell, PageState};

/// Shown when the session's company does not exist.
pub const COMPANY_NOT_FOUND_MESSAGE: &str = "Company not found.";
/// Shown after a successful save.
pub const SAVED_MESSAGE: &str = "Settings saved successfully.";

/// Values currently in the settings form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsForm {
    pub store_domain: String,
    pub api_key: String,
    pub access_token: String,
}

impl SettingsForm {
    /// Prefill from a company; unset fields become empty.
    #[must_use]
    pub fn from_company(company: &Company) -> Self {
        let settings = company.settings();
        Self {
            store_domain: settings.store_domain,
            api_key: settings.api_key.into_inner(),
            access_token: settings.access_token.into_inner(),
        }
    }

    fn to_input(&self) -> CompanySettingsInput {
        CompanySettingsInput::new(
            self.store_domain.as_str(),
            self.api_key.as_str(),
            self.access_token.as_str(),
        )
    }
}

struct Inner {
    lifecycle: Lifecycle,
    company: PageCell<Company>,
    save: PageCell<String>,
    form: watch::Sender<SettingsForm>,
}

/// Controller of the settings page.
#[derive(Clone)]
pub struct SettingsPage {
    ctx: AppContext,
    inner: Arc<Inner>,
}

impl SettingsPage {
    /// Mount the page. The company starts out `Loading`; call [`Self::load`].
    #[must_use]
    pub fn mount(ctx: AppContext) -> Self {
        let lifecycle = Lifecycle::new();
        let company = lifecycle.cell(PageState::Loading);
        let save = lifecycle.cell(PageState::Idle);
        let (form, _) = watch::channel(SettingsForm::default());
        Self {
            ctx,
            inner: Arc::new(Inner {
                lifecycle,
                company,
                save,
                form,
            }),
        }
    }

    /// State of the company section.
    #[must_use]
    pub fn state(&self) -> PageState<Company> {
        self.inner.company.get()
    }

    /// Outcome of the last save: the success or error message.
    #[must_use]
    pub fn save_state(&self) -> PageState<String> {
        self.inner.save.get()
    }

    /// Current form values.
    #[must_use]
    pub fn form(&self) -> SettingsForm {
        self.inner.form.borrow().clone()
    }

    /// Whether a save is in flight (the save button is disabled).
    #[must_use]
    pub fn is_saving(&self) -> bool {
        self.inner.save.is_busy()
    }

    /// Edit the store domain field.
    pub fn set_store_domain(&self, value: impl Into<String>) {
        let value = value.into();
        self.inner.form.send_modify(|f| f.store_domain = value);
    }

    /// Edit the API key field.
    pub fn set_api_key(&self, value: impl Into<String>) {
        let value = value.into();
        self.inner.form.send_modify(|f| f.api_key = value);
    }

    /// Edit the access token field.
    pub fn set_access_token(&self, value: impl Into<String>) {
        let value = value.into();
        self.inner.form.send_modify(|f| f.access_token = value);
    }

    /// Unmount the page; in-flight results are discarded.
    pub fn unmount(&self) {
        self.inner.lifecycle.unmount();
    }

    /// Load the company in the session and prefill the form.
    pub async fn load(&self) {
        let ticket = self.inner.company.start();

        let Some(company_id) = self.ctx.session.company_id() else {
            self.inner
                .company
                .finish(ticket, PageState::Error(NO_SESSION_MESSAGE.to_string()));
            return;
        };

        let state = match self.ctx.data.fetch_company_settings(company_id).await {
            Ok(Some(company)) => PageState::Success(company),
            Ok(None) => PageState::Error(COMPANY_NOT_FOUND_MESSAGE.to_string()),
            Err(e) => PageState::Error(e.user_message()),
        };

        let prefill = state.success().map(SettingsForm::from_company);
        if self.inner.company.finish(ticket, state) {
            if let Some(form) = prefill {
                self.inner.form.send_replace(form);
            }
        } else {
            debug!(company_id = %company_id, "Discarded settings result");
        }
    }

    /// Save the form. Ignored while a save is already in flight.
    pub async fn save(&self) {
        let Some(submission) = self.inner.save.try_submit() else {
            debug!("Save already in flight");
            return;
        };

        let Some(company_id) = self.ctx.session.company_id() else {
            submission.finish(PageState::Error(NO_SESSION_MESSAGE.to_string()));
            return;
        };

        let input = self.inner.form.borrow().to_input();
        match self
            .ctx
            .data
            .save_company_settings(company_id, &input)
            .await
        {
            Ok(company) => {
                if submission.finish(PageState::Success(SAVED_MESSAGE.to_string())) {
                    self.inner.company.set(PageState::Success(company));
                }
            }
            Err(e) => {
                submission.finish(PageState::Error(e.user_message()));
            }
        }
    }
}
