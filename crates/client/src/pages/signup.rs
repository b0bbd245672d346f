//! Signup page.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

use saas_dashboard_core::SignupResult;

use super::{AppContext, Lifecycle, PageCell, PageState};

/// Page heading and submit label.
pub const TITLE: &str = "Sign Up";

/// Values currently in the signup form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignupForm {
    pub email: String,
    pub company_name: String,
    pub password: String,
}

struct Inner {
    lifecycle: Lifecycle,
    result: PageCell<SignupResult>,
    form: watch::Sender<SignupForm>,
}

/// Controller of the signup page.
#[derive(Clone)]
pub struct SignupPage {
    ctx: AppContext,
    inner: Arc<Inner>,
}

impl SignupPage {
    /// Mount an empty, idle form.
    #[must_use]
    pub fn mount(ctx: AppContext) -> Self {
        let lifecycle = Lifecycle::new();
        let result = lifecycle.cell(PageState::Idle);
        let (form, _) = watch::channel(SignupForm::default());
        Self {
            ctx,
            inner: Arc::new(Inner {
                lifecycle,
                result,
                form,
            }),
        }
    }

    /// Outcome of the last submission.
    #[must_use]
    pub fn state(&self) -> PageState<SignupResult> {
        self.inner.result.get()
    }

    /// Current form values.
    #[must_use]
    pub fn form(&self) -> SignupForm {
        self.inner.form.borrow().clone()
    }

    /// Whether a submission is in flight.
    #[must_use]
    pub fn is_submitting(&self) -> bool {
        self.inner.result.is_busy()
    }

    pub fn set_email(&self, value: impl Into<String>) {
        let value = value.into();
        self.inner.form.send_modify(|f| f.email = value);
    }

    pub fn set_company_name(&self, value: impl Into<String>) {
        let value = value.into();
        self.inner.form.send_modify(|f| f.company_name = value);
    }

    pub fn set_password(&self, value: impl Into<String>) {
        let value = value.into();
        self.inner.form.send_modify(|f| f.password = value);
    }

    /// Unmount the page; an in-flight result is discarded.
    pub fn unmount(&self) {
        self.inner.lifecycle.unmount();
    }

    /// Submit the form. On success the session is established.
    pub async fn submit(&self) {
        let Some(submission) = self.inner.result.try_submit() else {
            debug!("Signup already in flight");
            return;
        };

        let form = self.form();
        let state = match self
            .ctx
            .data
            .signup(&form.email, &form.password, &form.company_name)
            .await
        {
            Ok(result) => PageState::Success(result),
            Err(e) => PageState::Error(e.user_message()),
        };
        submission.finish(state);
    }
}
