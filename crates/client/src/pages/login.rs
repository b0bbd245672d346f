//! Login page.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

use saas_dashboard_core::LoginResult;

use super::{AppContext, Lifecycle, PageCell, PageState};

/// Values currently in the login form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

struct Inner {
    lifecycle: Lifecycle,
    result: PageCell<LoginResult>,
    form: watch::Sender<LoginForm>,
}

/// Controller of the login page.
#[derive(Clone)]
pub struct LoginPage {
    ctx: AppContext,
    inner: Arc<Inner>,
}

impl LoginPage {
    /// Mount an empty, idle form.
    #[must_use]
    pub fn mount(ctx: AppContext) -> Self {
        let lifecycle = Lifecycle::new();
        let result = lifecycle.cell(PageState::Idle);
        let (form, _) = watch::channel(LoginForm::default());
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
    pub fn state(&self) -> PageState<LoginResult> {
        self.inner.result.get()
    }

    /// Current form values.
    #[must_use]
    pub fn form(&self) -> LoginForm {
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
            debug!("Login already in flight");
            return;
        };

        let form = self.form();
        let state = match self.ctx.data.login(&form.email, &form.password).await {
            Ok(result) => PageState::Success(result),
            Err(e) => PageState::Error(e.user_message()),
        };
        submission.finish(state);
    }
}
