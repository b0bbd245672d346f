//! Session commands.

use saas_dashboard_client::pages::{LoginPage, PageState, SignupPage};
use saas_dashboard_client::{AppContext, SessionContext};

use super::{CommandError, emit};
use crate::render;

/// Create a company and its first user, then sign in as that user.
///
/// # Errors
///
/// Returns `CommandError::Page` with the form's error message on failure.
pub async fn signup(
    ctx: AppContext,
    email: &str,
    company: &str,
    password: &str,
) -> Result<(), CommandError> {
    let page = SignupPage::mount(ctx);
    page.set_email(email);
    page.set_company_name(company);
    page.set_password(password);
    page.submit().await;

    match page.state() {
        PageState::Success(result) => {
            emit(&render::signup(&result));
            Ok(())
        }
        PageState::Error(message) => Err(CommandError::Page(message)),
        PageState::Idle | PageState::Loading => {
            Err(CommandError::Page("Signup did not complete".to_string()))
        }
    }
}

/// Sign in.
///
/// # Errors
///
/// Returns `CommandError::Page` with the form's error message on failure.
pub async fn login(ctx: AppContext, email: &str, password: &str) -> Result<(), CommandError> {
    let page = LoginPage::mount(ctx);
    page.set_email(email);
    page.set_password(password);
    page.submit().await;

    match page.state() {
        PageState::Success(result) => {
            emit(&render::login(&result));
            Ok(())
        }
        PageState::Error(message) => Err(CommandError::Page(message)),
        PageState::Idle | PageState::Loading => {
            Err(CommandError::Page("Login did not complete".to_string()))
        }
    }
}

/// Forget the session in every terminal.
///
/// # Errors
///
/// Returns `CommandError::Session` if the session file cannot be written.
pub fn logout(session: &SessionContext) -> Result<(), CommandError> {
    session.clear()?;
    tracing::info!("Signed out");
    emit("Signed out.");
    Ok(())
}
