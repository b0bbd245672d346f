//! Page commands: render a page controller once, or keep following it.

use std::time::Duration;

use saas_dashboard_client::pages::{DashboardPage, HomePage, Navigation, PageState, SettingsPage};
use saas_dashboard_client::{AppContext, SharedStorage};

use super::{CommandError, emit};
use crate::render;

/// How often `--follow` polls the session file for other terminals' writes.
const POLL_INTERVAL: Duration = Duration::from_millis(500);

pub fn home() {
    emit(&render::home(&HomePage));
}

pub fn nav() {
    emit(&render::nav(&Navigation));
}

fn page_error<T>(state: &PageState<T>) -> Result<(), CommandError> {
    match state.error() {
        Some(message) => Err(CommandError::Page(message.to_string())),
        None => Ok(()),
    }
}

/// Show the dashboard. With `follow`, keep reloading whenever another
/// terminal signs in or out, until Ctrl-C.
///
/// # Errors
///
/// Returns `CommandError::Page` if the dashboard cannot be shown.
pub async fn dashboard(
    ctx: AppContext,
    storage: &SharedStorage,
    follow: bool,
) -> Result<(), CommandError> {
    let page = DashboardPage::mount(ctx);
    page.load().await;

    let state = page.state();
    if !follow {
        page_error(&state)?;
        emit(&render::dashboard(&state));
        return Ok(());
    }

    emit(&render::dashboard(&state));

    let poller = storage.watch_outside_changes(POLL_INTERVAL);
    let follower = {
        let page = page.clone();
        tokio::spawn(async move { page.follow_session().await })
    };

    let mut states = page.watch();
    states.mark_unchanged();
    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
                }
                break;
            }
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = states.borrow_and_update().clone();
                if !state.is_loading() {
                    emit(&render::dashboard(&state));
                }
            }
        }
    }

    page.unmount();
    poller.abort();
    if let Err(e) = follower.await {
        tracing::debug!(error = %e, "Dashboard follower ended abnormally");
    }
    Ok(())
}

/// Show the settings of the active company.
///
/// # Errors
///
/// Returns `CommandError::Page` if the company cannot be loaded.
pub async fn settings_show(ctx: AppContext) -> Result<(), CommandError> {
    let page = SettingsPage::mount(ctx);
    page.load().await;

    let state = page.state();
    page_error(&state)?;
    emit(&render::settings(&state, &page.form()));
    Ok(())
}

/// Replace the settings of the active company.
///
/// # Errors
///
/// Returns `CommandError::Page` if the company cannot be loaded or the save
/// fails.
pub async fn settings_save(
    ctx: AppContext,
    domain: &str,
    api_key: &str,
    access_token: &str,
) -> Result<(), CommandError> {
    let page = SettingsPage::mount(ctx);
    page.load().await;
    page_error(&page.state())?;

    page.set_store_domain(domain);
    page.set_api_key(api_key);
    page.set_access_token(access_token);
    page.save().await;

    let outcome = page.save_state();
    page_error(&outcome)?;
    emit(&render::save_outcome(&outcome));
    emit(&render::settings(&page.state(), &page.form()));
    Ok(())
}
