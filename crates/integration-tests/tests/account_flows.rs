//! End-to-end account flows: data access, session and pages together.
//!
//! Every flow runs against both the in-memory backend and the REST backend
//! (through the fake API), which must behave identically.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::json;

use saas_dashboard_client::backend::{Backend, InMemoryBackend};
use saas_dashboard_client::pages::{DashboardPage, DashboardView, PageState, SettingsPage};
use saas_dashboard_client::password::CredentialHasher;
use saas_dashboard_client::session::SessionPolicy;
use saas_dashboard_client::{AppContext, DataAccess, DataAccessError, SessionContext, SharedStorage};
use saas_dashboard_core::{CompanyId, CompanySettingsInput};
use saas_dashboard_integration_tests::FakeApi;

const WAIT: Duration = Duration::from_secs(5);

/// A backend under test plus the tables behind it.
struct Fixture {
    name: &'static str,
    backend: Arc<dyn Backend>,
    tables: Arc<InMemoryBackend>,
    // Keeps the fake API alive for the REST fixture.
    _api: Option<FakeApi>,
}

async fn fixtures() -> Vec<Fixture> {
    let memory = Arc::new(InMemoryBackend::with_hasher(CredentialHasher::minimal()));
    let api = FakeApi::spawn().await.unwrap();

    vec![
        Fixture {
            name: "memory",
            backend: memory.clone(),
            tables: memory,
            _api: None,
        },
        Fixture {
            name: "rest",
            backend: Arc::new(api.rest_backend()),
            tables: Arc::clone(api.backend()),
            _api: Some(api),
        },
    ]
}

fn tab(storage: &SharedStorage, fixture: &Fixture) -> AppContext {
    let session = SessionContext::new(storage.open_tab(), SessionPolicy::default());
    AppContext::new(DataAccess::new(Arc::clone(&fixture.backend)), session)
}

async fn wait_for_snapshot(page: &DashboardPage) -> PageState<DashboardView> {
    let mut states = page.watch();
    let state = tokio::time::timeout(WAIT, async {
        states
            .wait_for(|s| matches!(s, PageState::Success(DashboardView::Snapshot(_))))
            .await
            .map(|s| s.clone())
    })
    .await;
    state.unwrap().unwrap()
}

// =============================================================================
// Signup / Login
// =============================================================================

#[tokio::test]
async fn test_signup_creates_company_user_and_session() {
    for fixture in fixtures().await {
        let ctx = tab(&SharedStorage::memory(), &fixture);

        let result = ctx.data.signup("a@b.com", "x", "Acme").await.unwrap();

        assert_eq!(result.company.name, "Acme", "{}", fixture.name);
        assert_eq!(result.company.shopify_domain, None, "{}", fixture.name);
        assert_eq!(result.user.email.as_str(), "a@b.com", "{}", fixture.name);
        assert_eq!(result.user.company_id, result.company.id, "{}", fixture.name);
        assert_eq!(ctx.session.company_id(), Some(result.company.id));
        assert_eq!(ctx.session.user_id(), Some(result.user.id));
    }
}

#[tokio::test]
async fn test_every_signup_gets_its_own_company() {
    for fixture in fixtures().await {
        let ctx = tab(&SharedStorage::memory(), &fixture);

        let first = ctx.data.signup("a@b.com", "x", "Acme").await.unwrap();
        let second = ctx.data.signup("c@d.com", "y", "Acme").await.unwrap();

        assert_ne!(first.company.id, second.company.id, "{}", fixture.name);
        assert_eq!(second.user.company_id, second.company.id);
        assert_eq!(fixture.tables.company_count().await, 2);
        // The session follows the most recent signup.
        assert_eq!(ctx.session.company_id(), Some(second.company.id));
    }
}

#[tokio::test]
async fn test_failed_login_establishes_no_session() {
    for fixture in fixtures().await {
        let ctx = tab(&SharedStorage::memory(), &fixture);
        ctx.data.signup("a@b.com", "x", "Acme").await.unwrap();
        ctx.session.clear().unwrap();

        for (email, password) in [("a@b.com", "wrong"), ("ghost@b.com", "x"), ("a@b.com", "X")] {
            let err = ctx.data.login(email, password).await.unwrap_err();
            assert!(
                matches!(err, DataAccessError::Auth(_)),
                "{}: {email}/{password} gave {err:?}",
                fixture.name
            );
            assert_eq!(ctx.session.company_id(), None);
            assert_eq!(ctx.session.user_id(), None);
        }
    }
}

#[tokio::test]
async fn test_login_establishes_session() {
    for fixture in fixtures().await {
        let ctx = tab(&SharedStorage::memory(), &fixture);
        let acme = ctx.data.signup("a@b.com", "x", "Acme").await.unwrap();
        ctx.session.clear().unwrap();

        let result = ctx.data.login("a@b.com", "x").await.unwrap();
        assert_eq!(result.company.as_ref().map(|c| c.id), Some(acme.company.id));
        assert_eq!(ctx.session.company_id(), Some(acme.company.id));
    }
}

// =============================================================================
// Dashboard
// =============================================================================

#[tokio::test]
async fn test_dashboard_without_records_is_empty() {
    for fixture in fixtures().await {
        let ctx = tab(&SharedStorage::memory(), &fixture);
        let acme = ctx.data.signup("a@b.com", "x", "Acme").await.unwrap();

        assert_eq!(
            ctx.data.fetch_dashboard_data(acme.company.id).await.unwrap(),
            None,
            "{}",
            fixture.name
        );

        let page = DashboardPage::mount(ctx);
        page.load().await;
        assert_eq!(page.state(), PageState::Success(DashboardView::Empty));
    }
}

#[tokio::test]
async fn test_dashboard_shows_snapshot() {
    for fixture in fixtures().await {
        let ctx = tab(&SharedStorage::memory(), &fixture);
        let acme = ctx.data.signup("a@b.com", "x", "Acme").await.unwrap();
        fixture
            .tables
            .record_dashboard_snapshot(acme.company.id, json!({"revenue": 1200}), Utc::now())
            .await
            .unwrap();

        let page = DashboardPage::mount(ctx);
        page.load().await;

        let PageState::Success(DashboardView::Snapshot(view)) = page.state() else {
            panic!("{}: expected a snapshot, got {:?}", fixture.name, page.state());
        };
        assert_eq!(view.company_id, acme.company.id);
        assert!(view.payload.contains("1200"));
    }
}

// =============================================================================
// Settings
// =============================================================================

#[tokio::test]
async fn test_missing_company_settings_is_none() {
    for fixture in fixtures().await {
        let ctx = tab(&SharedStorage::memory(), &fixture);
        assert_eq!(
            ctx.data
                .fetch_company_settings(CompanyId::new(999))
                .await
                .unwrap(),
            None,
            "{}",
            fixture.name
        );
    }
}

#[tokio::test]
async fn test_save_settings_is_idempotent() {
    for fixture in fixtures().await {
        let ctx = tab(&SharedStorage::memory(), &fixture);
        let acme = ctx.data.signup("a@b.com", "x", "Acme").await.unwrap();
        let input = CompanySettingsInput::new("acme.myshopify.com", "key", "token");

        let once = ctx
            .data
            .save_company_settings(acme.company.id, &input)
            .await
            .unwrap();
        let twice = ctx
            .data
            .save_company_settings(acme.company.id, &input)
            .await
            .unwrap();

        assert_eq!(once, twice, "{}", fixture.name);
        assert_eq!(twice.settings(), input);
    }
}

#[tokio::test]
async fn test_settings_page_round_trip() {
    for fixture in fixtures().await {
        let ctx = tab(&SharedStorage::memory(), &fixture);
        ctx.data.signup("a@b.com", "x", "Acme").await.unwrap();

        let page = SettingsPage::mount(ctx.clone());
        page.load().await;
        assert!(page.form().store_domain.is_empty(), "{}", fixture.name);

        page.set_store_domain("acme.myshopify.com");
        page.set_api_key("key");
        page.set_access_token("token");
        page.save().await;
        assert!(page.save_state().success().is_some(), "{}", fixture.name);

        // A fresh mount sees the saved values.
        let reopened = SettingsPage::mount(ctx);
        reopened.load().await;
        assert_eq!(reopened.form(), page.form());
    }
}

#[tokio::test]
async fn test_clearing_settings() {
    for fixture in fixtures().await {
        let ctx = tab(&SharedStorage::memory(), &fixture);
        let acme = ctx.data.signup("a@b.com", "x", "Acme").await.unwrap();
        let id = acme.company.id;

        ctx.data
            .save_settings(id, "acme.myshopify.com", "key", "token")
            .await
            .unwrap();
        let cleared = ctx.data.save_settings(id, "", "", "").await.unwrap();

        assert_eq!(cleared.shopify_domain, None, "{}", fixture.name);
        assert!(cleared.api_key.is_none());
        assert!(cleared.access_token.is_none());
        assert!(!cleared.has_integration());
    }
}

// =============================================================================
// Sessions across tabs
// =============================================================================

#[tokio::test]
async fn test_login_in_one_tab_reloads_dashboard_in_another() {
    for fixture in fixtures().await {
        let storage = SharedStorage::memory();
        let writer = tab(&storage, &fixture);
        let reader = tab(&storage, &fixture);

        let acme = writer.data.signup("a@b.com", "x", "Acme").await.unwrap();
        fixture
            .tables
            .record_dashboard_snapshot(acme.company.id, json!({"orders": 3}), Utc::now())
            .await
            .unwrap();
        writer.session.clear().unwrap();

        let page = DashboardPage::mount(reader);
        page.load().await;
        assert!(page.state().error().is_some(), "{}", fixture.name);

        let follower = {
            let page = page.clone();
            tokio::spawn(async move { page.follow_session().await })
        };
        tokio::task::yield_now().await;

        writer.data.login("a@b.com", "x").await.unwrap();

        let PageState::Success(DashboardView::Snapshot(view)) = wait_for_snapshot(&page).await
        else {
            unreachable!();
        };
        assert_eq!(view.company_id, acme.company.id);

        page.unmount();
        tokio::time::timeout(WAIT, follower).await.unwrap().unwrap();
    }
}

#[test]
fn test_logout_is_seen_by_every_tab() {
    let storage = SharedStorage::memory();
    let first = SessionContext::new(storage.open_tab(), SessionPolicy::default());
    let second = SessionContext::new(storage.open_tab(), SessionPolicy::default());

    first
        .establish(CompanyId::new(4), saas_dashboard_core::UserId::new(9))
        .unwrap();
    assert_eq!(second.company_id(), Some(CompanyId::new(4)));

    second.clear().unwrap();
    assert_eq!(first.company_id(), None);
    assert_eq!(first.user_id(), None);
}

#[tokio::test]
async fn test_file_session_is_shared_between_processes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");

    // Two independent storage handles model two processes.
    let here = SharedStorage::file(&path).unwrap();
    let elsewhere = SharedStorage::file(&path).unwrap();

    let watcher = SessionContext::new(here.open_tab(), SessionPolicy::default());
    let mut subscription = watcher.subscribe();
    let poller = here.watch_outside_changes(Duration::from_millis(20));

    let writer = SessionContext::new(elsewhere.open_tab(), SessionPolicy::default());
    writer
        .establish(CompanyId::new(12), saas_dashboard_core::UserId::new(1))
        .unwrap();

    let changed = tokio::time::timeout(WAIT, subscription.changed())
        .await
        .unwrap();
    assert_eq!(changed, Some(CompanyId::new(12)));
    assert_eq!(watcher.company_id(), Some(CompanyId::new(12)));

    poller.abort();
}
