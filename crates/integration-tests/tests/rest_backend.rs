//! `RestBackend` against the fake HTTP API.
//!
//! Covers the wire contract: request shapes, status code mapping and error
//! bodies passed through verbatim.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use secrecy::SecretString;
use serde_json::json;

use saas_dashboard_client::backend::{Backend, RestBackend};
use saas_dashboard_client::{AdminCapability, DataAccess, DataAccessError};
use saas_dashboard_core::{CompanyId, CompanySettingsInput};
use saas_dashboard_integration_tests::{ADMIN_TOKEN, FakeApi, OUTAGE_MESSAGE};

async fn setup() -> (FakeApi, DataAccess) {
    let api = FakeApi::spawn().await.unwrap();
    let data = DataAccess::new(Arc::new(api.rest_backend()));
    (api, data)
}

fn admin(token: &str) -> AdminCapability {
    AdminCapability::grant(Some(&SecretString::from(token)), token).unwrap()
}

// =============================================================================
// Auth
// =============================================================================

#[tokio::test]
async fn test_signup_over_http() {
    let (api, data) = setup().await;

    let result = data.signup("a@b.com", "x", "Acme").await.unwrap();
    assert_eq!(result.company.name, "Acme");
    assert_eq!(result.company.shopify_domain, None);
    assert_eq!(result.user.email.as_str(), "a@b.com");
    assert_eq!(result.user.company_id, result.company.id);

    // The hash never leaves the server.
    assert!(result.user.password_hash.is_empty());
    assert_eq!(api.backend().user_count().await, 1);
}

#[tokio::test]
async fn test_duplicate_signup_is_conflict() {
    let (_api, data) = setup().await;
    data.signup("a@b.com", "x", "Acme").await.unwrap();

    let err = data.signup("a@b.com", "y", "Other").await.unwrap_err();
    assert!(matches!(err, DataAccessError::Conflict(_)));
}

#[tokio::test]
async fn test_login_over_http() {
    let (_api, data) = setup().await;
    let acme = data.signup("a@b.com", "x", "Acme").await.unwrap();

    let result = data.login("a@b.com", "x").await.unwrap();
    assert_eq!(result.user.id, acme.user.id);
    assert_eq!(result.company.map(|c| c.id), Some(acme.company.id));
}

#[tokio::test]
async fn test_bad_credentials_are_auth_errors() {
    let (_api, data) = setup().await;
    data.signup("a@b.com", "x", "Acme").await.unwrap();

    let wrong_password = data.login("a@b.com", "nope").await.unwrap_err();
    assert_eq!(wrong_password, DataAccessError::invalid_credentials());

    let unknown_user = data.login("ghost@b.com", "x").await.unwrap_err();
    assert_eq!(unknown_user, DataAccessError::invalid_credentials());
}

// =============================================================================
// Dashboard
// =============================================================================

#[tokio::test]
async fn test_dashboard_404_is_none() {
    let (_api, data) = setup().await;
    let acme = data.signup("a@b.com", "x", "Acme").await.unwrap();

    assert_eq!(data.fetch_dashboard_data(acme.company.id).await.unwrap(), None);
    assert_eq!(data.fetch_dashboard_data(CompanyId::new(999)).await.unwrap(), None);
}

#[tokio::test]
async fn test_dashboard_returns_latest_snapshot() {
    let (api, data) = setup().await;
    let acme = data.signup("a@b.com", "x", "Acme").await.unwrap();

    let older = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let newer = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
    api.backend()
        .record_dashboard_snapshot(acme.company.id, json!({"orders": 1}), older)
        .await
        .unwrap();
    let latest = api
        .backend()
        .record_dashboard_snapshot(acme.company.id, json!({"orders": 7}), newer)
        .await
        .unwrap();

    let fetched = data
        .fetch_dashboard_data(acme.company.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(fetched, latest);
}

// =============================================================================
// Settings
// =============================================================================

#[tokio::test]
async fn test_missing_company_settings_is_none() {
    let (_api, data) = setup().await;
    assert_eq!(
        data.fetch_company_settings(CompanyId::new(999)).await.unwrap(),
        None
    );
}

#[tokio::test]
async fn test_settings_round_trip() {
    let (_api, data) = setup().await;
    let acme = data.signup("a@b.com", "x", "Acme").await.unwrap();

    let input = CompanySettingsInput::new("acme.myshopify.com", "key", "token");
    let saved = data
        .save_company_settings(acme.company.id, &input)
        .await
        .unwrap();
    let fetched = data
        .fetch_company_settings(acme.company.id)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(fetched, saved);
    assert_eq!(fetched.shopify_domain.as_deref(), Some("acme.myshopify.com"));
    assert_eq!(fetched.api_key.as_ref().map(|k| k.expose()), Some("key"));
    assert_eq!(fetched.access_token.as_ref().map(|t| t.expose()), Some("token"));
}

#[tokio::test]
async fn test_save_settings_for_unknown_company() {
    let (_api, data) = setup().await;
    let input = CompanySettingsInput::new("x.myshopify.com", "k", "t");

    let err = data
        .save_company_settings(CompanyId::new(999), &input)
        .await
        .unwrap_err();
    assert!(matches!(err, DataAccessError::NotFound(_)));
}

// =============================================================================
// Admin
// =============================================================================

#[tokio::test]
async fn test_companies_with_admin_token() {
    let (_api, data) = setup().await;
    data.signup("a@b.com", "x", "Acme").await.unwrap();
    data.signup("c@d.com", "x", "Globex").await.unwrap();

    let companies = data.fetch_companies(&admin(ADMIN_TOKEN)).await.unwrap();
    let names: Vec<_> = companies.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names.len(), 2);
    assert!(names.contains(&"Acme"));
    assert!(names.contains(&"Globex"));
}

#[tokio::test]
async fn test_companies_with_wrong_token_is_forbidden() {
    let (api, _data) = setup().await;

    let err = api
        .rest_backend()
        .fetch_companies(&admin("not-the-token"))
        .await
        .unwrap_err();
    assert!(matches!(err, DataAccessError::Forbidden(_)));
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test]
async fn test_server_error_body_is_surfaced_verbatim() {
    let (api, data) = setup().await;
    api.set_outage(true);

    let err = data.login("a@b.com", "x").await.unwrap_err();
    assert_eq!(err, DataAccessError::Backend(OUTAGE_MESSAGE.to_string()));
    assert_eq!(err.to_string(), OUTAGE_MESSAGE);

    api.set_outage(false);
    assert!(data.signup("a@b.com", "x", "Acme").await.is_ok());
}

#[tokio::test]
async fn test_unreachable_server_is_backend_error() {
    // Bind and immediately release a port so nothing is listening on it.
    let addr = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap();
    let url = url::Url::parse(&format!("http://{addr}/api")).unwrap();
    let backend = RestBackend::with_client(reqwest::Client::new(), url);

    let data = DataAccess::new(Arc::new(backend));
    let err = data
        .fetch_company_settings(CompanyId::new(1))
        .await
        .unwrap_err();
    assert!(err.is_backend());
}
