//! Integration tests for the SaaS dashboard.
//!
//! # Running Tests
//!
//! ```bash
//! # REST and in-memory suites (no external services)
//! cargo test -p saas-dashboard-integration-tests
//!
//! # PostgreSQL suite
//! DATABASE_URL=postgres://localhost/dashboard_test \
//!     cargo test -p saas-dashboard-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `rest_backend` - `RestBackend` against the fake HTTP API below
//! - `account_flows` - Signup, login, session and page flows end to end
//! - `postgres_backend` - `PostgresBackend` against a real database
//!
//! The [`FakeApi`] serves the JSON API the dashboard talks to, backed by an
//! [`InMemoryBackend`], on an ephemeral local port.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::extract::{Path, Request, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use reqwest::Client;
use secrecy::SecretString;
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use url::Url;

use saas_dashboard_client::AdminCapability;
use saas_dashboard_client::DataAccessError;
use saas_dashboard_client::backend::{Backend, InMemoryBackend, NewAccount, RestBackend};
use saas_dashboard_client::password::CredentialHasher;
use saas_dashboard_core::{
    Company, CompanyId, CompanySettingsInput, DashboardData, Email, LoginResult, SignupResult,
};

/// Admin token the fake API accepts.
pub const ADMIN_TOKEN: &str = "test-admin-token";

/// Body of every response while an outage is simulated.
pub const OUTAGE_MESSAGE: &str = "Service temporarily unavailable";

// =============================================================================
// Fake API
// =============================================================================

#[derive(Clone)]
struct ApiState {
    backend: Arc<InMemoryBackend>,
    admin_token: SecretString,
    outage: Arc<AtomicBool>,
}

/// A running fake of the dashboard's HTTP API.
///
/// The server task stops when this value is dropped.
pub struct FakeApi {
    base_url: Url,
    backend: Arc<InMemoryBackend>,
    outage: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl FakeApi {
    /// Start the API on `127.0.0.1` with an ephemeral port.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the listener cannot be bound.
    pub async fn spawn() -> std::io::Result<Self> {
        let backend = Arc::new(InMemoryBackend::with_hasher(CredentialHasher::minimal()));
        let outage = Arc::new(AtomicBool::new(false));
        let state = ApiState {
            backend: Arc::clone(&backend),
            admin_token: SecretString::from(ADMIN_TOKEN),
            outage: Arc::clone(&outage),
        };

        let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
        let addr = listener.local_addr()?;
        let app = router(state);

        let task = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!(error = %e, "Fake API stopped");
            }
        });

        let base_url = Url::parse(&format!("http://{addr}/api"))
            .map_err(|e| std::io::Error::other(e.to_string()))?;

        Ok(Self {
            base_url,
            backend,
            outage,
            task,
        })
    }

    /// Base URL, including a path prefix.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The tables behind the API, for seeding and inspection.
    #[must_use]
    pub const fn backend(&self) -> &Arc<InMemoryBackend> {
        &self.backend
    }

    /// A REST backend pointed at this API.
    #[must_use]
    pub fn rest_backend(&self) -> RestBackend {
        RestBackend::with_client(Client::new(), self.base_url.clone())
    }

    /// Make every request fail with a 503 until switched back off.
    pub fn set_outage(&self, on: bool) {
        self.outage.store(on, Ordering::SeqCst);
    }
}

impl Drop for FakeApi {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn router(state: ApiState) -> Router {
    let api = Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/dashboard/{company_id}", get(dashboard))
        .route("/settings/{company_id}", get(settings).post(save_settings))
        .route("/admin/companies", get(companies))
        .layer(middleware::from_fn_with_state(state.clone(), outage_guard))
        .with_state(state);

    Router::new().nest("/api", api)
}

async fn outage_guard(State(state): State<ApiState>, request: Request, next: Next) -> Response {
    if state.outage.load(Ordering::SeqCst) {
        return (StatusCode::SERVICE_UNAVAILABLE, OUTAGE_MESSAGE).into_response();
    }
    next.run(request).await
}

// =============================================================================
// Errors
// =============================================================================

struct ApiError(DataAccessError);

impl From<DataAccessError> for ApiError {
    fn from(err: DataAccessError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            DataAccessError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            DataAccessError::Auth(_) => StatusCode::UNAUTHORIZED,
            DataAccessError::Forbidden(_) => StatusCode::FORBIDDEN,
            DataAccessError::NotFound(_) => StatusCode::NOT_FOUND,
            DataAccessError::Conflict(_) => StatusCode::CONFLICT,
            DataAccessError::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.0.to_string()).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

fn not_found(what: &str) -> ApiError {
    ApiError(DataAccessError::NotFound(format!("{what} not found")))
}

// =============================================================================
// Handlers
// =============================================================================

#[derive(Deserialize)]
struct SignupRequest {
    email: String,
    password: String,
    company_name: String,
}

#[derive(Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Deserialize)]
struct SettingsRequest {
    shopify: ShopifySettings,
}

#[derive(Deserialize)]
struct ShopifySettings {
    shop_domain: String,
    api_key: String,
    access_token: String,
}

async fn signup(
    State(state): State<ApiState>,
    Json(body): Json<SignupRequest>,
) -> ApiResult<SignupResult> {
    let email = Email::parse(&body.email)
        .map_err(|e| ApiError(DataAccessError::Validation(e.to_string())))?;
    let company_name = body.company_name.trim();
    if company_name.is_empty() || body.password.is_empty() {
        return Err(ApiError(DataAccessError::Validation(
            "company_name and password are required".to_string(),
        )));
    }

    let account = NewAccount {
        email,
        password: SecretString::from(body.password),
        company_name: company_name.to_string(),
    };
    Ok(Json(state.backend.signup(&account).await?))
}

async fn login(
    State(state): State<ApiState>,
    Json(body): Json<LoginRequest>,
) -> ApiResult<LoginResult> {
    let email = Email::parse(&body.email).map_err(|_| DataAccessError::invalid_credentials())?;
    let password = SecretString::from(body.password);
    Ok(Json(state.backend.login(&email, &password).await?))
}

async fn dashboard(
    State(state): State<ApiState>,
    Path(company_id): Path<CompanyId>,
) -> ApiResult<DashboardData> {
    state
        .backend
        .fetch_dashboard_data(company_id)
        .await?
        .map(Json)
        .ok_or_else(|| not_found("Dashboard data"))
}

async fn settings(
    State(state): State<ApiState>,
    Path(company_id): Path<CompanyId>,
) -> ApiResult<Company> {
    state
        .backend
        .fetch_company_settings(company_id)
        .await?
        .map(Json)
        .ok_or_else(|| not_found("Company"))
}

async fn save_settings(
    State(state): State<ApiState>,
    Path(company_id): Path<CompanyId>,
    Json(body): Json<SettingsRequest>,
) -> ApiResult<Company> {
    let input = CompanySettingsInput::new(
        body.shopify.shop_domain,
        body.shopify.api_key,
        body.shopify.access_token,
    );
    Ok(Json(
        state
            .backend
            .save_company_settings(company_id, &input)
            .await?,
    ))
}

async fn companies(State(state): State<ApiState>, headers: HeaderMap) -> ApiResult<Vec<Company>> {
    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| DataAccessError::Auth("Missing admin token".to_string()))?;

    let admin = AdminCapability::grant(Some(&state.admin_token), presented)?;
    Ok(Json(state.backend.fetch_companies(&admin).await?))
}
