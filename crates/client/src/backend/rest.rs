//! REST backend.
//!
//! Talks to the HTTP facade over the hosted tables:
//!
//! | Operation | Request |
//! |-----------|---------|
//! | signup | `POST /auth/signup {email, password, company_name}` |
//! | login | `POST /auth/login {email, password}` |
//! | dashboard | `GET /dashboard/{company_id}` (404 = none) |
//! | settings | `GET /settings/{company_id}` (404 = none) |
//! | save settings | `POST /settings/{company_id} {shopify: {...}}` |
//! | companies | `GET /admin/companies` with a bearer token |
//!
//! Credential verification happens on the server. Error bodies of non-2xx
//! responses are passed through verbatim.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use saas_dashboard_core::{
    Company, CompanyId, CompanySettingsInput, DashboardData, Email, LoginResult, SignupResult,
};

use super::{Backend, NewAccount};
use crate::admin::AdminCapability;
use crate::error::{DataAccessError, Result};

#[derive(Serialize)]
struct SignupBody<'a> {
    email: &'a str,
    password: &'a str,
    company_name: &'a str,
}

#[derive(Serialize)]
struct LoginBody<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct SettingsBody<'a> {
    shopify: ShopifySettingsBody<'a>,
}

#[derive(Serialize)]
struct ShopifySettingsBody<'a> {
    shop_domain: &'a str,
    api_key: &'a str,
    access_token: &'a str,
}

/// Backend calling the REST facade.
#[derive(Debug, Clone)]
pub struct RestBackend {
    client: Client,
    base_url: Url,
}

impl RestBackend {
    /// Create a REST backend rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(base_url: Url) -> std::result::Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(concat!("saas-dashboard/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(client, base_url))
    }

    /// Create a REST backend using an existing HTTP client.
    #[must_use]
    pub fn with_client(client: Client, mut base_url: Url) -> Self {
        // Url::join drops the last path segment unless the base ends in '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self { client, base_url }
    }

    /// The base URL every endpoint is resolved against.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| DataAccessError::Backend(format!("Invalid endpoint {path}: {e}")))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        Ok(request.send().await?)
    }

    /// Fetch an entity that may legitimately be missing.
    async fn get_optional<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        let response = self.send(self.client.get(self.endpoint(path)?)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        handle_response::<Option<T>>(response).await
    }
}

/// Turn a response into a value or a classified error.
async fn handle_response<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(classify_failure(status, text));
    }

    response
        .json::<T>()
        .await
        .map_err(|e| DataAccessError::Backend(format!("Invalid response body: {e}")))
}

/// Map a non-2xx status to the error taxonomy, keeping the body verbatim.
fn classify_failure(status: StatusCode, body: String) -> DataAccessError {
    let message = if body.trim().is_empty() {
        format!("Request failed with status {}", status.as_u16())
    } else {
        body
    };

    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            DataAccessError::Validation(message)
        }
        StatusCode::UNAUTHORIZED => DataAccessError::Auth(message),
        StatusCode::FORBIDDEN => DataAccessError::Forbidden(message),
        StatusCode::NOT_FOUND => DataAccessError::NotFound(message),
        StatusCode::CONFLICT => DataAccessError::Conflict(message),
        _ => {
            tracing::warn!(status = status.as_u16(), "REST backend request failed");
            DataAccessError::Backend(message)
        }
    }
}

#[async_trait]
impl Backend for RestBackend {
    fn name(&self) -> &'static str {
        "rest"
    }

    async fn signup(&self, account: &NewAccount) -> Result<SignupResult> {
        let body = SignupBody {
            email: account.email.as_str(),
            password: account.password.expose_secret(),
            company_name: &account.company_name,
        };
        let response = self
            .send(self.client.post(self.endpoint("auth/signup")?).json(&body))
            .await?;
        handle_response(response).await
    }

    async fn login(&self, email: &Email, password: &SecretString) -> Result<LoginResult> {
        let body = LoginBody {
            email: email.as_str(),
            password: password.expose_secret(),
        };
        let response = self
            .send(self.client.post(self.endpoint("auth/login")?).json(&body))
            .await?;
        handle_response(response).await
    }

    async fn fetch_dashboard_data(&self, company_id: CompanyId) -> Result<Option<DashboardData>> {
        self.get_optional(&format!("dashboard/{company_id}")).await
    }

    async fn fetch_company_settings(&self, company_id: CompanyId) -> Result<Option<Company>> {
        self.get_optional(&format!("settings/{company_id}")).await
    }

    async fn save_company_settings(
        &self,
        company_id: CompanyId,
        settings: &CompanySettingsInput,
    ) -> Result<Company> {
        let body = SettingsBody {
            shopify: ShopifySettingsBody {
                shop_domain: &settings.store_domain,
                api_key: settings.api_key.expose(),
                access_token: settings.access_token.expose(),
            },
        };
        let url = self.endpoint(&format!("settings/{company_id}"))?;
        let response = self.send(self.client.post(url).json(&body)).await?;
        handle_response(response).await
    }

    async fn fetch_companies(&self, admin: &AdminCapability) -> Result<Vec<Company>> {
        let request = self
            .client
            .get(self.endpoint("admin/companies")?)
            .bearer_auth(admin.token().expose_secret());
        let response = self.send(request).await?;
        handle_response(response).await
    }
}
