//! Typed client for the service-desk REST contract.
//!
//! All calls share one authorization policy: the bearer token is attached to
//! every request, and an HTTP 401 triggers a single token refresh followed by
//! a single retry of the original call.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::engine::assignment::AssignVendorsRequest;
use crate::engine::billing::CreateBillRequest;
use crate::engine::listing::Page;
use crate::models::assignment::Assignment;
use crate::models::bill::Bill;
use crate::models::request::ServiceRequest;
use crate::models::vendor::Vendor;

const REFRESH_PATH: &str = "/api/token/refresh/";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("backend returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("unauthorized after token refresh")]
    Unauthorized,

    #[error("token refresh failed: {0}")]
    RefreshFailed(String),

    #[error("invalid base url: {0}")]
    InvalidUrl(String),
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn from_config(config: &Config) -> Option<Self> {
        config.backend_base_url.as_ref().map(|base_url| Self {
            base_url: base_url.clone(),
            timeout: Duration::from_secs(config.backend_timeout_secs),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh: &'a str,
}

#[derive(Deserialize)]
struct RefreshResponse {
    access: String,
    #[serde(default)]
    refresh: Option<String>,
}

pub struct BackendClient {
    http: Client,
    base_url: String,
    tokens: RwLock<TokenPair>,
}

impl BackendClient {
    pub fn new(config: ClientConfig, tokens: TokenPair) -> Result<Self, ClientError> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ClientError::InvalidUrl(config.base_url));
        }

        let http = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            http,
            base_url,
            tokens: RwLock::new(tokens),
        })
    }

    pub async fn tokens(&self) -> TokenPair {
        self.tokens.read().await.clone()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Sends the request built by `build`, refreshing the token and retrying
    /// once when the backend answers 401.
    async fn send<F>(&self, build: F) -> Result<Response, ClientError>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let access = self.tokens.read().await.access.clone();
        let response = build(&self.http).bearer_auth(&access).send().await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return ensure_success(response).await;
        }

        warn!("backend rejected access token; refreshing");
        self.refresh(&access).await?;

        let access = self.tokens.read().await.access.clone();
        let response = build(&self.http).bearer_auth(&access).send().await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(ClientError::Unauthorized);
        }
        ensure_success(response).await
    }

    async fn refresh(&self, stale_access: &str) -> Result<(), ClientError> {
        let mut tokens = self.tokens.write().await;

        // Another caller already swapped the token while we waited.
        if tokens.access != stale_access {
            return Ok(());
        }

        let response = self
            .http
            .post(self.url(REFRESH_PATH))
            .json(&RefreshRequest {
                refresh: &tokens.refresh,
            })
            .send()
            .await
            .map_err(|err| ClientError::RefreshFailed(err.to_string()))?;

        if !response.status().is_success() {
            return Err(ClientError::RefreshFailed(format!(
                "refresh endpoint returned {}",
                response.status()
            )));
        }

        let refreshed: RefreshResponse = response
            .json()
            .await
            .map_err(|err| ClientError::RefreshFailed(err.to_string()))?;

        tokens.access = refreshed.access;
        if let Some(refresh) = refreshed.refresh {
            tokens.refresh = refresh;
        }
        debug!("access token refreshed");

        Ok(())
    }

    async fn get_json<T>(&self, path: &str, query: &[(&str, &str)]) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
    {
        let url = self.url(path);
        let response = self.send(|http| http.get(&url).query(query)).await?;
        Ok(response.json().await?)
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize,
        T: DeserializeOwned,
    {
        let url = self.url(path);
        let response = self.send(|http| http.post(&url).json(body)).await?;
        Ok(response.json().await?)
    }

    pub async fn list_requests(
        &self,
        query: &[(&str, &str)],
    ) -> Result<Page<ServiceRequest>, ClientError> {
        self.get_json("/api/customer/requestservices/", query).await
    }

    pub async fn get_request(&self, id: Uuid) -> Result<ServiceRequest, ClientError> {
        self.get_json(&format!("/api/customer/requestservices/{id}/"), &[])
            .await
    }

    pub async fn assign_vendors(
        &self,
        submission: &AssignVendorsRequest,
    ) -> Result<Vec<Assignment>, ClientError> {
        self.post_json("/api/assign-vendor/", submission).await
    }

    pub async fn list_bills(&self, query: &[(&str, &str)]) -> Result<Page<Bill>, ClientError> {
        self.get_json("/api/billing/", query).await
    }

    pub async fn create_bill(&self, bill: &CreateBillRequest) -> Result<Bill, ClientError> {
        self.post_json("/api/billing/", bill).await
    }

    pub async fn list_vendors(&self, query: &[(&str, &str)]) -> Result<Page<Vendor>, ClientError> {
        self.get_json("/api/vendor/register/", query).await
    }

    pub async fn service_categories(&self) -> Result<Vec<String>, ClientError> {
        self.get_json("/api/get-service/categories/", &[]).await
    }

    pub async fn district_blocks(&self) -> Result<BTreeMap<String, Vec<String>>, ClientError> {
        self.get_json("/api/district-blocks/", &[]).await
    }
}

async fn ensure_success(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(ClientError::Status { status, body })
}
