//! REST client for the donation-management API.
//!
//! One [`ApiClient`] serves every screen. The auth context is injected at
//! construction; every request picks up the current bearer token from it, so
//! signing out immediately stops the `Authorization` header from being sent.

mod account;
mod admin;
mod donors;
mod import;
mod receipts;

pub use admin::TwoFactorAction;
pub use receipts::{DonationQuery, DONOR_ID_HEADER, RECEIPT_ID_HEADER};

use crate::auth::AuthContext;
use crate::config::AppConfig;
use crate::error::ApiError;
use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;

/// Opaque binary payload plus the response headers that describe it.
#[derive(Debug, Clone)]
pub struct Blob {
    pub bytes: Bytes,
    pub headers: HeaderMap,
}

impl Blob {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    auth: AuthContext,
}

impl ApiClient {
    pub fn new(cfg: &AppConfig, auth: AuthContext) -> Result<Self, ApiError> {
        let http = Client::builder()
            .user_agent(cfg.user_agent.clone())
            .timeout(cfg.timeout)
            .build()?;
        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            auth,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn auth(&self) -> &AuthContext {
        &self.auth
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        tracing::debug!(%method, path, "api request");
        let rb = self.http.request(method, format!("{}{}", self.base_url, path));
        match self.auth.bearer_token() {
            Some(token) => rb.bearer_auth(token),
            None => rb,
        }
    }

    pub(crate) fn get(&self, path: &str) -> RequestBuilder {
        self.request(Method::GET, path)
    }

    pub(crate) fn post(&self, path: &str) -> RequestBuilder {
        self.request(Method::POST, path)
    }

    pub(crate) fn put(&self, path: &str) -> RequestBuilder {
        self.request(Method::PUT, path)
    }

    pub(crate) fn delete(&self, path: &str) -> RequestBuilder {
        self.request(Method::DELETE, path)
    }

    /// Send and turn any non-2xx status into a classified [`ApiError`].
    async fn send(rb: RequestBuilder) -> Result<Response, ApiError> {
        let resp = rb.send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        let err = ApiError::from_response(status.as_u16(), &body);
        tracing::warn!(status = status.as_u16(), error = %err, "api call failed");
        Err(err)
    }

    pub(crate) async fn send_json<T: DeserializeOwned>(rb: RequestBuilder) -> Result<T, ApiError> {
        let resp = Self::send(rb).await?;
        resp.json::<T>()
            .await
            .map_err(|e| ApiError::Deserialize(e.to_string()))
    }

    /// Like [`Self::send_json`] but tolerates an empty body.
    pub(crate) async fn send_json_or_default<T: DeserializeOwned + Default>(
        rb: RequestBuilder,
    ) -> Result<T, ApiError> {
        let resp = Self::send(rb).await?;
        let body = resp.text().await?;
        if body.trim().is_empty() {
            return Ok(T::default());
        }
        serde_json::from_str(&body).map_err(|e| ApiError::Deserialize(e.to_string()))
    }

    pub(crate) async fn send_empty(rb: RequestBuilder) -> Result<(), ApiError> {
        Self::send(rb).await.map(|_| ())
    }

    pub(crate) async fn send_blob(rb: RequestBuilder) -> Result<Blob, ApiError> {
        let resp = Self::send(rb).await?;
        let headers = resp.headers().clone();
        let bytes = resp.bytes().await?;
        Ok(Blob { bytes, headers })
    }
}
