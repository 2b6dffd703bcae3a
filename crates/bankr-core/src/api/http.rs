//! HTTP client adapter for the banking backend.
//!
//! Attaches the persisted bearer token to every request and turns 401
//! responses into [`ApiErrorKind::Unauthorized`](super::ApiErrorKind) after
//! notifying the installed [`UnauthorizedHandler`]. No retries, no backoff and
//! no timeout beyond reqwest's defaults.

use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::errors::{ApiError, ApiErrorKind};
use crate::storage::Credentials;

/// Reacts to unauthorized responses.
///
/// Called once per 401, before the error is returned to the caller.
pub trait UnauthorizedHandler: Send + Sync {
    fn on_unauthorized(&self);
}

/// A logical request: method, path relative to the base URL, optional JSON
/// body and optional query pairs.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// Sets the JSON body.
    ///
    /// # Errors
    /// Returns a `Request` error if the body cannot be serialized.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body).map_err(|e| {
            ApiError::new(
                ApiErrorKind::Request,
                format!("Failed to serialize request body: {e}"),
            )
        })?;
        self.body = Some(value);
        Ok(self)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

/// Backend HTTP client. Cheap to clone; clones share the connection pool,
/// the credential store and the unauthorized handler.
#[derive(Clone)]
pub struct HttpClient {
    base_url: String,
    http: reqwest::Client,
    credentials: Credentials,
    unauthorized: Option<Arc<dyn UnauthorizedHandler>>,
}

impl HttpClient {
    /// Creates a client for `base_url` with JSON content headers.
    ///
    /// # Errors
    /// Returns an error if the underlying reqwest client cannot be built.
    pub fn new(base_url: &str, credentials: Credentials) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
            credentials,
            unauthorized: None,
        })
    }

    /// Returns a copy of this client that notifies `handler` on 401.
    #[must_use]
    pub fn with_unauthorized_handler(mut self, handler: Arc<dyn UnauthorizedHandler>) -> Self {
        self.unauthorized = Some(handler);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    fn url_for(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Bearer value for the persisted token, if any.
    fn bearer(&self) -> Option<String> {
        match self.credentials.token() {
            Ok(token) => token.map(|t| format!("Bearer {t}")),
            Err(e) => {
                tracing::warn!(error = %e, "could not read credential token; sending without it");
                None
            }
        }
    }

    /// Dispatches a request and returns the successful response.
    ///
    /// # Errors
    /// - `Unauthorized` on 401, after the unauthorized handler ran
    /// - `HttpStatus` on any other non-2xx status
    /// - `Timeout`/`Connection`/`Request` when the request never completed
    pub async fn send(&self, request: ApiRequest) -> Result<reqwest::Response, ApiError> {
        let url = self.url_for(&request.path);
        tracing::debug!(method = %request.method, %url, "dispatching request");

        let mut builder = self.http.request(request.method.clone(), &url);
        if let Some(bearer) = self.bearer() {
            builder = builder.header(AUTHORIZATION, bearer);
        }
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ApiError::from_reqwest(&e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::UNAUTHORIZED {
            tracing::warn!(%url, "backend rejected credentials; invalidating session");
            if let Some(handler) = &self.unauthorized {
                handler.on_unauthorized();
            }
            return Err(ApiError::unauthorized(&body));
        }

        tracing::debug!(%url, status = status.as_u16(), "request failed");
        Err(ApiError::http_status(status.as_u16(), &body))
    }

    /// Dispatches a request and decodes a JSON response body.
    ///
    /// # Errors
    /// See [`HttpClient::send`]; additionally `Parse` if the body does not
    /// decode into `T`.
    pub async fn send_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let response = self.send(request).await?;
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::from_reqwest(&e))?;
        serde_json::from_str(&body).map_err(|e| {
            let mut err = ApiError::parse(format!("Failed to parse response: {e}"));
            err.details = Some(body);
            err
        })
    }

    /// Dispatches a request and returns the body as text.
    ///
    /// # Errors
    /// See [`HttpClient::send`].
    pub async fn send_text(&self, request: ApiRequest) -> Result<String, ApiError> {
        let response = self.send(request).await?;
        response
            .text()
            .await
            .map_err(|e| ApiError::from_reqwest(&e))
    }
}
