//! REST client for the match backend.
//!
//! ARCHITECTURE
//! ============
//! `ApiClient` wraps one `reqwest::Client` and one base URL. Every request
//! reads the bearer token from the injected [`AuthHooks`] and attaches it
//! when present. A 401 response is reported back through
//! [`AuthHooks::session_rejected`] before the error is returned, so the
//! session owner decides what a rejected token means.
//!
//! ERROR HANDLING
//! ==============
//! Every operation is a single round trip: no retry, no backoff, no cache.
//! Non-2xx responses surface as [`ApiError::Status`] carrying the backend's
//! `detail` text.

use std::sync::Arc;

use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::types::{Health, Image, MatchOutcome, MatchResult, TokenResponse, User, UserUpdate};
use crate::config::ClientConfig;
use crate::upload::UploadRequest;

const EXPIRED_MESSAGE: &str = "Session expired. Please login again.";
const TRANSPORT_MESSAGE: &str = "Unable to reach the server. Please check your connection and try again.";

// =============================================================================
// ERROR TYPE
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The backend rejected the bearer token (or its absence).
    #[error("unauthorized: {detail}")]
    Unauthorized { detail: String },
    /// Any other non-2xx response.
    #[error("server returned {status}: {detail}")]
    Status { status: u16, detail: String },
    /// The request never produced a response.
    #[error("request failed: {0}")]
    Transport(String),
    /// A 2xx response whose body did not match the expected shape.
    #[error("unexpected response body: {0}")]
    Decode(String),
    /// The request could not be built (bad header, bad multipart part).
    #[error("invalid request: {0}")]
    Request(String),
}

impl ApiError {
    /// HTTP status for errors that carry one.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized { .. } => Some(StatusCode::UNAUTHORIZED.as_u16()),
            Self::Status { status, .. } => Some(*status),
            Self::Transport(_) | Self::Decode(_) | Self::Request(_) => None,
        }
    }

    /// Text suitable for showing to the user who triggered the request.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Unauthorized { .. } => EXPIRED_MESSAGE.to_owned(),
            Self::Status { detail, .. } => detail.clone(),
            Self::Transport(_) => TRANSPORT_MESSAGE.to_owned(),
            Self::Decode(_) | Self::Request(_) => "Something went wrong. Please try again.".to_owned(),
        }
    }
}

fn transport(err: reqwest::Error) -> ApiError {
    ApiError::Transport(err.to_string())
}

// =============================================================================
// SEAMS
// =============================================================================

/// Session-side hooks the client consults on every request.
pub trait AuthHooks: Send + Sync {
    /// Current bearer token, if a session holds one.
    fn bearer_token(&self) -> Option<String>;

    /// Called once per 401 response with the token that request carried.
    fn session_rejected(&self, sent_token: Option<&str>);
}

/// Every backend operation the session and the views rely on.
#[async_trait::async_trait]
pub trait Backend: Send + Sync {
    async fn authenticate(&self, username: &str, password: &str) -> Result<TokenResponse, ApiError>;
    async fn fetch_profile(&self) -> Result<User, ApiError>;
    async fn update_profile(&self, update: &UserUpdate) -> Result<User, ApiError>;
    async fn upload_image(&self, upload: UploadRequest) -> Result<Image, ApiError>;
    async fn list_images(&self, reference_only: bool) -> Result<Vec<Image>, ApiError>;
    async fn fetch_image(&self, image_id: i64) -> Result<Image, ApiError>;
    async fn match_image(&self, image_id: i64) -> Result<MatchOutcome, ApiError>;
    async fn match_history(&self) -> Result<Vec<MatchResult>, ApiError>;
}

// =============================================================================
// PATHS
// =============================================================================

fn image_endpoint(image_id: i64) -> String {
    format!("/api/images/{image_id}")
}

fn match_endpoint(image_id: i64) -> String {
    format!("/api/match/{image_id}")
}

/// Pull the human-readable message out of an error response body.
///
/// FastAPI sends `{"detail": "..."}` for handled errors and
/// `{"detail": [...]}` for request validation failures.
pub(crate) fn error_detail(status: StatusCode, body: &str) -> String {
    let parsed = serde_json::from_str::<Value>(body).ok();
    match parsed.as_ref().and_then(|v| v.get("detail")) {
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
        None if !body.trim().is_empty() => body.trim().to_owned(),
        None => status
            .canonical_reason()
            .map_or_else(|| format!("HTTP {}", status.as_u16()), ToOwned::to_owned),
    }
}

// =============================================================================
// CLIENT
// =============================================================================

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    hooks: Arc<dyn AuthHooks>,
}

impl ApiClient {
    /// Build a client for the configured backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: &ClientConfig, hooks: Arc<dyn AuthHooks>) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| ApiError::Request(e.to_string()))?;
        Ok(Self { http, base_url: config.api_url.trim_end_matches('/').to_owned(), hooks })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL of an uploaded image's served file.
    #[must_use]
    pub fn asset_url(&self, image: &Image) -> String {
        format!("{}{}", self.base_url, image.public_path())
    }

    /// Check backend liveness via `GET /health`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unreachable or unhealthy.
    pub async fn health(&self) -> Result<Health, ApiError> {
        let request = self.request(Method::GET, "/health");
        self.send_json(request).await
    }

    fn request(&self, method: Method, path: &str) -> (RequestBuilder, Option<String>) {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(method = method.as_str(), path, "api request");
        let token = self.hooks.bearer_token();
        let builder = self.http.request(method, url);
        let builder = match token.as_deref() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        };
        (builder, token)
    }

    async fn send(&self, (builder, token): (RequestBuilder, Option<String>)) -> Result<String, ApiError> {
        let response = builder.send().await.map_err(transport)?;
        let status = response.status();
        let body = response.text().await.map_err(transport)?;

        if status == StatusCode::UNAUTHORIZED {
            tracing::warn!("backend rejected credentials");
            self.hooks.session_rejected(token.as_deref());
            return Err(ApiError::Unauthorized { detail: error_detail(status, &body) });
        }
        if !status.is_success() {
            return Err(ApiError::Status { status: status.as_u16(), detail: error_detail(status, &body) });
        }
        Ok(body)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: (RequestBuilder, Option<String>),
    ) -> Result<T, ApiError> {
        let body = self.send(request).await?;
        serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

#[async_trait::async_trait]
impl Backend for ApiClient {
    async fn authenticate(&self, username: &str, password: &str) -> Result<TokenResponse, ApiError> {
        // Credential exchange carries no bearer, so its 401 never expires a session.
        let url = format!("{}/token", self.base_url);
        tracing::debug!(method = "POST", path = "/token", "api request");
        let builder = self
            .http
            .post(url)
            .form(&[("username", username), ("password", password)]);
        self.send_json((builder, None)).await
    }

    async fn fetch_profile(&self) -> Result<User, ApiError> {
        self.send_json(self.request(Method::GET, "/api/users/profile"))
            .await
    }

    async fn update_profile(&self, update: &UserUpdate) -> Result<User, ApiError> {
        let (builder, token) = self.request(Method::PUT, "/api/users/me");
        self.send_json((builder.json(update), token)).await
    }

    async fn upload_image(&self, upload: UploadRequest) -> Result<Image, ApiError> {
        let UploadRequest { file, is_reference } = upload;
        let part = Part::bytes(file.bytes)
            .file_name(file.file_name)
            .mime_str(&file.content_type)
            .map_err(|e| ApiError::Request(e.to_string()))?;
        let form = Form::new()
            .part("file", part)
            .text("is_reference", is_reference.to_string());
        let (builder, token) = self.request(Method::POST, "/api/upload");
        self.send_json((builder.multipart(form), token)).await
    }

    async fn list_images(&self, reference_only: bool) -> Result<Vec<Image>, ApiError> {
        let (builder, token) = self.request(Method::GET, "/api/images");
        let builder = builder.query(&[("reference_only", reference_only)]);
        self.send_json((builder, token)).await
    }

    async fn fetch_image(&self, image_id: i64) -> Result<Image, ApiError> {
        self.send_json(self.request(Method::GET, &image_endpoint(image_id)))
            .await
    }

    async fn match_image(&self, image_id: i64) -> Result<MatchOutcome, ApiError> {
        let value: Value = self
            .send_json(self.request(Method::POST, &match_endpoint(image_id)))
            .await?;
        MatchOutcome::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn match_history(&self) -> Result<Vec<MatchResult>, ApiError> {
        self.send_json(self.request(Method::GET, "/api/match-history"))
            .await
    }
}

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;
