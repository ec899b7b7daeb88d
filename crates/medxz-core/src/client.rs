//! Remote auth service.
//!
//! [`AuthService`] is the seam the session controller depends on;
//! [`HttpAuthClient`] is the implementation that talks to the medxz server:
//!
//! - `POST /v1/auth/login`  → `{session_token, organization, user}`
//! - `GET  /v1/auth/me`     → `{organization, user}` (bearer token)
//! - `POST /v1/auth/logout` → `{ok}` (bearer token)
//!
//! Expected failures are returned as [`AppError`], never panics.

use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::session::{LoginRequest, OrganizationInfo, Session, UserInfo};
use crate::token_store::TokenStore;

const LOGIN_PATH: &str = "/v1/auth/login";
const ME_PATH: &str = "/v1/auth/me";
const LOGOUT_PATH: &str = "/v1/auth/logout";

/// Default per-request timeout. Expiry surfaces as [`AppError::Network`].
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Operations the session controller needs from the server.
pub trait AuthService: Send + Sync + 'static {
    /// Returns the session behind the stored token, or `None` when there is
    /// no usable token.
    fn check_session(
        &self,
        server_url: &str,
    ) -> impl Future<Output = AppResult<Option<Session>>> + Send;

    fn login(&self, request: &LoginRequest) -> impl Future<Output = AppResult<Session>> + Send;

    fn logout(&self, server_url: &str) -> impl Future<Output = AppResult<()>> + Send;
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    session_token: String,
    organization: OrganizationInfo,
    user: UserInfo,
}

#[derive(Debug, Deserialize)]
struct MeResponse {
    organization: OrganizationInfo,
    user: UserInfo,
}

#[derive(Debug, Deserialize)]
struct ServerErrorBody {
    code: String,
    message: String,
}

/// HTTP implementation of [`AuthService`].
#[derive(Debug, Clone)]
pub struct HttpAuthClient {
    http: reqwest::Client,
    tokens: TokenStore,
}

impl HttpAuthClient {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(tokens: TokenStore) -> Result<Self> {
        Self::with_timeout(tokens, DEFAULT_TIMEOUT)
    }

    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_timeout(tokens: TokenStore, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { http, tokens })
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }
}

impl AuthService for HttpAuthClient {
    async fn check_session(&self, server_url: &str) -> AppResult<Option<Session>> {
        let Some(token) = self.tokens.load()? else {
            tracing::debug!("no stored session token");
            return Ok(None);
        };

        let url = join_url(server_url, ME_PATH)?;
        let response = self
            .http
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| AppError::network(e.to_string()))?;

        if response.status() == StatusCode::UNAUTHORIZED {
            tracing::debug!("stored session token rejected, discarding it");
            self.tokens.delete()?;
            return Ok(None);
        }

        if !response.status().is_success() {
            return Err(parse_server_error(response).await);
        }

        let data: MeResponse = response
            .json()
            .await
            .map_err(|e| AppError::network(format!("failed to decode server response: {e}")))?;

        Ok(Some(Session {
            organization: data.organization,
            user: data.user,
        }))
    }

    async fn login(&self, request: &LoginRequest) -> AppResult<Session> {
        let url = join_url(&request.server_url, LOGIN_PATH)?;
        tracing::debug!(
            organization = %request.organization_code,
            email = %request.email,
            "submitting login"
        );

        let response = self
            .http
            .post(&url)
            .json(&serde_json::json!({
                "organization_code": request.organization_code,
                "email": request.email,
                "password": request.password,
            }))
            .send()
            .await
            .map_err(|e| AppError::network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(parse_server_error(response).await);
        }

        let data: LoginResponse = response
            .json()
            .await
            .map_err(|e| AppError::network(format!("failed to decode server response: {e}")))?;

        self.tokens.store(&data.session_token)?;

        Ok(Session {
            organization: data.organization,
            user: data.user,
        })
    }

    async fn logout(&self, server_url: &str) -> AppResult<()> {
        let Some(token) = self.tokens.load()? else {
            return Ok(());
        };

        let url = join_url(server_url, LOGOUT_PATH)?;
        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| AppError::network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(parse_server_error(response).await);
        }

        self.tokens.delete()
    }
}

fn join_url(base: &str, path: &str) -> AppResult<String> {
    let base = base.trim();
    if base.is_empty() {
        return Err(AppError::InvalidServerUrl {
            message: "server_url is required".into(),
        });
    }

    let base = base.trim_end_matches('/');
    Ok(format!("{base}{path}"))
}

async fn parse_server_error(response: reqwest::Response) -> AppError {
    let status = response.status().as_u16();
    match response.json::<ServerErrorBody>().await {
        Ok(body) => AppError::ServerError {
            status,
            code: body.code,
            message: body.message,
        },
        Err(e) => AppError::ServerError {
            status,
            code: "unknown".into(),
            message: format!("failed to decode server error response: {e}"),
        },
    }
}
