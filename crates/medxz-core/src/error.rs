//! Structured errors returned by the auth client.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure of a remote auth operation.
///
/// Serialized as `{"type": "...", "details": {...}}` so the shape matches what
/// the server-facing bindings produce.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "type", content = "details")]
pub enum AppError {
    #[error("name cannot be empty")]
    EmptyName,

    #[error("invalid server url: {message}")]
    InvalidServerUrl { message: String },

    #[error("network error: {message}")]
    Network { message: String },

    #[error("keychain error: {message}")]
    Keychain { message: String },

    #[error("server error {status} {code}: {message}")]
    ServerError {
        status: u16,
        code: String,
        message: String,
    },
}

impl AppError {
    pub fn network(message: impl Into<String>) -> Self {
        AppError::Network {
            message: message.into(),
        }
    }

    pub fn keychain(message: impl Into<String>) -> Self {
        AppError::Keychain {
            message: message.into(),
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
