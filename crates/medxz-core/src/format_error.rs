//! User-facing wording for auth failures.
//!
//! The context changes the wording, never the kind of error. Every
//! `AppError` variant and every known server code has an explicit arm;
//! unknown server codes get a generic message instead of an empty one.

use crate::error::AppError;

/// Which operation produced the error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorContext {
    Login,
    Session,
    Logout,
}

pub fn format_auth_error(err: &AppError, context: ErrorContext) -> String {
    let message = match err {
        AppError::EmptyName => "Name cannot be empty.",
        AppError::InvalidServerUrl { .. } => "Enter a valid server URL.",
        AppError::Network { .. } => match context {
            ErrorContext::Session => "Cannot reach the server to verify your session.",
            ErrorContext::Login | ErrorContext::Logout => {
                "Cannot reach the server. Check the URL and your connection."
            }
        },
        AppError::Keychain { .. } => "We could not access the system keychain for your session.",
        AppError::ServerError { code, .. } => format_server_error(code, context),
    };
    message.to_string()
}

fn format_server_error(code: &str, context: ErrorContext) -> &'static str {
    match code {
        "bad_request" => match context {
            ErrorContext::Login => "Please fill out all required fields.",
            ErrorContext::Session | ErrorContext::Logout => {
                "The request was invalid. Please try again."
            }
        },
        "unauthorized" => match context {
            ErrorContext::Login => "Incorrect email or password.",
            ErrorContext::Logout => "Your session has already expired.",
            ErrorContext::Session => "Your session expired. Please sign in again.",
        },
        "forbidden" => "This account is disabled. Contact your administrator.",
        "not_found" => match context {
            ErrorContext::Login => "No account found for that organization and email.",
            ErrorContext::Session | ErrorContext::Logout => {
                "We could not find your account. Please sign in again."
            }
        },
        "conflict" => "That request conflicts with existing data.",
        "internal" => "The server had a problem. Please try again.",
        _ => "Unexpected server error. Please try again.",
    }
}
