//! Session and credential types.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationInfo {
    pub id: String,
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: String,
    pub email: String,
    pub role: String,
}

/// Authenticated identity as returned by the server.
///
/// Replaced wholesale on every successful check or login; never edited in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub organization: OrganizationInfo,
    pub user: UserInfo,
}

/// Email/password pair typed by the user.
///
/// Only lives for the duration of a login attempt. The password is never
/// trimmed and never shows up in Debug output.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Fully resolved login call: trimmed server, organization and email.
#[derive(Clone, PartialEq, Eq)]
pub struct LoginRequest {
    pub server_url: String,
    pub organization_code: String,
    pub email: String,
    pub password: String,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("server_url", &self.server_url)
            .field("organization_code", &self.organization_code)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}
