//! Core types and I/O for the medxz client.
//!
//! Everything here is independent of the session controller: the error
//! taxonomy, the durable settings, the session token file and the HTTP client
//! that talks to the auth server.

pub mod client;
pub mod config;
pub mod error;
pub mod format_error;
pub mod logging;
pub mod session;
pub mod token_store;

pub use client::{AuthService, HttpAuthClient};
pub use error::{AppError, AppResult};
pub use format_error::{ErrorContext, format_auth_error};
pub use session::{Credentials, LoginRequest, OrganizationInfo, Session, UserInfo};
