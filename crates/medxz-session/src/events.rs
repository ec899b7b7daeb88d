//! Events consumed by the reducer.
//!
//! Inputs from the UI layer and results of spawned remote calls both arrive
//! here; the runtime feeds them to [`crate::update::update`] one at a time.

use medxz_core::{AppError, Credentials, ErrorContext, Session, format_auth_error};
use tokio::task::JoinError;

use crate::task::TaskId;

const UNEXPECTED_ERROR: &str = "An unexpected error occurred";

/// Why a remote call produced no value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallFailure {
    /// Structured error from the auth client.
    App(AppError),
    /// The call itself blew up (panicked or was aborted).
    Unexpected(String),
}

impl CallFailure {
    pub fn from_join_error(err: JoinError) -> Self {
        if !err.is_panic() {
            return CallFailure::Unexpected(UNEXPECTED_ERROR.to_string());
        }
        let payload = err.into_panic();
        let message = payload
            .downcast_ref::<String>()
            .cloned()
            .or_else(|| payload.downcast_ref::<&str>().map(ToString::to_string))
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| UNEXPECTED_ERROR.to_string());
        CallFailure::Unexpected(message)
    }

    /// Message shown to the user.
    pub fn describe(&self, context: ErrorContext) -> String {
        match self {
            CallFailure::App(err) => format_auth_error(err, context),
            CallFailure::Unexpected(message) => message.clone(),
        }
    }
}

impl From<AppError> for CallFailure {
    fn from(err: AppError) -> Self {
        CallFailure::App(err)
    }
}

pub type CallResult<T> = Result<T, CallFailure>;

#[derive(Debug)]
pub enum SessionEvent {
    /// Controller created; kicks off the first session check.
    Boot,
    ServerUrlChanged(String),
    OrganizationCodeChanged(String),
    LoginRequested {
        task: TaskId,
        credentials: Credentials,
    },
    LogoutRequested {
        task: TaskId,
    },
    ChangeOrg,

    /// A scheduled check got past its debounce delay.
    SessionCheckStarted {
        task: TaskId,
    },
    SessionChecked {
        task: TaskId,
        result: CallResult<Option<Session>>,
    },
    LoginFinished {
        task: TaskId,
        server_url: String,
        organization_code: String,
        result: CallResult<Session>,
    },
    LogoutFinished {
        task: TaskId,
        result: CallResult<()>,
    },
}
