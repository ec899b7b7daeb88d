//! Effects returned by the reducer for the runtime to execute.
//!
//! Effects are I/O and task spawning only. The reducer decides what should
//! happen; the runtime does it and reports back through the inbox.

use std::time::Duration;

use medxz_core::LoginRequest;
use tokio_util::sync::CancellationToken;

use crate::task::TaskId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
}

/// Advisory notification for the user. Not part of the state contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub kind: ToastKind,
    pub title: String,
    pub description: Option<String>,
}

impl Toast {
    pub fn success(title: impl Into<String>, description: Option<String>) -> Self {
        Self {
            kind: ToastKind::Success,
            title: title.into(),
            description,
        }
    }

    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind: ToastKind::Error,
            title: title.into(),
            description: Some(description.into()),
        }
    }
}

#[derive(Debug)]
pub enum SessionEffect {
    /// Wait `delay` (unless cancelled), then check the session on `server_url`.
    ScheduleSessionCheck {
        task: TaskId,
        server_url: String,
        delay: Duration,
        cancel: CancellationToken,
    },

    /// Cancel a pending task. In-flight calls are not aborted; their results
    /// are dropped by the reducer.
    CancelTask { token: CancellationToken },

    SpawnLogin { task: TaskId, request: LoginRequest },

    SpawnLogout { task: TaskId, server_url: String },

    /// Commit server URL and organization code to the config store.
    PersistSettings {
        server_url: String,
        organization_code: String,
    },

    /// Remove the organization code from the config store.
    ForgetOrganization,

    /// Answer the caller waiting on a login.
    ResolveLogin { task: TaskId, success: bool },

    /// Answer the caller waiting on a logout.
    ResolveLogout { task: TaskId },

    Notify(Toast),
}
