//! Controller state.
//!
//! `AuthState` is owned by the runtime and mutated only by the reducer in
//! [`crate::update`]. Readers get an [`AuthSnapshot`], a plain value that is
//! republished after every event.

use medxz_core::Session;
use medxz_core::config::Settings;

use crate::task::{TaskSeq, Tasks};

/// Where the controller is in the session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Nothing has been checked yet.
    Unverified,
    VerifyingSession,
    Authenticated,
    Unauthenticated,
    SubmittingLogin,
    SubmittingLogout,
}

#[derive(Debug)]
pub struct AuthState {
    pub server_url: String,
    pub organization_code: String,
    pub organization_is_persisted: bool,
    pub session: Option<Session>,
    pub error: Option<String>,
    pub checking_session: bool,
    /// True until the first session check of the process completes.
    pub initial_check: bool,
    /// True once any check, submit or org change has settled the session slot.
    pub resolved: bool,
    pub task_seq: TaskSeq,
    pub tasks: Tasks,
}

impl AuthState {
    pub fn new(settings: Settings) -> Self {
        Self {
            server_url: settings.server_url,
            organization_code: settings.organization_code,
            organization_is_persisted: settings.organization_is_persisted,
            session: None,
            error: None,
            checking_session: true,
            initial_check: true,
            resolved: false,
            task_seq: TaskSeq::default(),
            tasks: Tasks::default(),
        }
    }

    pub fn submitting(&self) -> bool {
        self.tasks.submits.any()
    }

    pub fn phase(&self) -> Phase {
        if self.tasks.submits.login > 0 {
            Phase::SubmittingLogin
        } else if self.tasks.submits.logout > 0 {
            Phase::SubmittingLogout
        } else if self.tasks.session_check.started {
            Phase::VerifyingSession
        } else if self.session.is_some() {
            Phase::Authenticated
        } else if self.resolved {
            Phase::Unauthenticated
        } else {
            Phase::Unverified
        }
    }

    pub fn snapshot(&self) -> AuthSnapshot {
        AuthSnapshot {
            server_url: self.server_url.clone(),
            organization_code: self.organization_code.clone(),
            organization_is_persisted: self.organization_is_persisted,
            session: self.session.clone(),
            checking_session: self.checking_session,
            submitting: self.submitting(),
            error: self.error.clone(),
            phase: self.phase(),
        }
    }
}

/// Read-only view handed to the UI layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSnapshot {
    pub server_url: String,
    pub organization_code: String,
    /// Gates whether the organization-code input is shown.
    pub organization_is_persisted: bool,
    pub session: Option<Session>,
    pub checking_session: bool,
    pub submitting: bool,
    pub error: Option<String>,
    pub phase: Phase,
}

impl AuthSnapshot {
    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }
}
