//! Session reducer.
//!
//! `update` is the only place `AuthState` changes. It never performs I/O:
//! it mutates state and returns the effects the runtime must execute.
//!
//! Session checks are latest-only. Each trigger begins a new task (cancelling
//! the pending one) and a completion is applied only while its task id is
//! still active, so a superseded check can never overwrite newer state.

use std::time::Duration;

use medxz_core::{ErrorContext, LoginRequest};
use tokio_util::sync::CancellationToken;

use crate::effects::{SessionEffect, Toast};
use crate::events::SessionEvent;
use crate::state::AuthState;

/// Debounce applied to every check after the first one.
pub const RECHECK_DEBOUNCE: Duration = Duration::from_millis(400);

pub fn update(state: &mut AuthState, event: SessionEvent) -> Vec<SessionEffect> {
    match event {
        SessionEvent::Boot => schedule_session_check(state),
        SessionEvent::ServerUrlChanged(server_url) => {
            if server_url == state.server_url {
                return vec![];
            }
            state.server_url = server_url;
            schedule_session_check(state)
        }
        SessionEvent::OrganizationCodeChanged(code) => {
            state.organization_code = code;
            vec![]
        }
        SessionEvent::SessionCheckStarted { task } => {
            if state.tasks.session_check.mark_started(task) {
                state.checking_session = true;
                state.error = None;
            }
            vec![]
        }
        SessionEvent::SessionChecked { task, result } => {
            if !state.tasks.session_check.finish_if_active(task) {
                tracing::debug!(task = task.0, "discarding stale session check");
                return vec![];
            }
            let initial = std::mem::replace(&mut state.initial_check, false);
            state.checking_session = false;
            state.resolved = true;

            match result {
                Ok(Some(session)) => {
                    tracing::debug!(email = %session.user.email, "session verified");
                    state.session = Some(session);
                    state.error = None;
                    vec![]
                }
                Ok(None) => {
                    tracing::debug!("no active session");
                    state.session = None;
                    state.error = None;
                    vec![]
                }
                Err(failure) => {
                    let message = failure.describe(ErrorContext::Session);
                    tracing::warn!(error = ?failure, "session check failed");
                    state.session = None;
                    state.error = Some(message.clone());
                    if initial {
                        vec![SessionEffect::Notify(Toast::error(
                            "Connection failed",
                            message,
                        ))]
                    } else {
                        vec![]
                    }
                }
            }
        }
        SessionEvent::LoginRequested { task, credentials } => {
            let request = LoginRequest {
                server_url: state.server_url.trim().to_string(),
                organization_code: state.organization_code.trim().to_string(),
                email: credentials.email.trim().to_string(),
                password: credentials.password,
            };
            state.tasks.submits.login += 1;
            state.error = None;
            vec![SessionEffect::SpawnLogin { task, request }]
        }
        SessionEvent::LoginFinished {
            task,
            server_url,
            organization_code,
            result,
        } => {
            state.tasks.submits.login = state.tasks.submits.login.saturating_sub(1);
            state.resolved = true;

            match result {
                Ok(session) => {
                    let mut effects = vec![SessionEffect::PersistSettings {
                        server_url: server_url.clone(),
                        organization_code: organization_code.clone(),
                    }];
                    state.organization_is_persisted = true;
                    state.organization_code = organization_code;
                    // A check issued before this login predates its token.
                    if server_url != state.server_url {
                        state.server_url = server_url;
                        effects.extend(schedule_session_check(state));
                    } else {
                        effects.extend(supersede_session_check(state));
                    }

                    let welcome = format!("Welcome back, {}", session.user.email);
                    tracing::info!(email = %session.user.email, "signed in");
                    state.session = Some(session);
                    state.error = None;

                    effects.push(SessionEffect::Notify(Toast::success(
                        "Signed in",
                        Some(welcome),
                    )));
                    effects.push(SessionEffect::ResolveLogin {
                        task,
                        success: true,
                    });
                    effects
                }
                Err(failure) => {
                    let message = failure.describe(ErrorContext::Login);
                    tracing::warn!(error = ?failure, "sign in failed");
                    state.session = None;
                    state.error = Some(message.clone());
                    vec![
                        SessionEffect::Notify(Toast::error("Sign in failed", message)),
                        SessionEffect::ResolveLogin {
                            task,
                            success: false,
                        },
                    ]
                }
            }
        }
        SessionEvent::LogoutRequested { task } => {
            state.tasks.submits.logout += 1;
            state.error = None;
            vec![SessionEffect::SpawnLogout {
                task,
                server_url: state.server_url.trim().to_string(),
            }]
        }
        SessionEvent::LogoutFinished { task, result } => {
            state.tasks.submits.logout = state.tasks.submits.logout.saturating_sub(1);

            match result {
                Ok(()) => {
                    tracing::info!("signed out");
                    let mut effects = supersede_session_check(state);
                    state.session = None;
                    state.resolved = true;
                    effects.push(SessionEffect::Notify(Toast::success("Signed out", None)));
                    effects.push(SessionEffect::ResolveLogout { task });
                    effects
                }
                Err(failure) => {
                    // Keep the session: dropping it here would leave no way to retry.
                    let message = failure.describe(ErrorContext::Logout);
                    tracing::warn!(error = ?failure, "sign out failed");
                    state.error = Some(message.clone());
                    vec![
                        SessionEffect::Notify(Toast::error("Sign out failed", message)),
                        SessionEffect::ResolveLogout { task },
                    ]
                }
            }
        }
        SessionEvent::ChangeOrg => {
            let mut effects = supersede_session_check(state);
            state.organization_code.clear();
            state.organization_is_persisted = false;
            state.session = None;
            state.error = None;
            state.resolved = true;
            effects.push(SessionEffect::ForgetOrganization);
            effects
        }
    }
}

/// Starts a new latest-only session check, superseding any pending one.
fn schedule_session_check(state: &mut AuthState) -> Vec<SessionEffect> {
    let task = state.task_seq.next_id();
    let cancel = CancellationToken::new();
    let mut effects = Vec::new();

    if let Some(previous) = state.tasks.session_check.begin(task, cancel.clone()) {
        effects.push(SessionEffect::CancelTask { token: previous });
    }

    let delay = if state.initial_check {
        Duration::ZERO
    } else {
        RECHECK_DEBOUNCE
    };
    tracing::debug!(task = task.0, delay = ?delay, "scheduling session check");

    effects.push(SessionEffect::ScheduleSessionCheck {
        task,
        server_url: state.server_url.trim().to_string(),
        delay,
        cancel,
    });
    effects
}

/// Replaces a pending or in-flight check with a fresh one for the current
/// server URL. The old result is dropped on arrival; the URL still gets
/// verified. No-op when nothing is running.
fn supersede_session_check(state: &mut AuthState) -> Vec<SessionEffect> {
    if state.tasks.session_check.is_running() {
        schedule_session_check(state)
    } else {
        vec![]
    }
}

#[cfg(test)]
mod tests {
    use medxz_core::config::Settings;
    use medxz_core::{AppError, Credentials, OrganizationInfo, Session, UserInfo};

    use super::*;
    use crate::effects::ToastKind;
    use crate::events::CallFailure;
    use crate::state::Phase;
    use crate::task::TaskId;

    fn session(email: &str) -> Session {
        Session {
            organization: OrganizationInfo {
                id: "o1".into(),
                code: "acme".into(),
                name: "Acme Clinic".into(),
            },
            user: UserInfo {
                id: "u1".into(),
                email: email.into(),
                role: "admin".into(),
            },
        }
    }

    fn state() -> AuthState {
        AuthState::new(Settings {
            server_url: "http://clinic.local".into(),
            organization_code: " acme ".into(),
            organization_is_persisted: false,
        })
    }

    fn scheduled(effects: &[SessionEffect]) -> (TaskId, Duration) {
        effects
            .iter()
            .find_map(|e| match e {
                SessionEffect::ScheduleSessionCheck { task, delay, .. } => Some((*task, *delay)),
                _ => None,
            })
            .expect("a scheduled session check")
    }

    fn booted() -> (AuthState, TaskId) {
        let mut state = state();
        let effects = update(&mut state, SessionEvent::Boot);
        let (task, _) = scheduled(&effects);
        (state, task)
    }

    fn resolved(result: Result<Option<Session>, CallFailure>) -> AuthState {
        let (mut state, task) = booted();
        update(&mut state, SessionEvent::SessionCheckStarted { task });
        update(&mut state, SessionEvent::SessionChecked { task, result });
        state
    }

    fn toasts(effects: &[SessionEffect]) -> Vec<&Toast> {
        effects
            .iter()
            .filter_map(|e| match e {
                SessionEffect::Notify(toast) => Some(toast),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_first_check_has_no_delay() {
        let mut state = state();
        assert_eq!(state.phase(), Phase::Unverified);

        let effects = update(&mut state, SessionEvent::Boot);
        let (_, delay) = scheduled(&effects);
        assert_eq!(delay, Duration::ZERO);
        assert!(state.checking_session);
    }

    #[test]
    fn test_rechecks_after_first_are_debounced() {
        let mut state = resolved(Ok(None));
        let effects = update(
            &mut state,
            SessionEvent::ServerUrlChanged("http://other.local".into()),
        );
        let (_, delay) = scheduled(&effects);
        assert_eq!(delay, RECHECK_DEBOUNCE);
    }

    #[test]
    fn test_superseded_first_check_keeps_zero_delay() {
        let (mut state, _) = booted();
        let effects = update(
            &mut state,
            SessionEvent::ServerUrlChanged("http://other.local".into()),
        );
        let (_, delay) = scheduled(&effects);
        assert_eq!(delay, Duration::ZERO);
        assert!(
            effects
                .iter()
                .any(|e| matches!(e, SessionEffect::CancelTask { .. }))
        );
    }

    #[test]
    fn test_unchanged_server_url_does_not_reschedule() {
        let mut state = resolved(Ok(None));
        let effects = update(
            &mut state,
            SessionEvent::ServerUrlChanged("http://clinic.local".into()),
        );
        assert!(effects.is_empty());
    }

    #[test]
    fn test_stale_check_result_is_discarded() {
        let (mut state, first) = booted();
        let effects = update(
            &mut state,
            SessionEvent::ServerUrlChanged("http://other.local".into()),
        );
        let (second, _) = scheduled(&effects);

        update(
            &mut state,
            SessionEvent::SessionChecked {
                task: first,
                result: Ok(Some(session("stale@b.com"))),
            },
        );
        assert_eq!(state.session, None);
        assert!(state.checking_session);

        update(
            &mut state,
            SessionEvent::SessionChecked {
                task: second,
                result: Ok(Some(session("fresh@b.com"))),
            },
        );
        assert_eq!(state.session, Some(session("fresh@b.com")));
        assert_eq!(state.phase(), Phase::Authenticated);
    }

    #[test]
    fn test_check_started_moves_to_verifying_and_clears_error() {
        let (mut state, task) = booted();
        state.error = Some("old".into());
        update(&mut state, SessionEvent::SessionCheckStarted { task });
        assert_eq!(state.phase(), Phase::VerifyingSession);
        assert_eq!(state.error, None);
    }

    #[test]
    fn test_first_failure_toasts_later_failures_do_not() {
        let (mut state, task) = booted();
        let effects = update(
            &mut state,
            SessionEvent::SessionChecked {
                task,
                result: Err(AppError::network("refused").into()),
            },
        );
        assert_eq!(state.phase(), Phase::Unauthenticated);
        assert_eq!(
            state.error.as_deref(),
            Some("Cannot reach the server to verify your session.")
        );
        let first_toasts = toasts(&effects);
        assert_eq!(first_toasts.len(), 1);
        assert_eq!(first_toasts[0].kind, ToastKind::Error);
        assert_eq!(first_toasts[0].title, "Connection failed");

        let effects = update(
            &mut state,
            SessionEvent::ServerUrlChanged("http://other.local".into()),
        );
        let (task, _) = scheduled(&effects);
        let effects = update(
            &mut state,
            SessionEvent::SessionChecked {
                task,
                result: Err(AppError::network("refused").into()),
            },
        );
        assert!(toasts(&effects).is_empty());
        assert!(state.error.is_some());
    }

    #[test]
    fn test_no_stored_session_is_unauthenticated_without_error() {
        let state = resolved(Ok(None));
        assert_eq!(state.phase(), Phase::Unauthenticated);
        assert_eq!(state.error, None);
        assert!(!state.checking_session);
    }

    #[test]
    fn test_login_request_trims_all_but_password() {
        let (mut state, _) = booted();
        state.server_url = " http://clinic.local ".into();
        let effects = update(
            &mut state,
            SessionEvent::LoginRequested {
                task: TaskId(99),
                credentials: Credentials::new("  a@b.com ", " pw "),
            },
        );

        let Some(SessionEffect::SpawnLogin { request, .. }) = effects.first() else {
            panic!("expected SpawnLogin, got {effects:?}");
        };
        assert_eq!(request.server_url, "http://clinic.local");
        assert_eq!(request.organization_code, "acme");
        assert_eq!(request.email, "a@b.com");
        assert_eq!(request.password, " pw ");
        assert_eq!(state.phase(), Phase::SubmittingLogin);
        assert!(state.submitting());
    }

    #[test]
    fn test_login_success_persists_and_resolves_true() {
        let mut state = resolved(Ok(None));
        let task = TaskId(50);
        update(
            &mut state,
            SessionEvent::LoginRequested {
                task,
                credentials: Credentials::new("a@b.com", "pw"),
            },
        );
        let effects = update(
            &mut state,
            SessionEvent::LoginFinished {
                task,
                server_url: "http://clinic.local".into(),
                organization_code: "acme".into(),
                result: Ok(session("a@b.com")),
            },
        );

        assert!(matches!(
            effects.first(),
            Some(SessionEffect::PersistSettings { server_url, organization_code })
                if server_url == "http://clinic.local" && organization_code == "acme"
        ));
        assert!(matches!(
            effects.last(),
            Some(SessionEffect::ResolveLogin { success: true, .. })
        ));
        let toast = toasts(&effects)[0];
        assert_eq!(toast.title, "Signed in");
        assert_eq!(toast.description.as_deref(), Some("Welcome back, a@b.com"));
        assert!(state.organization_is_persisted);
        assert_eq!(state.organization_code, "acme");
        assert_eq!(state.phase(), Phase::Authenticated);
        assert!(!state.submitting());
    }

    #[test]
    fn test_login_success_with_trimmed_url_rechecks() {
        let mut state = resolved(Ok(None));
        state.server_url = "http://clinic.local/ ".into();
        let effects = update(
            &mut state,
            SessionEvent::LoginFinished {
                task: TaskId(50),
                server_url: "http://clinic.local/".into(),
                organization_code: "acme".into(),
                result: Ok(session("a@b.com")),
            },
        );
        let (_, delay) = scheduled(&effects);
        assert_eq!(delay, RECHECK_DEBOUNCE);
        assert_eq!(state.server_url, "http://clinic.local/");
    }

    #[test]
    fn test_login_success_supersedes_in_flight_check() {
        let (mut state, check) = booted();
        update(&mut state, SessionEvent::SessionCheckStarted { task: check });
        let effects = update(
            &mut state,
            SessionEvent::LoginFinished {
                task: TaskId(50),
                server_url: "http://clinic.local".into(),
                organization_code: "acme".into(),
                result: Ok(session("a@b.com")),
            },
        );
        let (fresh, _) = scheduled(&effects);
        assert_ne!(fresh, check);

        update(
            &mut state,
            SessionEvent::SessionChecked {
                task: check,
                result: Ok(None),
            },
        );
        assert_eq!(state.session, Some(session("a@b.com")));
        assert_eq!(state.phase(), Phase::VerifyingSession);

        update(
            &mut state,
            SessionEvent::SessionChecked {
                task: fresh,
                result: Ok(Some(session("a@b.com"))),
            },
        );
        assert!(!state.checking_session);
        assert_eq!(state.phase(), Phase::Authenticated);
    }

    #[test]
    fn test_login_success_without_pending_check_schedules_nothing() {
        let mut state = resolved(Ok(None));
        let effects = update(
            &mut state,
            SessionEvent::LoginFinished {
                task: TaskId(50),
                server_url: "http://clinic.local".into(),
                organization_code: "acme".into(),
                result: Ok(session("a@b.com")),
            },
        );
        assert!(
            !effects
                .iter()
                .any(|e| matches!(e, SessionEffect::ScheduleSessionCheck { .. }))
        );
    }

    #[test]
    fn test_login_failure_leaves_persistence_alone() {
        let mut state = resolved(Ok(None));
        let effects = update(
            &mut state,
            SessionEvent::LoginFinished {
                task: TaskId(50),
                server_url: "http://clinic.local".into(),
                organization_code: "acme".into(),
                result: Err(AppError::ServerError {
                    status: 401,
                    code: "unauthorized".into(),
                    message: "incorrect password".into(),
                }
                .into()),
            },
        );

        assert!(
            !effects
                .iter()
                .any(|e| matches!(e, SessionEffect::PersistSettings { .. }))
        );
        assert!(matches!(
            effects.last(),
            Some(SessionEffect::ResolveLogin { success: false, .. })
        ));
        assert_eq!(state.error.as_deref(), Some("Incorrect email or password."));
        assert!(!state.organization_is_persisted);
        assert_eq!(state.phase(), Phase::Unauthenticated);
        assert_eq!(toasts(&effects)[0].title, "Sign in failed");
    }

    #[test]
    fn test_logout_failure_keeps_session() {
        let mut state = resolved(Ok(Some(session("a@b.com"))));
        update(&mut state, SessionEvent::LogoutRequested { task: TaskId(60) });
        assert_eq!(state.phase(), Phase::SubmittingLogout);

        let effects = update(
            &mut state,
            SessionEvent::LogoutFinished {
                task: TaskId(60),
                result: Err(AppError::network("refused").into()),
            },
        );
        assert_eq!(state.session, Some(session("a@b.com")));
        assert_eq!(state.phase(), Phase::Authenticated);
        assert_eq!(
            state.error.as_deref(),
            Some("Cannot reach the server. Check the URL and your connection.")
        );
        assert_eq!(toasts(&effects)[0].title, "Sign out failed");
    }

    #[test]
    fn test_logout_success_clears_session() {
        let mut state = resolved(Ok(Some(session("a@b.com"))));
        update(&mut state, SessionEvent::LogoutRequested { task: TaskId(60) });
        let effects = update(
            &mut state,
            SessionEvent::LogoutFinished {
                task: TaskId(60),
                result: Ok(()),
            },
        );
        assert_eq!(state.session, None);
        assert_eq!(state.phase(), Phase::Unauthenticated);
        assert_eq!(toasts(&effects)[0].title, "Signed out");
    }

    #[test]
    fn test_change_org_clears_everything_local() {
        let mut state = resolved(Ok(Some(session("a@b.com"))));
        state.organization_is_persisted = true;
        state.error = Some("old".into());

        let effects = update(&mut state, SessionEvent::ChangeOrg);

        assert!(matches!(
            effects.last(),
            Some(SessionEffect::ForgetOrganization)
        ));
        assert_eq!(state.organization_code, "");
        assert!(!state.organization_is_persisted);
        assert_eq!(state.session, None);
        assert_eq!(state.error, None);
        assert_eq!(state.phase(), Phase::Unauthenticated);
    }

    #[test]
    fn test_change_org_discards_pending_check() {
        let (mut state, task) = booted();
        let effects = update(&mut state, SessionEvent::ChangeOrg);
        assert!(
            effects
                .iter()
                .any(|e| matches!(e, SessionEffect::CancelTask { .. }))
        );
        let (replacement, _) = scheduled(&effects);
        assert_ne!(replacement, task);

        update(
            &mut state,
            SessionEvent::SessionChecked {
                task,
                result: Ok(Some(session("a@b.com"))),
            },
        );
        assert_eq!(state.session, None);
    }

    #[test]
    fn test_change_org_still_verifies_edited_server_url() {
        let mut state = resolved(Ok(None));
        update(
            &mut state,
            SessionEvent::ServerUrlChanged("http://new.local".into()),
        );

        let effects = update(&mut state, SessionEvent::ChangeOrg);
        let Some(SessionEffect::ScheduleSessionCheck { server_url, .. }) = effects
            .iter()
            .find(|e| matches!(e, SessionEffect::ScheduleSessionCheck { .. }))
        else {
            panic!("expected a replacement check, got {effects:?}");
        };
        assert_eq!(server_url, "http://new.local");
        assert!(state.tasks.session_check.is_running());
    }

    #[test]
    fn test_logout_success_supersedes_pending_check() {
        let mut state = resolved(Ok(Some(session("a@b.com"))));
        let effects = update(
            &mut state,
            SessionEvent::ServerUrlChanged("http://new.local".into()),
        );
        let (pending, _) = scheduled(&effects);
        update(&mut state, SessionEvent::LogoutRequested { task: TaskId(60) });

        let effects = update(
            &mut state,
            SessionEvent::LogoutFinished {
                task: TaskId(60),
                result: Ok(()),
            },
        );
        let (replacement, _) = scheduled(&effects);
        assert_ne!(replacement, pending);
        assert!(!state.tasks.session_check.is_active(pending));
    }

    #[test]
    fn test_superseding_in_flight_check_stays_verifying() {
        let (mut state, first) = booted();
        update(&mut state, SessionEvent::SessionCheckStarted { task: first });
        update(
            &mut state,
            SessionEvent::ServerUrlChanged("http://other.local".into()),
        );
        assert!(state.checking_session);
        assert_eq!(state.phase(), Phase::VerifyingSession);
    }
}
