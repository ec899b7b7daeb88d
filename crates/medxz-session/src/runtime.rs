//! Session runtime - owns state, runs the event loop, executes effects.
//!
//! One tokio task owns `AuthState`. UI commands arrive on a command channel;
//! results of spawned remote calls arrive on the inbox. Every event goes
//! through the reducer, the returned effects are executed, and a fresh
//! [`AuthSnapshot`] is published on a watch channel.
//!
//! Dropping every [`SessionHandle`] stops the loop and cancels any pending
//! session check.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use medxz_core::config::{ConfigStore, Settings};
use medxz_core::{AppResult, AuthService, Credentials};
use tokio::sync::{mpsc, oneshot, watch};

use crate::effects::{SessionEffect, Toast};
use crate::events::{CallFailure, CallResult, SessionEvent};
use crate::state::{AuthSnapshot, AuthState};
use crate::task::TaskId;
use crate::update;

/// Toasts emitted by the controller, in order.
pub type ToastReceiver = mpsc::UnboundedReceiver<Toast>;

#[derive(Debug)]
enum Command {
    SetServerUrl(String),
    SetOrganizationCode(String),
    Login {
        credentials: Credentials,
        reply: oneshot::Sender<bool>,
    },
    Logout {
        reply: oneshot::Sender<()>,
    },
    ChangeOrg {
        reply: oneshot::Sender<()>,
    },
}

/// Owner of the session state machine.
pub struct SessionController<S> {
    state: AuthState,
    service: Arc<S>,
    store: Arc<dyn ConfigStore>,
    commands_rx: mpsc::UnboundedReceiver<Command>,
    inbox_tx: mpsc::UnboundedSender<SessionEvent>,
    inbox_rx: mpsc::UnboundedReceiver<SessionEvent>,
    snapshot_tx: watch::Sender<AuthSnapshot>,
    toast_tx: mpsc::UnboundedSender<Toast>,
    login_replies: HashMap<TaskId, oneshot::Sender<bool>>,
    logout_replies: HashMap<TaskId, oneshot::Sender<()>>,
}

impl<S: AuthService> SessionController<S> {
    /// Loads settings from `store`, starts the controller on the current tokio
    /// runtime and kicks off the first session check.
    ///
    /// # Errors
    /// Returns an error if the settings cannot be loaded.
    pub fn spawn<C: ConfigStore>(service: S, store: C) -> Result<(SessionHandle, ToastReceiver)> {
        let settings = Settings::load(&store)?;
        tracing::debug!(server_url = %settings.server_url, "starting session controller");

        let state = AuthState::new(settings);
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(state.snapshot());
        let (toast_tx, toast_rx) = mpsc::unbounded_channel();

        let controller = Self {
            state,
            service: Arc::new(service),
            store: Arc::new(store),
            commands_rx,
            inbox_tx,
            inbox_rx,
            snapshot_tx,
            toast_tx,
            login_replies: HashMap::new(),
            logout_replies: HashMap::new(),
        };
        tokio::spawn(controller.run());

        let handle = SessionHandle {
            commands: commands_tx,
            snapshot: snapshot_rx,
        };
        Ok((handle, toast_rx))
    }

    async fn run(mut self) {
        self.dispatch(SessionEvent::Boot);
        self.publish();

        loop {
            tokio::select! {
                command = self.commands_rx.recv() => {
                    let Some(command) = command else { break };
                    self.handle_command(command);
                }
                Some(event) = self.inbox_rx.recv() => self.dispatch(event),
            }
            self.publish();
        }

        if let Some(cancel) = self.state.tasks.session_check.take() {
            cancel.cancel();
        }
        tracing::debug!("session controller stopped");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::SetServerUrl(server_url) => {
                self.dispatch(SessionEvent::ServerUrlChanged(server_url));
            }
            Command::SetOrganizationCode(code) => {
                self.dispatch(SessionEvent::OrganizationCodeChanged(code));
            }
            Command::Login { credentials, reply } => {
                let task = self.state.task_seq.next_id();
                self.login_replies.insert(task, reply);
                self.dispatch(SessionEvent::LoginRequested { task, credentials });
            }
            Command::Logout { reply } => {
                let task = self.state.task_seq.next_id();
                self.logout_replies.insert(task, reply);
                self.dispatch(SessionEvent::LogoutRequested { task });
            }
            Command::ChangeOrg { reply } => {
                self.dispatch(SessionEvent::ChangeOrg);
                self.publish();
                let _ = reply.send(());
            }
        }
    }

    fn dispatch(&mut self, event: SessionEvent) {
        let effects = update::update(&mut self.state, event);
        for effect in effects {
            self.execute_effect(effect);
        }
    }

    fn publish(&self) {
        let next = self.state.snapshot();
        self.snapshot_tx.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }

    fn execute_effect(&mut self, effect: SessionEffect) {
        match effect {
            SessionEffect::ScheduleSessionCheck {
                task,
                server_url,
                delay,
                cancel,
            } => {
                let service = Arc::clone(&self.service);
                let tx = self.inbox_tx.clone();
                tokio::spawn(async move {
                    tokio::select! {
                        () = cancel.cancelled() => return,
                        () = tokio::time::sleep(delay) => {}
                    }
                    let _ = tx.send(SessionEvent::SessionCheckStarted { task });
                    let result =
                        guarded(async move { service.check_session(&server_url).await }).await;
                    let _ = tx.send(SessionEvent::SessionChecked { task, result });
                });
            }
            SessionEffect::CancelTask { token } => token.cancel(),
            SessionEffect::SpawnLogin { task, request } => {
                let service = Arc::clone(&self.service);
                let tx = self.inbox_tx.clone();
                let server_url = request.server_url.clone();
                let organization_code = request.organization_code.clone();
                tokio::spawn(async move {
                    let result = guarded(async move { service.login(&request).await }).await;
                    let _ = tx.send(SessionEvent::LoginFinished {
                        task,
                        server_url,
                        organization_code,
                        result,
                    });
                });
            }
            SessionEffect::SpawnLogout { task, server_url } => {
                let service = Arc::clone(&self.service);
                let tx = self.inbox_tx.clone();
                tokio::spawn(async move {
                    let result = guarded(async move { service.logout(&server_url).await }).await;
                    let _ = tx.send(SessionEvent::LogoutFinished { task, result });
                });
            }
            SessionEffect::PersistSettings {
                server_url,
                organization_code,
            } => {
                if let Err(e) = Settings::commit(self.store.as_ref(), &server_url, &organization_code)
                {
                    tracing::warn!("failed to persist settings: {e:#}");
                }
            }
            SessionEffect::ForgetOrganization => {
                if let Err(e) = Settings::forget_organization(self.store.as_ref()) {
                    tracing::warn!("failed to forget organization code: {e:#}");
                }
            }
            SessionEffect::ResolveLogin { task, success } => {
                // Callers read the snapshot as soon as they are answered.
                self.publish();
                if let Some(reply) = self.login_replies.remove(&task) {
                    let _ = reply.send(success);
                }
            }
            SessionEffect::ResolveLogout { task } => {
                self.publish();
                if let Some(reply) = self.logout_replies.remove(&task) {
                    let _ = reply.send(());
                }
            }
            SessionEffect::Notify(toast) => {
                tracing::debug!(title = %toast.title, kind = ?toast.kind, "toast");
                let _ = self.toast_tx.send(toast);
            }
        }
    }
}

/// Runs a client call on its own task so a panic in the transport becomes a
/// [`CallFailure::Unexpected`] instead of taking the controller down.
async fn guarded<T, F>(call: F) -> CallResult<T>
where
    F: Future<Output = AppResult<T>> + Send + 'static,
    T: Send + 'static,
{
    match tokio::spawn(call).await {
        Ok(result) => result.map_err(CallFailure::App),
        Err(e) => {
            let failure = CallFailure::from_join_error(e);
            tracing::error!(?failure, "auth client call failed unexpectedly");
            Err(failure)
        }
    }
}

/// Cloneable handle used by the UI layer.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<Command>,
    snapshot: watch::Receiver<AuthSnapshot>,
}

impl SessionHandle {
    /// Updates the server URL; re-verifies the session after the debounce.
    pub fn set_server_url(&self, server_url: impl Into<String>) {
        let _ = self.commands.send(Command::SetServerUrl(server_url.into()));
    }

    pub fn set_organization_code(&self, code: impl Into<String>) {
        let _ = self
            .commands
            .send(Command::SetOrganizationCode(code.into()));
    }

    /// Submits credentials. Returns `true` on success, so the caller can clear
    /// the password field.
    ///
    /// The controller does not serialize concurrent logins; callers disable
    /// their submit action while `submitting` is set.
    pub async fn login(&self, credentials: Credentials) -> bool {
        let (reply, rx) = oneshot::channel();
        if self.commands.send(Command::Login { credentials, reply }).is_err() {
            return false;
        }
        rx.await.unwrap_or(false)
    }

    pub async fn logout(&self) {
        let (reply, rx) = oneshot::channel();
        if self.commands.send(Command::Logout { reply }).is_ok() {
            let _ = rx.await;
        }
    }

    /// Forgets the organization code and the current session. Local only.
    pub async fn change_org(&self) {
        let (reply, rx) = oneshot::channel();
        if self.commands.send(Command::ChangeOrg { reply }).is_ok() {
            let _ = rx.await;
        }
    }

    /// Latest published state.
    pub fn snapshot(&self) -> AuthSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthSnapshot> {
        self.snapshot.clone()
    }

    /// Waits until the published state satisfies `predicate`. Returns the
    /// last known state if the controller stops first.
    pub async fn wait_for(&self, predicate: impl FnMut(&AuthSnapshot) -> bool) -> AuthSnapshot {
        let mut rx = self.snapshot.clone();
        let result = rx.wait_for(predicate).await.map(|snapshot| snapshot.clone());
        result.unwrap_or_else(|_| rx.borrow().clone())
    }

    /// Waits for the current session check to finish.
    pub async fn session_checked(&self) -> AuthSnapshot {
        self.wait_for(|s| !s.checking_session).await
    }
}
