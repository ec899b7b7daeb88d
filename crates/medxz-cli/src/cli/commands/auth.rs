//! Session command handlers.
//!
//! Each command starts a session controller against the saved settings,
//! drives it like the sign-in screen would and prints the outcome. Toasts
//! go to stderr as `title: description`.

use anyhow::Result;
use medxz_core::config::{ConfigKey, ConfigStore, FileConfigStore};
use medxz_core::token_store::TokenStore;
use medxz_core::{Credentials, HttpAuthClient, Session};
use medxz_session::{AuthSnapshot, SessionController, SessionHandle, Toast, ToastReceiver};

use crate::cli::Reported;

/// Saved settings with the server URL optionally replaced for this run.
/// Writes go straight to the file, so a successful login still persists the
/// URL it used.
struct ServerOverride {
    inner: FileConfigStore,
    server_url: Option<String>,
}

impl ConfigStore for ServerOverride {
    fn get(&self, key: ConfigKey) -> Result<Option<String>> {
        match (key, &self.server_url) {
            (ConfigKey::ServerUrl, Some(url)) => Ok(Some(url.clone())),
            _ => self.inner.get(key),
        }
    }

    fn set(&self, key: ConfigKey, value: &str) -> Result<()> {
        self.inner.set(key, value)
    }

    fn set_many(&self, entries: &[(ConfigKey, &str)]) -> Result<()> {
        self.inner.set_many(entries)
    }

    fn remove(&self, key: ConfigKey) -> Result<()> {
        self.inner.remove(key)
    }
}

struct Connection {
    handle: SessionHandle,
    toasts: ToastReceiver,
}

impl Connection {
    fn open(server_url: Option<String>) -> Result<Self> {
        let client = HttpAuthClient::new(TokenStore::new())?;
        let store = ServerOverride {
            inner: FileConfigStore::new(),
            server_url,
        };
        let (handle, toasts) = SessionController::spawn(client, store)?;
        Ok(Self { handle, toasts })
    }

    fn flush_toasts(&mut self) {
        while let Ok(toast) = self.toasts.try_recv() {
            print_toast(&toast);
        }
    }
}

fn print_toast(toast: &Toast) {
    match &toast.description {
        Some(description) => eprintln!("{}: {description}", toast.title),
        None => eprintln!("{}", toast.title),
    }
}

fn print_session(session: &Session) {
    println!(
        "Signed in as {} ({}) at {} [{}]",
        session.user.email,
        session.user.role,
        session.organization.name,
        session.organization.code
    );
}

pub async fn status(server_url: Option<String>) -> Result<()> {
    let mut conn = Connection::open(server_url)?;
    let snapshot = conn.handle.session_checked().await;
    conn.flush_toasts();
    report_status(&snapshot)
}

fn report_status(snapshot: &AuthSnapshot) -> Result<()> {
    if let Some(session) = &snapshot.session {
        print_session(session);
        return Ok(());
    }
    if let Some(error) = &snapshot.error {
        // The first failed check already produced a toast.
        tracing::debug!(error = %error, "status check failed");
        return Err(Reported.into());
    }
    println!("Not signed in ({})", snapshot.server_url);
    Ok(())
}

pub async fn login(
    server_url: Option<String>,
    organization_code: Option<String>,
    email: String,
    password: String,
) -> Result<()> {
    let mut conn = Connection::open(server_url)?;

    if let Some(code) = organization_code {
        conn.handle.set_organization_code(code);
    } else if !conn.handle.snapshot().organization_is_persisted {
        anyhow::bail!("no saved organization; pass --org <CODE>");
    }

    let ok = conn.handle.login(Credentials::new(email, password)).await;
    conn.flush_toasts();
    if !ok {
        return Err(Reported.into());
    }
    if let Some(session) = &conn.handle.snapshot().session {
        print_session(session);
    }
    Ok(())
}

pub async fn logout(server_url: Option<String>) -> Result<()> {
    let mut conn = Connection::open(server_url)?;
    let checked = conn.handle.session_checked().await;
    conn.flush_toasts();
    if checked.error.is_some() {
        return Err(Reported.into());
    }
    if checked.session.is_none() {
        println!("Not signed in");
        return Ok(());
    }

    conn.handle.logout().await;
    conn.flush_toasts();
    if conn.handle.snapshot().error.is_some() {
        return Err(Reported.into());
    }
    Ok(())
}

pub async fn change_org(server_url: Option<String>) -> Result<()> {
    let conn = Connection::open(server_url)?;
    conn.handle.change_org().await;
    println!("Organization cleared");
    Ok(())
}
