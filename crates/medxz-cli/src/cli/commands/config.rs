//! Config command handlers.

use anyhow::{Context, Result};
use medxz_core::config::{self, FileConfigStore, Settings};

pub fn path() {
    println!("{}", config::paths::config_path().display());
}

pub fn show(server_override: Option<&str>) -> Result<()> {
    let store = FileConfigStore::new();
    let settings = Settings::load(&store)
        .with_context(|| format!("read config at {}", store.path().display()))?;

    let server_url = server_override.unwrap_or(&settings.server_url);
    let organization = if settings.organization_is_persisted {
        settings.organization_code.as_str()
    } else {
        "(none)"
    };

    println!("server_url = {server_url}");
    println!("organization_code = {organization}");
    println!(
        "session_token = {}",
        config::paths::session_token_path().display()
    );
    Ok(())
}
