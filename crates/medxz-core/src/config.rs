//! Durable client settings.
//!
//! Only two values survive a restart: the server URL and the organization
//! code. They live in `${MEDXZ_HOME}/config.toml` and are edited with
//! `toml_edit`, so anything else a user keeps in that file is preserved.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, Result};
use toml_edit::{DocumentMut, value};

/// Server used when nothing (or only whitespace) is stored.
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:1426";

pub mod paths {
    //! Path resolution for medxz configuration and data.
    //!
    //! MEDXZ_HOME resolution order:
    //! 1. MEDXZ_HOME environment variable (if set)
    //! 2. ~/.config/medxz (default)

    use std::path::PathBuf;

    /// Returns the medxz home directory.
    pub fn medxz_home() -> PathBuf {
        if let Ok(home) = std::env::var("MEDXZ_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir()
            .map_or_else(|| PathBuf::from(".medxz"), |h| h.join(".config").join("medxz"))
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        medxz_home().join("config.toml")
    }

    /// Returns the path to the stored session token.
    pub fn session_token_path() -> PathBuf {
        medxz_home().join("session_token")
    }

    /// Returns the directory for log files.
    pub fn logs_dir() -> PathBuf {
        medxz_home().join("logs")
    }
}

/// The two persisted settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    ServerUrl,
    OrganizationCode,
}

impl ConfigKey {
    pub fn as_str(self) -> &'static str {
        match self {
            ConfigKey::ServerUrl => "server_url",
            ConfigKey::OrganizationCode => "organization_code",
        }
    }
}

/// Key/value persistence for [`ConfigKey`]s.
pub trait ConfigStore: Send + Sync + 'static {
    /// Returns the stored value, or `None` when the key was never set.
    ///
    /// # Errors
    /// Returns an error if the backing storage cannot be read.
    fn get(&self, key: ConfigKey) -> Result<Option<String>>;

    /// # Errors
    /// Returns an error if the backing storage cannot be written.
    fn set(&self, key: ConfigKey, value: &str) -> Result<()>;

    /// Writes several keys in one go. Stores that can write atomically
    /// override this; the default falls back to one `set` per entry.
    ///
    /// # Errors
    /// Returns an error if the backing storage cannot be written.
    fn set_many(&self, entries: &[(ConfigKey, &str)]) -> Result<()> {
        for (key, value) in entries {
            self.set(*key, value)?;
        }
        Ok(())
    }

    /// # Errors
    /// Returns an error if the backing storage cannot be written.
    fn remove(&self, key: ConfigKey) -> Result<()>;
}

/// `config.toml` backed store.
#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    /// Store at the default config path.
    pub fn new() -> Self {
        Self::at(paths::config_path())
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_document(&self) -> Result<DocumentMut> {
        if !self.path.exists() {
            return Ok(DocumentMut::new());
        }
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read config from {}", self.path.display()))?;
        contents
            .parse()
            .with_context(|| format!("Failed to parse config from {}", self.path.display()))
    }

    fn write_document(&self, doc: &DocumentMut) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        fs::write(&self.path, doc.to_string())
            .with_context(|| format!("Failed to write config to {}", self.path.display()))
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn get(&self, key: ConfigKey) -> Result<Option<String>> {
        let doc = self.read_document()?;
        Ok(doc
            .get(key.as_str())
            .and_then(|item| item.as_str())
            .map(ToString::to_string))
    }

    fn set(&self, key: ConfigKey, new_value: &str) -> Result<()> {
        self.set_many(&[(key, new_value)])
    }

    fn set_many(&self, entries: &[(ConfigKey, &str)]) -> Result<()> {
        let mut doc = self.read_document()?;
        for (key, new_value) in entries {
            doc[key.as_str()] = value(*new_value);
        }
        self.write_document(&doc)
    }

    fn remove(&self, key: ConfigKey) -> Result<()> {
        let mut doc = self.read_document()?;
        if doc.remove(key.as_str()).is_none() {
            return Ok(());
        }
        self.write_document(&doc)
    }
}

/// In-memory store. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryConfigStore {
    values: Arc<Mutex<HashMap<ConfigKey, String>>>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store with both values pre-set.
    pub fn with_values(server_url: &str, organization_code: &str) -> Self {
        let store = Self::new();
        {
            let mut values = store.values.lock().unwrap_or_else(PoisonError::into_inner);
            values.insert(ConfigKey::ServerUrl, server_url.to_string());
            values.insert(ConfigKey::OrganizationCode, organization_code.to_string());
        }
        store
    }

    /// Non-failing read for assertions.
    pub fn value(&self, key: ConfigKey) -> Option<String> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned()
    }
}

impl ConfigStore for MemoryConfigStore {
    fn get(&self, key: ConfigKey) -> Result<Option<String>> {
        Ok(self.value(key))
    }

    fn set(&self, key: ConfigKey, new_value: &str) -> Result<()> {
        self.set_many(&[(key, new_value)])
    }

    fn set_many(&self, entries: &[(ConfigKey, &str)]) -> Result<()> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        for (key, new_value) in entries {
            values.insert(*key, (*new_value).to_string());
        }
        Ok(())
    }

    fn remove(&self, key: ConfigKey) -> Result<()> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&key);
        Ok(())
    }
}

/// Settings as seen at start-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_url: String,
    pub organization_code: String,
    /// True when a non-blank organization code was found in the store.
    pub organization_is_persisted: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            organization_code: String::new(),
            organization_is_persisted: false,
        }
    }
}

impl Settings {
    /// Loads settings, falling back to the default server URL when the stored
    /// one is missing or blank.
    ///
    /// # Errors
    /// Returns an error if the store cannot be read.
    pub fn load(store: &dyn ConfigStore) -> Result<Self> {
        let server_url = store
            .get(ConfigKey::ServerUrl)?
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());
        let organization_code = store.get(ConfigKey::OrganizationCode)?.unwrap_or_default();
        let organization_is_persisted = !organization_code.trim().is_empty();
        Ok(Self {
            server_url,
            organization_code,
            organization_is_persisted,
        })
    }

    /// Commits a server URL and organization code after a successful login.
    ///
    /// # Errors
    /// Returns an error if the store cannot be written.
    /// Both keys land in a single write, so a failure never leaves the code
    /// stored without its server.
    pub fn commit(store: &dyn ConfigStore, server_url: &str, organization_code: &str) -> Result<()> {
        store.set_many(&[
            (ConfigKey::ServerUrl, server_url),
            (ConfigKey::OrganizationCode, organization_code),
        ])
    }

    /// Forgets the stored organization code.
    ///
    /// # Errors
    /// Returns an error if the store cannot be written.
    pub fn forget_organization(store: &dyn ConfigStore) -> Result<()> {
        store.remove(ConfigKey::OrganizationCode)
    }
}
