//! Session token storage.
//!
//! The bearer token issued at login is kept in `${MEDXZ_HOME}/session_token`
//! with restricted permissions (0600). Any failure to read or write it is a
//! [`AppError::Keychain`]. The token is never logged.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::config::paths;
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    /// Token store at the default location.
    pub fn new() -> Self {
        Self::at(paths::session_token_path())
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the stored token, or `None` if there is none.
    ///
    /// # Errors
    /// Returns `Keychain` if the file exists but cannot be read.
    pub fn load(&self) -> AppResult<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => {
                let token = contents.trim();
                Ok((!token.is_empty()).then(|| token.to_string()))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::keychain(format!(
                "failed to read {}: {e}",
                self.path.display()
            ))),
        }
    }

    /// Stores the token, replacing any previous one.
    ///
    /// # Errors
    /// Returns `Keychain` if the file cannot be written.
    pub fn store(&self, token: &str) -> AppResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                AppError::keychain(format!("failed to create {}: {e}", parent.display()))
            })?;
        }

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(&self.path).map_err(|e| {
            AppError::keychain(format!("failed to open {}: {e}", self.path.display()))
        })?;
        file.write_all(token.as_bytes()).map_err(|e| {
            AppError::keychain(format!("failed to write {}: {e}", self.path.display()))
        })
    }

    /// Deletes the token. Missing token is not an error.
    ///
    /// # Errors
    /// Returns `Keychain` if the file exists but cannot be removed.
    pub fn delete(&self) -> AppResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::keychain(format!(
                "failed to remove {}: {e}",
                self.path.display()
            ))),
        }
    }
}

impl Default for TokenStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_missing_token_is_none() {
        let dir = tempdir().unwrap();
        let store = TokenStore::at(dir.path().join("session_token"));
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_store_load_delete() {
        let dir = tempdir().unwrap();
        let store = TokenStore::at(dir.path().join("sub").join("session_token"));

        store.store("tok-123").unwrap();
        assert_eq!(store.load().unwrap().as_deref(), Some("tok-123"));

        store.delete().unwrap();
        assert_eq!(store.load().unwrap(), None);
        store.delete().unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_token_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let store = TokenStore::at(dir.path().join("session_token"));
        store.store("tok").unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_unreadable_path_is_keychain_error() {
        let dir = tempdir().unwrap();
        // A directory where the file should be cannot be read as a string.
        let path = dir.path().join("session_token");
        fs::create_dir_all(&path).unwrap();
        let store = TokenStore::at(&path);

        assert!(matches!(store.load(), Err(AppError::Keychain { .. })));
    }
}
