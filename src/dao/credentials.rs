//! Durable key/value storage for the auth token and user.

use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
    sync::Mutex,
};

use thiserror::Error;
use tracing::debug;

/// Key under which the bearer token is persisted.
pub const AUTH_TOKEN_KEY: &str = "auth_token";
/// Key under which the serialized [`AuthUser`](crate::dto::auth::AuthUser) is persisted.
pub const AUTH_USER_KEY: &str = "auth_user";

/// Failures of a [`CredentialStore`].
#[derive(Debug, Error)]
pub enum CredentialError {
    /// The backing file could not be read or written.
    #[error("credential file `{path}` is not accessible")]
    Io {
        /// Credential file.
        path: PathBuf,
        /// Underlying IO failure.
        #[source]
        source: io::Error,
    },
    /// The backing file does not hold a JSON object of strings.
    #[error("credential file `{path}` is malformed")]
    Serde {
        /// Credential file.
        path: PathBuf,
        /// Decoding or encoding failure.
        #[source]
        source: serde_json::Error,
    },
    /// A value could not be encoded before storing it.
    #[error("failed to encode credential `{key}`")]
    Encode {
        /// Key the value was meant for.
        key: &'static str,
        /// Encoding failure.
        #[source]
        source: serde_json::Error,
    },
}

/// Small string map surviving restarts.
pub trait CredentialStore: Send + Sync {
    /// Value stored under `key`.
    fn get(&self, key: &str) -> Result<Option<String>, CredentialError>;
    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<(), CredentialError>;
    /// Remove `key`; absent keys are not an error.
    fn remove(&self, key: &str) -> Result<(), CredentialError>;
}

/// [`CredentialStore`] persisted as a JSON object in a single file.
pub struct FileCredentialStore {
    path: PathBuf,
    // Serializes read-modify-write cycles on the file.
    lock: Mutex<()>,
}

impl FileCredentialStore {
    /// Store backed by the file at `path`; the file is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, CredentialError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) if contents.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(contents) => serde_json::from_str(&contents).map_err(|source| CredentialError::Serde {
                path: self.path.clone(),
                source,
            }),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(source) => Err(CredentialError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<(), CredentialError> {
        let io_err = |source| CredentialError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let contents = serde_json::to_string_pretty(entries).map_err(|source| {
            CredentialError::Serde {
                path: self.path.clone(),
                source,
            }
        })?;
        fs::write(&self.path, contents).map_err(io_err)?;
        debug!(path = %self.path.display(), "credentials written");
        Ok(())
    }

    fn modify<F>(&self, change: F) -> Result<(), CredentialError>
    where
        F: FnOnce(&mut BTreeMap<String, String>),
    {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut entries = self.read_all()?;
        change(&mut entries);
        self.write_all(&entries)
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self, key: &str) -> Result<Option<String>, CredentialError> {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CredentialError> {
        self.modify(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<(), CredentialError> {
        self.modify(|entries| {
            entries.remove(key);
        })
    }
}

/// Process-local [`CredentialStore`], for tests and ephemeral clients.
#[derive(Default)]
pub struct MemoryCredentialStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryCredentialStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self, key: &str) -> Result<Option<String>, CredentialError> {
        let entries = self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CredentialError> {
        let mut entries = self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), CredentialError> {
        let mut entries = self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.remove(key);
        Ok(())
    }
}
