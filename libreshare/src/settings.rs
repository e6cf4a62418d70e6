//! Settings gateway
//!
//! Generic get/set store for configuration blobs. The identity model keeps
//! its whole-set snapshots here; there is no schema versioning, a stored
//! blob is always treated as the current full value for its key.
//!
//! The store is injected wherever it is needed so tests run against
//! [`MemoryStore`] while deployments use [`FileStore`].
//!
//! Read-modify-write sequences against the same key are NOT safe for
//! concurrent writers; the subsystem assumes at most one in-flight mutating
//! call per operator. Callers needing stricter guarantees must add locking
//! around the store.

use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::RwLock;

use crate::error::{Result, SettingsError};

/// Key under which the authenticated-service set snapshot is stored
pub const AUTHENTICATED_SERVICES_KEY: &str = "authenticated_services";
/// Key under which the active-account set snapshot is stored
pub const ACTIVE_ACCOUNTS_KEY: &str = "active_accounts";
/// Key under which general settings are stored
pub const GENERAL_SETTINGS_KEY: &str = "general_settings";

/// Generic blob store with get/set semantics
pub trait SettingsStore: Send + Sync {
    /// Fetch the blob stored under `key`, if any
    fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Store `value` under `key`, replacing any prior blob
    fn set(&self, key: &str, value: Value) -> Result<()>;
}

/// In-memory store for tests and embedding
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| SettingsError::Store("store lock poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| SettingsError::Store("store lock poisoned".to_string()))?;
        entries.insert(key.to_string(), value);
        Ok(())
    }
}

/// File-backed store: one JSON document holding all keys
///
/// Every `set` is a read-modify-write of the whole document. A missing file
/// reads as empty; a corrupted file degrades to empty with a warning rather
/// than failing, matching how the rest of the state handling treats
/// unreadable snapshots.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn read_document(&self) -> Result<BTreeMap<String, Value>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }

        let content = std::fs::read_to_string(&self.path).map_err(SettingsError::Io)?;
        match serde_json::from_str(&content) {
            Ok(document) => Ok(document),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "Corrupted settings file, starting empty: {}", e);
                Ok(BTreeMap::new())
            }
        }
    }

    fn write_document(&self, document: &BTreeMap<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(SettingsError::Io)?;
        }

        let content = serde_json::to_string_pretty(document).map_err(SettingsError::Serialize)?;
        std::fs::write(&self.path, content).map_err(SettingsError::Io)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = std::fs::Permissions::from_mode(0o644);
            std::fs::set_permissions(&self.path, permissions).map_err(SettingsError::Io)?;
        }

        Ok(())
    }
}

impl SettingsStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.read_document()?.remove(key))
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut document = self.read_document()?;
        document.insert(key.to_string(), value);
        self.write_document(&document)
    }
}
