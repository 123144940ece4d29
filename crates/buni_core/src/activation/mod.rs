//! Durable activation state for plugins and themes.
//!
//! # Responsibility
//! - Persist which plugins are active and which theme is selected.
//! - Serialize read-modify-write cycles across managers.
//!
//! # Invariants
//! - The store is the single source of truth; managers derive from it.
//! - A failed save leaves the previously persisted state authoritative.

mod json_store;
mod sqlite_store;

pub use json_store::JsonFileActivationStore;
pub use sqlite_store::SqliteActivationStore;

use crate::db::DbError;
use log::{error, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub type StorageResult<T> = Result<T, StorageError>;

/// Persisted activation record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivationState {
    #[serde(default)]
    pub active_plugins: BTreeSet<String>,
    #[serde(default)]
    pub active_theme: Option<String>,
}

impl ActivationState {
    pub fn is_plugin_active(&self, id: &str) -> bool {
        self.active_plugins.contains(id)
    }

    /// Returns `true` when the plugin was not active before.
    pub fn activate_plugin(&mut self, id: &str) -> bool {
        self.active_plugins.insert(id.to_string())
    }

    /// Returns `true` when the plugin was active before.
    pub fn deactivate_plugin(&mut self, id: &str) -> bool {
        self.active_plugins.remove(id)
    }
}

/// Activation persistence errors.
#[derive(Debug)]
pub enum StorageError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Corrupt(String),
    Db(DbError),
    /// Backend refused the operation (e.g. read-only or offline).
    Unavailable(String),
}

impl Display for StorageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "activation store i/o error at `{}`: {source}", path.display())
            }
            Self::Corrupt(detail) => write!(f, "activation state is corrupt: {detail}"),
            Self::Db(err) => write!(f, "activation store database error: {err}"),
            Self::Unavailable(detail) => write!(f, "activation store unavailable: {detail}"),
        }
    }
}

impl Error for StorageError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Db(err) => Some(err),
            Self::Corrupt(_) | Self::Unavailable(_) => None,
        }
    }
}

impl From<DbError> for StorageError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Minimal durable key-value contract for activation state.
pub trait ActivationStore: Send + Sync {
    fn load(&self) -> StorageResult<ActivationState>;
    fn save(&self, state: &ActivationState) -> StorageResult<()>;
}

/// Process-local store for tests and embedded hosts.
#[derive(Debug, Default)]
pub struct MemoryActivationStore {
    state: Mutex<ActivationState>,
}

impl MemoryActivationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: ActivationState) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }
}

impl ActivationStore for MemoryActivationStore {
    fn load(&self) -> StorageResult<ActivationState> {
        Ok(self
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save(&self, state: &ActivationState) -> StorageResult<()> {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state.clone();
        Ok(())
    }
}

/// Serialized access to one activation store.
///
/// Both managers share one ledger so concurrent activation requests never
/// interleave their load/mutate/save cycles.
pub struct ActivationLedger {
    store: Arc<dyn ActivationStore>,
    write_lock: Mutex<()>,
}

impl ActivationLedger {
    pub fn new(store: Arc<dyn ActivationStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    pub fn load(&self) -> StorageResult<ActivationState> {
        let _guard = self.lock();
        self.store.load()
    }

    /// Loads the state, applies `mutate` to a copy and saves it.
    ///
    /// Returns the saved state. When `mutate` leaves the state unchanged the
    /// save is skipped.
    ///
    /// # Errors
    /// - Returns the load or save error; nothing is cached on failure.
    pub fn update<F>(&self, mutate: F) -> StorageResult<ActivationState>
    where
        F: FnOnce(&mut ActivationState),
    {
        let _guard = self.lock();
        let current = self.store.load()?;
        let mut next = current.clone();
        mutate(&mut next);
        if next == current {
            return Ok(current);
        }

        match self.store.save(&next) {
            Ok(()) => {
                info!(
                    "event=activation_save module=activation status=ok active_plugins={} active_theme={}",
                    next.active_plugins.len(),
                    next.active_theme.as_deref().unwrap_or("none")
                );
                Ok(next)
            }
            Err(err) => {
                error!(
                    "event=activation_save module=activation status=error error={}",
                    err
                );
                Err(err)
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
