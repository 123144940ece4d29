//! Runtime configuration.
//!
//! # Responsibility
//! - Read `buni.json` into [`RuntimeConfig`], defaulting every missing field.
//! - Resolve relative paths against the host's base directory.
//! - Build the configured activation store.
//!
//! # Invariants
//! - A missing config file yields the defaults.
//! - Paths returned by [`RuntimeConfig::resolve`] are never relative to the
//!   process working directory unless the base itself is.

use crate::activation::{
    ActivationStore, JsonFileActivationStore, SqliteActivationStore, StorageError,
};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const CONFIG_FILE_NAME: &str = "buni.json";

/// Which backend persists activation state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Json,
    Sqlite,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivationConfig {
    pub backend: StoreBackend,
    pub path: PathBuf,
}

impl Default for ActivationConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Json,
            path: PathBuf::from("active_extensions.json"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Falls back to [`crate::logging::default_log_level`].
    pub level: Option<String>,
    /// Logging stays off when unset.
    pub dir: Option<PathBuf>,
}

/// Host-level runtime settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub plugins_path: PathBuf,
    pub themes_path: PathBuf,
    pub activation: ActivationConfig,
    pub log: LogConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            plugins_path: PathBuf::from("plugins"),
            themes_path: PathBuf::from("themes"),
            activation: ActivationConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl RuntimeConfig {
    /// Reads the config file at `path`.
    ///
    /// # Errors
    /// - [`ConfigError::Io`] when the file exists but cannot be read.
    /// - [`ConfigError::Parse`] when the file is not a valid config.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_json::from_str(&raw).map_err(|err| ConfigError::Parse {
            path: path.to_path_buf(),
            detail: err.to_string(),
        })
    }

    /// Reads `buni.json` from `base` and resolves its paths against `base`.
    pub fn load_from_dir(base: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let base = base.as_ref();
        Ok(Self::load(base.join(CONFIG_FILE_NAME))?.resolve(base))
    }

    /// Joins every relative path onto `base`.
    pub fn resolve(mut self, base: impl AsRef<Path>) -> Self {
        let base = base.as_ref();
        self.plugins_path = join_relative(base, &self.plugins_path);
        self.themes_path = join_relative(base, &self.themes_path);
        self.activation.path = join_relative(base, &self.activation.path);
        self.log.dir = self.log.dir.map(|dir| join_relative(base, &dir));
        self
    }

    /// Opens the configured activation store.
    ///
    /// # Errors
    /// - Returns the store's open error, e.g. a failed SQLite migration.
    pub fn open_store(&self) -> Result<Arc<dyn ActivationStore>, StorageError> {
        let store: Arc<dyn ActivationStore> = match self.activation.backend {
            StoreBackend::Json => Arc::new(JsonFileActivationStore::new(&self.activation.path)),
            StoreBackend::Sqlite => Arc::new(SqliteActivationStore::open(&self.activation.path)?),
        };
        Ok(store)
    }
}

fn join_relative(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        detail: String,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse { path, detail } => {
                write!(f, "invalid config `{}`: {detail}", path.display())
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { .. } => None,
        }
    }
}
