//! JSON file activation store.

use super::{ActivationState, ActivationStore, StorageError, StorageResult};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Stores activation state in one JSON file.
///
/// Writes go to a sibling temp file that is renamed over the target, so a
/// crash mid-write never leaves a truncated file behind.
#[derive(Debug, Clone)]
pub struct JsonFileActivationStore {
    path: PathBuf,
}

/// Accepted on-disk shapes. Older installs wrote a bare array of plugin ids.
#[derive(Deserialize)]
#[serde(untagged)]
enum OnDisk {
    PluginList(Vec<String>),
    Current(ActivationState),
}

impl JsonFileActivationStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut file_name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        file_name.push(".tmp");
        self.path.with_file_name(file_name)
    }

    fn io_error(&self, path: &Path, source: std::io::Error) -> StorageError {
        StorageError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl ActivationStore for JsonFileActivationStore {
    fn load(&self) -> StorageResult<ActivationState> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(ActivationState::default()),
            Err(err) => return Err(self.io_error(&self.path, err)),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(ActivationState::default());
        }

        match serde_json::from_slice::<OnDisk>(&bytes) {
            Ok(OnDisk::Current(state)) => Ok(state),
            Ok(OnDisk::PluginList(ids)) => Ok(ActivationState {
                active_plugins: ids.into_iter().collect::<BTreeSet<_>>(),
                active_theme: None,
            }),
            Err(err) => Err(StorageError::Corrupt(format!(
                "`{}`: {err}",
                self.path.display()
            ))),
        }
    }

    fn save(&self, state: &ActivationState) -> StorageResult<()> {
        if let Some(parent) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|err| self.io_error(parent, err))?;
        }

        let bytes = serde_json::to_vec_pretty(state)
            .map_err(|err| StorageError::Corrupt(err.to_string()))?;
        let temp_path = self.temp_path();
        std::fs::write(&temp_path, bytes).map_err(|err| self.io_error(&temp_path, err))?;
        std::fs::rename(&temp_path, &self.path).map_err(|err| self.io_error(&self.path, err))
    }
}

#[cfg(test)]
mod tests {
    use super::JsonFileActivationStore;
    use crate::activation::{ActivationState, ActivationStore, StorageError};
    use std::fs;

    #[test]
    fn missing_file_loads_empty_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileActivationStore::new(dir.path().join("active.json"));
        assert_eq!(store.load().unwrap(), ActivationState::default());
    }

    #[test]
    fn save_then_load_survives_new_instance() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("active.json");

        let mut state = ActivationState::default();
        state.activate_plugin("seo");
        state.active_theme = Some("aurora".to_string());
        JsonFileActivationStore::new(&path).save(&state).unwrap();

        let reopened = JsonFileActivationStore::new(&path);
        assert_eq!(reopened.load().unwrap(), state);
        assert!(!dir.path().join("nested").join("active.json.tmp").exists());
    }

    #[test]
    fn legacy_plugin_list_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("active_plugins.json");
        fs::write(&path, r#"["seo", "social-share", "seo"]"#).unwrap();

        let state = JsonFileActivationStore::new(&path).load().unwrap();
        assert_eq!(state.active_plugins.len(), 2);
        assert!(state.is_plugin_active("social-share"));
        assert_eq!(state.active_theme, None);
    }

    #[test]
    fn corrupt_file_is_reported_not_reset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("active.json");
        fs::write(&path, "{ oops").unwrap();

        let err = JsonFileActivationStore::new(&path)
            .load()
            .expect_err("corrupt file must fail");
        assert!(matches!(err, StorageError::Corrupt(_)));
    }
}
