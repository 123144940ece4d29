//! Candidate sources for extension discovery.
//!
//! # Responsibility
//! - Enumerate extension candidates (immediate subdirectories of a root).
//! - Read manifest bytes and delete candidates on uninstall.
//!
//! # Invariants
//! - Candidates are returned sorted by name so traversal order is stable.
//! - Candidate names never escape the root (no separators, no `..`).

use log::warn;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Source I/O errors.
#[derive(Debug)]
pub enum SourceError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    CandidateNotFound(String),
    InvalidCandidate(String),
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "i/o error at `{}`: {source}", path.display()),
            Self::CandidateNotFound(name) => write!(f, "extension candidate not found: {name}"),
            Self::InvalidCandidate(name) => write!(f, "extension candidate name is invalid: {name}"),
        }
    }
}

impl Error for SourceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::CandidateNotFound(_) | Self::InvalidCandidate(_) => None,
        }
    }
}

/// Where extension candidates come from.
pub trait ExtensionSource: Send + Sync {
    /// Human-readable location used in log events.
    fn location(&self) -> String;

    /// Lists candidate names in deterministic order.
    fn list_candidates(&self) -> Result<Vec<String>, SourceError>;

    /// Reads `file_name` inside `candidate`; `Ok(None)` when the file is absent.
    fn read_manifest(&self, candidate: &str, file_name: &str)
        -> Result<Option<Vec<u8>>, SourceError>;

    /// Removes the candidate and all of its files.
    fn remove_candidate(&self, candidate: &str) -> Result<(), SourceError>;
}

fn validate_candidate(candidate: &str) -> Result<(), SourceError> {
    let trimmed = candidate.trim();
    if trimmed.is_empty()
        || trimmed == "."
        || trimmed == ".."
        || trimmed.contains(['/', '\\'])
    {
        return Err(SourceError::InvalidCandidate(candidate.to_string()));
    }
    Ok(())
}

/// Filesystem source: every immediate subdirectory of `root` is a candidate.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ExtensionSource for DirectorySource {
    fn location(&self) -> String {
        self.root.display().to_string()
    }

    fn list_candidates(&self) -> Result<Vec<String>, SourceError> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            // A missing root simply has no extensions.
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(SourceError::Io {
                    path: self.root.clone(),
                    source,
                })
            }
        };

        let mut candidates = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| SourceError::Io {
                path: self.root.clone(),
                source,
            })?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) => candidates.push(name),
                Err(raw) => warn!(
                    "event=source_list module=extension status=skip reason=non_utf8_name name={:?}",
                    raw
                ),
            }
        }
        candidates.sort();
        Ok(candidates)
    }

    fn read_manifest(
        &self,
        candidate: &str,
        file_name: &str,
    ) -> Result<Option<Vec<u8>>, SourceError> {
        validate_candidate(candidate)?;
        let path = self.root.join(candidate).join(file_name);
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(SourceError::Io { path, source }),
        }
    }

    fn remove_candidate(&self, candidate: &str) -> Result<(), SourceError> {
        validate_candidate(candidate)?;
        let path = self.root.join(candidate);
        match std::fs::remove_dir_all(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                Err(SourceError::CandidateNotFound(candidate.to_string()))
            }
            Err(source) => Err(SourceError::Io { path, source }),
        }
    }
}

/// In-memory source for tests and hosts that embed manifests.
#[derive(Debug, Default)]
pub struct MemorySource {
    candidates: Mutex<BTreeMap<String, BTreeMap<String, Vec<u8>>>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an empty candidate (a directory without any manifest).
    pub fn with_candidate(self, candidate: impl Into<String>) -> Self {
        self.lock().entry(candidate.into()).or_default();
        self
    }

    /// Adds `file_name` with `bytes` to `candidate`, creating it if needed.
    pub fn with_file(
        self,
        candidate: impl Into<String>,
        file_name: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        self.lock()
            .entry(candidate.into())
            .or_default()
            .insert(file_name.into(), bytes.into());
        self
    }

    pub fn contains(&self, candidate: &str) -> bool {
        self.lock().contains_key(candidate)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, BTreeMap<String, Vec<u8>>>> {
        self.candidates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl ExtensionSource for MemorySource {
    fn location(&self) -> String {
        "memory".to_string()
    }

    fn list_candidates(&self) -> Result<Vec<String>, SourceError> {
        Ok(self.lock().keys().cloned().collect())
    }

    fn read_manifest(
        &self,
        candidate: &str,
        file_name: &str,
    ) -> Result<Option<Vec<u8>>, SourceError> {
        Ok(self
            .lock()
            .get(candidate)
            .and_then(|files| files.get(file_name))
            .cloned())
    }

    fn remove_candidate(&self, candidate: &str) -> Result<(), SourceError> {
        match self.lock().remove(candidate) {
            Some(_) => Ok(()),
            None => Err(SourceError::CandidateNotFound(candidate.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{DirectorySource, ExtensionSource, MemorySource, SourceError};
    use std::fs;

    #[test]
    fn directory_source_lists_sorted_subdirectories_only() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("zeta")).unwrap();
        fs::create_dir(dir.path().join("alpha")).unwrap();
        fs::write(dir.path().join("active_plugins.json"), "[]").unwrap();

        let source = DirectorySource::new(dir.path());
        assert_eq!(source.list_candidates().unwrap(), vec!["alpha", "zeta"]);
    }

    #[test]
    fn missing_root_lists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let source = DirectorySource::new(dir.path().join("does-not-exist"));
        assert!(source.list_candidates().unwrap().is_empty());
    }

    #[test]
    fn directory_source_reads_and_removes_candidates() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("seo")).unwrap();
        fs::write(dir.path().join("seo").join("plugin.json"), "{}").unwrap();

        let source = DirectorySource::new(dir.path());
        assert_eq!(
            source.read_manifest("seo", "plugin.json").unwrap(),
            Some(b"{}".to_vec())
        );
        assert_eq!(source.read_manifest("seo", "theme.json").unwrap(), None);

        source.remove_candidate("seo").unwrap();
        assert!(!dir.path().join("seo").exists());
        assert!(matches!(
            source.remove_candidate("seo"),
            Err(SourceError::CandidateNotFound(_))
        ));
    }

    #[test]
    fn directory_source_rejects_escaping_candidates() {
        let dir = tempfile::tempdir().unwrap();
        let source = DirectorySource::new(dir.path());
        for name in ["..", "../etc", "a/b", ""] {
            assert!(matches!(
                source.remove_candidate(name),
                Err(SourceError::InvalidCandidate(_))
            ));
        }
    }

    #[test]
    fn memory_source_round_trip() {
        let source = MemorySource::new()
            .with_candidate("empty")
            .with_file("seo", "plugin.json", "{}");
        assert_eq!(source.list_candidates().unwrap(), vec!["empty", "seo"]);
        assert_eq!(source.read_manifest("empty", "plugin.json").unwrap(), None);
        source.remove_candidate("seo").unwrap();
        assert!(!source.contains("seo"));
    }
}
