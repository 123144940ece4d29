//! Extension runtime error taxonomy.

use crate::activation::StorageError;
use crate::extension::manifest::ManifestError;
use crate::extension::source::SourceError;
use crate::hook::HookError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ExtensionResult<T> = Result<T, ExtensionError>;

/// Lifecycle call that failed on a loaded extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleStage {
    Register,
    Boot,
    Enable,
    Disable,
}

impl LifecycleStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Register => "register",
            Self::Boot => "boot",
            Self::Enable => "enable",
            Self::Disable => "disable",
        }
    }
}

impl Display for LifecycleStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors surfaced by discovery, managers and the runtime facade.
#[derive(Debug)]
pub enum ExtensionError {
    /// Candidate manifest missing or invalid; recovered as a skip.
    ManifestInvalid {
        candidate: String,
        reason: ManifestError,
    },
    /// Entry point missing or instance could not be built; recovered as a skip.
    ConstructionFailed { id: String, reason: String },
    /// Request referenced an id that is not loaded.
    ExtensionNotFound(String),
    /// A hook callback failed during dispatch.
    HookCallback(HookError),
    /// An extension lifecycle method returned an error.
    Lifecycle {
        id: String,
        stage: LifecycleStage,
        reason: String,
    },
    /// Activation state could not be read or written.
    Storage(StorageError),
    /// Extension root could not be listed or modified.
    Source(SourceError),
}

impl ExtensionError {
    /// Returns the id or candidate name the error is about, when there is one.
    pub fn subject(&self) -> Option<&str> {
        match self {
            Self::ManifestInvalid { candidate, .. } => Some(candidate),
            Self::ConstructionFailed { id, .. } => Some(id),
            Self::ExtensionNotFound(id) => Some(id),
            Self::Lifecycle { id, .. } => Some(id),
            Self::HookCallback(err) => Some(err.hook()),
            Self::Storage(_) | Self::Source(_) => None,
        }
    }
}

impl Display for ExtensionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ManifestInvalid { candidate, reason } => {
                write!(f, "invalid manifest in `{candidate}`: {reason}")
            }
            Self::ConstructionFailed { id, reason } => {
                write!(f, "failed to construct extension `{id}`: {reason}")
            }
            Self::ExtensionNotFound(id) => write!(f, "extension not found: {id}"),
            Self::HookCallback(err) => write!(f, "{err}"),
            Self::Lifecycle { id, stage, reason } => {
                write!(f, "extension `{id}` failed to {stage}: {reason}")
            }
            Self::Storage(err) => write!(f, "{err}"),
            Self::Source(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ExtensionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::ManifestInvalid { reason, .. } => Some(reason),
            Self::HookCallback(err) => Some(err),
            Self::Storage(err) => Some(err),
            Self::Source(err) => Some(err),
            Self::ConstructionFailed { .. }
            | Self::ExtensionNotFound(_)
            | Self::Lifecycle { .. } => None,
        }
    }
}

impl From<HookError> for ExtensionError {
    fn from(value: HookError) -> Self {
        Self::HookCallback(value)
    }
}

impl From<StorageError> for ExtensionError {
    fn from(value: StorageError) -> Self {
        Self::Storage(value)
    }
}

impl From<SourceError> for ExtensionError {
    fn from(value: SourceError) -> Self {
        Self::Source(value)
    }
}

/// One candidate excluded from a load pass.
#[derive(Debug)]
pub struct SkipRecord {
    /// Source entry (directory name) that was skipped.
    pub candidate: String,
    pub error: ExtensionError,
}

impl Display for SkipRecord {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "skipped `{}`: {}", self.candidate, self.error)
    }
}
