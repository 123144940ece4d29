//! Extension contracts, manifests and discovery.
//!
//! # Responsibility
//! - Describe on-disk extensions through validated manifests.
//! - Enumerate candidates from an extension source.
//! - Build live instances through compiled-in factories.
//!
//! # Invariants
//! - One bad candidate never aborts discovery.
//! - Instances are only built from factories registered ahead of loading.

pub mod capability;
pub mod discovery;
pub mod error;
pub mod factory;
pub mod manifest;
pub mod source;

pub use capability::{ExtensionState, Plugin, Theme};
pub use error::{ExtensionError, ExtensionResult, LifecycleStage, SkipRecord};
pub use factory::{FactoryError, FactoryRegistry, PluginFactories, ThemeFactories};
pub use manifest::{ExtensionKind, ExtensionManifest, ManifestError, ThemeInfo};
pub use source::{DirectorySource, ExtensionSource, MemorySource, SourceError};
