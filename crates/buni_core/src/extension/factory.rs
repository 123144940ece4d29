//! Typed constructor registry keyed by manifest entry reference.
//!
//! # Responsibility
//! - Map `entry_ref` strings to compiled-in constructors.
//! - Turn a manifest into a live instance or a `ConstructionFailed` error.
//!
//! # Invariants
//! - One constructor per entry reference.
//! - A registry only builds manifests of its own kind.

use crate::extension::capability::{Plugin, Theme};
use crate::extension::error::ExtensionError;
use crate::extension::manifest::{derive_entry_ref, ExtensionKind, ExtensionManifest};
use crate::hook::BoxError;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

type Constructor<T> = Box<dyn Fn(&ExtensionManifest) -> Result<Box<T>, BoxError> + Send + Sync>;

/// Factory registration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FactoryError {
    EmptyEntryRef,
    DuplicateEntryRef(String),
}

impl Display for FactoryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyEntryRef => write!(f, "entry reference must not be empty"),
            Self::DuplicateEntryRef(value) => {
                write!(f, "entry reference already registered: {value}")
            }
        }
    }
}

impl Error for FactoryError {}

/// Constructors for one extension kind.
pub struct FactoryRegistry<T: ?Sized> {
    kind: ExtensionKind,
    constructors: BTreeMap<String, Constructor<T>>,
}

/// Constructors for plugins.
pub type PluginFactories = FactoryRegistry<dyn Plugin>;
/// Constructors for themes.
pub type ThemeFactories = FactoryRegistry<dyn Theme>;

impl PluginFactories {
    pub fn plugins() -> Self {
        Self::new(ExtensionKind::Plugin)
    }
}

impl ThemeFactories {
    pub fn themes() -> Self {
        Self::new(ExtensionKind::Theme)
    }
}

impl<T: ?Sized> FactoryRegistry<T> {
    pub fn new(kind: ExtensionKind) -> Self {
        Self {
            kind,
            constructors: BTreeMap::new(),
        }
    }

    pub fn kind(&self) -> ExtensionKind {
        self.kind
    }

    /// Registers a constructor under an explicit entry reference.
    pub fn register<F>(&mut self, entry_ref: impl Into<String>, constructor: F) -> Result<(), FactoryError>
    where
        F: Fn(&ExtensionManifest) -> Result<Box<T>, BoxError> + Send + Sync + 'static,
    {
        let entry_ref: String = entry_ref.into();
        let entry_ref = entry_ref.trim().to_string();
        if entry_ref.is_empty() {
            return Err(FactoryError::EmptyEntryRef);
        }
        if self.constructors.contains_key(&entry_ref) {
            return Err(FactoryError::DuplicateEntryRef(entry_ref));
        }
        self.constructors.insert(entry_ref, Box::new(constructor));
        Ok(())
    }

    /// Registers a constructor for the extension whose manifest id is `id`.
    pub fn register_id<F>(&mut self, id: &str, constructor: F) -> Result<(), FactoryError>
    where
        F: Fn(&ExtensionManifest) -> Result<Box<T>, BoxError> + Send + Sync + 'static,
    {
        self.register(derive_entry_ref(self.kind, id.trim()), constructor)
    }

    pub fn contains(&self, entry_ref: &str) -> bool {
        self.constructors.contains_key(entry_ref)
    }

    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }

    /// Sorted registered entry references.
    pub fn entry_refs(&self) -> Vec<&str> {
        self.constructors.keys().map(String::as_str).collect()
    }

    /// Builds the instance for `manifest`.
    ///
    /// # Errors
    /// - [`ExtensionError::ConstructionFailed`] when the manifest kind does not
    ///   match, no constructor is registered, or the constructor fails.
    pub fn construct(&self, manifest: &ExtensionManifest) -> Result<Box<T>, ExtensionError> {
        if manifest.kind != self.kind {
            return Err(ExtensionError::ConstructionFailed {
                id: manifest.id.clone(),
                reason: format!(
                    "manifest kind `{}` does not match factory kind `{}`",
                    manifest.kind, self.kind
                ),
            });
        }
        let constructor = self.constructors.get(&manifest.entry_ref).ok_or_else(|| {
            ExtensionError::ConstructionFailed {
                id: manifest.id.clone(),
                reason: format!("no constructor registered for `{}`", manifest.entry_ref),
            }
        })?;
        constructor(manifest).map_err(|err| ExtensionError::ConstructionFailed {
            id: manifest.id.clone(),
            reason: err.to_string(),
        })
    }
}
