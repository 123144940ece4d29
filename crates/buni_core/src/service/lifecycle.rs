//! Load and boot passes shared by the plugin and theme managers.
//!
//! # Invariants
//! - `register()` runs right after construction, in discovery order.
//! - `boot()` runs only after the whole load pass, in load order.
//! - Per-candidate failures during load become skip records.
//! - An instance's `name()` equals its manifest id, so one key addresses both.

use crate::extension::capability::{ExtensionState, Plugin, Theme};
use crate::extension::discovery::{discover, partition_outcomes};
use crate::extension::error::{ExtensionError, ExtensionResult, LifecycleStage, SkipRecord};
use crate::extension::factory::FactoryRegistry;
use crate::extension::manifest::{ExtensionKind, ExtensionManifest, ManifestError};
use crate::extension::source::ExtensionSource;
use crate::hook::{BoxError, HookRegistry};
use log::{info, warn};
use std::sync::Arc;

/// Lifecycle calls the load/boot passes need from an instance.
pub(crate) trait Bootable {
    fn declared_name(&self) -> &str;
    fn register_with(&mut self, hooks: &Arc<HookRegistry>) -> Result<(), BoxError>;
    fn boot_with(&mut self, hooks: &Arc<HookRegistry>) -> Result<(), BoxError>;
}

impl Bootable for dyn Plugin {
    fn declared_name(&self) -> &str {
        self.name()
    }

    fn register_with(&mut self, hooks: &Arc<HookRegistry>) -> Result<(), BoxError> {
        self.register(hooks)
    }

    fn boot_with(&mut self, hooks: &Arc<HookRegistry>) -> Result<(), BoxError> {
        self.boot(hooks)
    }
}

impl Bootable for dyn Theme {
    fn declared_name(&self) -> &str {
        self.name()
    }

    fn register_with(&mut self, hooks: &Arc<HookRegistry>) -> Result<(), BoxError> {
        self.register(hooks)
    }

    fn boot_with(&mut self, hooks: &Arc<HookRegistry>) -> Result<(), BoxError> {
        self.boot(hooks)
    }
}

/// A manifest with its live instance.
pub struct LoadedExtension<T: ?Sized> {
    manifest: ExtensionManifest,
    instance: Box<T>,
    state: ExtensionState,
}

impl<T: ?Sized> LoadedExtension<T> {
    pub fn manifest(&self) -> &ExtensionManifest {
        &self.manifest
    }

    pub fn id(&self) -> &str {
        &self.manifest.id
    }

    pub fn state(&self) -> ExtensionState {
        self.state
    }

    pub fn instance(&self) -> &T {
        &self.instance
    }

    pub(crate) fn instance_mut(&mut self) -> &mut T {
        &mut self.instance
    }
}

/// Outcome of one load pass.
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Ids loaded by this pass, in load order.
    pub loaded: Vec<String>,
    pub skipped: Vec<SkipRecord>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }
}

pub(crate) fn load_extensions<T>(
    kind: ExtensionKind,
    source: &dyn ExtensionSource,
    factories: &FactoryRegistry<T>,
    hooks: &Arc<HookRegistry>,
    loaded: &mut Vec<LoadedExtension<T>>,
) -> ExtensionResult<LoadReport>
where
    T: ?Sized + Bootable,
{
    let (manifests, skipped) = partition_outcomes(discover(source, kind)?);
    let mut report = LoadReport {
        loaded: Vec::new(),
        skipped,
    };

    for manifest in manifests {
        let candidate = manifest.candidate.clone();
        if loaded.iter().any(|entry| entry.id() == manifest.id) {
            warn!(
                "event=extension_load module=service status=skip kind={} id={} reason=already_loaded",
                kind, manifest.id
            );
            report.skipped.push(SkipRecord {
                error: ExtensionError::ManifestInvalid {
                    candidate: candidate.clone(),
                    reason: ManifestError::DuplicateId(manifest.id),
                },
                candidate,
            });
            continue;
        }

        match instantiate(factories, hooks, manifest) {
            Ok(entry) => {
                info!(
                    "event=extension_load module=service status=ok kind={} id={} version={} entry_ref={}",
                    kind,
                    entry.id(),
                    entry.manifest.version,
                    entry.manifest.entry_ref
                );
                report.loaded.push(entry.id().to_string());
                loaded.push(entry);
            }
            Err(error) => {
                warn!(
                    "event=extension_load module=service status=skip kind={} candidate={} error={}",
                    kind, candidate, error
                );
                report.skipped.push(SkipRecord { candidate, error });
            }
        }
    }

    Ok(report)
}

fn instantiate<T>(
    factories: &FactoryRegistry<T>,
    hooks: &Arc<HookRegistry>,
    manifest: ExtensionManifest,
) -> Result<LoadedExtension<T>, ExtensionError>
where
    T: ?Sized + Bootable,
{
    let mut instance = factories.construct(&manifest)?;
    let name = instance.declared_name().trim();
    if name != manifest.id {
        return Err(ExtensionError::ConstructionFailed {
            reason: format!("instance reports name `{name}`, manifest id is `{}`", manifest.id),
            id: manifest.id,
        });
    }
    instance
        .register_with(hooks)
        .map_err(|err| ExtensionError::ConstructionFailed {
            id: manifest.id.clone(),
            reason: format!("{} failed: {err}", LifecycleStage::Register),
        })?;

    Ok(LoadedExtension {
        manifest,
        instance,
        state: ExtensionState::Registered,
    })
}

/// Boots every registered, not yet booted entry in load order.
///
/// Returns how many entries this pass booted.
pub(crate) fn boot_extensions<T>(
    kind: ExtensionKind,
    hooks: &Arc<HookRegistry>,
    loaded: &mut [LoadedExtension<T>],
) -> ExtensionResult<usize>
where
    T: ?Sized + Bootable,
{
    let mut booted = 0;
    for entry in loaded
        .iter_mut()
        .filter(|entry| entry.state == ExtensionState::Registered)
    {
        if let Err(err) = entry.instance.boot_with(hooks) {
            warn!(
                "event=extension_boot module=service status=error kind={} id={} error={}",
                kind,
                entry.id(),
                err
            );
            return Err(ExtensionError::Lifecycle {
                id: entry.id().to_string(),
                stage: LifecycleStage::Boot,
                reason: err.to_string(),
            });
        }
        entry.state = ExtensionState::Booted;
        booted += 1;
    }

    info!(
        "event=extension_boot module=service status=ok kind={} booted={}",
        kind, booted
    );
    Ok(booted)
}
