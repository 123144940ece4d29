//! Plugin lifecycle orchestration.
//!
//! # Responsibility
//! - Load, register and boot plugins from one source.
//! - Toggle activation through the shared activation ledger.
//! - Uninstall plugins by deactivating, deleting and unloading them.
//!
//! # Invariants
//! - Loaded plugins are keyed by manifest id (equal to `name()`) and kept in
//!   load order.
//! - Activation answers always come from the store, never from a stale copy.
//! - A failed save after `enable`/`disable` is compensated best-effort.

use crate::activation::ActivationLedger;
use crate::extension::capability::{ExtensionState, Plugin};
use crate::extension::error::{ExtensionError, ExtensionResult, LifecycleStage};
use crate::extension::factory::PluginFactories;
use crate::extension::manifest::ExtensionKind;
use crate::extension::source::ExtensionSource;
use crate::hook::HookRegistry;
use crate::service::lifecycle::{boot_extensions, load_extensions, LoadReport, LoadedExtension};
use log::{info, warn};
use std::sync::{Arc, Mutex, PoisonError};

/// A loaded plugin instance with its manifest.
pub type LoadedPlugin = LoadedExtension<dyn Plugin>;

/// Listing row for one loaded plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledPlugin {
    pub id: String,
    pub name: String,
    pub version: String,
    pub description: String,
    pub state: ExtensionState,
    pub active: bool,
}

/// Owns loaded plugins and their activation toggles.
pub struct PluginManager {
    hooks: Arc<HookRegistry>,
    source: Arc<dyn ExtensionSource>,
    factories: PluginFactories,
    activation: Arc<ActivationLedger>,
    plugins: Vec<LoadedPlugin>,
    installed: Mutex<Option<Vec<InstalledPlugin>>>,
}

impl PluginManager {
    pub fn new(
        hooks: Arc<HookRegistry>,
        source: Arc<dyn ExtensionSource>,
        factories: PluginFactories,
        activation: Arc<ActivationLedger>,
    ) -> Self {
        Self {
            hooks,
            source,
            factories,
            activation,
            plugins: Vec::new(),
            installed: Mutex::new(None),
        }
    }

    /// Discovers plugins, constructs them and runs `register()` on each.
    ///
    /// Calling this again loads only candidates whose id is not loaded yet.
    ///
    /// # Errors
    /// - Returns [`ExtensionError::Source`] when the plugin root cannot be
    ///   listed. Per-candidate failures end up in [`LoadReport::skipped`].
    pub fn load_plugins(&mut self) -> ExtensionResult<LoadReport> {
        let report = load_extensions(
            ExtensionKind::Plugin,
            self.source.as_ref(),
            &self.factories,
            &self.hooks,
            &mut self.plugins,
        )?;
        self.invalidate_installed();
        info!(
            "event=plugins_load module=plugin status=ok loaded={} skipped={} total={}",
            report.loaded.len(),
            report.skipped.len(),
            self.plugins.len()
        );
        Ok(report)
    }

    /// Runs `boot()` on every registered plugin that has not booted yet.
    ///
    /// # Errors
    /// - Stops at the first failing plugin with [`ExtensionError::Lifecycle`].
    pub fn boot_plugins(&mut self) -> ExtensionResult<usize> {
        let result = boot_extensions(ExtensionKind::Plugin, &self.hooks, &mut self.plugins);
        self.invalidate_installed();
        result
    }

    /// Activates a loaded plugin and persists the change.
    ///
    /// Calling this for an already active plugin runs `enable()` again and
    /// leaves the persisted set unchanged.
    ///
    /// # Errors
    /// - [`ExtensionError::ExtensionNotFound`] for an unknown id.
    /// - [`ExtensionError::Lifecycle`] when the plugin's `enable()` fails.
    /// - [`ExtensionError::Storage`] when the new state cannot be saved; the
    ///   plugin's `disable()` is called to undo the in-memory side.
    pub fn enable_plugin(&mut self, id: &str) -> ExtensionResult<()> {
        let id = id.trim();
        let index = self.position(id)?;

        self.plugins[index]
            .instance_mut()
            .enable()
            .map_err(|err| ExtensionError::Lifecycle {
                id: id.to_string(),
                stage: LifecycleStage::Enable,
                reason: err.to_string(),
            })?;

        if let Err(err) = self.activation.update(|state| {
            state.activate_plugin(id);
        }) {
            if let Err(undo) = self.plugins[index].instance_mut().disable() {
                warn!(
                    "event=plugin_enable_rollback module=plugin status=error id={} error={}",
                    id, undo
                );
            }
            return Err(err.into());
        }

        self.invalidate_installed();
        info!("event=plugin_enable module=plugin status=ok id={}", id);
        Ok(())
    }

    /// Deactivates a loaded plugin and persists the change.
    ///
    /// # Errors
    /// - [`ExtensionError::ExtensionNotFound`] for an unknown id.
    /// - [`ExtensionError::Lifecycle`] when the plugin's `disable()` fails.
    /// - [`ExtensionError::Storage`] when the new state cannot be saved; the
    ///   plugin's `enable()` is called to undo the in-memory side.
    pub fn disable_plugin(&mut self, id: &str) -> ExtensionResult<()> {
        let id = id.trim();
        let index = self.position(id)?;

        self.plugins[index]
            .instance_mut()
            .disable()
            .map_err(|err| ExtensionError::Lifecycle {
                id: id.to_string(),
                stage: LifecycleStage::Disable,
                reason: err.to_string(),
            })?;

        if let Err(err) = self.activation.update(|state| {
            state.deactivate_plugin(id);
        }) {
            if let Err(undo) = self.plugins[index].instance_mut().enable() {
                warn!(
                    "event=plugin_disable_rollback module=plugin status=error id={} error={}",
                    id, undo
                );
            }
            return Err(err.into());
        }

        self.invalidate_installed();
        info!("event=plugin_disable module=plugin status=ok id={}", id);
        Ok(())
    }

    /// Deactivates (when active), deletes and unloads a plugin.
    ///
    /// Hooks the plugin registered stay in the registry until restart.
    ///
    /// # Errors
    /// - [`ExtensionError::ExtensionNotFound`] for an unknown id.
    /// - Any error from deactivation, in which case nothing is deleted.
    /// - [`ExtensionError::Source`] when the plugin directory cannot be
    ///   removed; the plugin stays loaded but inactive.
    pub fn uninstall_plugin(&mut self, id: &str) -> ExtensionResult<()> {
        let id = id.trim();
        self.position(id)?;

        if self.is_active(id)? {
            self.disable_plugin(id)?;
        }

        let index = self.position(id)?;
        let candidate = self.plugins[index].manifest().candidate.clone();
        self.source.remove_candidate(&candidate).inspect_err(|err| {
            warn!(
                "event=plugin_uninstall module=plugin status=error id={} candidate={} error={}",
                id, candidate, err
            );
        })?;

        self.plugins.remove(index);
        self.invalidate_installed();
        info!(
            "event=plugin_uninstall module=plugin status=ok id={} candidate={}",
            id, candidate
        );
        Ok(())
    }

    /// Returns whether `id` is in the persisted active set.
    pub fn is_active(&self, id: &str) -> ExtensionResult<bool> {
        Ok(self.activation.load()?.is_plugin_active(id.trim()))
    }

    /// Loaded plugin ids that are currently active, in load order.
    pub fn active_plugins(&self) -> ExtensionResult<Vec<String>> {
        let state = self.activation.load()?;
        Ok(self
            .plugins
            .iter()
            .filter(|plugin| state.is_plugin_active(plugin.id()))
            .map(|plugin| plugin.id().to_string())
            .collect())
    }

    /// Listing of every loaded plugin with its activation flag.
    ///
    /// The listing is cached until the next load, boot, toggle or uninstall.
    pub fn installed_plugins(&self) -> ExtensionResult<Vec<InstalledPlugin>> {
        let mut cache = self
            .installed
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(rows) = cache.as_ref() {
            return Ok(rows.clone());
        }

        let state = self.activation.load()?;
        let rows: Vec<InstalledPlugin> = self
            .plugins
            .iter()
            .map(|plugin| InstalledPlugin {
                id: plugin.id().to_string(),
                name: plugin.instance().name().to_string(),
                version: plugin.instance().version().to_string(),
                description: plugin.instance().description().to_string(),
                state: plugin.state(),
                active: state.is_plugin_active(plugin.id()),
            })
            .collect();
        *cache = Some(rows.clone());
        Ok(rows)
    }

    pub fn get(&self, id: &str) -> Option<&LoadedPlugin> {
        self.plugins.iter().find(|plugin| plugin.id() == id.trim())
    }

    /// Loaded plugins in load order.
    pub fn plugins(&self) -> &[LoadedPlugin] {
        &self.plugins
    }

    pub fn plugin_ids(&self) -> Vec<&str> {
        self.plugins.iter().map(LoadedPlugin::id).collect()
    }

    pub fn hooks(&self) -> &Arc<HookRegistry> {
        &self.hooks
    }

    fn position(&self, id: &str) -> ExtensionResult<usize> {
        self.plugins
            .iter()
            .position(|plugin| plugin.id() == id)
            .ok_or_else(|| ExtensionError::ExtensionNotFound(id.to_string()))
    }

    fn invalidate_installed(&self) {
        *self
            .installed
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }
}
