//! Host-facing extension runtime.
//!
//! # Responsibility
//! - Own the hook registry, activation ledger and both managers.
//! - Expose the call surface the CMS host uses at known moments.
//!
//! # Invariants
//! - One hook registry and one activation ledger per runtime.
//! - `start()` registers every extension before booting any of them.

use crate::activation::{ActivationLedger, ActivationStore};
use crate::config::RuntimeConfig;
use crate::extension::error::{ExtensionError, ExtensionResult};
use crate::extension::factory::{PluginFactories, ThemeFactories};
use crate::extension::source::{DirectorySource, ExtensionSource};
use crate::hook::{BoxError, CallbackId, HookRegistry, DEFAULT_PRIORITY, HOOK_INIT};
use crate::service::{
    InstalledPlugin, LoadReport, LoadedTheme, PluginManager, ThemeManager,
};
use log::info;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

/// Load results of [`ExtensionRuntime::start`].
#[derive(Debug, Default)]
pub struct StartReport {
    pub plugins: LoadReport,
    pub themes: LoadReport,
}

/// Extension runtime wired for one site.
pub struct ExtensionRuntime {
    hooks: Arc<HookRegistry>,
    activation: Arc<ActivationLedger>,
    plugins: PluginManager,
    themes: ThemeManager,
}

impl ExtensionRuntime {
    pub fn new(
        plugin_source: Arc<dyn ExtensionSource>,
        theme_source: Arc<dyn ExtensionSource>,
        store: Arc<dyn ActivationStore>,
        plugin_factories: PluginFactories,
        theme_factories: ThemeFactories,
    ) -> Self {
        let hooks = Arc::new(HookRegistry::new());
        let activation = Arc::new(ActivationLedger::new(store));
        let plugins = PluginManager::new(
            Arc::clone(&hooks),
            plugin_source,
            plugin_factories,
            Arc::clone(&activation),
        );
        let themes = ThemeManager::new(
            Arc::clone(&hooks),
            theme_source,
            theme_factories,
            Arc::clone(&activation),
        );
        Self {
            hooks,
            activation,
            plugins,
            themes,
        }
    }

    /// Builds a runtime over the directories and store named by `config`.
    ///
    /// # Errors
    /// - [`ExtensionError::Storage`] when the activation store cannot be opened.
    pub fn from_config(
        config: &RuntimeConfig,
        plugin_factories: PluginFactories,
        theme_factories: ThemeFactories,
    ) -> ExtensionResult<Self> {
        let store = config.open_store()?;
        info!(
            "event=runtime_open module=runtime status=ok plugins_path={} themes_path={} backend={:?}",
            config.plugins_path.display(),
            config.themes_path.display(),
            config.activation.backend
        );
        Ok(Self::new(
            Arc::new(DirectorySource::new(&config.plugins_path)),
            Arc::new(DirectorySource::new(&config.themes_path)),
            store,
            plugin_factories,
            theme_factories,
        ))
    }

    /// Loads and registers all extensions, boots them, then fires the init hook.
    ///
    /// # Errors
    /// - Source or storage errors from loading, the first boot failure, or a
    ///   failing init callback.
    pub fn start(&mut self) -> ExtensionResult<StartReport> {
        let started_at = Instant::now();
        let plugins = self.plugins.load_plugins()?;
        let themes = self.themes.load_themes()?;
        self.plugins.boot_plugins()?;
        self.themes.boot_themes()?;
        self.do_action(HOOK_INIT, &[])?;

        info!(
            "event=runtime_start module=runtime status=ok plugins={} themes={} skipped={} duration_ms={}",
            plugins.loaded.len(),
            themes.loaded.len(),
            plugins.skipped.len() + themes.skipped.len(),
            started_at.elapsed().as_millis()
        );
        Ok(StartReport { plugins, themes })
    }

    pub fn hooks(&self) -> &Arc<HookRegistry> {
        &self.hooks
    }

    pub fn activation(&self) -> &Arc<ActivationLedger> {
        &self.activation
    }

    pub fn plugin_manager(&self) -> &PluginManager {
        &self.plugins
    }

    pub fn plugin_manager_mut(&mut self) -> &mut PluginManager {
        &mut self.plugins
    }

    pub fn theme_manager(&self) -> &ThemeManager {
        &self.themes
    }

    pub fn theme_manager_mut(&mut self) -> &mut ThemeManager {
        &mut self.themes
    }

    /// Registers a host action at [`DEFAULT_PRIORITY`].
    pub fn add_action<F>(&self, hook: &str, callback: F) -> CallbackId
    where
        F: Fn(&[Value]) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.add_action_with_priority(hook, DEFAULT_PRIORITY, callback)
    }

    pub fn add_action_with_priority<F>(&self, hook: &str, priority: i32, callback: F) -> CallbackId
    where
        F: Fn(&[Value]) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.hooks.add_action_with_priority(hook, priority, callback)
    }

    pub fn do_action(&self, hook: &str, args: &[Value]) -> ExtensionResult<()> {
        self.hooks.do_action(hook, args).map_err(ExtensionError::from)
    }

    /// Registers a host filter at [`DEFAULT_PRIORITY`].
    pub fn add_filter<F>(&self, hook: &str, callback: F) -> CallbackId
    where
        F: Fn(Value, &[Value]) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        self.add_filter_with_priority(hook, DEFAULT_PRIORITY, callback)
    }

    pub fn add_filter_with_priority<F>(&self, hook: &str, priority: i32, callback: F) -> CallbackId
    where
        F: Fn(Value, &[Value]) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        self.hooks.add_filter_with_priority(hook, priority, callback)
    }

    pub fn apply_filters(&self, hook: &str, value: Value, args: &[Value]) -> ExtensionResult<Value> {
        self.hooks
            .apply_filters(hook, value, args)
            .map_err(ExtensionError::from)
    }

    pub fn load_plugins(&mut self) -> ExtensionResult<LoadReport> {
        self.plugins.load_plugins()
    }

    pub fn boot_plugins(&mut self) -> ExtensionResult<usize> {
        self.plugins.boot_plugins()
    }

    pub fn enable_plugin(&mut self, id: &str) -> ExtensionResult<()> {
        self.plugins.enable_plugin(id)
    }

    pub fn disable_plugin(&mut self, id: &str) -> ExtensionResult<()> {
        self.plugins.disable_plugin(id)
    }

    pub fn uninstall_plugin(&mut self, id: &str) -> ExtensionResult<()> {
        self.plugins.uninstall_plugin(id)
    }

    pub fn is_plugin_active(&self, id: &str) -> ExtensionResult<bool> {
        self.plugins.is_active(id)
    }

    pub fn installed_plugins(&self) -> ExtensionResult<Vec<InstalledPlugin>> {
        self.plugins.installed_plugins()
    }

    pub fn load_themes(&mut self) -> ExtensionResult<LoadReport> {
        self.themes.load_themes()
    }

    pub fn boot_themes(&mut self) -> ExtensionResult<usize> {
        self.themes.boot_themes()
    }

    pub fn set_active_theme(&mut self, id: &str) -> ExtensionResult<()> {
        self.themes.set_active_theme(id)
    }

    pub fn get_active_theme(&self) -> Option<&LoadedTheme> {
        self.themes.get_active_theme()
    }
}
