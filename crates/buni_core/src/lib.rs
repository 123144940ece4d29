//! Extension runtime for the Buni CMS.
//! Discovers, loads and wires plugins and themes into named hooks.

pub mod activation;
pub mod config;
pub mod db;
pub mod extension;
pub mod hook;
pub mod logging;
pub mod runtime;
pub mod service;

pub use activation::{
    ActivationLedger, ActivationState, ActivationStore, JsonFileActivationStore,
    MemoryActivationStore, SqliteActivationStore, StorageError, StorageResult,
};
pub use config::{ConfigError, RuntimeConfig, StoreBackend};
pub use extension::{
    DirectorySource, ExtensionError, ExtensionKind, ExtensionManifest, ExtensionResult,
    ExtensionSource, ExtensionState, MemorySource, Plugin, PluginFactories, SkipRecord, Theme,
    ThemeFactories,
};
pub use hook::{BoxError, CallbackId, HookError, HookRegistry, DEFAULT_PRIORITY};
pub use logging::{
    default_log_level, init_logging, init_logging_from, logging_status, LogTarget, LoggingError,
};
pub use runtime::{ExtensionRuntime, StartReport};
pub use service::{InstalledPlugin, LoadReport, LoadedPlugin, LoadedTheme, PluginManager, ThemeManager};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
