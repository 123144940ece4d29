//! Extension managers.
//!
//! # Responsibility
//! - Drive the load, register, boot and activation lifecycle for plugins
//!   and themes.
//! - Keep hosts decoupled from discovery and storage details.

mod lifecycle;
pub mod plugin_manager;
pub mod theme_manager;

pub use lifecycle::{LoadReport, LoadedExtension};
pub use plugin_manager::{InstalledPlugin, LoadedPlugin, PluginManager};
pub use theme_manager::{LoadedTheme, ThemeManager};
