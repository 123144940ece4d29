//! Theme lifecycle orchestration and active theme selection.
//!
//! # Responsibility
//! - Load, register and boot themes from one source.
//! - Select the active theme and persist the selection.
//!
//! # Invariants
//! - The active pointer refers to a loaded theme or is empty.
//! - The selection is persisted before the in-memory pointer moves.
//! - No theme is selected implicitly.

use crate::activation::ActivationLedger;
use crate::extension::capability::Theme;
use crate::extension::error::{ExtensionError, ExtensionResult};
use crate::extension::factory::ThemeFactories;
use crate::extension::manifest::ExtensionKind;
use crate::extension::source::ExtensionSource;
use crate::hook::HookRegistry;
use crate::service::lifecycle::{boot_extensions, load_extensions, LoadReport, LoadedExtension};
use log::{info, warn};
use std::sync::Arc;

/// A loaded theme instance with its manifest.
pub type LoadedTheme = LoadedExtension<dyn Theme>;

/// Owns loaded themes and the active theme pointer.
pub struct ThemeManager {
    hooks: Arc<HookRegistry>,
    source: Arc<dyn ExtensionSource>,
    factories: ThemeFactories,
    activation: Arc<ActivationLedger>,
    themes: Vec<LoadedTheme>,
    active: Option<String>,
}

impl ThemeManager {
    pub fn new(
        hooks: Arc<HookRegistry>,
        source: Arc<dyn ExtensionSource>,
        factories: ThemeFactories,
        activation: Arc<ActivationLedger>,
    ) -> Self {
        Self {
            hooks,
            source,
            factories,
            activation,
            themes: Vec::new(),
            active: None,
        }
    }

    /// Discovers, constructs and registers themes, then restores the
    /// persisted selection.
    ///
    /// A persisted id that did not load leaves no theme active.
    ///
    /// # Errors
    /// - [`ExtensionError::Storage`] when the persisted state cannot be read;
    ///   nothing is loaded in that case.
    /// - [`ExtensionError::Source`] when the theme root cannot be listed.
    pub fn load_themes(&mut self) -> ExtensionResult<LoadReport> {
        let persisted = self.activation.load()?;
        let report = load_extensions(
            ExtensionKind::Theme,
            self.source.as_ref(),
            &self.factories,
            &self.hooks,
            &mut self.themes,
        )?;

        self.active = match persisted.active_theme {
            Some(id) if self.themes.iter().any(|theme| theme.id() == id) => Some(id),
            Some(id) => {
                warn!(
                    "event=theme_restore module=theme status=skip id={} reason=not_loaded",
                    id
                );
                None
            }
            None => None,
        };

        info!(
            "event=themes_load module=theme status=ok loaded={} skipped={} active={}",
            report.loaded.len(),
            report.skipped.len(),
            self.active.as_deref().unwrap_or("none")
        );
        Ok(report)
    }

    /// Runs `boot()` on every registered theme that has not booted yet.
    pub fn boot_themes(&mut self) -> ExtensionResult<usize> {
        boot_extensions(ExtensionKind::Theme, &self.hooks, &mut self.themes)
    }

    /// Makes `id` the active theme.
    ///
    /// # Errors
    /// - [`ExtensionError::ExtensionNotFound`] when `id` is not loaded.
    /// - [`ExtensionError::Storage`] when the selection cannot be saved; the
    ///   previous theme stays active.
    pub fn set_active_theme(&mut self, id: &str) -> ExtensionResult<()> {
        let id = id.trim();
        if !self.themes.iter().any(|theme| theme.id() == id) {
            return Err(ExtensionError::ExtensionNotFound(id.to_string()));
        }

        self.activation.update(|state| {
            state.active_theme = Some(id.to_string());
        })?;
        self.active = Some(id.to_string());
        info!("event=theme_activate module=theme status=ok id={}", id);
        Ok(())
    }

    /// Clears the selection so no theme is active.
    pub fn clear_active_theme(&mut self) -> ExtensionResult<()> {
        self.activation.update(|state| state.active_theme = None)?;
        self.active = None;
        info!("event=theme_clear module=theme status=ok");
        Ok(())
    }

    pub fn get_active_theme(&self) -> Option<&LoadedTheme> {
        let id = self.active.as_deref()?;
        self.get(id)
    }

    pub fn active_theme_id(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn get(&self, id: &str) -> Option<&LoadedTheme> {
        self.themes.iter().find(|theme| theme.id() == id.trim())
    }

    /// Loaded themes in load order.
    pub fn themes(&self) -> &[LoadedTheme] {
        &self.themes
    }

    pub fn theme_ids(&self) -> Vec<&str> {
        self.themes.iter().map(LoadedTheme::id).collect()
    }
}
