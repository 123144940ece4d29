//! Capability sets extensions must implement.
//!
//! Conformance is checked by the compiler: a type is a plugin or theme only if
//! it implements the matching trait and is registered with a factory.

use crate::hook::{BoxError, HookRegistry};
use std::sync::Arc;

/// Capability set for plugin extensions.
///
/// `register` runs right after construction and is where hooks are added.
/// `boot` runs once every plugin has registered, so it may rely on hooks added
/// by other plugins.
pub trait Plugin: Send {
    fn register(&mut self, hooks: &Arc<HookRegistry>) -> Result<(), BoxError>;

    fn boot(&mut self, _hooks: &Arc<HookRegistry>) -> Result<(), BoxError> {
        Ok(())
    }

    /// Called when the host activates the plugin.
    fn enable(&mut self) -> Result<(), BoxError> {
        Ok(())
    }

    /// Called when the host deactivates the plugin.
    fn disable(&mut self) -> Result<(), BoxError> {
        Ok(())
    }

    fn name(&self) -> &str;

    fn version(&self) -> &str;

    fn description(&self) -> &str;
}

/// Capability set for theme extensions.
pub trait Theme: Send {
    fn register(&mut self, hooks: &Arc<HookRegistry>) -> Result<(), BoxError>;

    fn boot(&mut self, _hooks: &Arc<HookRegistry>) -> Result<(), BoxError> {
        Ok(())
    }

    fn name(&self) -> &str;

    fn version(&self) -> &str;

    fn description(&self) -> &str;

    /// Layout template the host renders pages with.
    fn layout(&self) -> &str;
}

/// Lifecycle position of a loaded extension.
///
/// Orthogonal to activation, which lives in the activation store. A discovered
/// manifest has no state until its instance is constructed and registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ExtensionState {
    Registered,
    Booted,
}

impl ExtensionState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Registered => "registered",
            Self::Booted => "booted",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ExtensionState;

    #[test]
    fn states_start_at_registered_and_order_by_progress() {
        assert!(ExtensionState::Registered < ExtensionState::Booted);
        assert_eq!(ExtensionState::Registered.as_str(), "registered");
        assert_eq!(ExtensionState::Booted.as_str(), "booted");
    }
}
