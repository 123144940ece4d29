//! Named extension points fired by the host.
//!
//! # Responsibility
//! - Hold ordered action and filter callbacks keyed by hook name.
//! - Dispatch callbacks deterministically on behalf of the host.
//!
//! # Invariants
//! - Dispatch order is ascending priority, then insertion order.
//! - A hook with no registrations is a valid no-op target.
//! - Mutations made during a dispatch apply from the next dispatch on.

mod registry;

pub use registry::{
    ActionCallback, BoxError, CallbackId, FilterCallback, HookError, HookRegistry,
    DEFAULT_PRIORITY,
};

/// Fired once after all plugins and themes are loaded and booted.
pub const HOOK_INIT: &str = "cms_init";
/// Fired while the admin navigation is rendered.
pub const HOOK_ADMIN_MENU: &str = "admin_menu";
/// Fired before page output so extensions can enqueue assets.
pub const HOOK_ENQUEUE_SCRIPTS: &str = "cms_enqueue_scripts";
