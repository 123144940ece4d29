//! Extensions compiled into the `buni` binary.

use buni_core::hook::{HOOK_ADMIN_MENU, HOOK_ENQUEUE_SCRIPTS};
use buni_core::{BoxError, HookRegistry, Plugin, PluginFactories, Theme, ThemeFactories};
use log::info;
use serde_json::{json, Value};
use std::sync::Arc;

pub const HELLO_MENU_ID: &str = "HelloMenu";
pub const STARTER_THEME_ID: &str = "starter";

/// Adds a "Hello" entry to the admin navigation.
#[derive(Debug, Default)]
pub struct HelloMenu;

impl Plugin for HelloMenu {
    fn register(&mut self, hooks: &Arc<HookRegistry>) -> Result<(), BoxError> {
        hooks.add_filter(HOOK_ADMIN_MENU, |menu, _args| {
            let mut items = match menu {
                Value::Array(items) => items,
                Value::Null => Vec::new(),
                other => vec![other],
            };
            items.push(json!({ "title": "Hello", "route": "/admin/hello" }));
            Ok(Value::Array(items))
        });
        Ok(())
    }

    fn boot(&mut self, hooks: &Arc<HookRegistry>) -> Result<(), BoxError> {
        hooks.add_action(HOOK_ENQUEUE_SCRIPTS, |_args| {
            info!("event=enqueue module=hello_menu status=ok asset=hello.js");
            Ok(())
        });
        Ok(())
    }

    fn enable(&mut self) -> Result<(), BoxError> {
        info!("event=plugin_hook module=hello_menu status=ok stage=enable");
        Ok(())
    }

    fn disable(&mut self) -> Result<(), BoxError> {
        info!("event=plugin_hook module=hello_menu status=ok stage=disable");
        Ok(())
    }

    fn name(&self) -> &str {
        HELLO_MENU_ID
    }

    fn version(&self) -> &str {
        "1.0.0"
    }

    fn description(&self) -> &str {
        "Adds a Hello entry to the admin menu."
    }
}

/// Minimal client theme.
#[derive(Debug, Default)]
pub struct StarterTheme;

impl Theme for StarterTheme {
    fn register(&mut self, _hooks: &Arc<HookRegistry>) -> Result<(), BoxError> {
        Ok(())
    }

    fn name(&self) -> &str {
        STARTER_THEME_ID
    }

    fn version(&self) -> &str {
        "1.0.0"
    }

    fn description(&self) -> &str {
        "Plain starter layout."
    }

    fn layout(&self) -> &str {
        "layouts.app"
    }
}

pub fn plugin_factories() -> Result<PluginFactories, BoxError> {
    let mut factories = PluginFactories::plugins();
    factories.register_id(HELLO_MENU_ID, |_| Ok(Box::new(HelloMenu)))?;
    Ok(factories)
}

pub fn theme_factories() -> Result<ThemeFactories, BoxError> {
    let mut factories = ThemeFactories::themes();
    factories.register_id(STARTER_THEME_ID, |_| Ok(Box::new(StarterTheme)))?;
    Ok(factories)
}
