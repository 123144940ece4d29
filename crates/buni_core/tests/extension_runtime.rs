use buni_core::hook::{HOOK_ADMIN_MENU, HOOK_INIT};
use buni_core::{
    ActivationState, ActivationStore, BoxError, ExtensionError, ExtensionRuntime, HookRegistry,
    JsonFileActivationStore, Plugin, PluginFactories, RuntimeConfig, StorageError, StorageResult,
    Theme, ThemeFactories,
};
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

struct SeoPlugin {
    registered: Arc<AtomicUsize>,
}

impl Plugin for SeoPlugin {
    fn register(&mut self, hooks: &Arc<HookRegistry>) -> Result<(), BoxError> {
        self.registered.fetch_add(1, Ordering::SeqCst);
        hooks.add_filter(HOOK_ADMIN_MENU, |menu, _args| {
            let mut items = menu.as_array().cloned().unwrap_or_default();
            items.push(json!("SEO"));
            Ok(Value::Array(items))
        });
        Ok(())
    }

    fn name(&self) -> &str {
        "Seo"
    }

    fn version(&self) -> &str {
        "1.2.0"
    }

    fn description(&self) -> &str {
        "Meta tags and sitemaps"
    }
}

struct DsccoreTheme;

impl Theme for DsccoreTheme {
    fn register(&mut self, _hooks: &Arc<HookRegistry>) -> Result<(), BoxError> {
        Ok(())
    }

    fn name(&self) -> &str {
        "dsccore"
    }

    fn version(&self) -> &str {
        "3.0.0"
    }

    fn description(&self) -> &str {
        "Default client theme"
    }

    fn layout(&self) -> &str {
        "dsccore::layouts.app"
    }
}

/// Fails every save while `failing` is set.
struct SwitchableStore {
    inner: JsonFileActivationStore,
    failing: AtomicBool,
}

impl ActivationStore for SwitchableStore {
    fn load(&self) -> StorageResult<ActivationState> {
        self.inner.load()
    }

    fn save(&self, state: &ActivationState) -> StorageResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("maintenance".to_string()));
        }
        self.inner.save(state)
    }
}

fn write_file(path: &Path, contents: &str) {
    fs::create_dir_all(path.parent().expect("parent dir")).expect("create dirs");
    fs::write(path, contents).expect("write file");
}

/// Site with one valid plugin, one directory without manifest and one theme.
fn seed_site(site: &Path) {
    write_file(
        &site.join("plugins/seo/plugin.json"),
        r#"{"autoload": {"Seo\\": "src/"}, "version": "1.2.0", "description": "Meta tags"}"#,
    );
    fs::create_dir_all(site.join("plugins/assets")).expect("plugin without manifest");
    write_file(
        &site.join("themes/dsccore/theme.json"),
        r#"{"name": "dsccore", "version": "3.0.0", "author": "DSC"}"#,
    );
}

fn factories(registered: &Arc<AtomicUsize>) -> (PluginFactories, ThemeFactories) {
    let mut plugins = PluginFactories::plugins();
    let registered = Arc::clone(registered);
    plugins
        .register_id("Seo", move |_| {
            Ok(Box::new(SeoPlugin {
                registered: Arc::clone(&registered),
            }))
        })
        .expect("plugin factory");
    let mut themes = ThemeFactories::themes();
    themes
        .register_id("dsccore", |_| Ok(Box::new(DsccoreTheme)))
        .expect("theme factory");
    (plugins, themes)
}

fn runtime_for(site: &Path, registered: &Arc<AtomicUsize>) -> ExtensionRuntime {
    let config = RuntimeConfig::load_from_dir(site).expect("config");
    let (plugins, themes) = factories(registered);
    ExtensionRuntime::from_config(&config, plugins, themes).expect("runtime")
}

#[test]
fn start_loads_valid_plugin_and_skips_directory_without_manifest() {
    let site = tempfile::tempdir().expect("tempdir");
    seed_site(site.path());
    let registered = Arc::new(AtomicUsize::new(0));
    let mut runtime = runtime_for(site.path(), &registered);

    let init_seen = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&init_seen);
    runtime.add_action(HOOK_INIT, move |_args| {
        flag.store(true, Ordering::SeqCst);
        Ok(())
    });

    let report = runtime.start().expect("start");
    assert_eq!(report.plugins.loaded, vec!["Seo"]);
    assert_eq!(report.plugins.skipped.len(), 1);
    assert_eq!(report.plugins.skipped[0].candidate, "assets");
    assert!(matches!(
        report.plugins.skipped[0].error,
        ExtensionError::ManifestInvalid { .. }
    ));
    assert_eq!(registered.load(Ordering::SeqCst), 1);
    assert!(init_seen.load(Ordering::SeqCst));

    let menu = runtime
        .apply_filters(HOOK_ADMIN_MENU, json!([]), &[])
        .expect("menu");
    assert_eq!(menu, json!(["SEO"]));
}

#[test]
fn activation_survives_restart() {
    let site = tempfile::tempdir().expect("tempdir");
    seed_site(site.path());
    let registered = Arc::new(AtomicUsize::new(0));

    {
        let mut runtime = runtime_for(site.path(), &registered);
        runtime.start().expect("start");
        runtime.enable_plugin("Seo").expect("enable");
        runtime.set_active_theme("dsccore").expect("theme");
    }

    let mut restarted = runtime_for(site.path(), &registered);
    restarted.start().expect("restart");
    assert!(restarted.is_plugin_active("Seo").expect("is_active"));
    let theme = restarted.get_active_theme().expect("active theme");
    assert_eq!(theme.instance().layout(), "dsccore::layouts.app");

    let rows = restarted.installed_plugins().expect("listing");
    assert_eq!(rows.len(), 1);
    assert!(rows[0].active);
    assert_eq!(rows[0].name, "Seo");
}

#[test]
fn sqlite_backend_persists_activation() {
    let site = tempfile::tempdir().expect("tempdir");
    seed_site(site.path());
    write_file(
        &site.path().join("buni.json"),
        r#"{"activation": {"backend": "sqlite", "path": "buni.sqlite3"}}"#,
    );
    let registered = Arc::new(AtomicUsize::new(0));

    {
        let mut runtime = runtime_for(site.path(), &registered);
        runtime.start().expect("start");
        runtime.enable_plugin("Seo").expect("enable");
    }

    assert!(site.path().join("buni.sqlite3").exists());
    let mut restarted = runtime_for(site.path(), &registered);
    restarted.start().expect("restart");
    assert!(restarted.is_plugin_active("Seo").expect("is_active"));
}

#[test]
fn unknown_ids_leave_store_untouched() {
    let site = tempfile::tempdir().expect("tempdir");
    seed_site(site.path());
    let registered = Arc::new(AtomicUsize::new(0));
    let mut runtime = runtime_for(site.path(), &registered);
    runtime.start().expect("start");

    assert!(matches!(
        runtime.enable_plugin("unknown"),
        Err(ExtensionError::ExtensionNotFound(_))
    ));
    assert!(matches!(
        runtime.set_active_theme("unknown"),
        Err(ExtensionError::ExtensionNotFound(_))
    ));
    assert!(runtime.get_active_theme().is_none());
    assert!(!site.path().join("active_extensions.json").exists());
}

#[test]
fn storage_failure_during_enable_changes_nothing() {
    let site = tempfile::tempdir().expect("tempdir");
    seed_site(site.path());
    let store = Arc::new(SwitchableStore {
        inner: JsonFileActivationStore::new(site.path().join("active_extensions.json")),
        failing: AtomicBool::new(true),
    });
    let registered = Arc::new(AtomicUsize::new(0));
    let (plugins, themes) = factories(&registered);
    let config = RuntimeConfig::load_from_dir(site.path()).expect("config");
    let mut runtime = ExtensionRuntime::new(
        Arc::new(buni_core::DirectorySource::new(&config.plugins_path)),
        Arc::new(buni_core::DirectorySource::new(&config.themes_path)),
        store.clone(),
        plugins,
        themes,
    );
    runtime.start().expect("start");

    let err = runtime
        .enable_plugin("Seo")
        .expect_err("save failure must surface");
    assert!(matches!(err, ExtensionError::Storage(_)));
    assert_eq!(store.load().expect("load"), ActivationState::default());
    assert!(!runtime.is_plugin_active("Seo").expect("is_active"));

    store.failing.store(false, Ordering::SeqCst);
    runtime.enable_plugin("Seo").expect("enable after recovery");
    assert!(runtime.is_plugin_active("Seo").expect("is_active"));
}

#[test]
fn uninstall_removes_plugin_directory() {
    let site = tempfile::tempdir().expect("tempdir");
    seed_site(site.path());
    let registered = Arc::new(AtomicUsize::new(0));
    let mut runtime = runtime_for(site.path(), &registered);
    runtime.start().expect("start");
    runtime.enable_plugin("Seo").expect("enable");

    runtime.uninstall_plugin("Seo").expect("uninstall");

    assert!(!site.path().join("plugins/seo").exists());
    assert!(site.path().join("plugins/assets").exists());
    assert!(!runtime.is_plugin_active("Seo").expect("is_active"));
    assert!(runtime.plugin_manager().get("Seo").is_none());
}
