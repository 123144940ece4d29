use buni_core::{HookError, HookRegistry};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

fn recorder() -> Arc<Mutex<Vec<&'static str>>> {
    Arc::new(Mutex::new(Vec::new()))
}

#[test]
fn unregistered_hooks_are_no_ops() {
    let hooks = HookRegistry::new();
    hooks.do_action("nothing_here", &[]).expect("no-op action");
    let value = hooks
        .apply_filters("title", json!("Hello"), &[])
        .expect("identity filter");
    assert_eq!(value, json!("Hello"));
}

#[test]
fn lower_priority_runs_first_then_insertion_order() {
    let hooks = HookRegistry::new();
    let calls = recorder();

    for (label, priority) in [("f", 20), ("g", 10), ("h", 10)] {
        let calls = Arc::clone(&calls);
        hooks.add_action_with_priority("admin_menu", priority, move |_args| {
            calls.lock().expect("calls lock").push(label);
            Ok(())
        });
    }

    hooks.do_action("admin_menu", &[]).expect("dispatch");
    assert_eq!(*calls.lock().expect("calls lock"), vec!["g", "h", "f"]);
}

#[test]
fn filters_chain_their_results() {
    let hooks = HookRegistry::new();
    hooks.add_filter("title", |value, _args| {
        Ok(Value::String(format!("{}!", value.as_str().unwrap_or_default())))
    });
    hooks.add_filter_with_priority("title", 5, |value, args| {
        let prefix = args.first().and_then(Value::as_str).unwrap_or_default();
        Ok(Value::String(format!(
            "{prefix}{}",
            value.as_str().unwrap_or_default()
        )))
    });

    let value = hooks
        .apply_filters("title", json!("Hello"), &[json!("> ")])
        .expect("filters");
    assert_eq!(value, json!("> Hello!"));
}

#[test]
fn registration_during_dispatch_waits_for_next_dispatch() {
    let hooks = Arc::new(HookRegistry::new());
    let calls = recorder();

    let registry = Arc::clone(&hooks);
    let outer_calls = Arc::clone(&calls);
    hooks.add_action("cms_init", move |_args| {
        outer_calls.lock().expect("calls lock").push("outer");
        let inner_calls = Arc::clone(&outer_calls);
        registry.add_action("cms_init", move |_args| {
            inner_calls.lock().expect("calls lock").push("inner");
            Ok(())
        });
        Ok(())
    });

    hooks.do_action("cms_init", &[]).expect("first dispatch");
    assert_eq!(*calls.lock().expect("calls lock"), vec!["outer"]);

    hooks.do_action("cms_init", &[]).expect("second dispatch");
    assert_eq!(
        *calls.lock().expect("calls lock"),
        vec!["outer", "outer", "inner"]
    );
}

#[test]
fn failing_callback_stops_dispatch_and_names_hook() {
    let hooks = HookRegistry::new();
    let calls = recorder();

    hooks.add_action_with_priority("cms_enqueue_scripts", 1, |_args| {
        Err("asset missing".into())
    });
    let later = Arc::clone(&calls);
    hooks.add_action_with_priority("cms_enqueue_scripts", 2, move |_args| {
        later.lock().expect("calls lock").push("later");
        Ok(())
    });

    let err = hooks
        .do_action("cms_enqueue_scripts", &[])
        .expect_err("callback error must propagate");
    assert!(matches!(err, HookError::Callback { priority: 1, .. }));
    assert_eq!(err.hook(), "cms_enqueue_scripts");
    assert!(calls.lock().expect("calls lock").is_empty());
}
