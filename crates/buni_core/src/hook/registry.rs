//! Priority-ordered action/filter registry.

use log::{debug, warn};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// Priority used when the caller does not pick one.
pub const DEFAULT_PRIORITY: i32 = 10;

/// Error type returned by extension callbacks.
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// Side-effecting callback receiving the dispatch arguments.
pub type ActionCallback = Arc<dyn Fn(&[Value]) -> Result<(), BoxError> + Send + Sync>;

/// Value-transforming callback receiving the current value and extra arguments.
pub type FilterCallback = Arc<dyn Fn(Value, &[Value]) -> Result<Value, BoxError> + Send + Sync>;

/// Handle identifying one registration, used for removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CallbackId(u64);

impl CallbackId {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl Display for CallbackId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "cb#{}", self.0)
    }
}

/// Hook dispatch errors.
#[derive(Debug)]
pub enum HookError {
    /// A registered callback failed; remaining callbacks did not run.
    Callback {
        hook: String,
        priority: i32,
        source: BoxError,
    },
}

impl HookError {
    pub fn hook(&self) -> &str {
        match self {
            Self::Callback { hook, .. } => hook,
        }
    }
}

impl Display for HookError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Callback {
                hook,
                priority,
                source,
            } => write!(
                f,
                "callback for hook `{hook}` at priority {priority} failed: {source}"
            ),
        }
    }
}

impl Error for HookError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Callback { source, .. } => Some(source.as_ref()),
        }
    }
}

struct Registration<C> {
    id: CallbackId,
    callback: C,
}

/// Priority buckets per hook name.
struct HookTable<C> {
    hooks: HashMap<String, BTreeMap<i32, Vec<Registration<C>>>>,
}

impl<C: Clone> HookTable<C> {
    fn new() -> Self {
        Self {
            hooks: HashMap::new(),
        }
    }

    fn insert(&mut self, name: String, priority: i32, id: CallbackId, callback: C) {
        self.hooks
            .entry(name)
            .or_default()
            .entry(priority)
            .or_default()
            .push(Registration { id, callback });
    }

    fn remove(&mut self, name: &str, id: CallbackId) -> bool {
        let Some(buckets) = self.hooks.get_mut(name) else {
            return false;
        };

        let mut removed = false;
        buckets.retain(|_, bucket| {
            let before = bucket.len();
            bucket.retain(|registration| registration.id != id);
            removed |= bucket.len() != before;
            !bucket.is_empty()
        });
        if buckets.is_empty() {
            self.hooks.remove(name);
        }
        removed
    }

    fn contains(&self, name: &str) -> bool {
        self.hooks.contains_key(name)
    }

    fn len(&self, name: &str) -> usize {
        self.hooks
            .get(name)
            .map_or(0, |buckets| buckets.values().map(Vec::len).sum())
    }

    /// Copies the dispatch list so the lock is not held while callbacks run.
    fn snapshot(&self, name: &str) -> Vec<(i32, C)> {
        let Some(buckets) = self.hooks.get(name) else {
            return Vec::new();
        };
        buckets
            .iter()
            .flat_map(|(priority, bucket)| {
                bucket
                    .iter()
                    .map(move |registration| (*priority, registration.callback.clone()))
            })
            .collect()
    }
}

/// Shared, thread-safe action/filter registry.
///
/// Built once at startup and handed to managers and the host as
/// `Arc<HookRegistry>`. Registration takes the write lock; dispatch takes the
/// read lock only long enough to copy the callback list, so callbacks may
/// re-enter the registry freely.
pub struct HookRegistry {
    actions: RwLock<HookTable<ActionCallback>>,
    filters: RwLock<HookTable<FilterCallback>>,
    fired: Mutex<HashMap<String, u64>>,
    next_id: AtomicU64,
}

impl Default for HookRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HookRegistry {
    pub fn new() -> Self {
        Self {
            actions: RwLock::new(HookTable::new()),
            filters: RwLock::new(HookTable::new()),
            fired: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Registers an action at [`DEFAULT_PRIORITY`].
    pub fn add_action<F>(&self, name: impl Into<String>, callback: F) -> CallbackId
    where
        F: Fn(&[Value]) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.add_action_with_priority(name, DEFAULT_PRIORITY, callback)
    }

    /// Registers an action at `priority`; lower numbers run first.
    ///
    /// Registering the same callback twice makes it fire twice.
    pub fn add_action_with_priority<F>(
        &self,
        name: impl Into<String>,
        priority: i32,
        callback: F,
    ) -> CallbackId
    where
        F: Fn(&[Value]) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        let name: String = name.into();
        let id = self.allocate_id();
        debug!(
            "event=hook_register module=hook status=ok shape=action hook={} priority={} id={}",
            name, priority, id
        );
        self.actions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, priority, id, Arc::new(callback));
        id
    }

    /// Registers a filter at [`DEFAULT_PRIORITY`].
    pub fn add_filter<F>(&self, name: impl Into<String>, callback: F) -> CallbackId
    where
        F: Fn(Value, &[Value]) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        self.add_filter_with_priority(name, DEFAULT_PRIORITY, callback)
    }

    /// Registers a filter at `priority`; lower numbers run first.
    pub fn add_filter_with_priority<F>(
        &self,
        name: impl Into<String>,
        priority: i32,
        callback: F,
    ) -> CallbackId
    where
        F: Fn(Value, &[Value]) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        let name: String = name.into();
        let id = self.allocate_id();
        debug!(
            "event=hook_register module=hook status=ok shape=filter hook={} priority={} id={}",
            name, priority, id
        );
        self.filters
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, priority, id, Arc::new(callback));
        id
    }

    /// Removes one action registration. Returns `false` when it was not found.
    pub fn remove_action(&self, name: &str, id: CallbackId) -> bool {
        self.actions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name, id)
    }

    /// Removes one filter registration. Returns `false` when it was not found.
    pub fn remove_filter(&self, name: &str, id: CallbackId) -> bool {
        self.filters
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name, id)
    }

    pub fn has_action(&self, name: &str) -> bool {
        self.actions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(name)
    }

    pub fn has_filter(&self, name: &str) -> bool {
        self.filters
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(name)
    }

    /// Number of action registrations under `name`.
    pub fn action_len(&self, name: &str) -> usize {
        self.actions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len(name)
    }

    /// Number of filter registrations under `name`.
    pub fn filter_len(&self, name: &str) -> usize {
        self.filters
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len(name)
    }

    /// How many times `do_action(name, ..)` found at least one registered
    /// action. Dispatches to unregistered names are not counted.
    pub fn action_count(&self, name: &str) -> u64 {
        self.fired
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .copied()
            .unwrap_or(0)
    }

    /// Runs every action registered under `name` with `args`.
    ///
    /// # Errors
    /// - Returns [`HookError::Callback`] for the first failing callback; later
    ///   callbacks of this dispatch are not invoked.
    pub fn do_action(&self, name: &str, args: &[Value]) -> Result<(), HookError> {
        let callbacks = self
            .actions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot(name);
        if callbacks.is_empty() {
            return Ok(());
        }

        // Keys stay bounded by the set of names that ever had an action.
        *self
            .fired
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(name.to_string())
            .or_insert(0) += 1;

        for (priority, callback) in callbacks {
            if let Err(source) = callback(args) {
                warn!(
                    "event=hook_dispatch module=hook status=error shape=action hook={} priority={} error={}",
                    name, priority, source
                );
                return Err(HookError::Callback {
                    hook: name.to_string(),
                    priority,
                    source,
                });
            }
        }
        Ok(())
    }

    /// Threads `value` through every filter registered under `name`.
    ///
    /// Each filter receives the previous filter's output. With no filters the
    /// input is returned unchanged.
    ///
    /// # Errors
    /// - Returns [`HookError::Callback`] for the first failing callback.
    pub fn apply_filters(
        &self,
        name: &str,
        value: Value,
        extra_args: &[Value],
    ) -> Result<Value, HookError> {
        let callbacks = self
            .filters
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot(name);

        let mut current = value;
        for (priority, callback) in callbacks {
            current = callback(current, extra_args).map_err(|source| {
                warn!(
                    "event=hook_dispatch module=hook status=error shape=filter hook={} priority={} error={}",
                    name, priority, source
                );
                HookError::Callback {
                    hook: name.to_string(),
                    priority,
                    source,
                }
            })?;
        }
        Ok(current)
    }

    fn allocate_id(&self) -> CallbackId {
        CallbackId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }
}
