use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock, Weak};

use serde_json::Value;
use tracing::{debug, trace, warn};

use super::path;

type Subscriber = Arc<dyn Fn(&Value) + Send + Sync>;
type SubscriberList = Vec<(usize, Subscriber)>;

/// A thread-safe, named store for a key-value state object.
///
/// The state is a `serde_json::Value` object whose top-level keys are
/// *slices*. Slices are read and written by dotted path, and every write
/// notifies subscribers with the new state.
///
/// Cloning a `Store` produces another handle to the same state.
pub struct Store {
    name: Arc<str>,
    state: Arc<RwLock<Value>>,
    subscribers: Arc<RwLock<SubscriberList>>,
    next_subscriber: Arc<AtomicUsize>,
}

impl Store {
    /// Create a new store with the given name and initial state object.
    pub fn new(name: impl Into<String>, initial: Value) -> Self {
        Self {
            name: Arc::from(name.into()),
            state: Arc::new(RwLock::new(initial)),
            subscribers: Arc::new(RwLock::new(Vec::new())),
            next_subscriber: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// The store's name, used in diagnostics and log fields.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get a clone of the current state.
    pub fn snapshot(&self) -> Value {
        self.state.read().unwrap().clone()
    }

    /// Read state without cloning.
    pub fn read<R>(&self, f: impl FnOnce(&Value) -> R) -> R {
        let state = self.state.read().unwrap();
        f(&state)
    }

    /// Replace the whole state.
    pub fn set(&self, new_state: Value) {
        trace!(store = %self.name, "state replaced");
        *self.state.write().unwrap() = new_state;
        self.notify();
    }

    /// Update the state in place using a function.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut Value),
    {
        {
            let mut state = self.state.write().unwrap();
            f(&mut state);
        }
        trace!(store = %self.name, "state updated");
        self.notify();
    }

    /// Replace the slice at a dotted `path` with `value`.
    ///
    /// Missing intermediate objects are created; sibling slices are left
    /// untouched.
    pub fn patch_slice(&self, path: &str, value: Value) {
        if path.is_empty() {
            warn!(store = %self.name, "ignoring slice patch with empty path");
            return;
        }
        debug!(store = %self.name, %path, "slice patched");
        {
            let mut state = self.state.write().unwrap();
            path::set_at(&mut state, path, value);
        }
        self.notify();
    }

    /// Shallow-merge an object `patch` into the root state.
    ///
    /// Each top-level key of `patch` replaces the same key in the root;
    /// other keys survive. Non-object patches are ignored.
    pub fn patch_root(&self, patch: Value) {
        if !patch.is_object() {
            warn!(store = %self.name, "ignoring non-object root patch");
            return;
        }
        debug!(store = %self.name, "root patched");
        {
            let mut state = self.state.write().unwrap();
            path::shallow_merge(&mut state, &patch);
        }
        self.notify();
    }

    /// Subscribe to state changes.
    ///
    /// The callback runs after every write with the new state. Dropping the
    /// returned guard unsubscribes it.
    pub fn subscribe<F>(&self, callback: F) -> StoreSubscription
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let id = self.next_subscriber.fetch_add(1, Ordering::SeqCst);
        self.subscribers
            .write()
            .unwrap()
            .push((id, Arc::new(callback)));

        StoreSubscription {
            id,
            subscribers: Arc::downgrade(&self.subscribers),
        }
    }

    /// Notify all subscribers of a state change.
    ///
    /// Callbacks run outside the state and subscriber locks, in
    /// registration order, so a subscriber may write back into the store.
    fn notify(&self) {
        let callbacks: Vec<Subscriber> = {
            let subscribers = self.subscribers.read().unwrap();
            subscribers.iter().map(|(_, cb)| Arc::clone(cb)).collect()
        };
        let state = self.snapshot();
        for callback in &callbacks {
            callback(&state);
        }
    }
}

impl Clone for Store {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            state: Arc::clone(&self.state),
            subscribers: Arc::clone(&self.subscribers),
            next_subscriber: Arc::clone(&self.next_subscriber),
        }
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("name", &self.name)
            .field("state", &*self.state.read().unwrap())
            .finish_non_exhaustive()
    }
}

/// RAII guard for a store subscriber. Dropping it unsubscribes.
pub struct StoreSubscription {
    id: usize,
    subscribers: Weak<RwLock<SubscriberList>>,
}

impl Drop for StoreSubscription {
    fn drop(&mut self) {
        if let Some(subscribers) = self.subscribers.upgrade() {
            if let Ok(mut subscribers) = subscribers.write() {
                subscribers.retain(|(id, _)| *id != self.id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn snapshot_and_set() {
        let store = Store::new("app", json!({ "count": 0 }));

        assert_eq!(store.snapshot(), json!({ "count": 0 }));

        store.set(json!({ "count": 42 }));
        assert_eq!(store.snapshot(), json!({ "count": 42 }));
    }

    #[test]
    fn patch_slice_leaves_siblings_untouched() {
        let store = Store::new("app", json!({ "a": 1, "b": 2 }));

        store.patch_slice("a", json!({ "nested": true }));

        assert_eq!(store.snapshot(), json!({ "a": { "nested": true }, "b": 2 }));
    }

    #[test]
    fn patch_slice_reaches_nested_paths() {
        let store = Store::new("app", json!({ "profile": { "flags": { "beta": false } } }));

        store.patch_slice("profile.flags", json!({ "beta": true }));

        assert_eq!(
            store.snapshot(),
            json!({ "profile": { "flags": { "beta": true } } })
        );
    }

    #[test]
    fn patch_root_merges_top_level_keys() {
        let store = Store::new("app", json!({ "a": 1, "b": 2 }));

        store.patch_root(json!({ "b": 3, "c": 4 }));

        assert_eq!(store.snapshot(), json!({ "a": 1, "b": 3, "c": 4 }));
    }

    #[test]
    fn non_object_root_patch_is_ignored() {
        let store = Store::new("app", json!({ "a": 1 }));

        store.patch_root(json!(5));

        assert_eq!(store.snapshot(), json!({ "a": 1 }));
    }

    #[test]
    fn subscribers_run_per_write_until_guard_drops() {
        let store = Store::new("app", json!({}));
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();

        let guard = store.subscribe(move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(calls.load(Ordering::SeqCst), 0);

        store.patch_slice("a", json!(1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        store.patch_slice("a", json!(2));
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        drop(guard);
        store.patch_slice("a", json!(3));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn subscriber_may_write_back() {
        let store = Store::new("app", json!({ "echo": 0, "value": 0 }));
        let writer = store.clone();

        let _guard = store.subscribe(move |state| {
            // Mirror `value` into `echo` once; guard against ping-pong.
            let value = state.get("value").cloned().unwrap_or(Value::Null);
            if state.get("echo") != Some(&value) {
                writer.update(|s| path::set_at(s, "echo", value.clone()));
            }
        });

        store.patch_slice("value", json!(9));

        assert_eq!(store.snapshot(), json!({ "echo": 9, "value": 9 }));
    }
}
