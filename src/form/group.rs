use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock, Weak};

use serde_json::Value;

use crate::store::path;

type Subscriber = Arc<dyn Fn(&Value) + Send + Sync>;
type SubscriberList = Vec<(usize, Subscriber)>;

/// A reactive form: a current value plus an observable change stream.
///
/// Writes come in two flavors: `set_value` replaces the whole value and
/// `patch_value` shallow-merges object keys onto it. Both emit the full
/// post-write value on the change stream; the `_silent` variants perform
/// the same write without emitting, which is how a bridge seeds or resets
/// the form without hearing its own write echo back.
///
/// Cloning a `FormGroup` produces another handle to the same form.
pub struct FormGroup {
    value: Arc<RwLock<Value>>,
    subscribers: Arc<RwLock<SubscriberList>>,
    next_subscriber: Arc<AtomicUsize>,
}

impl FormGroup {
    /// Create a form holding the given initial value.
    pub fn new(initial: Value) -> Self {
        Self {
            value: Arc::new(RwLock::new(initial)),
            subscribers: Arc::new(RwLock::new(Vec::new())),
            next_subscriber: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// The form's current value.
    pub fn value(&self) -> Value {
        self.value.read().unwrap().clone()
    }

    /// Replace the whole value and emit a change.
    pub fn set_value(&self, value: Value) {
        self.set_value_silent(value);
        self.emit();
    }

    /// Replace the whole value without emitting.
    pub fn set_value_silent(&self, value: Value) {
        *self.value.write().unwrap() = value;
    }

    /// Shallow-merge `patch`'s keys onto the current value and emit the
    /// full merged value.
    ///
    /// Non-object current values are replaced outright.
    pub fn patch_value(&self, patch: Value) {
        self.patch_value_silent(patch);
        self.emit();
    }

    /// Shallow-merge without emitting.
    pub fn patch_value_silent(&self, patch: Value) {
        let mut value = self.value.write().unwrap();
        path::shallow_merge(&mut value, &patch);
    }

    /// Subscribe to the change stream.
    ///
    /// Each emission carries the post-write value. Dropping the returned
    /// guard unsubscribes.
    pub fn subscribe<F>(&self, callback: F) -> FormSubscription
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let id = self.next_subscriber.fetch_add(1, Ordering::SeqCst);
        self.subscribers
            .write()
            .unwrap()
            .push((id, Arc::new(callback)));

        FormSubscription {
            id,
            subscribers: Arc::downgrade(&self.subscribers),
        }
    }

    /// Number of live subscribers (diagnostics).
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().unwrap().len()
    }

    /// Notify subscribers of the current value.
    ///
    /// Callbacks run outside the value and subscriber locks, in
    /// registration order.
    fn emit(&self) {
        let callbacks: Vec<Subscriber> = {
            let subscribers = self.subscribers.read().unwrap();
            subscribers.iter().map(|(_, cb)| Arc::clone(cb)).collect()
        };
        let value = self.value();
        for callback in &callbacks {
            callback(&value);
        }
    }
}

impl Clone for FormGroup {
    fn clone(&self) -> Self {
        Self {
            value: Arc::clone(&self.value),
            subscribers: Arc::clone(&self.subscribers),
            next_subscriber: Arc::clone(&self.next_subscriber),
        }
    }
}

impl std::fmt::Debug for FormGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormGroup")
            .field("value", &*self.value.read().unwrap())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// RAII guard for a form subscriber. Dropping it unsubscribes.
pub struct FormSubscription {
    id: usize,
    subscribers: Weak<RwLock<SubscriberList>>,
}

impl Drop for FormSubscription {
    fn drop(&mut self) {
        if let Some(subscribers) = self.subscribers.upgrade() {
            if let Ok(mut subscribers) = subscribers.write() {
                subscribers.retain(|(id, _)| *id != self.id);
            }
        }
    }
}
