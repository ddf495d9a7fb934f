use serde::de::DeserializeOwned;
use serde_json::Value;

use super::path;
use super::store::Store;

/// Read-side handle over a [`Store`].
///
/// A `Query` is what a bridge is constructed with: it exposes the store's
/// snapshot and slice reads, and hands the store back out for writes.
#[derive(Clone, Debug)]
pub struct Query {
    store: Store,
}

impl Query {
    /// Create a query over the given store.
    pub fn new(store: &Store) -> Self {
        Self {
            store: store.clone(),
        }
    }

    /// A clone of the full state object.
    pub fn snapshot(&self) -> Value {
        self.store.snapshot()
    }

    /// The slice at a dotted `path`, if present.
    pub fn slice(&self, path: &str) -> Option<Value> {
        self.store.read(|state| path::get_at(state, path).cloned())
    }

    /// The slice at `path`, deserialized into `T`.
    ///
    /// `None` when the path is missing or the value does not fit `T`.
    pub fn slice_as<T: DeserializeOwned>(&self, path: &str) -> Option<T> {
        let value = self.slice(path)?;
        serde_json::from_value(value).ok()
    }

    /// The underlying store.
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// The store's name.
    pub fn name(&self) -> &str {
        self.store.name()
    }
}
