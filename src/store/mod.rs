//! The state-store collaborator: a named key-value state object.
//!
//! A [`Store`] holds one JSON object; its top-level keys are *slices*,
//! addressed by dotted paths (`"config"`, `"profile.flags"`). A [`Query`]
//! is the read side handed to bridges. The store is deliberately small:
//! snapshot reads, slice/root patches, and change notification, nothing
//! more.

pub mod path;

mod query;
mod store;

pub use query::Query;
pub use store::{Store, StoreSubscription};
