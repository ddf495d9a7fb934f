//! # Formbridge
//!
//! Debounced two-way synchronization between reactive forms and a keyed
//! state store.
//!
//! Formbridge provides two levels of abstraction:
//!
//! ## Collaborators (store and form)
//!
//! The pieces a bridge synchronizes:
//! - `Store` - A named key-value state object with slice-addressed patches
//!   and change notification
//! - `Query` - The read side of a store: snapshots and slice reads
//! - `FormGroup` - A reactive form: a current value plus a change stream
//!
//! ## Bridge (the synchronization layer)
//!
//! - `FormBridge` - Subscribes to a form's change stream, debounces
//!   emissions, and patches a store slice with each settled value; resets
//!   push the default (or a supplied value) back into both sides
//! - `FormDefault` - Factory, key-based, or root-mode default sources
//! - `Scheduler` / `Debouncer` - Virtual-time deferred actions; hosts pump
//!   the scheduler, tests drive it deterministically
//!
//! ```
//! use std::time::Duration;
//! use serde_json::json;
//! use formbridge::{FormBridge, FormDefault, FormGroup, Query, Scheduler, Store};
//!
//! Scheduler::scope(|| {
//!     let store = Store::new("session", json!({}));
//!     let form = FormGroup::new(json!(null));
//!
//!     let bridge = FormBridge::new(
//!         Query::new(&store),
//!         FormDefault::factory(|| json!({ "title": "", "draft": false })),
//!     )
//!     .attach(&form)
//!     .unwrap();
//!
//!     form.patch_value(json!({ "title": "hello" }));
//!     Scheduler::current().advance(Duration::from_millis(100));
//!
//!     assert_eq!(
//!         store.snapshot()["bridgeForm"],
//!         json!({ "title": "hello", "draft": false })
//!     );
//!     bridge.destroy();
//! });
//! ```

pub mod form;
pub mod persist;
pub mod runtime;
pub mod store;

// Re-export main types for convenience
pub use form::{FormGroup, FormSubscription};
pub use persist::{BridgeOptions, FormBridge, FormDefault, PersistError, PersistResult};
pub use runtime::{Debouncer, Scheduler};
pub use store::{Query, Store};

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn it_works() {
        // Basic smoke test
        Scheduler::scope(|| {
            let store = Store::new("app", json!({}));
            let form = FormGroup::new(json!(null));

            let _bridge = FormBridge::new(
                Query::new(&store),
                FormDefault::factory(|| json!({ "n": 0 })),
            )
            .attach(&form)
            .unwrap();

            assert_eq!(form.value(), json!({ "n": 0 }));

            form.patch_value(json!({ "n": 42 }));
            Scheduler::current().advance(Duration::from_millis(100));

            assert_eq!(store.snapshot()["bridgeForm"], json!({ "n": 42 }));
        });
    }
}
