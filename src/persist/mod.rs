//! The form-store bridge: debounced synchronization between a
//! [`FormGroup`](crate::form::FormGroup) and a store slice.

mod errors;
mod plugin;

pub use errors::{PersistError, PersistResult};
pub use plugin::{BridgeOptions, BridgeTarget, FormBridge, FormDefault};
