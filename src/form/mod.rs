//! The reactive form collaborator: a current value plus a change stream.

mod group;

pub use group::{FormGroup, FormSubscription};
