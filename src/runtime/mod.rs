//! Deferred-action runtime: a virtual-time scheduler and a debouncer
//! built on top of it.
//!
//! Time here is virtual: it only moves when a host calls
//! [`Scheduler::advance`] or [`Scheduler::run_pending`], which keeps every
//! debounce settle deterministic and ordered. Hosts with a real event loop
//! can poll [`Scheduler::next_deadline`] and advance by measured elapsed
//! time.

mod debounce;
mod scheduler;

pub use debounce::Debouncer;
pub use scheduler::{Scheduler, TimerId};
