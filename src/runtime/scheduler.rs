use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::warn;

/// A deferred action registered with the scheduler.
type Action = Box<dyn FnOnce() + Send>;

/// Upper bound on actions fired by one [`Scheduler::run_pending`] sweep.
/// An action that keeps rescheduling itself would otherwise never settle.
const MAX_PENDING_SWEEP: usize = 10_000;

/// Identifier for a scheduled action, used to cancel it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(usize);

/// Timer queue state (the scheduler's interior).
struct TimerContext {
    /// Virtual time since the scheduler was created.
    now: Duration,
    /// Tie-breaker so equal deadlines fire in scheduling order.
    next_seq: u64,
    // Map from (deadline, sequence) to the pending action
    queue: BTreeMap<(Duration, u64), (TimerId, Action)>,
    // Map from timer ID to its queue key, for cancellation
    index: HashMap<TimerId, (Duration, u64)>,
}

impl TimerContext {
    fn new() -> Self {
        Self {
            now: Duration::ZERO,
            next_seq: 0,
            queue: BTreeMap::new(),
            index: HashMap::new(),
        }
    }

    fn clear(&mut self) {
        self.now = Duration::ZERO;
        self.next_seq = 0;
        self.queue.clear();
        self.index.clear();
    }

    /// Remove and return the earliest action due at or before `limit`.
    fn take_due(&mut self, limit: Duration) -> Option<(Duration, Action)> {
        let (&(deadline, seq), _) = self.queue.iter().next()?;
        if deadline > limit {
            return None;
        }
        let (id, action) = self.queue.remove(&(deadline, seq))?;
        self.index.remove(&id);
        // While an action fires, `now` reads its deadline, so work it
        // schedules lands relative to the firing moment.
        self.now = deadline;
        Some((deadline, action))
    }
}

/// Deferred-action scheduler with virtual time.
///
/// The scheduler is the single source of "later" in this crate: debounced
/// work is registered here and fires when time is advanced. Time is
/// virtual: it moves only through [`advance`](Scheduler::advance) and
/// [`run_pending`](Scheduler::run_pending), which keeps every settle
/// deterministic. Hosts with a real event loop can poll
/// [`next_deadline`](Scheduler::next_deadline) and advance by measured
/// elapsed time.
///
/// Supports both a global scheduler (default) and scoped schedulers for
/// isolation.
///
/// # Examples
///
/// Using the default global scheduler:
///
/// ```
/// use std::time::Duration;
/// use formbridge::runtime::Scheduler;
///
/// let scheduler = Scheduler::current();
/// scheduler.schedule(Duration::from_millis(10), || {});
/// assert!(scheduler.pending_count() >= 1);
/// scheduler.run_pending();
/// ```
///
/// Using scoped schedulers for isolation:
///
/// ```
/// use std::time::Duration;
/// use formbridge::runtime::Scheduler;
///
/// Scheduler::scope(|| {
///     let scheduler = Scheduler::current();
///     scheduler.schedule(Duration::from_millis(5), || {});
///     assert_eq!(scheduler.pending_count(), 1);
///
///     scheduler.advance(Duration::from_millis(5));
///     assert_eq!(scheduler.pending_count(), 0);
/// });
/// // The scheduler and any still-pending actions are dropped here
/// ```
pub struct Scheduler {
    next_id: AtomicUsize,
    context: Mutex<TimerContext>,
}

// Thread-local stack for scoped schedulers
thread_local! {
    static SCHEDULER_STACK: RefCell<Vec<Arc<Scheduler>>> = RefCell::new(vec![]);
}

impl Scheduler {
    /// Create a new isolated scheduler.
    fn new() -> Arc<Self> {
        Arc::new(Scheduler {
            next_id: AtomicUsize::new(0),
            context: Mutex::new(TimerContext::new()),
        })
    }

    /// Run a function with a fresh isolated scheduler.
    ///
    /// Useful for tests: pending actions and virtual time cannot leak
    /// between scopes. The scheduler is dropped when the function returns.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    /// use formbridge::runtime::Scheduler;
    ///
    /// Scheduler::scope(|| {
    ///     Scheduler::current().schedule(Duration::from_millis(1), || {});
    /// });
    /// ```
    pub fn scope<F, R>(f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let scheduler = Self::new();
        Self::with_scheduler(scheduler, f)
    }

    /// Get or create the global scheduler (fallback).
    ///
    /// This is used as the default when no scoped scheduler is active.
    pub fn global() -> Arc<Self> {
        use std::sync::OnceLock;
        static SCHEDULER: OnceLock<Arc<Scheduler>> = OnceLock::new();
        Arc::clone(SCHEDULER.get_or_init(Self::new))
    }

    /// Get the current scheduler (scoped or global fallback).
    ///
    /// Returns the scheduler from the top of the thread-local stack,
    /// or the global one if no scoped scheduler is active.
    pub fn current() -> Arc<Self> {
        SCHEDULER_STACK.with(|stack| {
            stack
                .borrow()
                .last()
                .cloned()
                .unwrap_or_else(Self::global)
        })
    }

    /// Run a function with a specific scheduler as the current context.
    ///
    /// Pushes the scheduler onto the thread-local stack for the duration
    /// of the function execution.
    pub fn with_scheduler<F, R>(scheduler: Arc<Self>, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        SCHEDULER_STACK.with(|stack| {
            stack.borrow_mut().push(scheduler);
        });

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(f));

        SCHEDULER_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });

        match result {
            Ok(r) => r,
            Err(e) => std::panic::resume_unwind(e),
        }
    }

    /// Drop all pending actions and reset virtual time.
    ///
    /// Useful for resetting between tests that share a scheduler.
    pub fn clear(&self) {
        self.context.lock().unwrap().clear();
        self.next_id.store(0, Ordering::SeqCst);
    }

    /// Virtual time elapsed since the scheduler was created.
    ///
    /// While an action fires, `now()` reads that action's deadline.
    pub fn now(&self) -> Duration {
        self.context.lock().unwrap().now
    }

    /// Register `action` to fire once `after` has elapsed.
    pub fn schedule<F>(&self, after: Duration, action: F) -> TimerId
    where
        F: FnOnce() + Send + 'static,
    {
        let id = TimerId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let mut ctx = self.context.lock().unwrap();
        let deadline = ctx.now + after;
        let seq = ctx.next_seq;
        ctx.next_seq += 1;
        ctx.queue.insert((deadline, seq), (id, Box::new(action)));
        ctx.index.insert(id, (deadline, seq));
        id
    }

    /// Discard a pending action. Returns whether it was still pending.
    pub fn cancel(&self, id: TimerId) -> bool {
        let mut ctx = self.context.lock().unwrap();
        match ctx.index.remove(&id) {
            Some(key) => ctx.queue.remove(&key).is_some(),
            None => false,
        }
    }

    /// Move virtual time forward by `dt`, firing due actions.
    ///
    /// Actions fire in (deadline, scheduling-order) order, outside the
    /// scheduler lock, so they may schedule or cancel freely. Actions
    /// scheduled from within a firing action land relative to the firing
    /// moment and still fire in this call if they fall inside `dt`.
    pub fn advance(&self, dt: Duration) {
        let target = {
            let ctx = self.context.lock().unwrap();
            ctx.now + dt
        };

        loop {
            let due = self.context.lock().unwrap().take_due(target);
            match due {
                Some((_, action)) => action(),
                None => break,
            }
        }

        let mut ctx = self.context.lock().unwrap();
        if ctx.now < target {
            ctx.now = target;
        }
    }

    /// Fire every pending action regardless of remaining delay.
    ///
    /// Virtual time jumps to each deadline in turn. Returns the number of
    /// actions fired. The sweep is bounded, so an action that keeps
    /// rescheduling itself cannot spin forever.
    pub fn run_pending(&self) -> usize {
        let mut fired = 0;
        while fired < MAX_PENDING_SWEEP {
            let due = self.context.lock().unwrap().take_due(Duration::MAX);
            match due {
                Some((_, action)) => {
                    action();
                    fired += 1;
                }
                None => return fired,
            }
        }
        warn!(fired, "pending sweep hit its cap with actions still queued");
        fired
    }

    /// Number of actions still waiting to fire.
    pub fn pending_count(&self) -> usize {
        self.context.lock().unwrap().queue.len()
    }

    /// Time until the earliest pending action, if any.
    ///
    /// A pumping host can use this as its poll timeout.
    pub fn next_deadline(&self) -> Option<Duration> {
        let ctx = self.context.lock().unwrap();
        let (&(deadline, _), _) = ctx.queue.iter().next()?;
        Some(deadline.saturating_sub(ctx.now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn actions_fire_in_deadline_order() {
        Scheduler::scope(|| {
            let scheduler = Scheduler::current();
            let order = Arc::new(Mutex::new(Vec::new()));

            for (label, delay) in [("b", 20), ("a", 10), ("c", 30)] {
                let order = order.clone();
                scheduler.schedule(Duration::from_millis(delay), move || {
                    order.lock().unwrap().push(label);
                });
            }

            scheduler.advance(Duration::from_millis(30));
            assert_eq!(*order.lock().unwrap(), vec!["a", "b", "c"]);
        });
    }

    #[test]
    fn equal_deadlines_fire_in_scheduling_order() {
        Scheduler::scope(|| {
            let scheduler = Scheduler::current();
            let order = Arc::new(Mutex::new(Vec::new()));

            for label in ["first", "second", "third"] {
                let order = order.clone();
                scheduler.schedule(Duration::from_millis(10), move || {
                    order.lock().unwrap().push(label);
                });
            }

            scheduler.advance(Duration::from_millis(10));
            assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
        });
    }

    #[test]
    fn cancelled_actions_never_fire() {
        Scheduler::scope(|| {
            let scheduler = Scheduler::current();
            let fired = Arc::new(AtomicUsize::new(0));

            let fired_clone = fired.clone();
            let id = scheduler.schedule(Duration::from_millis(5), move || {
                fired_clone.fetch_add(1, Ordering::SeqCst);
            });

            assert!(scheduler.cancel(id));
            assert!(!scheduler.cancel(id));

            scheduler.advance(Duration::from_millis(10));
            assert_eq!(fired.load(Ordering::SeqCst), 0);
        });
    }

    #[test]
    fn advance_is_cumulative() {
        Scheduler::scope(|| {
            let scheduler = Scheduler::current();
            let fired = Arc::new(AtomicUsize::new(0));

            let fired_clone = fired.clone();
            scheduler.schedule(Duration::from_millis(10), move || {
                fired_clone.fetch_add(1, Ordering::SeqCst);
            });

            scheduler.advance(Duration::from_millis(6));
            assert_eq!(fired.load(Ordering::SeqCst), 0);

            scheduler.advance(Duration::from_millis(4));
            assert_eq!(fired.load(Ordering::SeqCst), 1);
            assert_eq!(scheduler.now(), Duration::from_millis(10));
        });
    }

    #[test]
    fn nested_schedules_land_relative_to_firing_moment() {
        Scheduler::scope(|| {
            let scheduler = Scheduler::current();
            let times = Arc::new(Mutex::new(Vec::new()));

            let times_outer = times.clone();
            let inner_scheduler = Scheduler::current();
            scheduler.schedule(Duration::from_millis(10), move || {
                let times_inner = times_outer.clone();
                let sched = inner_scheduler.clone();
                times_outer.lock().unwrap().push(sched.now());
                inner_scheduler.schedule(Duration::from_millis(5), move || {
                    times_inner.lock().unwrap().push(sched.now());
                });
            });

            scheduler.advance(Duration::from_millis(20));
            assert_eq!(
                *times.lock().unwrap(),
                vec![Duration::from_millis(10), Duration::from_millis(15)]
            );
        });
    }

    #[test]
    fn run_pending_drains_the_queue() {
        Scheduler::scope(|| {
            let scheduler = Scheduler::current();
            let fired = Arc::new(AtomicUsize::new(0));

            for delay in [5, 500, 50_000] {
                let fired = fired.clone();
                scheduler.schedule(Duration::from_millis(delay), move || {
                    fired.fetch_add(1, Ordering::SeqCst);
                });
            }

            assert_eq!(scheduler.run_pending(), 3);
            assert_eq!(fired.load(Ordering::SeqCst), 3);
            assert_eq!(scheduler.pending_count(), 0);
        });
    }

    #[test]
    fn next_deadline_reports_remaining_time() {
        Scheduler::scope(|| {
            let scheduler = Scheduler::current();
            assert_eq!(scheduler.next_deadline(), None);

            scheduler.schedule(Duration::from_millis(30), || {});
            assert_eq!(scheduler.next_deadline(), Some(Duration::from_millis(30)));

            scheduler.advance(Duration::from_millis(10));
            assert_eq!(scheduler.next_deadline(), Some(Duration::from_millis(20)));
        });
    }

    #[test]
    fn scopes_are_isolated() {
        let before = Scheduler::global().pending_count();

        Scheduler::scope(|| {
            Scheduler::current().schedule(Duration::from_millis(1), || {});
            assert_eq!(Scheduler::current().pending_count(), 1);
        });

        assert_eq!(Scheduler::global().pending_count(), before);
    }

    #[test]
    fn clear_resets_time_and_queue() {
        Scheduler::scope(|| {
            let scheduler = Scheduler::current();
            scheduler.schedule(Duration::from_millis(5), || {});
            scheduler.advance(Duration::from_millis(2));

            scheduler.clear();

            assert_eq!(scheduler.pending_count(), 0);
            assert_eq!(scheduler.now(), Duration::ZERO);
        });
    }
}
