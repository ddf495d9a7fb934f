use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use tracing::trace;

use super::scheduler::{Scheduler, TimerId};

/// Pending debounce state: the latest pushed value and its timer.
struct DebounceState<T> {
    latest: Option<T>,
    timer: Option<TimerId>,
}

struct DebounceInner<T> {
    interval: Duration,
    scheduler: Arc<Scheduler>,
    sink: Box<dyn Fn(T) + Send + Sync>,
    state: Mutex<DebounceState<T>>,
}

impl<T> Drop for DebounceInner<T> {
    fn drop(&mut self) {
        if let Some(id) = self.state.lock().unwrap().timer.take() {
            self.scheduler.cancel(id);
        }
    }
}

/// Coalesces a burst of pushed values into one deferred sink call.
///
/// Each [`push`](Debouncer::push) stores the value and re-arms a timer on
/// the scheduler; when the timer fires after a quiet interval, the sink
/// receives the last pushed value. Cloning produces another handle to the
/// same debouncer; dropping the last handle discards any pending flush.
///
/// # Examples
///
/// ```
/// use std::sync::{Arc, Mutex};
/// use std::time::Duration;
/// use formbridge::runtime::{Debouncer, Scheduler};
///
/// Scheduler::scope(|| {
///     let flushed = Arc::new(Mutex::new(Vec::new()));
///     let sink = flushed.clone();
///     let debouncer = Debouncer::new(Duration::from_millis(100), move |v: i32| {
///         sink.lock().unwrap().push(v);
///     });
///
///     debouncer.push(1);
///     debouncer.push(2);
///     debouncer.push(3);
///
///     Scheduler::current().advance(Duration::from_millis(100));
///     assert_eq!(*flushed.lock().unwrap(), vec![3]);
/// });
/// ```
pub struct Debouncer<T> {
    inner: Arc<DebounceInner<T>>,
}

impl<T: Send + 'static> Debouncer<T> {
    /// Create a debouncer on the current scheduler.
    pub fn new<F>(interval: Duration, sink: F) -> Self
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        Self::with_scheduler(Scheduler::current(), interval, sink)
    }

    /// Create a debouncer on a specific scheduler.
    pub fn with_scheduler<F>(scheduler: Arc<Scheduler>, interval: Duration, sink: F) -> Self
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(DebounceInner {
                interval,
                scheduler,
                sink: Box::new(sink),
                state: Mutex::new(DebounceState {
                    latest: None,
                    timer: None,
                }),
            }),
        }
    }

    /// Store `value` and re-arm the quiet-interval timer.
    ///
    /// Any previously pending flush is superseded; when the timer fires,
    /// the sink receives only the last value pushed before it.
    pub fn push(&self, value: T) {
        let mut state = self.inner.state.lock().unwrap();
        state.latest = Some(value);
        if let Some(id) = state.timer.take() {
            self.inner.scheduler.cancel(id);
        }

        // The scheduled action holds only a weak handle, so dropping the
        // last Debouncer clone silences it even if the timer still fires.
        let weak: Weak<DebounceInner<T>> = Arc::downgrade(&self.inner);
        let id = self.inner.scheduler.schedule(self.inner.interval, move || {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let flushed = {
                let mut state = inner.state.lock().unwrap();
                state.timer = None;
                state.latest.take()
            };
            if let Some(value) = flushed {
                trace!("debounce settled");
                (inner.sink)(value);
            }
        });
        state.timer = Some(id);
        trace!(interval = ?self.inner.interval, "debounce armed");
    }

    /// Discard any pending flush without invoking the sink.
    ///
    /// A later `push` re-arms normally.
    pub fn cancel(&self) {
        let mut state = self.inner.state.lock().unwrap();
        state.latest = None;
        if let Some(id) = state.timer.take() {
            self.inner.scheduler.cancel(id);
        }
    }

    /// Whether a flush is currently armed.
    pub fn is_pending(&self) -> bool {
        self.inner.state.lock().unwrap().timer.is_some()
    }
}

impl<T> Clone for Debouncer<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}
