use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use super::errors::{PersistError, PersistResult};
use crate::form::{FormGroup, FormSubscription};
use crate::runtime::{Debouncer, Scheduler};
use crate::store::Query;

/// Where a bridge reads its default value from.
pub enum FormDefault {
    /// A factory producing the default slice value. The bridge owns the
    /// slice at [`BridgeOptions::form_key`] and seeds it on first attach.
    Factory(Arc<dyn Fn() -> Value + Send + Sync>),
    /// An existing slice, addressed by dotted path, is both the default
    /// and the write target.
    Slice(String),
    /// The store's whole root state is the mirrored slice; settled form
    /// values shallow-merge into the root.
    Root,
}

impl FormDefault {
    /// Factory mode: `f` produces the default slice value.
    pub fn factory<F>(f: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        Self::Factory(Arc::new(f))
    }

    /// Key-based mode: the slice at `path` is the default and the target.
    pub fn slice(path: impl Into<String>) -> Self {
        Self::Slice(path.into())
    }

    /// Root mode: mirror the store's root state.
    pub fn root() -> Self {
        Self::Root
    }
}

impl std::fmt::Debug for FormDefault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Factory(_) => f.write_str("Factory(..)"),
            Self::Slice(path) => f.debug_tuple("Slice").field(path).finish(),
            Self::Root => f.write_str("Root"),
        }
    }
}

/// Bridge configuration.
#[derive(Clone, Debug)]
pub struct BridgeOptions {
    /// Slice key used in factory mode.
    pub form_key: String,
    /// Quiet interval before a burst of form edits settles into the store.
    pub debounce: Duration,
    /// Whether bridge-initiated form writes (attach seed, reset) emit on
    /// the form's change stream.
    pub emit_event: bool,
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self {
            form_key: "bridgeForm".to_string(),
            debounce: Duration::from_millis(100),
            emit_event: false,
        }
    }
}

impl BridgeOptions {
    pub fn with_form_key(mut self, key: impl Into<String>) -> Self {
        self.form_key = key.into();
        self
    }

    pub fn with_debounce(mut self, interval: Duration) -> Self {
        self.debounce = interval;
        self
    }

    pub fn with_emit_event(mut self, emit: bool) -> Self {
        self.emit_event = emit;
        self
    }
}

/// Where settled form values land in the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BridgeTarget {
    /// Replace the slice at this dotted path.
    Slice(String),
    /// Shallow-merge into the root state.
    Root,
}

/// Live state of an attached bridge. Dropping it releases the form
/// subscription and silences any pending debounced flush.
struct Attached {
    form: FormGroup,
    target: BridgeTarget,
    /// Reset default for key-based and root modes, captured at attach.
    baseline: Value,
    debouncer: Debouncer<Value>,
    _subscription: FormSubscription,
}

/// Synchronizes a reactive form with a slice of a state store.
///
/// Once [attached](FormBridge::attach), edits emitted by the form are
/// debounced and patched into the configured store slice; [`reset`]
/// pushes the default value (or a caller-supplied one, via [`reset_to`])
/// back into both form and store. [`destroy`] or drop tears the
/// subscription down; a pending debounced value is discarded, not
/// flushed.
///
/// The bridge captures the current [`Scheduler`] at construction, so a
/// bridge built inside [`Scheduler::scope`] stays on that scheduler.
///
/// [`reset`]: FormBridge::reset
/// [`reset_to`]: FormBridge::reset_to
/// [`destroy`]: FormBridge::destroy
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use serde_json::json;
/// use formbridge::persist::{FormBridge, FormDefault};
/// use formbridge::runtime::Scheduler;
/// use formbridge::{FormGroup, Query, Store};
///
/// Scheduler::scope(|| {
///     let store = Store::new("session", json!({}));
///     let query = Query::new(&store);
///     let form = FormGroup::new(json!(null));
///
///     let bridge = FormBridge::new(query, FormDefault::factory(|| json!({ "draft": "" })))
///         .attach(&form)
///         .unwrap();
///
///     form.patch_value(json!({ "draft": "hello" }));
///     Scheduler::current().advance(Duration::from_millis(100));
///
///     assert_eq!(store.snapshot()["bridgeForm"], json!({ "draft": "hello" }));
///     bridge.destroy();
/// });
/// ```
pub struct FormBridge {
    query: Query,
    default: FormDefault,
    options: BridgeOptions,
    scheduler: Arc<Scheduler>,
    attached: Option<Attached>,
}

impl FormBridge {
    /// Create a bridge with default options.
    pub fn new(query: Query, default: FormDefault) -> Self {
        Self::with_options(query, default, BridgeOptions::default())
    }

    /// Create a bridge with explicit options.
    pub fn with_options(query: Query, default: FormDefault, options: BridgeOptions) -> Self {
        Self {
            query,
            default,
            options,
            scheduler: Scheduler::current(),
            attached: None,
        }
    }

    /// Activate the bridge against `form`.
    ///
    /// Computes the default value, seeds the store slice when the bridge
    /// owns it (factory mode, absent key), writes the slice's value into
    /// the form, then subscribes to the form's change stream through a
    /// debouncer whose settled values patch the store target.
    ///
    /// In factory mode a pre-existing slice wins over the factory product,
    /// so persisted state survives re-attachment. Key-based mode fails
    /// with [`PersistError::MissingSlice`] when the named slice is absent.
    /// Attaching an already attached bridge tears the old subscription
    /// down first.
    pub fn attach(mut self, form: &FormGroup) -> PersistResult<Self> {
        if let Some(old) = self.attached.take() {
            old.debouncer.cancel();
        }

        let (target, seed, baseline) = match &self.default {
            FormDefault::Factory(factory) => {
                let key = self.options.form_key.clone();
                let seed = match self.query.slice(&key) {
                    Some(existing) => existing,
                    None => {
                        let default = factory();
                        self.query.store().patch_slice(&key, default.clone());
                        default
                    }
                };
                (BridgeTarget::Slice(key), seed.clone(), seed)
            }
            FormDefault::Slice(path) => {
                let value =
                    self.query
                        .slice(path)
                        .ok_or_else(|| PersistError::MissingSlice {
                            path: path.clone(),
                            store: self.query.name().to_string(),
                        })?;
                (BridgeTarget::Slice(path.clone()), value.clone(), value)
            }
            FormDefault::Root => {
                let snapshot = self.query.snapshot();
                (BridgeTarget::Root, snapshot.clone(), snapshot)
            }
        };

        self.write_form(form, seed);

        let store = self.query.store().clone();
        let sink_target = target.clone();
        let debouncer = Debouncer::with_scheduler(
            Arc::clone(&self.scheduler),
            self.options.debounce,
            move |value: Value| match &sink_target {
                BridgeTarget::Slice(path) => store.patch_slice(path, value),
                BridgeTarget::Root => store.patch_root(value),
            },
        );

        let pusher = debouncer.clone();
        let subscription = form.subscribe(move |value| pusher.push(value.clone()));

        debug!(store = %self.query.name(), target = ?target, "bridge attached");
        self.attached = Some(Attached {
            form: form.clone(),
            target,
            baseline,
            debouncer,
            _subscription: subscription,
        });
        Ok(self)
    }

    /// Restore the default value into both the form and the store.
    ///
    /// Factory mode re-invokes the factory; key-based and root modes use
    /// the value captured at attach time.
    pub fn reset(&self) -> PersistResult<()> {
        let value = match &self.default {
            FormDefault::Factory(factory) => factory(),
            _ => {
                self.attached
                    .as_ref()
                    .ok_or(PersistError::NotAttached)?
                    .baseline
                    .clone()
            }
        };
        self.apply_reset(value)
    }

    /// Set both the form and the store to `value`.
    pub fn reset_to(&self, value: Value) -> PersistResult<()> {
        self.apply_reset(value)
    }

    fn apply_reset(&self, value: Value) -> PersistResult<()> {
        let attached = self.attached.as_ref().ok_or(PersistError::NotAttached)?;

        self.write_form(&attached.form, value.clone());
        // Resets hit the store synchronously; only form-originated edits
        // go through the debouncer.
        match &attached.target {
            BridgeTarget::Slice(path) => self.query.store().patch_slice(path, value),
            BridgeTarget::Root => self.query.store().patch_root(value),
        }

        debug!(store = %self.query.name(), target = ?attached.target, "bridge reset");
        Ok(())
    }

    /// Tear the bridge down.
    ///
    /// Releases the form subscription and cancels any pending debounced
    /// flush; the pending value is discarded, not written. Dropping the
    /// bridge has the same effect.
    pub fn destroy(mut self) {
        if let Some(attached) = self.attached.take() {
            attached.debouncer.cancel();
            debug!(store = %self.query.name(), target = ?attached.target, "bridge destroyed");
        }
    }

    /// Whether the bridge is currently attached to a form.
    pub fn is_attached(&self) -> bool {
        self.attached.is_some()
    }

    /// The store target of the attached bridge, if any.
    pub fn target(&self) -> Option<&BridgeTarget> {
        self.attached.as_ref().map(|a| &a.target)
    }

    fn write_form(&self, form: &FormGroup, value: Value) {
        if self.options.emit_event {
            form.set_value(value);
        } else {
            form.set_value_silent(value);
        }
    }
}

impl Drop for FormBridge {
    fn drop(&mut self) {
        if let Some(attached) = self.attached.take() {
            attached.debouncer.cancel();
        }
    }
}

impl std::fmt::Debug for FormBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormBridge")
            .field("store", &self.query.name())
            .field("default", &self.default)
            .field("attached", &self.attached.is_some())
            .finish_non_exhaustive()
    }
}
