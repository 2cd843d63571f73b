//! Diagnostic observers for resolution and binding events.
//!
//! Observers are notified synchronously. A container without observers skips
//! every notification, including the timing of resolutions.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::DiError;
use crate::key::Id;
use crate::provider::Placement;

/// Observer trait for container events.
///
/// Every method has an empty default so implementations only override what
/// they need.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::time::Duration;
/// use contextual_di::{Container, DiObserver, Id};
///
/// #[derive(Default)]
/// struct Counting(AtomicUsize);
///
/// impl DiObserver for Counting {
///     fn resolved(&self, _id: &Id, _duration: Duration) {
///         self.0.fetch_add(1, Ordering::Relaxed);
///     }
/// }
///
/// let counting = Arc::new(Counting::default());
/// let mut container = Container::new();
/// container.add_observer(counting.clone());
/// container.set("x", 1u8);
/// container.get("x", None).unwrap();
/// assert_eq!(counting.0.load(Ordering::Relaxed), 1);
/// ```
pub trait DiObserver: Send + Sync {
    /// Resolution of `id` is starting.
    fn resolving(&self, _id: &Id) {}

    /// Resolution of `id` finished without error (possibly with nothing found).
    fn resolved(&self, _id: &Id, _duration: Duration) {}

    /// Resolution of `id` failed.
    fn resolution_failed(&self, _id: &Id, _error: &DiError) {}

    /// A binding for `id` was stored.
    fn bound(&self, _id: &Id, _placement: &Placement) {}

    /// A type's bind actions ran.
    fn auto_bound(&self, _type_name: &str) {}

    /// The active context was named `name`; `flushed` deferred bindings moved in.
    fn scope_aliased(&self, _name: &str, _flushed: usize) {}
}

/// Collection of observers with a fast path for the empty case.
#[derive(Default, Clone)]
pub(crate) struct Observers {
    observers: Vec<Arc<dyn DiObserver>>,
}

impl Observers {
    pub(crate) fn new() -> Self {
        Self { observers: Vec::new() }
    }

    pub(crate) fn add(&mut self, observer: Arc<dyn DiObserver>) {
        self.observers.push(observer);
    }

    /// Returns true if any observers are registered.
    #[inline]
    pub(crate) fn has_observers(&self) -> bool {
        !self.observers.is_empty()
    }

    #[inline]
    pub(crate) fn resolving(&self, id: &Id) {
        for observer in &self.observers {
            observer.resolving(id);
        }
    }

    #[inline]
    pub(crate) fn resolved(&self, id: &Id, duration: Duration) {
        for observer in &self.observers {
            observer.resolved(id, duration);
        }
    }

    #[inline]
    pub(crate) fn resolution_failed(&self, id: &Id, error: &DiError) {
        for observer in &self.observers {
            observer.resolution_failed(id, error);
        }
    }

    #[inline]
    pub(crate) fn bound(&self, id: &Id, placement: &Placement) {
        for observer in &self.observers {
            observer.bound(id, placement);
        }
    }

    #[inline]
    pub(crate) fn auto_bound(&self, type_name: &str) {
        for observer in &self.observers {
            observer.auto_bound(type_name);
        }
    }

    #[inline]
    pub(crate) fn scope_aliased(&self, name: &str, flushed: usize) {
        for observer in &self.observers {
            observer.scope_aliased(name, flushed);
        }
    }
}

/// Built-in observer that writes events to stdout, failures to stderr.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use contextual_di::{Container, LoggingObserver};
///
/// let mut container = Container::new();
/// container.add_observer(Arc::new(LoggingObserver::new()));
/// ```
pub struct LoggingObserver {
    prefix: String,
}

impl LoggingObserver {
    /// Creates a logging observer with the default prefix.
    pub fn new() -> Self {
        Self {
            prefix: "[contextual-di]".to_string(),
        }
    }

    /// Creates a logging observer with a custom prefix.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }
}

impl Default for LoggingObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl DiObserver for LoggingObserver {
    fn resolving(&self, id: &Id) {
        println!("{} Resolving: {}", self.prefix, id);
    }

    fn resolved(&self, id: &Id, duration: Duration) {
        println!("{} Resolved: {} in {:?}", self.prefix, id, duration);
    }

    fn resolution_failed(&self, id: &Id, error: &DiError) {
        eprintln!("{} FAILED {}: {}", self.prefix, id, error);
    }

    fn bound(&self, id: &Id, placement: &Placement) {
        println!("{} Bound: {} ({})", self.prefix, id, placement);
    }

    fn auto_bound(&self, type_name: &str) {
        println!("{} Auto-bound: {}", self.prefix, type_name);
    }

    fn scope_aliased(&self, name: &str, flushed: usize) {
        println!("{} Scope {} aliased, {} deferred binding(s) flushed", self.prefix, name, flushed);
    }
}

/// Built-in observer counting events.
#[derive(Debug, Default)]
pub struct MetricsObserver {
    resolution_count: AtomicU64,
    total_resolution_time: AtomicU64,
    failure_count: AtomicU64,
    binding_count: AtomicU64,
    deferred_count: AtomicU64,
}

impl MetricsObserver {
    /// Creates a metrics observer with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful resolutions.
    pub fn resolution_count(&self) -> u64 {
        self.resolution_count.load(Ordering::Relaxed)
    }

    /// Average duration of successful resolutions.
    pub fn average_resolution_time(&self) -> Option<Duration> {
        let count = self.resolution_count();
        if count == 0 {
            return None;
        }
        Some(Duration::from_nanos(self.total_resolution_time.load(Ordering::Relaxed) / count))
    }

    /// Number of failed resolutions.
    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Relaxed)
    }

    /// Number of stored bindings, deferred ones included.
    pub fn binding_count(&self) -> u64 {
        self.binding_count.load(Ordering::Relaxed)
    }

    /// Number of bindings queued for a scope that did not exist yet.
    pub fn deferred_count(&self) -> u64 {
        self.deferred_count.load(Ordering::Relaxed)
    }

    /// Resets every counter.
    pub fn reset(&self) {
        self.resolution_count.store(0, Ordering::Relaxed);
        self.total_resolution_time.store(0, Ordering::Relaxed);
        self.failure_count.store(0, Ordering::Relaxed);
        self.binding_count.store(0, Ordering::Relaxed);
        self.deferred_count.store(0, Ordering::Relaxed);
    }
}

impl DiObserver for MetricsObserver {
    fn resolved(&self, _id: &Id, duration: Duration) {
        self.resolution_count.fetch_add(1, Ordering::Relaxed);
        self.total_resolution_time
            .fetch_add(duration.as_nanos() as u64, Ordering::Relaxed);
    }

    fn resolution_failed(&self, _id: &Id, _error: &DiError) {
        self.failure_count.fetch_add(1, Ordering::Relaxed);
    }

    fn bound(&self, _id: &Id, placement: &Placement) {
        self.binding_count.fetch_add(1, Ordering::Relaxed);
        if matches!(placement, Placement::Deferred(_)) {
            self.deferred_count.fetch_add(1, Ordering::Relaxed);
        }
    }
}
