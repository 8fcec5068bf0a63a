//! Reactive Runtime
//!
//! The runtime is the central coordinator that connects tracked reads to the
//! computations that depend on them. It owns the dependency registry, a
//! two-level map from target identity to property key to the set of
//! subscribers that read that property.
//!
//! # How It Works
//!
//! 1. When a tracked value is read inside a running effect or computed getter,
//!    [`Runtime::track`] adds the running subscriber to the set stored for
//!    `(target, key)`, creating the set on first use.
//!
//! 2. When a tracked value changes, [`Runtime::trigger`] snapshots that set and
//!    notifies every subscriber in the snapshot, either by re-running it or by
//!    calling its scheduler.
//!
//! 3. When a target, ref or computed cell is dropped, its [`Identity`] removes
//!    the target's whole entry with [`Runtime::forget`], so the registry never
//!    outlives the values it describes. Dependency sets own their subscribers,
//!    so a live effect keeps whatever its body captured until it is disposed.
//!
//! # Thread Safety
//!
//! The registry lives in thread-local storage. Every handle in this crate is
//! `Rc` based, so a reactive graph is confined to the thread that built it and
//! needs no locking.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use smallvec::SmallVec;

use super::context::ReactiveContext;
use super::subscriber::{Subscriber, SubscriberId};
use crate::config::RuntimeConfig;
use crate::error::Error;
use crate::object::Key;

/// Stable identity of a trackable target.
///
/// Records, lists, refs and computed cells each own one. The registry is keyed
/// by this ID, never by a view, so every view over the same target shares a
/// dependency map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(u64);

impl TargetId {
    pub(crate) fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Owning handle for a [`TargetId`].
///
/// Dropping it removes the target's dependency map from the registry.
pub(crate) struct Identity(TargetId);

impl Identity {
    pub(crate) fn new() -> Self {
        Self(TargetId::next())
    }

    pub(crate) fn id(&self) -> TargetId {
        self.0
    }
}

impl Drop for Identity {
    fn drop(&mut self) {
        Runtime::forget(self.0);
    }
}

/// The set of subscribers registered for one `(target, key)` pair.
///
/// Insertion order is kept so dispatch order is deterministic. Members are
/// held strongly until they leave the set or the set is forgotten.
#[derive(Default)]
pub(crate) struct Dep {
    subscribers: RefCell<IndexMap<SubscriberId, Rc<Subscriber>>>,
}

impl Dep {
    /// Add a subscriber. Returns `false` if it was already a member.
    fn insert(&self, subscriber: &Rc<Subscriber>) -> bool {
        let mut subscribers = self.subscribers.borrow_mut();
        if subscribers.contains_key(&subscriber.id()) {
            return false;
        }
        subscribers.insert(subscriber.id(), Rc::clone(subscriber));
        true
    }

    pub(crate) fn remove(&self, id: SubscriberId) {
        // Dropped after the borrow is released.
        let removed = self.subscribers.borrow_mut().shift_remove(&id);
        drop(removed);
    }

    fn snapshot(&self) -> SmallVec<[Rc<Subscriber>; 8]> {
        self.subscribers.borrow().values().cloned().collect()
    }

    fn len(&self) -> usize {
        self.subscribers.borrow().len()
    }
}

type KeyMap = HashMap<Key, Rc<Dep>>;

thread_local! {
    static REGISTRY: RefCell<HashMap<TargetId, KeyMap>> = RefCell::new(HashMap::new());
    static IN_FLIGHT: RefCell<HashMap<SubscriberId, usize>> = RefCell::new(HashMap::new());
    static CONFIG: RefCell<RuntimeConfig> = RefCell::new(RuntimeConfig::default());
}

/// Marks a subscriber as being notified for as long as the guard lives.
///
/// A subscriber can only be entered again while it is still in flight if the
/// dispatch went around a cycle back to it. Entering it more often than the
/// configured limit panics with [`Error::CycleDetected`].
struct InFlight(SubscriberId);

impl InFlight {
    fn enter(id: SubscriberId) -> Self {
        let entries = IN_FLIGHT.with(|in_flight| {
            let mut in_flight = in_flight.borrow_mut();
            let entries = in_flight.entry(id).or_insert(0);
            *entries += 1;
            *entries
        });
        // Built before the check so the entry is released on the panic path.
        let guard = Self(id);

        if let Some(limit) = CONFIG.with(|c| c.borrow().max_reentry) {
            if entries > limit + 1 {
                tracing::debug!(subscriber = id.raw(), limit, "subscriber cycle detected");
                panic::panic_any(Error::CycleDetected {
                    subscriber: id.raw(),
                    limit,
                });
            }
        }
        guard
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        let _ = IN_FLIGHT.try_with(|in_flight| {
            let mut in_flight = in_flight.borrow_mut();
            if let Some(entries) = in_flight.get_mut(&self.0) {
                *entries -= 1;
                if *entries == 0 {
                    in_flight.remove(&self.0);
                }
            }
        });
    }
}

/// The per-thread reactive runtime.
pub struct Runtime;

impl Runtime {
    /// Record that the active subscriber read `key` on `target`.
    ///
    /// Does nothing outside a tracked execution. Tracking the same pair twice
    /// during one run adds a single edge.
    pub fn track(target: TargetId, key: &Key) {
        let Some(subscriber) = ReactiveContext::current() else {
            return;
        };

        let dep = REGISTRY.with(|registry| {
            let mut registry = registry.borrow_mut();
            let keys = registry.entry(target).or_default();
            match keys.get(key) {
                Some(dep) => Rc::clone(dep),
                None => {
                    let dep = Rc::new(Dep::default());
                    keys.insert(key.clone(), Rc::clone(&dep));
                    dep
                }
            }
        });

        if dep.insert(&subscriber) {
            subscriber.record_dependency(&dep);
            tracing::trace!(%target, %key, subscriber = subscriber.id().raw(), "tracked dependency");
        }
    }

    /// Notify every subscriber registered for `(target, key)`.
    ///
    /// The subscriber set is copied before dispatch, so subscribers joining or
    /// leaving it during dispatch do not affect this pass. The active
    /// subscriber is skipped. A subscriber that panics does not stop the
    /// others; the first panic is resumed once all of them have been notified.
    ///
    /// Chains of nested dispatches may be arbitrarily deep. Only a subscriber
    /// reached again while it is still being notified counts against
    /// [`RuntimeConfig::max_reentry`].
    ///
    /// # Panics
    ///
    /// Panics with [`Error::CycleDetected`] as payload when a subscriber is
    /// re-entered more often than the limit allows.
    pub fn trigger(target: TargetId, key: &Key) {
        let dep = REGISTRY.with(|registry| {
            registry
                .borrow()
                .get(&target)
                .and_then(|keys| keys.get(key))
                .cloned()
        });
        let Some(dep) = dep else {
            return;
        };

        let snapshot = dep.snapshot();
        if snapshot.is_empty() {
            return;
        }

        let active = ReactiveContext::current_subscriber();
        tracing::trace!(%target, %key, subscribers = snapshot.len(), "dispatching");

        let mut failure = None;
        for subscriber in snapshot {
            if Some(subscriber.id()) == active || subscriber.is_disposed() {
                continue;
            }

            let notified = panic::catch_unwind(AssertUnwindSafe(|| {
                let _in_flight = InFlight::enter(subscriber.id());
                subscriber.notify();
            }));
            if let Err(payload) = notified {
                tracing::debug!(
                    %target,
                    %key,
                    subscriber = subscriber.id().raw(),
                    "subscriber panicked during dispatch"
                );
                failure.get_or_insert(payload);
            }
        }

        if let Some(payload) = failure {
            panic::resume_unwind(payload);
        }
    }

    /// Drop the dependency map of a target that no longer exists.
    pub(crate) fn forget(target: TargetId) {
        let removed = REGISTRY
            .try_with(|registry| {
                registry
                    .try_borrow_mut()
                    .ok()
                    .and_then(|mut registry| registry.remove(&target))
            })
            .ok()
            .flatten();

        // Releasing the sets may drop subscribers and the targets they
        // captured, which re-enters the registry.
        if let Some(keys) = removed {
            tracing::trace!(%target, keys = keys.len(), "forgot target");
            drop(keys);
        }
    }

    /// Number of subscribers registered for `(target, key)`.
    pub fn subscriber_count(target: TargetId, key: &Key) -> usize {
        REGISTRY.with(|registry| {
            registry
                .borrow()
                .get(&target)
                .and_then(|keys| keys.get(key))
                .map_or(0, |dep| dep.len())
        })
    }

    /// Number of targets that currently have a dependency map.
    pub fn tracked_target_count() -> usize {
        REGISTRY.with(|registry| registry.borrow().len())
    }

    /// Check if reads are currently being tracked.
    pub fn is_tracking() -> bool {
        ReactiveContext::is_active()
    }

    /// Get the active subscriber, if any.
    pub fn current_subscriber() -> Option<SubscriberId> {
        ReactiveContext::current_subscriber()
    }

    /// Install a configuration for the current thread.
    pub fn configure(config: RuntimeConfig) {
        tracing::debug!(?config, "runtime configured");
        CONFIG.with(|c| *c.borrow_mut() = config);
    }

    /// Configuration in effect on the current thread.
    pub fn config() -> RuntimeConfig {
        CONFIG.with(|c| c.borrow().clone())
    }
}
