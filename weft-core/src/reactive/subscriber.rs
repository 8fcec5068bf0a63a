//! Subscriber types for the reactive system.
//!
//! A Subscriber is any re-executable computation that depends on reactive
//! values: an effect body or the internal runner of a computed cell.
//!
//! Every run starts by detaching the subscriber from all dependency sets it
//! joined during the previous run, so after a run its dependencies are
//! exactly the reads that run performed.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use smallvec::SmallVec;

use super::context::ReactiveContext;
use super::effect::{Effect, Scheduler};
use super::runtime::Dep;

/// Unique identifier for a subscriber.
///
/// Each subscriber gets a unique ID when created. Dependency sets are keyed by
/// this ID, which makes joining a set idempotent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

/// A re-executable tracked computation.
///
/// Dependency sets hold subscribers strongly; a subscriber only holds weak
/// references back to the sets it joined, so a set disappears together with
/// its target.
pub(crate) struct Subscriber {
    id: SubscriberId,

    /// The tracked body.
    body: Box<dyn Fn()>,

    /// Dispatch override invoked instead of `run` when a dependency changes.
    scheduler: Option<Scheduler>,

    /// Dependency sets this subscriber currently belongs to.
    deps: RefCell<SmallVec<[Weak<Dep>; 4]>>,

    disposed: Cell<bool>,

    /// Number of completed runs.
    run_count: Cell<usize>,
}

impl Subscriber {
    pub(crate) fn new(body: Box<dyn Fn()>, scheduler: Option<Scheduler>) -> Rc<Self> {
        Rc::new(Self {
            id: SubscriberId::new(),
            body,
            scheduler,
            deps: RefCell::new(SmallVec::new()),
            disposed: Cell::new(false),
            run_count: Cell::new(0),
        })
    }

    pub(crate) fn id(&self) -> SubscriberId {
        self.id
    }

    /// Run the body with full re-subscription.
    ///
    /// The active-subscriber entry is popped even if the body panics.
    pub(crate) fn run(self: &Rc<Self>) {
        if self.disposed.get() {
            return;
        }

        self.cleanup();

        let _ctx = ReactiveContext::enter(Rc::clone(self));
        (self.body)();

        self.run_count.set(self.run_count.get() + 1);
    }

    /// React to a dependency change: call the scheduler if there is one,
    /// otherwise re-run.
    pub(crate) fn notify(self: &Rc<Self>) {
        match &self.scheduler {
            Some(scheduler) => scheduler(&Effect::from_subscriber(Rc::clone(self))),
            None => self.run(),
        }
    }

    /// Remember a dependency set this subscriber has just joined.
    pub(crate) fn record_dependency(&self, dep: &Rc<Dep>) {
        self.deps.borrow_mut().push(Rc::downgrade(dep));
    }

    /// Leave every dependency set and forget them.
    pub(crate) fn cleanup(&self) {
        let deps = std::mem::take(&mut *self.deps.borrow_mut());
        for dep in deps.iter().filter_map(Weak::upgrade) {
            dep.remove(self.id);
        }
    }

    pub(crate) fn dispose(&self) {
        self.disposed.set(true);
        self.cleanup();
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.disposed.get()
    }

    pub(crate) fn run_count(&self) -> usize {
        self.run_count.get()
    }

    /// Number of live dependency sets this subscriber belongs to.
    pub(crate) fn dependency_count(&self) -> usize {
        self.deps
            .borrow()
            .iter()
            .filter(|dep| dep.strong_count() > 0)
            .count()
    }
}
