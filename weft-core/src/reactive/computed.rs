//! Computed Implementation
//!
//! A Computed is a cached derived value that re-evaluates only when it is read
//! after one of its dependencies changed.
//!
//! # How Computed Cells Work
//!
//! 1. The getter runs inside an internal lazy effect, so every value it reads
//!    registers that effect as a dependent.
//!
//! 2. The effect's scheduler never re-runs the getter. It marks the cache
//!    dirty and notifies the cell's own dependents.
//!
//! 3. On the next read, a dirty cell re-runs the getter once and caches the
//!    result. Any number of dependency changes between two reads collapse into
//!    that single recomputation.
//!
//! Reading a computed cell registers the reader like any other tracked value,
//! so cells can feed effects and other cells.
//!
//! # Failure Modes
//!
//! If the getter panics the previous cached value is kept and the cell stays
//! dirty, so the next read retries.
//!
//! A getter must not read its own cell: the cell is still dirty while its
//! getter runs, so the read recurses until the stack overflows.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use super::context::untrack;
use super::effect::{Effect, EffectOptions};
use super::runtime::{Identity, Runtime, TargetId};
use crate::object::Key;

/// Cache shared between the cell and its internal effect.
struct ComputedState<T> {
    /// The cached value (None if never computed).
    value: RefCell<Option<T>>,
    dirty: Cell<bool>,
}

struct ComputedInner<T> {
    identity: Identity,
    state: Rc<ComputedState<T>>,
    runner: Effect,
}

impl<T> Drop for ComputedInner<T> {
    fn drop(&mut self) {
        // Dependency sets hold the runner strongly; leave them so the getter
        // is released with the cell.
        self.runner.dispose();
    }
}

/// A lazily evaluated, cached value derived from other reactive values.
///
/// Cloning a `Computed` creates another handle to the same cache.
///
/// # Example
///
/// ```rust
/// use weft_core::{computed, ref_cell};
///
/// let price = ref_cell(10);
/// let quantity = ref_cell(5);
///
/// let (p, q) = (price.clone(), quantity.clone());
/// let total = computed(move || p.get() * q.get());
///
/// assert_eq!(total.get(), 50);
/// price.set(20);
/// assert!(total.is_dirty());
/// assert_eq!(total.get(), 100);
/// ```
pub struct Computed<T> {
    inner: Rc<ComputedInner<T>>,
}

impl<T> Computed<T>
where
    T: Clone + 'static,
{
    /// Create a cell. The getter first runs on the first read.
    pub fn new<F>(getter: F) -> Self
    where
        F: Fn() -> T + 'static,
    {
        let identity = Identity::new();
        let id = identity.id();
        let state = Rc::new(ComputedState {
            value: RefCell::new(None),
            dirty: Cell::new(true),
        });

        let body_state = Rc::clone(&state);
        let scheduler_state = Rc::clone(&state);
        let runner = Effect::with_options(
            move || {
                let value = getter();
                let previous = body_state.value.replace(Some(value));
                body_state.dirty.set(false);
                drop(previous);
            },
            EffectOptions::new().lazy().scheduler(move |_| {
                scheduler_state.dirty.set(true);
                Runtime::trigger(id, &Key::Value);
            }),
        );

        Self {
            inner: Rc::new(ComputedInner {
                identity,
                state,
                runner,
            }),
        }
    }

    /// Read the value, recomputing first if a dependency changed.
    ///
    /// Registers the caller as a dependent of this cell.
    pub fn get(&self) -> T {
        Runtime::track(self.id(), &Key::Value);

        if self.inner.state.dirty.get() {
            self.inner.runner.run();
        }

        self.inner
            .state
            .value
            .borrow()
            .clone()
            .expect("computed cell should hold a value after its getter ran")
    }

    /// Read the value without registering the caller.
    pub fn get_untracked(&self) -> T {
        untrack(|| self.get())
    }
}

impl<T> Computed<T> {
    /// Identity used for this cell's dependents.
    pub fn id(&self) -> TargetId {
        self.inner.identity.id()
    }

    /// Check if the next read will run the getter.
    pub fn is_dirty(&self) -> bool {
        self.inner.state.dirty.get()
    }

    /// Check if the cell has a cached value.
    pub fn has_value(&self) -> bool {
        self.inner.state.value.borrow().is_some()
    }

    /// Number of times the getter has run to completion.
    pub fn compute_count(&self) -> usize {
        self.inner.runner.run_count()
    }

    /// Number of subscribers that read this cell.
    pub fn dependent_count(&self) -> usize {
        Runtime::subscriber_count(self.id(), &Key::Value)
    }
}

impl<T> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Computed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computed")
            .field("id", &self.id())
            .field("cached", &self.inner.state.value.borrow())
            .field("dirty", &self.is_dirty())
            .finish()
    }
}

/// Create a lazily evaluated, cached derived value.
pub fn computed<T, F>(getter: F) -> Computed<T>
where
    T: Clone + 'static,
    F: Fn() -> T + 'static,
{
    Computed::new(getter)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
