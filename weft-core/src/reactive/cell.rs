//! Ref Implementation
//!
//! A Ref is a single boxed value with tracked reads and writes, used for
//! primitives that cannot be wrapped as reactive objects.
//!
//! Unlike writes through a reactive object, [`Ref::set`] performs no equality
//! check: every write notifies dependents, even if the new value equals the
//! old one.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::runtime::{Identity, Runtime, TargetId};
use crate::object::Key;

struct RefInner<T> {
    identity: Identity,
    value: RefCell<T>,
}

/// A reactive cell holding a value of type `T`.
///
/// Cloning a `Ref` creates another handle to the same value.
///
/// # Example
///
/// ```rust
/// use weft_core::ref_cell;
///
/// let count = ref_cell(0);
/// count.set(5);
/// count.update(|v| v + 1);
/// assert_eq!(count.get(), 6);
/// ```
pub struct Ref<T> {
    inner: Rc<RefInner<T>>,
}

impl<T> Ref<T> {
    /// Create a new ref with the given initial value.
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(RefInner {
                identity: Identity::new(),
                value: RefCell::new(value),
            }),
        }
    }

    /// Identity used for this ref's dependents.
    pub fn id(&self) -> TargetId {
        self.inner.identity.id()
    }

    /// Borrow the value, registering the caller as a dependent.
    ///
    /// Writing to this ref from inside `f` panics.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        Runtime::track(self.id(), &Key::Value);
        f(&self.inner.value.borrow())
    }

    /// Store a new value and notify every dependent.
    pub fn set(&self, value: T) {
        let previous = self.inner.value.replace(value);
        drop(previous);
        Runtime::trigger(self.id(), &Key::Value);
    }

    /// Replace the value with `f(&current)`.
    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        let next = f(&self.inner.value.borrow());
        self.set(next);
    }

    /// Number of subscribers that read this ref.
    pub fn subscriber_count(&self) -> usize {
        Runtime::subscriber_count(self.id(), &Key::Value)
    }
}

impl<T: Clone> Ref<T> {
    /// Get the current value, registering the caller as a dependent.
    pub fn get(&self) -> T {
        self.with(T::clone)
    }

    /// Get the current value without tracking.
    pub fn get_untracked(&self) -> T {
        self.inner.value.borrow().clone()
    }
}

impl<T> Clone for Ref<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Ref<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ref")
            .field("id", &self.id())
            .field("value", &self.inner.value.borrow())
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

/// Create a reactive cell around `value`.
pub fn ref_cell<T>(value: T) -> Ref<T> {
    Ref::new(value)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
