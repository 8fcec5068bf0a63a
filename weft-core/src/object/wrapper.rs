//! Tracked views over raw targets.
//!
//! [`Reactive`] is the intercepting layer: reads go through
//! [`Runtime::track`], writes and removals go through [`Runtime::trigger`].
//! Views hold no state of their own. The reactive marker and the dependency
//! map both belong to the raw target, so wrapping a target twice, or wrapping
//! a target reached through another view, yields views that share everything.
//!
//! Nested objects become reactive lazily, when first read through a view.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use serde_json::Value as JsonValue;

use super::target::{Target, TargetKind};
use super::value::{Key, Value};
use crate::error::{Error, Result};
use crate::reactive::{Runtime, TargetId};

/// Wrap a raw target for tracked access.
///
/// Marks the target reactive. Wrapping is idempotent: every view over the
/// same raw target shares one dependency map.
pub fn reactive(target: &Target) -> Reactive {
    target.mark_reactive();
    Reactive {
        raw: target.clone(),
    }
}

/// A tracked view over a raw [`Target`].
///
/// # Example
///
/// ```rust
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use weft_core::{effect, Reactive};
///
/// let state = Reactive::from_json(serde_json::json!({"a": 1, "b": 2})).unwrap();
/// let sum = Rc::new(Cell::new(0.0));
///
/// let (view, out) = (state.clone(), sum.clone());
/// let _effect = effect(move || {
///     let a = view.get("a").unwrap().as_f64().unwrap_or_default();
///     let b = view.get("b").unwrap().as_f64().unwrap_or_default();
///     out.set(a + b);
/// });
///
/// state.set("a", 5).unwrap();
/// assert_eq!(sum.get(), 7.0);
/// ```
#[derive(Clone)]
pub struct Reactive {
    raw: Target,
}

impl Reactive {
    /// Wrap a new empty record.
    pub fn record() -> Self {
        reactive(&Target::record())
    }

    /// Wrap a new empty list.
    pub fn list() -> Self {
        reactive(&Target::list())
    }

    /// Build raw targets from a JSON array or object and wrap the root.
    pub fn from_json(json: JsonValue) -> Result<Self> {
        Value::from(json).as_reactive().ok_or(Error::NotATarget)
    }

    /// Identity of the raw target.
    pub fn id(&self) -> TargetId {
        self.raw.id()
    }

    pub fn kind(&self) -> TargetKind {
        self.raw.kind()
    }

    /// The raw target behind this view.
    pub fn raw(&self) -> &Target {
        &self.raw
    }

    pub fn to_raw(&self) -> Target {
        self.raw.clone()
    }

    /// Read a property, registering the active subscriber on it.
    ///
    /// Nested objects are marked reactive before being returned; use
    /// [`Value::as_reactive`] or [`object`](Self::object) to get their view.
    pub fn get(&self, key: impl Into<Key>) -> Result<Value> {
        let key = self.raw.normalize_key(key)?;
        Runtime::track(self.id(), &key);

        let value = self.raw.read(&key);
        if let Value::Object(nested) = &value {
            nested.mark_reactive();
        }
        Ok(value)
    }

    /// Read a property that must hold an object and return its view.
    pub fn object(&self, key: impl Into<Key>) -> Result<Reactive> {
        let key = key.into();
        self.get(key.clone())?
            .as_reactive()
            .ok_or(Error::NotAnObject { key })
    }

    /// Write a property.
    ///
    /// Dependents of the key are notified only if the new value is not
    /// strictly equal to the old one. List index writes also notify `length`
    /// dependents; creating a record field also notifies key-set dependents.
    pub fn set(&self, key: impl Into<Key>, value: impl Into<Value>) -> Result<()> {
        let key = self.raw.normalize_key(key)?;
        let outcome = self.raw.write(&key, value.into())?;

        let mut keys = Vec::with_capacity(2);
        if outcome.changed {
            keys.push(key.clone());
        }
        match key {
            Key::Index(_) if outcome.changed || outcome.len_changed => keys.push(Key::Length),
            Key::Field(_) if outcome.added => keys.push(Key::Keys),
            _ => {}
        }

        self.trigger_all(&keys);
        Ok(())
    }

    /// Remove a property. Returns whether anything was removed.
    ///
    /// Record fields are deleted; list slots become `Null` holes and the
    /// length is kept. A list's `length` cannot be removed.
    pub fn remove(&self, key: impl Into<Key>) -> Result<bool> {
        let key = self.raw.normalize_key(key)?;
        if !self.raw.delete(&key) {
            return Ok(false);
        }

        match self.kind() {
            TargetKind::Record => self.trigger_all(&[key, Key::Keys]),
            TargetKind::List => self.trigger_all(&[key]),
        }
        Ok(true)
    }

    /// Check whether a property exists, tracking it.
    pub fn has(&self, key: impl Into<Key>) -> Result<bool> {
        let key = self.raw.normalize_key(key)?;
        Runtime::track(self.id(), &key);
        Ok(self.raw.contains(&key))
    }

    /// Number of fields or slots, tracking the key set or the length.
    pub fn len(&self) -> usize {
        Runtime::track(self.id(), &self.shape_key());
        self.raw.len_raw()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Field names or slot indices, tracking the key set or the length.
    pub fn keys(&self) -> Vec<Key> {
        Runtime::track(self.id(), &self.shape_key());
        self.raw.keys_raw()
    }

    /// Append to a list.
    pub fn push(&self, value: impl Into<Value>) -> Result<()> {
        self.expect_list()?;
        self.set(Key::Index(self.raw.len_raw()), value)
    }

    /// Remove and return the last slot of a list.
    pub fn pop(&self) -> Result<Option<Value>> {
        let Some((index, value)) = self.raw.pop_slot()? else {
            return Ok(None);
        };

        if let Value::Object(nested) = &value {
            nested.mark_reactive();
        }
        self.trigger_all(&[Key::Index(index), Key::Length]);
        Ok(Some(value))
    }

    /// Deep copy to JSON without tracking.
    pub fn snapshot(&self) -> Result<JsonValue> {
        self.raw.snapshot()
    }

    /// Number of subscribers registered on a property.
    pub fn subscriber_count(&self, key: impl Into<Key>) -> Result<usize> {
        let key = self.raw.normalize_key(key)?;
        Ok(Runtime::subscriber_count(self.id(), &key))
    }

    /// Key whose dependents care about insertions and removals.
    fn shape_key(&self) -> Key {
        match self.kind() {
            TargetKind::Record => Key::Keys,
            TargetKind::List => Key::Length,
        }
    }

    fn expect_list(&self) -> Result<()> {
        match self.kind() {
            TargetKind::List => Ok(()),
            found => Err(Error::KindMismatch {
                expected: TargetKind::List,
                found,
            }),
        }
    }

    /// Trigger each key in turn; a panic from one key's dispatch is resumed
    /// only after the remaining keys have been dispatched.
    fn trigger_all(&self, keys: &[Key]) {
        let id = self.id();
        let mut failure = None;

        for key in keys {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| Runtime::trigger(id, key))) {
                failure.get_or_insert(payload);
            }
        }

        if let Some(payload) = failure {
            panic::resume_unwind(payload);
        }
    }
}

impl PartialEq for Reactive {
    fn eq(&self, other: &Self) -> bool {
        self.raw.ptr_eq(&other.raw)
    }
}

impl fmt::Debug for Reactive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Reactive").field(&self.raw).finish()
    }
}
