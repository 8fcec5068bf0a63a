//! Raw targets.
//!
//! A [`Target`] is the plain, untracked object behind every reactive view.
//! Reading or writing it directly never touches the registry; go through
//! [`reactive`](super::reactive) for tracked access.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::fmt;
use std::mem;
use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::Value as JsonValue;

use super::value::{Key, Value};
use crate::error::{Error, Result};
use crate::reactive::{Identity, TargetId};

/// Shape of a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    /// Ordered, string-keyed fields.
    Record,
    /// Indexed slots with a length.
    List,
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetKind::Record => f.write_str("record"),
            TargetKind::List => f.write_str("list"),
        }
    }
}

enum TargetData {
    Record(IndexMap<String, Value>),
    List(Vec<Value>),
}

impl TargetData {
    fn kind(&self) -> TargetKind {
        match self {
            TargetData::Record(_) => TargetKind::Record,
            TargetData::List(_) => TargetKind::List,
        }
    }
}

struct TargetCell {
    identity: Identity,
    /// Set the first time the target is wrapped.
    reactive: Cell<bool>,
    data: RefCell<TargetData>,
}

/// What a raw write did, for deciding which keys to trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct WriteOutcome {
    /// The stored value is not strictly equal to the previous one.
    pub(crate) changed: bool,
    /// A record field was created.
    pub(crate) added: bool,
    /// A list's length changed.
    pub(crate) len_changed: bool,
}

/// A shared raw object.
///
/// Cloning a `Target` yields another reference to the same object; the
/// registry entry for it is removed when the last reference is dropped.
///
/// An effect whose body captures a view of the target holds such a reference,
/// and the registry holds the effect until it is disposed. Dispose effects to
/// release the targets they read. Targets that reference each other in a
/// cycle are never dropped.
#[derive(Clone)]
pub struct Target {
    cell: Rc<TargetCell>,
}

impl Target {
    fn with_data(data: TargetData) -> Self {
        Self {
            cell: Rc::new(TargetCell {
                identity: Identity::new(),
                reactive: Cell::new(false),
                data: RefCell::new(data),
            }),
        }
    }

    /// Create an empty record.
    pub fn record() -> Self {
        Self::with_data(TargetData::Record(IndexMap::new()))
    }

    /// Create an empty list.
    pub fn list() -> Self {
        Self::with_data(TargetData::List(Vec::new()))
    }

    /// Create a record from `(name, value)` pairs.
    pub fn from_fields<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let fields = fields
            .into_iter()
            .map(|(name, value)| (name.into(), value.into()))
            .collect();
        Self::with_data(TargetData::Record(fields))
    }

    /// Create a list from values.
    pub fn from_values<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::with_data(TargetData::List(values.into_iter().map(Into::into).collect()))
    }

    pub fn id(&self) -> TargetId {
        self.cell.identity.id()
    }

    pub fn kind(&self) -> TargetKind {
        self.cell.data.borrow().kind()
    }

    /// Check if the target has been wrapped.
    pub fn is_reactive(&self) -> bool {
        self.cell.reactive.get()
    }

    pub(crate) fn mark_reactive(&self) {
        self.cell.reactive.set(true);
    }

    /// Check if both handles refer to the same object.
    pub fn ptr_eq(&self, other: &Target) -> bool {
        Rc::ptr_eq(&self.cell, &other.cell)
    }

    /// Convert a key into the form this target stores and tracks it under.
    pub fn normalize_key(&self, key: impl Into<Key>) -> Result<Key> {
        key.into().normalize(self.kind())
    }

    /// Read a slot without tracking. Missing slots read as `Null`.
    pub fn get_raw(&self, key: impl Into<Key>) -> Result<Value> {
        let key = self.normalize_key(key)?;
        Ok(self.read(&key))
    }

    /// Write a slot without triggering anything.
    pub fn set_raw(&self, key: impl Into<Key>, value: impl Into<Value>) -> Result<()> {
        let key = self.normalize_key(key)?;
        self.write(&key, value.into()).map(|_| ())
    }

    /// Remove a slot without triggering anything.
    pub fn remove_raw(&self, key: impl Into<Key>) -> Result<bool> {
        let key = self.normalize_key(key)?;
        Ok(self.delete(&key))
    }

    /// Number of fields or slots, without tracking.
    pub fn len_raw(&self) -> usize {
        match &*self.cell.data.borrow() {
            TargetData::Record(fields) => fields.len(),
            TargetData::List(items) => items.len(),
        }
    }

    /// Field names or slot indices, in order, without tracking.
    pub fn keys_raw(&self) -> Vec<Key> {
        match &*self.cell.data.borrow() {
            TargetData::Record(fields) => fields.keys().cloned().map(Key::Field).collect(),
            TargetData::List(items) => (0..items.len()).map(Key::Index).collect(),
        }
    }

    /// Deep copy to JSON. Fails if the object graph contains a cycle.
    pub fn snapshot(&self) -> Result<JsonValue> {
        self.snapshot_guarded(&mut HashSet::new())
    }

    pub(crate) fn snapshot_guarded(&self, visiting: &mut HashSet<TargetId>) -> Result<JsonValue> {
        if !visiting.insert(self.id()) {
            return Err(Error::CyclicSnapshot);
        }

        let json = match &*self.cell.data.borrow() {
            TargetData::Record(fields) => JsonValue::Object(
                fields
                    .iter()
                    .map(|(name, value)| -> Result<(String, JsonValue)> {
                        Ok((name.clone(), value.snapshot_guarded(visiting)?))
                    })
                    .collect::<Result<_>>()?,
            ),
            TargetData::List(items) => JsonValue::Array(
                items
                    .iter()
                    .map(|value| value.snapshot_guarded(visiting))
                    .collect::<Result<_>>()?,
            ),
        };

        visiting.remove(&self.id());
        Ok(json)
    }

    // Key-level operations below take keys already normalised for this target.

    pub(crate) fn read(&self, key: &Key) -> Value {
        match (&*self.cell.data.borrow(), key) {
            (TargetData::Record(fields), Key::Field(name)) => {
                fields.get(name).cloned().unwrap_or_default()
            }
            (TargetData::List(items), Key::Index(i)) => items.get(*i).cloned().unwrap_or_default(),
            (TargetData::List(items), Key::Length) => Value::from(items.len()),
            _ => Value::Null,
        }
    }

    pub(crate) fn contains(&self, key: &Key) -> bool {
        match (&*self.cell.data.borrow(), key) {
            (TargetData::Record(fields), Key::Field(name)) => fields.contains_key(name),
            (TargetData::List(items), Key::Index(i)) => *i < items.len(),
            (TargetData::List(_), Key::Length) => true,
            _ => false,
        }
    }

    pub(crate) fn write(&self, key: &Key, value: Value) -> Result<WriteOutcome> {
        // Replaced values are released after the borrow below ends.
        let mut discarded = Vec::new();
        let mut data = self.cell.data.borrow_mut();

        match (&mut *data, key) {
            (TargetData::Record(fields), Key::Field(name)) => match fields.get_mut(name) {
                Some(slot) => {
                    let changed = !slot.strict_eq(&value);
                    discarded.push(mem::replace(slot, value));
                    Ok(WriteOutcome {
                        changed,
                        added: false,
                        len_changed: false,
                    })
                }
                None => {
                    let changed = !value.is_null();
                    fields.insert(name.clone(), value);
                    Ok(WriteOutcome {
                        changed,
                        added: true,
                        len_changed: false,
                    })
                }
            },
            (TargetData::List(items), Key::Index(i)) => {
                let i = *i;
                if let Some(slot) = items.get_mut(i) {
                    let changed = !slot.strict_eq(&value);
                    discarded.push(mem::replace(slot, value));
                    Ok(WriteOutcome {
                        changed,
                        added: false,
                        len_changed: false,
                    })
                } else {
                    let changed = !value.is_null();
                    items.resize(i, Value::Null);
                    items.push(value);
                    Ok(WriteOutcome {
                        changed,
                        added: false,
                        len_changed: true,
                    })
                }
            }
            (TargetData::List(items), Key::Length) => {
                let len = value.as_length().ok_or_else(|| Error::InvalidLength {
                    value: format!("{value:?}"),
                })?;
                let len_changed = len != items.len();
                if len < items.len() {
                    discarded.extend(items.drain(len..));
                } else {
                    items.resize(len, Value::Null);
                }
                Ok(WriteOutcome {
                    changed: len_changed,
                    added: false,
                    len_changed,
                })
            }
            (data, key) => Err(Error::InvalidKey {
                key: key.clone(),
                kind: data.kind(),
            }),
        }
    }

    /// Remove a field, or punch a hole in a list slot. Returns whether
    /// anything was there.
    pub(crate) fn delete(&self, key: &Key) -> bool {
        let removed = {
            let mut data = self.cell.data.borrow_mut();
            match (&mut *data, key) {
                (TargetData::Record(fields), Key::Field(name)) => fields.shift_remove(name),
                (TargetData::List(items), Key::Index(i)) if *i < items.len() => {
                    Some(mem::take(&mut items[*i]))
                }
                _ => None,
            }
        };
        removed.is_some()
    }

    /// Remove the last list slot, returning its index and value.
    pub(crate) fn pop_slot(&self) -> Result<Option<(usize, Value)>> {
        match &mut *self.cell.data.borrow_mut() {
            TargetData::List(items) => Ok(items.pop().map(|value| (items.len(), value))),
            TargetData::Record(_) => Err(Error::KindMismatch {
                expected: TargetKind::List,
                found: TargetKind::Record,
            }),
        }
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Shallow: object graphs may be cyclic.
        let kind = self.cell.data.try_borrow().map(|data| data.kind()).ok();
        f.debug_struct("Target")
            .field("id", &self.id())
            .field("kind", &kind)
            .field("reactive", &self.is_reactive())
            .finish()
    }
}
