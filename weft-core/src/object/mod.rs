//! Reactive Objects
//!
//! This module makes arbitrary nested records and lists trackable.
//!
//! - [`Target`] is the raw object: shared, mutable, untracked.
//! - [`Reactive`] is a view over a target whose reads track and whose writes
//!   trigger, with nested objects wrapped lazily on access.
//! - [`Value`] and [`Key`] are the dynamic values and property keys stored in
//!   and used to address targets.
//!
//! Dependencies are always registered against the raw target's identity, so
//! all views of one object observe the same changes.

mod target;
mod value;
mod wrapper;

pub use target::{Target, TargetKind};
pub use value::{Key, Value, MAX_LIST_LEN};
pub use wrapper::{reactive, Reactive};
