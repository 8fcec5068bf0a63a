//! Weft Core
//!
//! A fine-grained reactive engine. Given mutable state, it records which
//! derived values and side effects read which pieces of it, and re-runs
//! exactly the affected ones when that state changes.
//!
//! It provides four entry points:
//!
//! - [`reactive`]: deep, lazily wrapped, trackable records and lists
//! - [`effect`]: a function that re-runs when anything it read changes
//! - [`computed`]: a cached derived value, recomputed lazily on read
//! - [`ref_cell`]: a single tracked slot whose writes always notify
//!
//! Everything runs synchronously on the calling thread: a write returns
//! after every subscriber it affected has run.
//!
//! # Architecture
//!
//! - `reactive`: the tracking engine (registry, effects, computed, refs)
//! - `object`: raw targets, values and the tracked views over them
//! - `config`: per-thread runtime settings
//! - `error`: the crate error type
//!
//! # Example
//!
//! ```rust
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use weft_core::{computed, effect, Reactive};
//!
//! let state = Reactive::from_json(serde_json::json!({"price": 10, "quantity": 5})).unwrap();
//!
//! let view = state.clone();
//! let total = computed(move || {
//!     let price = view.get("price").unwrap().as_f64().unwrap_or_default();
//!     let quantity = view.get("quantity").unwrap().as_f64().unwrap_or_default();
//!     price * quantity
//! });
//!
//! let shown = Rc::new(Cell::new(0.0));
//! let (total_clone, shown_clone) = (total.clone(), shown.clone());
//! let _display = effect(move || shown_clone.set(total_clone.get()));
//!
//! state.set("price", 20).unwrap();
//! assert_eq!(shown.get(), 100.0);
//! ```

pub mod config;
pub mod error;
pub mod object;
pub mod reactive;

pub use config::RuntimeConfig;
pub use error::{Error, Result};
pub use object::{reactive, Key, Reactive, Target, TargetKind, Value, MAX_LIST_LEN};
pub use reactive::{
    computed, effect, effect_with, ref_cell, untrack, Computed, Effect, EffectOptions, Ref,
    Runtime, Scheduler, SubscriberId, TargetId,
};
