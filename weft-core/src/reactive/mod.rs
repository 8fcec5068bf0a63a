//! Reactive Primitives
//!
//! This module implements the tracking engine: the dependency registry,
//! effects, computed cells and refs. Reactive objects built on top of it live
//! in [`crate::object`].
//!
//! # Concepts
//!
//! ## Effects
//!
//! An Effect runs a function immediately and re-runs it whenever a tracked
//! value it read changes. A scheduler can replace the re-run.
//!
//! ## Computed Cells
//!
//! A Computed is a derived value that caches its result. Dependency changes
//! only mark it dirty; it recomputes on the next read.
//!
//! ## Refs
//!
//! A Ref is a single tracked slot. Every write notifies dependents.
//!
//! # Implementation Notes
//!
//! The reactive system uses a thread-local stack to track which computation
//! is running. Reads call [`Runtime::track`], writes call
//! [`Runtime::trigger`], and both resolve to the subscriber sets held by the
//! runtime's registry.
//!
//! Everything is synchronous: a write returns only after every subscriber it
//! triggered, and everything they triggered in turn, has run.

mod cell;
mod computed;
mod context;
mod effect;
mod runtime;
mod subscriber;

pub use cell::{ref_cell, Ref};
pub use computed::{computed, Computed};
pub use context::{untrack, ReactiveContext};
pub use effect::{effect, effect_with, Effect, EffectOptions, Scheduler};
pub use runtime::{Runtime, TargetId};
pub use subscriber::SubscriberId;

pub(crate) use runtime::Identity;
