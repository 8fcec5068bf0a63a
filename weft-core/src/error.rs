//! Error types for the reactive engine.
//!
//! Only API misuse is reported through [`Error`]. Failures inside subscriber
//! bodies are panics and propagate to whoever caused the run.

use thiserror::Error;

use crate::object::{Key, TargetKind};

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the reactive engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// The key cannot address a slot of a target of this kind.
    #[error("key {key} is not valid for a {kind} target")]
    InvalidKey { key: Key, kind: TargetKind },

    /// Navigation expected an object but found a primitive or nothing.
    #[error("value at {key} is not an object")]
    NotAnObject { key: Key },

    /// Only records and lists can be made reactive.
    #[error("only records and lists can be made reactive")]
    NotATarget,

    /// The operation only applies to targets of another kind.
    #[error("expected a {expected} target, found a {found}")]
    KindMismatch {
        expected: TargetKind,
        found: TargetKind,
    },

    /// A list length must be a non-negative integer.
    #[error("{value} is not a valid list length")]
    InvalidLength { value: String },

    /// A snapshot reached a target that is already being serialized.
    #[error("object graph contains a cycle and cannot be snapshotted")]
    CyclicSnapshot,

    /// A subscriber was notified again while its earlier notifications were
    /// still running, more often than the configured limit allows.
    #[error("subscriber {subscriber} re-entered more than {limit} times; subscribers form a cycle")]
    CycleDetected { subscriber: u64, limit: usize },
}
