//! Runtime Configuration
//!
//! The engine has a single tunable: how often one subscriber may be notified
//! again while an earlier notification of it is still running. Only a
//! dependency cycle can re-enter a subscriber, so acyclic trigger chains of
//! any length are unaffected. Hosts can build a [`RuntimeConfig`] in code
//! or load it from a JSON document, then install it for the current thread
//! with [`Runtime::configure`](crate::reactive::Runtime::configure).

use serde::{Deserialize, Serialize};

/// Default limit on re-entrant notifications of one subscriber.
pub const DEFAULT_MAX_REENTRY: usize = 8;

/// Per-thread runtime settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Maximum number of times a subscriber may be re-entered by dispatch.
    ///
    /// `Some(0)` rejects the first re-entry. `None` disables the guard, so
    /// indirect subscriber cycles recurse until the stack overflows.
    pub max_reentry: Option<usize>,
}

impl RuntimeConfig {
    /// Configuration with the cycle guard disabled.
    pub fn unbounded() -> Self {
        Self { max_reentry: None }
    }

    /// Set the re-entry limit.
    pub fn with_max_reentry(mut self, limit: usize) -> Self {
        self.max_reentry = Some(limit);
        self
    }

    /// Parse a configuration document. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_reentry: Some(DEFAULT_MAX_REENTRY),
        }
    }
}
