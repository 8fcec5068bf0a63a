//! Effect Implementation
//!
//! An Effect is a side-effecting computation that runs whenever its
//! dependencies change.
//!
//! # How Effects Work
//!
//! 1. When created, the effect runs its function immediately to establish
//!    initial dependencies (unless it is lazy).
//!
//! 2. When any dependency changes, the effect re-runs synchronously, or its
//!    scheduler is called instead if one was supplied.
//!
//! 3. Before re-running, the effect leaves every dependency set it joined and
//!    tracks new ones during execution. Branches not taken in the latest run
//!    therefore stop triggering it.
//!
//! # Differences from Computed
//!
//! - Computed cells return a value; effects do not.
//! - Computed cells are lazy (compute on access); effects are eager.
//! - Computed cells are effects whose scheduler only marks the cache dirty.

use std::fmt;
use std::rc::Rc;

use super::subscriber::{Subscriber, SubscriberId};

/// Dispatch override: called with the effect instead of re-running it.
pub type Scheduler = Rc<dyn Fn(&Effect)>;

/// Options accepted by [`effect_with`].
#[derive(Clone, Default)]
pub struct EffectOptions {
    /// Called instead of re-running the body when a dependency changes.
    pub scheduler: Option<Scheduler>,

    /// Skip the run at construction.
    pub lazy: bool,
}

impl EffectOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the dispatch override.
    pub fn scheduler<F>(mut self, scheduler: F) -> Self
    where
        F: Fn(&Effect) + 'static,
    {
        self.scheduler = Some(Rc::new(scheduler));
        self
    }

    /// Do not run the effect when it is created.
    pub fn lazy(mut self) -> Self {
        self.lazy = true;
        self
    }
}

impl fmt::Debug for EffectOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectOptions")
            .field("scheduler", &self.scheduler.is_some())
            .field("lazy", &self.lazy)
            .finish()
    }
}

/// A side-effecting computation that runs when dependencies change.
///
/// Cloning an `Effect` creates another handle to the same runner.
///
/// # Example
///
/// ```rust
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use weft_core::{effect, ref_cell};
///
/// let count = ref_cell(0);
/// let seen = Rc::new(Cell::new(0));
///
/// let (count_clone, seen_clone) = (count.clone(), seen.clone());
/// let _effect = effect(move || seen_clone.set(count_clone.get()));
///
/// count.set(5);
/// assert_eq!(seen.get(), 5);
/// ```
#[derive(Clone)]
pub struct Effect {
    subscriber: Rc<Subscriber>,
}

impl Effect {
    /// Create an effect and run it immediately.
    pub fn new<F>(run: F) -> Self
    where
        F: Fn() + 'static,
    {
        Self::with_options(run, EffectOptions::default())
    }

    /// Create an effect without running it.
    ///
    /// It tracks nothing until [`run`](Self::run) is called.
    pub fn new_lazy<F>(run: F) -> Self
    where
        F: Fn() + 'static,
    {
        Self::with_options(run, EffectOptions::new().lazy())
    }

    /// Create an effect with explicit options.
    pub fn with_options<F>(run: F, options: EffectOptions) -> Self
    where
        F: Fn() + 'static,
    {
        let effect = Self {
            subscriber: Subscriber::new(Box::new(run), options.scheduler),
        };

        if !options.lazy {
            effect.run();
        }

        effect
    }

    pub(crate) fn from_subscriber(subscriber: Rc<Subscriber>) -> Self {
        Self { subscriber }
    }

    /// Get the effect's unique ID.
    pub fn id(&self) -> SubscriberId {
        self.subscriber.id()
    }

    /// Run the effect now, re-collecting its dependencies.
    ///
    /// A panic in the body propagates after the reactive context has been
    /// restored.
    pub fn run(&self) {
        self.subscriber.run();
    }

    /// Detach the effect from all of its dependencies.
    ///
    /// After disposal, the effect will not run again. Dependency sets hold
    /// live effects, so an effect that is never disposed keeps the targets its
    /// body captured alive even after every handle to it is dropped.
    pub fn dispose(&self) {
        self.subscriber.dispose();
    }

    /// Check if the effect has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.subscriber.is_disposed()
    }

    /// Get the number of times the effect has run to completion.
    pub fn run_count(&self) -> usize {
        self.subscriber.run_count()
    }

    /// Get the number of dependency sets the effect belongs to.
    pub fn dependency_count(&self) -> usize {
        self.subscriber.dependency_count()
    }
}

impl PartialEq for Effect {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.subscriber, &other.subscriber)
    }
}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.id())
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Run `f` now and again whenever anything it read changes.
pub fn effect<F>(f: F) -> Effect
where
    F: Fn() + 'static,
{
    Effect::new(f)
}

/// Like [`effect`], with a scheduler and/or lazy start.
pub fn effect_with<F>(f: F, options: EffectOptions) -> Effect
where
    F: Fn() + 'static,
{
    Effect::with_options(f, options)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
