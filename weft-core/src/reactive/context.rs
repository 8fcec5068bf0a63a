//! Reactive Context
//!
//! The reactive context tracks which computation is currently running.
//! This enables automatic dependency tracking: when a tracked value is read,
//! the current computation is registered as a dependent.
//!
//! # Implementation
//!
//! We use a thread-local stack to track the currently executing computation.
//! When entering a reactive context (running an effect or a computed getter),
//! we push the subscriber onto the stack. When the computation completes, the
//! guard pops it, which restores the previous subscriber as the active one.
//!
//! An entry may also be empty: [`untrack`] pushes one so that reads inside it
//! register nothing, even when called from within an effect.

use std::cell::RefCell;
use std::rc::Rc;

use super::subscriber::{Subscriber, SubscriberId};

thread_local! {
    static CONTEXT_STACK: RefCell<Vec<ContextEntry>> = const { RefCell::new(Vec::new()) };
}

/// An entry in the reactive context stack.
struct ContextEntry {
    /// The running computation, or `None` for an untracked scope.
    subscriber: Option<Rc<Subscriber>>,
}

impl ContextEntry {
    fn id(&self) -> Option<SubscriberId> {
        self.subscriber.as_ref().map(|subscriber| subscriber.id())
    }
}

/// Guard that pops the context when dropped.
///
/// This ensures the context stack is properly maintained even if
/// the computation panics.
pub struct ReactiveContext {
    subscriber_id: Option<SubscriberId>,
}

impl ReactiveContext {
    /// Enter a new reactive context for the given subscriber.
    pub(crate) fn enter(subscriber: Rc<Subscriber>) -> Self {
        let subscriber_id = Some(subscriber.id());
        Self::push(ContextEntry {
            subscriber: Some(subscriber),
        });
        Self { subscriber_id }
    }

    /// Enter a scope in which reads are not tracked.
    pub(crate) fn enter_untracked() -> Self {
        Self::push(ContextEntry { subscriber: None });
        Self {
            subscriber_id: None,
        }
    }

    fn push(entry: ContextEntry) {
        CONTEXT_STACK.with(|stack| stack.borrow_mut().push(entry));
    }

    /// Check if reads are currently being tracked.
    pub fn is_active() -> bool {
        Self::current_subscriber().is_some()
    }

    /// Get the ID of the active subscriber, if any.
    pub fn current_subscriber() -> Option<SubscriberId> {
        CONTEXT_STACK.with(|stack| stack.borrow().last().and_then(ContextEntry::id))
    }

    /// Number of entries on the stack, tracked or not.
    pub fn depth() -> usize {
        CONTEXT_STACK.with(|stack| stack.borrow().len())
    }

    pub(crate) fn current() -> Option<Rc<Subscriber>> {
        CONTEXT_STACK.with(|stack| {
            stack
                .borrow()
                .last()
                .and_then(|entry| entry.subscriber.clone())
        })
    }
}

impl Drop for ReactiveContext {
    fn drop(&mut self) {
        // Keep the entry alive until the stack borrow is released; dropping
        // the last handle to a subscriber can run arbitrary destructors.
        let popped = CONTEXT_STACK.with(|stack| stack.borrow_mut().pop());

        if let Some(entry) = &popped {
            debug_assert_eq!(
                entry.id(),
                self.subscriber_id,
                "ReactiveContext mismatch: expected {:?}, got {:?}",
                self.subscriber_id,
                entry.id()
            );
        }
    }
}

/// Run `f` without tracking any reads it performs.
///
/// The previous context is restored afterwards, including when `f` panics.
pub fn untrack<R>(f: impl FnOnce() -> R) -> R {
    let _ctx = ReactiveContext::enter_untracked();
    f()
}
