//! Observation of operation state changes
//!
//! Some owners of operations are not interested in their results, but need to
//! react whenever an operation flips from one lifecycle state to another, as
//! a task queue would do when deciding which operation to start next.
//!
//! Such observers are notified in two phases around every transition. First,
//! they are told that the state being entered and the state being left are
//! about to change. Then the state is mutated. Finally, they are told that
//! the state being left and the state being entered have changed. An
//! observer can therefore never see the new value before it was warned.
//!
//! Observers are executed inline, on the thread which drives the transition,
//! while the state machine holds its transition lock. They should be quick,
//! and must not start or cancel the operation they are observing.

pub mod log;

use crate::status::OperationState;
use std::fmt;
use std::sync::Arc;


/// Phase of a state change notification
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangePhase {
    /// The state is about to change
    Will,

    /// The state has changed
    Did,
}


/// Notification sent to state observers
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StateChange {
    /// Whether this notification precedes or follows the mutation
    pub phase: ChangePhase,

    /// Observer key of the state this notification is about
    pub key: &'static str,

    /// State being left
    pub from: OperationState,

    /// State being entered
    pub to: OperationState,
}


/// Entry point for code which wants to react to state changes
pub trait StateObserver: Send + Sync {
    /// Called twice before and twice after every state transition
    fn notify(&self, change: StateChange);
}
//
impl<F> StateObserver for F
where
    F: Fn(StateChange) + Send + Sync,
{
    fn notify(&self, change: StateChange) {
        self(change)
    }
}


/// Ordered collection of state observers
#[derive(Clone, Default)]
pub struct ObserverSet {
    observers: Vec<Arc<dyn StateObserver>>,
}
//
impl ObserverSet {
    /// Create an empty observer set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an observer at the end of the set
    pub fn push(&mut self, observer: Arc<dyn StateObserver>) {
        self.observers.push(observer);
    }

    /// Number of registered observers
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    /// Check if no observer is registered
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Warn every observer that `from` and `to` are about to change
    pub fn will_change(&self, from: OperationState, to: OperationState) {
        self.broadcast(ChangePhase::Will, to, from, to);
        self.broadcast(ChangePhase::Will, from, from, to);
    }

    /// Tell every observer that `from` and `to` have changed
    pub fn did_change(&self, from: OperationState, to: OperationState) {
        self.broadcast(ChangePhase::Did, from, from, to);
        self.broadcast(ChangePhase::Did, to, from, to);
    }

    fn broadcast(
        &self,
        phase: ChangePhase,
        subject: OperationState,
        from: OperationState,
        to: OperationState,
    ) {
        let change = StateChange {
            phase,
            key: subject.key(),
            from,
            to,
        };
        for observer in &self.observers {
            observer.notify(change);
        }
    }
}
//
impl fmt::Debug for ObserverSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverSet")
            .field("len", &self.observers.len())
            .finish()
    }
}
