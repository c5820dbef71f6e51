//! Four-state lifecycle of an operation
//!
//! The current state is kept in an atomic word, so that predicates can be
//! evaluated from any thread without ever waiting on a transition in
//! progress. Transitions themselves are serialized by a lock, which also
//! protects the observers and the polling monitor they notify.

use crate::monitor::{self, StateFeed, StateMonitor};
use crate::observer::ObserverSet;
use crate::status::OperationState;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU8, Ordering};
use tokio_util::sync::CancellationToken;
use tracing::trace;


/// Forward-only lifecycle state machine with observer notifications
pub struct OperationStateMachine {
    /// Current state, encoded with OperationState::to_bits
    state: AtomicU8,

    /// Transition lock and everything transitions must notify
    transitions: Mutex<Transitions>,

    /// Reading end of the polling monitor, until somebody claims it
    monitor: Mutex<Option<StateMonitor>>,

    /// Cancellation signal of the surrounding scope, if any
    scope: Option<CancellationToken>,
}
//
impl OperationStateMachine {
    /// Create a state machine in the Ready state
    pub fn new(observers: ObserverSet, scope: Option<CancellationToken>) -> Self {
        let (feed, monitor) = monitor::new_monitor(OperationState::Ready);
        OperationStateMachine {
            state: AtomicU8::new(OperationState::Ready.to_bits()),
            transitions: Mutex::new(Transitions { observers, feed }),
            monitor: Mutex::new(Some(monitor)),
            scope,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> OperationState {
        OperationState::from_bits(self.state.load(Ordering::Acquire))
    }

    /// Check if the operation is waiting to be started
    pub fn is_ready(&self) -> bool {
        self.state() == OperationState::Ready
    }

    /// Check if the work routine is running
    pub fn is_executing(&self) -> bool {
        self.state() == OperationState::Executing
    }

    /// Check if the work routine signalled completion
    pub fn is_finished(&self) -> bool {
        self.state() == OperationState::Finished
    }

    /// Check if the operation was cancelled, or if its scope was
    ///
    /// A cancelled scope makes this true for good, even while the local
    /// state has not caught up yet.
    ///
    pub fn is_cancelled(&self) -> bool {
        self.state() == OperationState::Cancelled || self.scope_cancelled()
    }

    /// Check if the surrounding scope signalled cancellation
    pub fn scope_cancelled(&self) -> bool {
        self.scope
            .as_ref()
            .map_or(false, CancellationToken::is_cancelled)
    }

    /// Cancellation signal of the surrounding scope, if any
    pub fn scope(&self) -> Option<&CancellationToken> {
        self.scope.as_ref()
    }

    /// Move to a new state, notifying observers before and after
    ///
    /// Returns whether the state changed. Moving to the current state does
    /// nothing, and so does any move the lifecycle graph forbids, such as
    /// leaving a final state.
    ///
    pub fn transition(&self, to: OperationState) -> bool {
        let mut transitions = self.transitions.lock();
        let from = self.state();
        if from == to || !from.can_transition_to(to) {
            trace!(from = from.key(), to = to.key(), "transition refused");
            return false;
        }

        transitions.observers.will_change(from, to);
        self.state.store(to.to_bits(), Ordering::Release);
        transitions.feed.publish(to);
        transitions.observers.did_change(from, to);
        true
    }

    /// Claim the polling monitor of this state machine
    ///
    /// There is only one monitor, so every call after the first one returns
    /// `None`.
    ///
    pub fn take_monitor(&self) -> Option<StateMonitor> {
        self.monitor.lock().take()
    }
}


/// State protected by the transition lock
struct Transitions {
    /// Observers notified around every transition
    observers: ObserverSet,

    /// Writing end of the polling monitor
    feed: StateFeed,
}
