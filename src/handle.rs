//! Externally visible operations
//!
//! An operation handle is what the owner of a unit of work manipulates. It
//! is created ready, started once, and cancelled at will. Starting it hands a
//! work routine the handle itself, through which the routine reports status
//! and publishes its outcome, along with a completion callback which the
//! routine invokes when it is done.
//!
//! Starting returns as soon as the work routine returns, and routines are
//! expected to move their actual work to a task of their own. Consumers
//! follow that work through the status stream and the final value, both of
//! which are provided by the coordinator the handle owns.

use crate::cancel::{CancelPeer, Cancellable};
use crate::channel::StatusChannel;
use crate::config::OperationBuilder;
use crate::coordinator::{Outcome, ResultCoordinator};
use crate::error::StatusClosed;
use crate::machine::OperationStateMachine;
use crate::monitor::StateMonitor;
use crate::status::{OperationState, OperationTypes};
use parking_lot::Mutex;
use std::borrow::Cow;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};


/// Work performed by an operation once started
///
/// A routine must publish exactly one outcome through
/// [`OperationHandle::finish`] before invoking its completion callback. It
/// should check [`OperationHandle::is_cancelled`] between steps, since
/// cancellation never interrupts it on its own.
///
pub trait WorkRoutine<T: OperationTypes>: Send + 'static {
    /// Start the work, and arrange for `done` to be invoked once it is over
    fn run(self: Box<Self>, operation: Arc<OperationHandle<T>>, done: Completion<T>);
}
//
impl<T, W> WorkRoutine<T> for W
where
    T: OperationTypes,
    W: FnOnce(Arc<OperationHandle<T>>, Completion<T>) + Send + 'static,
{
    fn run(self: Box<Self>, operation: Arc<OperationHandle<T>>, done: Completion<T>) {
        (*self)(operation, done)
    }
}


/// Cancellable unit of work with a four-state lifecycle
pub struct OperationHandle<T: OperationTypes> {
    /// Name of the operation in logs
    label: Cow<'static, str>,

    /// Lifecycle state, as seen by the owner and state observers
    machine: OperationStateMachine,

    /// Result, status stream and cancellation flag
    coordinator: ResultCoordinator<T>,

    /// Work routine, until the operation is started
    work: Mutex<Option<Box<dyn WorkRoutine<T>>>>,

    /// Cancelled once the operation reaches a final state
    lifecycle: CancellationToken,

    /// Whether a task already watches the surrounding scope
    watching: AtomicBool,
}
//
impl<T: OperationTypes> OperationHandle<T> {
    /// Create an operation with the default configuration
    pub fn new<W>(work: W) -> Arc<Self>
    where
        W: FnOnce(Arc<Self>, Completion<T>) + Send + 'static,
    {
        OperationBuilder::new().build(work)
    }

    /// Create an operation running a work routine, with the default
    /// configuration
    pub fn from_routine<R: WorkRoutine<T>>(routine: R) -> Arc<Self> {
        OperationBuilder::new().build_routine(routine)
    }

    pub(crate) fn from_builder(
        builder: OperationBuilder,
        work: Box<dyn WorkRoutine<T>>,
    ) -> Arc<Self> {
        // The coordinator knows its handle from birth, so it can never be
        // cancelled before its peer is registered
        let handle = Arc::new_cyclic(|handle: &Weak<Self>| {
            let peer: CancelPeer = handle.clone();
            OperationHandle {
                coordinator: ResultCoordinator::with_peer(builder.label.clone(), peer),
                machine: OperationStateMachine::new(builder.observers, builder.scope),
                label: builder.label,
                work: Mutex::new(Some(work)),
                lifecycle: CancellationToken::new(),
                watching: AtomicBool::new(false),
            }
        });
        handle.watch_scope();
        handle
    }

    /// Start the operation
    ///
    /// Does nothing unless the operation is ready. If the surrounding scope
    /// was already cancelled, the operation is cancelled instead.
    ///
    pub fn start(self: &Arc<Self>) {
        if self.machine.scope_cancelled() {
            debug!(op = %self.label, "scope cancelled before start");
            self.cancel();
            return;
        }
        if !self.machine.transition(OperationState::Executing) {
            debug!(op = %self.label, state = self.state().key(), "operation not started");
            return;
        }
        let Some(work) = self.work.lock().take() else {
            return;
        };

        debug!(op = %self.label, "operation started");
        if !self.watch_scope() {
            warn!(
                op = %self.label,
                "no tokio runtime, scope cancellation will only be noticed by the handle's own calls"
            );
        }
        let done = Completion {
            operation: Some(Arc::downgrade(self)),
        };
        work.run(self.clone(), done);
    }

    /// Cancel the operation
    ///
    /// Moves the operation to the Cancelled state and cancels its
    /// coordinator, which fails pending waiters and closes the status
    /// stream. Does nothing if the operation is already finished or
    /// cancelled.
    ///
    pub fn cancel(&self) {
        if !self.machine.transition(OperationState::Cancelled) {
            return;
        }
        self.lifecycle.cancel();
        self.coordinator.cancel();
    }

    /// Cancel the operation from within its work routine
    ///
    /// Consumers cannot tell this apart from a cancellation by the owner.
    ///
    pub fn cancel_work(&self) {
        self.coordinator.cancel();
    }

    /// Access the status stream of the operation
    pub fn status(&self) -> StatusChannel<T::Status> {
        self.follow_scope();
        self.coordinator.status()
    }

    /// Wait for the final outcome of the operation
    ///
    /// A cancellation of the surrounding scope while waiting cancels the
    /// operation, unless it already finished.
    ///
    pub async fn value(&self) -> Outcome<T> {
        let Some(scope) = self.machine.scope() else {
            return self.coordinator.value().await;
        };
        tokio::select! {
            biased;
            _ = scope.cancelled() => {
                self.cancel();
                self.coordinator.value().await
            }
            outcome = self.coordinator.value() => outcome,
        }
    }

    /// Report an intermediate status value
    pub fn report(&self, status: T::Status) -> Result<(), StatusClosed<T::Status>> {
        self.follow_scope();
        self.coordinator.report(status)
    }

    /// Close the status stream ahead of the final outcome
    pub fn finish_status(&self) {
        self.coordinator.finish_status()
    }

    /// Publish the final outcome of the operation
    ///
    /// The outcome is discarded if the surrounding scope was cancelled.
    ///
    pub fn finish(&self, result: Result<T::Success, T::Failure>) {
        self.follow_scope();
        self.coordinator.finish(result)
    }

    /// Current lifecycle state
    pub fn state(&self) -> OperationState {
        self.machine.state()
    }

    /// Check if the operation is waiting to be started
    pub fn is_ready(&self) -> bool {
        self.machine.is_ready()
    }

    /// Check if the work routine is running
    pub fn is_executing(&self) -> bool {
        self.machine.is_executing()
    }

    /// Check if the work routine signalled completion
    pub fn is_finished(&self) -> bool {
        self.machine.is_finished()
    }

    /// Check if the operation, or its surrounding scope, was cancelled
    pub fn is_cancelled(&self) -> bool {
        self.machine.is_cancelled()
    }

    /// Claim the polling monitor of the operation's lifecycle state
    pub fn take_monitor(&self) -> Option<StateMonitor> {
        self.machine.take_monitor()
    }

    /// Name of the operation in logs
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Cancel the operation when its scope is, for as long as it lives
    ///
    /// Returns whether a watcher task is running, which requires a tokio
    /// runtime. Only one watcher is ever spawned.
    ///
    fn watch_scope(self: &Arc<Self>) -> bool {
        let Some(scope) = self.machine.scope().cloned() else {
            return true;
        };
        if self.watching.load(Ordering::Acquire) {
            return true;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return false;
        };
        if self.watching.swap(true, Ordering::AcqRel) {
            return true;
        }

        let operation = Arc::downgrade(self);
        let lifecycle = self.lifecycle.clone();
        runtime.spawn(async move {
            tokio::select! {
                _ = scope.cancelled() => {
                    if let Some(operation) = operation.upgrade() {
                        debug!(op = %operation.label, "scope cancelled");
                        operation.cancel();
                    }
                }
                _ = lifecycle.cancelled() => {}
            }
        });
        true
    }

    /// Catch up with a cancelled scope before touching the coordinator
    ///
    /// The watcher task may not have run yet, or may not exist at all.
    ///
    fn follow_scope(&self) {
        if self.machine.scope_cancelled() {
            self.cancel();
        }
    }

    /// Wrap up after the work routine signalled completion
    fn settle(&self) {
        self.follow_scope();
        if !self.coordinator.has_outcome() && !self.coordinator.is_cancelled() {
            warn!(op = %self.label, "work routine completed without an outcome");
            self.coordinator.cancel();
        } else if self.machine.transition(OperationState::Finished) {
            debug!(op = %self.label, "operation finished");
        }
        self.lifecycle.cancel();
    }
}
//
impl<T: OperationTypes> Cancellable for OperationHandle<T> {
    fn cancel(&self) {
        OperationHandle::cancel(self)
    }
}
//
impl<T: OperationTypes> Drop for OperationHandle<T> {
    fn drop(&mut self) {
        self.lifecycle.cancel();
    }
}
//
impl<T: OperationTypes> fmt::Debug for OperationHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationHandle")
            .field("label", &self.label)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}


/// Completion callback handed to a work routine
///
/// Invoking it moves the operation to the Finished state. It can only be
/// invoked once. Dropping it without invoking it is a bug in the work
/// routine: the operation is then finished if an outcome was published, and
/// cancelled otherwise, so that nobody waits for it forever.
///
pub struct Completion<T: OperationTypes> {
    /// Operation to settle, until this callback has fired
    operation: Option<Weak<OperationHandle<T>>>,
}
//
impl<T: OperationTypes> Completion<T> {
    /// Signal that the work routine is done
    pub fn done(mut self) {
        self.fire();
    }

    fn fire(&mut self) {
        let Some(operation) = self.operation.take() else {
            return;
        };
        match operation.upgrade() {
            Some(operation) => operation.settle(),
            None => debug!("operation dropped before its work routine completed"),
        }
    }
}
//
impl<T: OperationTypes> Drop for Completion<T> {
    fn drop(&mut self) {
        if self.operation.is_some() {
            warn!("completion callback dropped without being invoked");
            self.fire();
        }
    }
}
//
impl<T: OperationTypes> fmt::Debug for Completion<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("pending", &self.operation.is_some())
            .finish()
    }
}
