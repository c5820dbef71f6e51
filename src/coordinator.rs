//! Coordination between a running work routine and its consumers
//!
//! The coordinator is the meeting point of three parties: the work routine,
//! which reports intermediate status and eventually a final result, the
//! consumers, which watch the status stream and await the result, and the
//! operation handle, with which cancellation requests are exchanged.
//!
//! All of its mutable state lives behind a single mutex, so that concurrent
//! reports, completions and cancellations never interleave partial updates.
//! Nothing is ever awaited while the lock is held.

use crate::cancel::CancelPeer;
use crate::channel::StatusChannel;
use crate::error::{OperationError, StatusClosed};
use crate::status::OperationTypes;
use parking_lot::Mutex;
use std::borrow::Cow;
use tokio::sync::oneshot;
use tracing::{debug, trace, warn};


/// Final outcome of an operation, as seen by a consumer
pub type Outcome<T> = Result<
    <T as OperationTypes>::Success,
    OperationError<<T as OperationTypes>::Failure>,
>;


/// Single-assignment result slot, status stream and cancellation flag
pub struct ResultCoordinator<T: OperationTypes> {
    /// Name used to tell operations apart in logs
    label: Cow<'static, str>,

    /// Mutex-protected coordination state
    state: Mutex<State<T>>,
}
//
impl<T: OperationTypes> ResultCoordinator<T> {
    /// Create a coordinator which does not cascade cancellation anywhere
    pub fn new(label: impl Into<Cow<'static, str>>) -> Self {
        ResultCoordinator {
            label: label.into(),
            state: Mutex::new(State {
                channel: None,
                outcome: None,
                waiters: Vec::new(),
                cancelled: false,
                peer: None,
            }),
        }
    }

    /// Create a coordinator which cascades cancellation to `peer`
    pub fn with_peer(label: impl Into<Cow<'static, str>>, peer: CancelPeer) -> Self {
        let coordinator = Self::new(label);
        coordinator.set_peer(peer);
        coordinator
    }

    /// Register the object to be cancelled whenever this coordinator is
    pub fn set_peer(&self, peer: CancelPeer) {
        self.state.lock().peer = Some(peer);
    }

    /// Access the status stream, creating it on first use
    ///
    /// If the operation already has an outcome or was cancelled, the
    /// returned channel is closed and will only yield what was already
    /// reported through it.
    ///
    pub fn status(&self) -> StatusChannel<T::Status> {
        let mut state = self.state.lock();
        let done = state.outcome.is_some() || state.cancelled;
        let channel = state.channel.get_or_insert_with(StatusChannel::new);
        if done {
            channel.finish();
        }
        channel.clone()
    }

    /// Wait for the final outcome of the operation
    ///
    /// Resolves immediately if the operation was cancelled or already
    /// produced its outcome. Any number of callers may wait concurrently,
    /// and all of them receive the same outcome.
    ///
    pub async fn value(&self) -> Outcome<T> {
        let waiter = {
            let mut state = self.state.lock();
            if state.cancelled {
                return Err(OperationError::Cancelled);
            }
            if let Some(outcome) = &state.outcome {
                return outcome.clone().map_err(OperationError::Failed);
            }
            let (tx, rx) = oneshot::channel();
            state.waiters.push(tx);
            rx
        };

        // Senders only go away with the coordinator, which we borrow
        waiter.await.unwrap_or(Err(OperationError::Cancelled))
    }

    /// Forward an intermediate status value to the status stream
    ///
    /// If nobody requested the status stream yet, the value is dropped. Once
    /// the operation is cancelled or has produced its outcome, or after the
    /// stream was finished explicitly, the value is rejected.
    ///
    pub fn report(&self, value: T::Status) -> Result<(), StatusClosed<T::Status>> {
        let state = self.state.lock();
        if state.cancelled || state.outcome.is_some() {
            trace!(op = %self.label, "status rejected, operation is over");
            return Err(StatusClosed(value));
        }
        match &state.channel {
            Some(channel) => channel.send(value),
            None => {
                trace!(op = %self.label, "status dropped, nobody is listening");
                Ok(())
            }
        }
    }

    /// Close the status stream without producing an outcome
    pub fn finish_status(&self) {
        let mut state = self.state.lock();
        state.channel.get_or_insert_with(StatusChannel::new).finish();
    }

    /// Publish the final outcome of the operation
    ///
    /// Pending waiters are resolved right away, later ones receive a cached
    /// copy. Only the first outcome counts: publishing again, or publishing
    /// after cancellation, is logged and ignored.
    ///
    pub fn finish(&self, result: Result<T::Success, T::Failure>) {
        let waiters = {
            let mut state = self.state.lock();
            if state.cancelled {
                debug!(op = %self.label, "outcome ignored, operation was cancelled");
                return;
            }
            if state.outcome.is_some() {
                warn!(op = %self.label, "operation finished twice, keeping first outcome");
                return;
            }
            if let Some(channel) = &state.channel {
                channel.finish();
            }
            debug!(
                op = %self.label,
                success = result.is_ok(),
                waiters = state.waiters.len(),
                "outcome published"
            );
            state.outcome = Some(result.clone());
            std::mem::take(&mut state.waiters)
        };

        let outcome = result.map_err(OperationError::Failed);
        for waiter in waiters {
            // A waiter which went away does not need its outcome
            let _ = waiter.send(outcome.clone());
        }
    }

    /// Cancel the operation
    ///
    /// Closes the status stream, fails pending waiters with a cancellation
    /// error and cancels the registered peer. Cancelling again does nothing,
    /// which stops the cascade when the peer cancels us back.
    ///
    pub fn cancel(&self) {
        let (waiters, peer) = {
            let mut state = self.state.lock();
            if state.cancelled {
                return;
            }
            state.cancelled = true;
            if let Some(channel) = &state.channel {
                channel.finish();
            }
            debug!(
                op = %self.label,
                waiters = state.waiters.len(),
                "operation cancelled"
            );
            (std::mem::take(&mut state.waiters), state.peer.clone())
        };

        for waiter in waiters {
            let _ = waiter.send(Err(OperationError::Cancelled));
        }

        match peer.as_ref().and_then(|peer| peer.upgrade()) {
            Some(peer) => peer.cancel(),
            None => debug!(op = %self.label, "no live peer to cascade cancellation to"),
        }
    }

    /// Check if the operation was cancelled
    pub fn is_cancelled(&self) -> bool {
        self.state.lock().cancelled
    }

    /// Check if the work routine published an outcome
    pub fn has_outcome(&self) -> bool {
        self.state.lock().outcome.is_some()
    }

    /// Name of the operation in logs
    pub fn label(&self) -> &str {
        &self.label
    }
}


/// Mutex-protected part of the coordinator
struct State<T: OperationTypes> {
    /// Status stream, created on first request
    channel: Option<StatusChannel<T::Status>>,

    /// Outcome published by the work routine, if any
    outcome: Option<Result<T::Success, T::Failure>>,

    /// Consumers currently waiting for the outcome
    waiters: Vec<oneshot::Sender<Outcome<T>>>,

    /// Whether the operation was cancelled (never reverts)
    cancelled: bool,

    /// Non-owning reference to the object cancelled alongside us
    peer: Option<CancelPeer>,
}
