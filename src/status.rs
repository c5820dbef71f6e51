//! Facilities to represent the lifecycle of operations
//!
//! The model is the following: an operation is created in a ready state, is
//! started by its owner, which moves it to an executing state, and ends up in
//! one of two final states. Either the work routine completed and the
//! operation is finished, or somebody gave up on it and it is cancelled.
//!
//! Each operation also carries three caller-chosen types: the intermediate
//! status values it streams while running, and the success and failure values
//! its final result may hold.


/// Lifecycle state of an operation
///
/// Here are the possible state transitions:
///
/// - Ready -> Executing / Cancelled
/// - Executing -> Finished / Cancelled
///
/// Once the operation is either Finished or Cancelled, its state won't change
/// anymore.
///
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationState {
    /// The operation has been created, but not been started yet
    Ready,

    /// The work routine has been started and not signalled completion
    Executing,

    /// The work routine has signalled completion
    Finished,

    /// The operation was cancelled before it could finish
    Cancelled,
}
//
impl OperationState {
    /// Observer key associated with this state
    ///
    /// External observers are notified of state flips through these keys,
    /// once for the state being left and once for the state being entered.
    ///
    pub fn key(self) -> &'static str {
        use self::OperationState::*;
        match self {
            Ready => "isReady",
            Executing => "isExecuting",
            Finished => "isFinished",
            Cancelled => "isCancelled",
        }
    }

    /// Check if this state is final (i.e. won't change anymore)
    pub fn is_final(self) -> bool {
        use self::OperationState::*;
        match self {
            Ready | Executing => false,
            Finished | Cancelled => true,
        }
    }

    /// Check if moving from this state to `next` is a legal transition
    pub fn can_transition_to(self, next: OperationState) -> bool {
        use self::OperationState::*;
        matches!(
            (self, next),
            (Ready, Executing)
                | (Executing, Finished)
                | (Ready, Cancelled)
                | (Executing, Cancelled)
        )
    }

    pub(crate) fn to_bits(self) -> u8 {
        self as u8
    }

    pub(crate) fn from_bits(bits: u8) -> Self {
        use self::OperationState::*;
        match bits {
            0 => Ready,
            1 => Executing,
            2 => Finished,
            _ => Cancelled,
        }
    }
}


/// Caller-chosen types flowing through an operation
///
/// Success and failure values must be cloneable because every consumer
/// awaiting the operation receives its own copy of the final outcome.
///
pub trait OperationTypes: 'static {
    /// Intermediate values streamed while the operation runs
    ///
    /// Possible usage: Keep the consumer informed about the work's progress.
    ///
    type Status: Send + 'static;

    /// Final value of an operation which completed successfully
    type Success: Clone + Send + 'static;

    /// Final value of an operation which failed
    ///
    /// This is always reported separately from cancellation, so it does not
    /// need to be able to express it.
    ///
    type Failure: Clone + Send + 'static;
}
//
impl<Status, Success, Failure> OperationTypes for (Status, Success, Failure)
where
    Status: Send + 'static,
    Success: Clone + Send + 'static,
    Failure: Clone + Send + 'static,
{
    type Status = Status;
    type Success = Success;
    type Failure = Failure;
}
