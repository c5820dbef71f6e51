//! Errors reported to operation consumers and producers

use std::fmt;
use thiserror::Error;


/// Reason why awaiting an operation's value did not produce a success
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum OperationError<Failure> {
    /// The operation was cancelled, either explicitly or by its scope
    ///
    /// Cancellation takes precedence over any result the work routine may
    /// have produced concurrently.
    ///
    #[error("operation was cancelled")]
    Cancelled,

    /// The work routine reported a failure
    #[error("operation failed: {0}")]
    Failed(Failure),
}
//
impl<Failure> OperationError<Failure> {
    /// Check if this error stems from cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, OperationError::Cancelled)
    }

    /// Extract the failure reported by the work routine, if any
    pub fn into_failure(self) -> Option<Failure> {
        match self {
            OperationError::Cancelled => None,
            OperationError::Failed(failure) => Some(failure),
        }
    }
}


/// A status value was reported after the status channel was closed
///
/// The rejected value is handed back to the caller. Work routines usually
/// treat this as a hint that nobody cares about their progress anymore.
///
#[derive(Error)]
#[error("status channel is closed")]
pub struct StatusClosed<T>(pub T);
//
impl<T> StatusClosed<T> {
    /// Recover the status value which could not be delivered
    pub fn into_inner(self) -> T {
        self.0
    }
}
//
impl<T> fmt::Debug for StatusClosed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusClosed").finish_non_exhaustive()
    }
}


/// Unit tests
#[cfg(test)]
mod tests {
    use super::*;

    /// Check the error messages and the cancellation predicate
    #[test]
    fn operation_errors() {
        let cancelled: OperationError<String> = OperationError::Cancelled;
        assert!(cancelled.is_cancelled());
        assert_eq!(cancelled.to_string(), "operation was cancelled");
        assert_eq!(cancelled.into_failure(), None);

        let failed = OperationError::Failed("disk on fire".to_owned());
        assert!(!failed.is_cancelled());
        assert_eq!(failed.to_string(), "operation failed: disk on fire");
        assert_eq!(failed.into_failure().as_deref(), Some("disk on fire"));
    }

    /// Check that a rejected status can be recovered
    #[test]
    fn status_closed() {
        struct Opaque(u32);
        let err = StatusClosed(Opaque(7));
        assert_eq!(err.to_string(), "status channel is closed");
        assert_eq!(format!("{:?}", err), "StatusClosed { .. }");
        assert_eq!(err.into_inner().0, 7);
    }
}
