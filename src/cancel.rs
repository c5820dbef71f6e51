//! Cancellation peers
//!
//! The precise semantics of cancellation are application-specific, and since
//! work routines are never preempted, a cancellation request is only honored
//! when the routine checks for it between two steps. What we can guarantee is
//! that a cancellation request always reaches every cooperating object: the
//! operation handle owned by the external owner, and the coordinator which
//! hands out the operation's result.
//!
//! These two objects hold each other in unequal ways. The handle owns its
//! coordinator, while the coordinator only keeps a non-owning reference to
//! the handle, through which it cascades cancellation outward.

use std::sync::Weak;


/// Features which every object taking part in a cancellation cascade shares
pub trait Cancellable {
    /// Request the cancellation of the underlying work
    ///
    /// Implementations must be idempotent, so that a cancellation which
    /// cascades back to its origin stops there.
    ///
    fn cancel(&self);
}


/// Non-owning reference to a cancellation peer
pub type CancelPeer = Weak<dyn Cancellable + Send + Sync>;
