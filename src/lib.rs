//! Structured access to callback-driven operations
//!
//! Picture yourself in a situation where: some of your code is organized
//! around old-school operation objects, which an owner creates, starts and
//! may cancel, and which signal their completion through a callback. Now some
//! newer code of yours would like to simply await the result of such an
//! operation, and maybe watch a stream of progress updates while it runs.
//!
//! This crate bridges the two worlds. An [`OperationHandle`] exposes the
//! four-state lifecycle that operation owners expect (ready, executing,
//! finished, cancelled) along with observer hooks for state changes. Behind
//! it, a [`ResultCoordinator`] delivers the operation's single final outcome
//! to whoever awaits it, streams intermediate status values through a
//! [`StatusChannel`], and makes sure that a cancellation from either side
//! reaches the other one, exactly once.
//!
//! ```no_run
//! use structured_ops::{Completion, OperationHandle};
//!
//! # async fn example() {
//! type Ops = (u32, u64, String);
//!
//! let op = OperationHandle::<Ops>::new(|op, done: Completion<Ops>| {
//!     tokio::spawn(async move {
//!         let mut total = 0;
//!         for step in 1..=10u32 {
//!             if op.is_cancelled() {
//!                 break;
//!             }
//!             total += u64::from(step);
//!             let _ = op.report(step);
//!         }
//!         op.finish(Ok(total));
//!         done.done();
//!     });
//! });
//!
//! let status = op.status();
//! op.start();
//! while let Some(step) = status.next().await {
//!     println!("step {}", step);
//! }
//! assert_eq!(op.value().await, Ok(55));
//! # }
//! ```

pub mod cancel;
pub mod channel;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod handle;
pub mod machine;
pub mod monitor;
pub mod observer;
pub mod status;

pub use cancel::{CancelPeer, Cancellable};
pub use channel::StatusChannel;
pub use config::OperationBuilder;
pub use coordinator::{Outcome, ResultCoordinator};
pub use error::{OperationError, StatusClosed};
pub use handle::{Completion, OperationHandle, WorkRoutine};
pub use machine::OperationStateMachine;
pub use monitor::StateMonitor;
pub use observer::{ChangePhase, StateChange, StateObserver};
pub use status::{OperationState, OperationTypes};
