//! State observer which reports transitions through `tracing`
//!
//! Only the notifications about the state being entered are logged, so each
//! transition shows up as one "will" event and one "did" event.

use crate::observer::{ChangePhase, StateChange, StateObserver};
use std::borrow::Cow;
use tracing::{debug, trace};


/// StateObserver implementation which logs every state transition
#[derive(Clone, Debug)]
pub struct LogObserver {
    label: Cow<'static, str>,
}
//
impl LogObserver {
    /// Create an observer tagging its events with the given operation label
    pub fn new(label: impl Into<Cow<'static, str>>) -> Self {
        LogObserver {
            label: label.into(),
        }
    }
}
//
impl StateObserver for LogObserver {
    fn notify(&self, change: StateChange) {
        if change.key != change.to.key() {
            return;
        }
        match change.phase {
            ChangePhase::Will => trace!(
                op = %self.label,
                from = change.from.key(),
                to = change.to.key(),
                "state about to change"
            ),
            ChangePhase::Did => debug!(
                op = %self.label,
                from = change.from.key(),
                to = change.to.key(),
                "state changed"
            ),
        }
    }
}
