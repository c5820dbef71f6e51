//! Polling-based operation state monitoring
//!
//! This module provides a way to monitor an operation's lifecycle state
//! through polling. It provides maximal performance in scenarios where a
//! client does not need to synchronize with state changes, but only to
//! periodically check the current state, as is the case for example when
//! refreshing progress indicators in user interfaces.

use crate::status::OperationState;
use triple_buffer::{Input, Output, TripleBuffer};


/// Create the writing and reading ends of a state monitor
pub(crate) fn new_monitor(initial: OperationState) -> (StateFeed, StateMonitor) {
    let (input, output) = TripleBuffer::new(&initial).split();
    (StateFeed { input }, StateMonitor { output })
}


/// Writing end of a state monitor, fed by the state machine
pub(crate) struct StateFeed {
    /// New states will be sent through this triple buffer
    input: Input<OperationState>,
}
//
impl StateFeed {
    /// Publish a new lifecycle state
    pub(crate) fn publish(&mut self, state: OperationState) {
        self.input.write(state);
    }
}


/// Client interface, used to poll the latest lifecycle state
///
/// Reading never blocks nor waits for the state machine, no matter how busy
/// it is.
///
pub struct StateMonitor {
    /// Latest state will be read through this triple buffer
    output: Output<OperationState>,
}
//
impl StateMonitor {
    /// Access the latest published lifecycle state
    pub fn state(&mut self) -> OperationState {
        *self.output.read()
    }

    /// Check if the operation reached a final state
    pub fn is_final(&mut self) -> bool {
        self.state().is_final()
    }
}
