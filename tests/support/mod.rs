//! Example workloads driven through the public API
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;
use structured_ops::{
    CancelPeer, Cancellable, Completion, OperationBuilder, OperationError, OperationHandle,
    ResultCoordinator, WorkRoutine,
};
use tokio::task::AbortHandle;


/// Install a test-friendly log subscriber, once per test binary
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}


/// Fraction of a counting job which has been completed
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Progress {
    pub completed: u64,
    pub total: u64,
}
//
impl Progress {
    pub fn fraction(&self) -> f64 {
        self.completed as f64 / self.total as f64
    }
}


/// Status, success and failure types of a counter
pub type CounterOps = (Progress, i64, String);

/// Operation handle of a counter
pub type CounterOp = OperationHandle<CounterOps>;


/// Work routine summing numbers, one every `delay`, reporting its progress
pub struct Counter {
    numbers: Vec<i64>,
    delay: Duration,
    condition: Option<Box<dyn Fn(usize) -> bool + Send + Sync>>,
}
//
impl Counter {
    pub fn new(numbers: Vec<i64>, delay: Duration) -> Self {
        Counter {
            numbers,
            delay,
            condition: None,
        }
    }

    /// Have the routine cancel itself when it reaches an index for which
    /// `condition` holds
    pub fn cancelling_when(mut self, condition: impl Fn(usize) -> bool + Send + Sync + 'static) -> Self {
        self.condition = Some(Box::new(condition));
        self
    }

    pub fn into_operation(self) -> Arc<CounterOp> {
        OperationBuilder::new()
            .label("counter")
            .log_transitions()
            .build_routine(self)
    }
}
//
impl WorkRoutine<CounterOps> for Counter {
    fn run(self: Box<Self>, op: Arc<CounterOp>, done: Completion<CounterOps>) {
        tokio::spawn(async move {
            let total_units = self.numbers.len() as u64;
            let mut total = 0;
            for (index, number) in self.numbers.iter().enumerate() {
                if op.is_cancelled() {
                    break;
                }
                tokio::time::sleep(self.delay).await;
                total += number;
                if self.condition.as_ref().map_or(false, |cond| cond(index)) {
                    op.cancel_work();
                    break;
                }
                let progress = Progress {
                    completed: index as u64 + 1,
                    total: total_units,
                };
                if op.report(progress).is_err() {
                    break;
                }
                tokio::task::yield_now().await;
            }
            op.finish(Ok(total));
            done.done();
        });
    }
}


/// Provider of a number which becomes available after some delay
pub struct NumberProvider {
    pub number: i64,
    pub delay: Duration,
    pub cancel_task: bool,
}
//
impl NumberProvider {
    pub async fn value(&self) -> Result<i64, OperationError<String>> {
        let coordinator = Arc::new(ResultCoordinator::<((), i64, String)>::new("number"));

        let (c_coordinator, number, delay) = (coordinator.clone(), self.number, self.delay);
        let producer = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            c_coordinator.finish(Ok(number));
        });

        // Cancelling the coordinator aborts the producing task
        let peer = Arc::new(AbortOnCancel(producer.abort_handle()));
        coordinator.set_peer(Arc::downgrade(&peer) as CancelPeer);

        if self.cancel_task {
            let c_coordinator = coordinator.clone();
            tokio::spawn(async move { c_coordinator.cancel() });
        }

        let value = coordinator.value().await;
        drop(peer);
        value
    }
}


/// Cancellation peer aborting a tokio task
struct AbortOnCancel(AbortHandle);
//
impl Cancellable for AbortOnCancel {
    fn cancel(&self) {
        self.0.abort();
    }
}
