//! End-to-end scenarios: counting jobs and delayed values

mod support;

use std::sync::Arc;
use std::time::Duration;
use structured_ops::{OperationBuilder, OperationError, OperationState, StatusChannel};
use support::{init_tracing, Counter, CounterOp, NumberProvider, Progress};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const DELAY: Duration = Duration::from_millis(100);

fn input() -> Vec<i64> {
    (1..=10).collect()
}

/// Drain a status stream in the background
fn collect(status: StatusChannel<Progress>) -> JoinHandle<Vec<Progress>> {
    tokio::spawn(async move {
        let mut seen = Vec::new();
        while let Some(progress) = status.next().await {
            seen.push(progress);
        }
        seen
    })
}

/// Drain a status stream in the background, cancelling the operation once
/// it is more than a quarter done
fn collect_and_cancel(op: Arc<CounterOp>) -> JoinHandle<Vec<Progress>> {
    let status = op.status();
    tokio::spawn(async move {
        let mut seen = Vec::new();
        while let Some(progress) = status.next().await {
            seen.push(progress);
            if progress.fraction() > 0.25 {
                op.cancel();
            }
        }
        seen
    })
}

/// Counting to completion yields the sum and a full progress report
#[tokio::test(start_paused = true)]
async fn counting_to_completion() {
    init_tracing();
    let counter = Counter::new(input(), DELAY).into_operation();
    let progress = collect(counter.status());
    counter.start();

    assert_eq!(counter.value().await, Ok(55));
    assert!(counter.is_finished());

    let progress = progress.await.unwrap();
    let completed: Vec<u64> = progress.iter().map(|p| p.completed).collect();
    assert_eq!(completed, (1..=10).collect::<Vec<_>>());
    assert_eq!(progress.last().map(Progress::fraction), Some(1.0));
    assert!((progress[0].fraction() - 0.1).abs() < 1e-12);
}

/// Cancelling the operation from its owner fails the value and ends the
/// status stream at the cancellation point
#[tokio::test(start_paused = true)]
async fn counting_cancelling_operation() {
    init_tracing();
    let counter = Counter::new(input(), DELAY).into_operation();
    let progress = collect_and_cancel(counter.clone());
    counter.start();

    assert_eq!(counter.value().await, Err(OperationError::Cancelled));
    assert_eq!(counter.state(), OperationState::Cancelled);

    let progress = progress.await.unwrap();
    let completed: Vec<u64> = progress.iter().map(|p| p.completed).collect();
    assert_eq!(completed, vec![1, 2, 3]);
    assert!(counter.report(Progress { completed: 4, total: 10 }).is_err());
}

/// A work routine cancelling itself looks the same to consumers
#[tokio::test(start_paused = true)]
async fn counting_cancelling_task() {
    init_tracing();
    let counter = Counter::new(input(), DELAY)
        .cancelling_when(|index| index > 2)
        .into_operation();
    let progress = collect(counter.status());
    counter.start();

    let waiter = {
        let counter = counter.clone();
        tokio::spawn(async move { counter.value().await })
    };
    assert_eq!(waiter.await.unwrap(), Err(OperationError::Cancelled));
    assert_eq!(counter.state(), OperationState::Cancelled);
    assert_eq!(progress.await.unwrap().len(), 3);
}

/// Cancelling the surrounding scope cancels a running operation
#[tokio::test(start_paused = true)]
async fn counting_cancelling_scope() {
    init_tracing();
    let scope = CancellationToken::new();
    let counter: Arc<CounterOp> = OperationBuilder::new()
        .label("scoped-counter")
        .scope(scope.child_token())
        .build_routine(Counter::new(input(), DELAY));
    let progress = collect(counter.status());
    counter.start();

    tokio::time::sleep(DELAY * 4 + DELAY / 2).await;
    scope.cancel();

    assert_eq!(counter.value().await, Err(OperationError::Cancelled));
    assert!(counter.is_cancelled());
    assert_eq!(counter.state(), OperationState::Cancelled);
    assert_eq!(progress.await.unwrap().len(), 4);
}

/// Every concurrent waiter receives the same outcome
#[tokio::test(start_paused = true)]
async fn many_waiters() {
    init_tracing();
    let counter = Counter::new(input(), DELAY).into_operation();
    counter.start();

    let waiters: Vec<_> = (0..4)
        .map(|_| {
            let counter = counter.clone();
            tokio::spawn(async move { counter.value().await })
        })
        .collect();
    for waiter in waiters {
        assert_eq!(waiter.await.unwrap(), Ok(55));
    }

    // Late consumers get the cached outcome and an already closed stream
    assert_eq!(counter.value().await, Ok(55));
    let status = counter.status();
    assert!(status.is_closed());
    assert_eq!(status.next().await, None);
}

/// The polling monitor follows the operation to its final state
#[tokio::test(start_paused = true)]
async fn polling_monitor() {
    let counter = Counter::new(vec![1, 2, 3], DELAY).into_operation();
    let mut monitor = counter.take_monitor().unwrap();
    assert_eq!(monitor.state(), OperationState::Ready);

    counter.start();
    assert_eq!(monitor.state(), OperationState::Executing);

    assert_eq!(counter.value().await, Ok(6));
    while !monitor.is_final() {
        tokio::task::yield_now().await;
    }
    assert_eq!(monitor.state(), OperationState::Finished);
}

/// A delayed value which is not cancelled comes out unchanged
#[tokio::test(start_paused = true)]
async fn async_value_not_cancelled() {
    init_tracing();
    let provider = NumberProvider {
        number: 42,
        delay: DELAY,
        cancel_task: false,
    };
    assert_eq!(provider.value().await, Ok(42));
}

/// A delayed value whose producer is cancelled fails with a cancellation
#[tokio::test(start_paused = true)]
async fn async_value_cancelled() {
    init_tracing();
    let provider = NumberProvider {
        number: 13,
        delay: DELAY,
        cancel_task: true,
    };
    let err = provider.value().await.unwrap_err();
    assert!(err.is_cancelled());
}
