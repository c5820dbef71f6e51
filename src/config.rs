//! Configuration of operation handles
//!
//! Operations are configured in code, through a builder, when they are
//! created. There is nothing to load from files or from the environment.

use crate::handle::{Completion, OperationHandle, WorkRoutine};
use crate::observer::log::LogObserver;
use crate::observer::{ObserverSet, StateObserver};
use crate::status::OperationTypes;
use std::borrow::Cow;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;


/// Builder of operation handles
#[derive(Debug)]
pub struct OperationBuilder {
    /// Name of the operation in logs
    pub(crate) label: Cow<'static, str>,

    /// Cancellation signal of the surrounding scope
    pub(crate) scope: Option<CancellationToken>,

    /// Observers notified on state transitions
    pub(crate) observers: ObserverSet,
}
//
impl OperationBuilder {
    /// Start from the default configuration: an unlabelled operation with no
    /// scope and no observer
    pub fn new() -> Self {
        OperationBuilder {
            label: Cow::Borrowed("operation"),
            scope: None,
            observers: ObserverSet::new(),
        }
    }

    /// Name the operation in logs
    pub fn label(mut self, label: impl Into<Cow<'static, str>>) -> Self {
        self.label = label.into();
        self
    }

    /// Tie the operation to the cancellation signal of a surrounding scope
    ///
    /// Once the scope is cancelled, the operation reports itself cancelled,
    /// and a started operation is cancelled as if its owner had asked for it.
    ///
    pub fn scope(mut self, scope: CancellationToken) -> Self {
        self.scope = Some(scope);
        self
    }

    /// Register an observer of state transitions
    pub fn observer(mut self, observer: impl StateObserver + 'static) -> Self {
        self.observers.push(Arc::new(observer));
        self
    }

    /// Log every state transition through `tracing`
    pub fn log_transitions(self) -> Self {
        let observer = LogObserver::new(self.label.clone());
        self.observer(observer)
    }

    /// Build an operation which runs the given closure when started
    pub fn build<T, W>(self, work: W) -> Arc<OperationHandle<T>>
    where
        T: OperationTypes,
        W: FnOnce(Arc<OperationHandle<T>>, Completion<T>) + Send + 'static,
    {
        OperationHandle::from_builder(self, Box::new(work))
    }

    /// Build an operation which runs the given work routine when started
    pub fn build_routine<T, R>(self, routine: R) -> Arc<OperationHandle<T>>
    where
        T: OperationTypes,
        R: WorkRoutine<T>,
    {
        OperationHandle::from_builder(self, Box::new(routine))
    }
}
//
impl Default for OperationBuilder {
    fn default() -> Self {
        Self::new()
    }
}
