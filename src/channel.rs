//! Closable stream of intermediate status values
//!
//! A status channel carries the values reported by a work routine to whoever
//! is watching its progress. Values are delivered in the order in which they
//! were sent. Once the channel is finished, nothing sent afterwards is
//! observable, while values sent before are still delivered before the
//! stream ends.
//!
//! The queue is unbounded, so neither sending nor finishing ever waits for
//! the consumer to catch up.

use crate::error::StatusClosed;
use futures::Stream;
use parking_lot::Mutex;
use std::fmt;
use std::future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;


/// Shared handle to a status channel
///
/// Cloning the handle does not duplicate the values: all clones drain the
/// same queue, which is meant to be consumed by one task at a time.
///
pub struct StatusChannel<T> {
    shared: Arc<Shared<T>>,
}
//
impl<T> StatusChannel<T> {
    /// Create a new, open status channel
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        StatusChannel {
            shared: Arc::new(Shared {
                tx: Mutex::new(Some(tx)),
                rx: Mutex::new(rx),
            }),
        }
    }

    /// Push a status value at the end of the channel
    pub fn send(&self, value: T) -> Result<(), StatusClosed<T>> {
        let tx = self.shared.tx.lock();
        match tx.as_ref() {
            Some(tx) => tx.send(value).map_err(|err| StatusClosed(err.0)),
            None => Err(StatusClosed(value)),
        }
    }

    /// Close the channel, ending the stream after the values already sent
    ///
    /// Finishing an already finished channel does nothing.
    ///
    pub fn finish(&self) {
        self.shared.tx.lock().take();
    }

    /// Check if the channel was finished
    pub fn is_closed(&self) -> bool {
        self.shared.tx.lock().is_none()
    }

    /// Wait for the next status value, or `None` once the channel is finished
    /// and drained
    pub async fn next(&self) -> Option<T> {
        future::poll_fn(|cx| self.poll_recv(cx)).await
    }

    fn poll_recv(&self, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.shared.rx.lock().poll_recv(cx)
    }
}
//
impl<T> Clone for StatusChannel<T> {
    fn clone(&self) -> Self {
        StatusChannel {
            shared: self.shared.clone(),
        }
    }
}
//
impl<T> Default for StatusChannel<T> {
    fn default() -> Self {
        Self::new()
    }
}
//
impl<T> fmt::Debug for StatusChannel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusChannel")
            .field("closed", &self.is_closed())
            .finish()
    }
}
//
impl<T> Stream for StatusChannel<T> {
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.poll_recv(cx)
    }
}


/// State shared between all handles to a channel
struct Shared<T> {
    /// Sending side, dropped when the channel is finished
    tx: Mutex<Option<mpsc::UnboundedSender<T>>>,

    /// Receiving side, shared by every handle
    rx: Mutex<mpsc::UnboundedReceiver<T>>,
}
