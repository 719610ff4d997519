//! Hand-off between the blocking listener thread and async subscribers.
//!
//! An unbounded channel keeps the listener's publish path non-blocking:
//! the receive loop must never stall on a slow subscriber. Events are
//! delivered in arrival order. The receive side is a single shared queue,
//! so concurrent subscribers compete for events rather than each getting
//! a copy.

use std::sync::Arc;

use futures::Stream;
use tokio::sync::Mutex;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use super::TrapEvent;

/// Publishing side, held by the listener thread.
#[derive(Debug, Clone)]
pub struct TrapBridge {
    tx: UnboundedSender<TrapEvent>,
}

impl TrapBridge {
    /// Enqueue an event without blocking.
    ///
    /// Failure means every consumer handle is gone; the event is dropped.
    pub fn publish(&self, event: TrapEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!("no trap consumers, event dropped");
        }
    }
}

/// Consuming side, shared by stream subscribers.
#[derive(Debug, Clone)]
pub struct TrapStream {
    rx: Arc<Mutex<UnboundedReceiver<TrapEvent>>>,
}

impl TrapStream {
    /// Wait for the next event. Returns `None` when the bridge is gone
    /// and the queue is drained.
    pub async fn next(&self) -> Option<TrapEvent> {
        self.rx.lock().await.recv().await
    }

    /// Adapt to a [`Stream`] that never ends while the bridge lives.
    pub fn into_stream(self) -> impl Stream<Item = TrapEvent> {
        futures::stream::unfold(self, |stream| async move {
            stream.next().await.map(|event| (event, stream))
        })
    }
}

/// Create a connected bridge/stream pair.
pub fn channel() -> (TrapBridge, TrapStream) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        TrapBridge { tx },
        TrapStream {
            rx: Arc::new(Mutex::new(rx)),
        },
    )
}
