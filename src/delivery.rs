//! Outbound delivery — converts notification text into the caller's
//! message type and offers it to a bounded channel without ever waiting.

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::debug;

/// Caller-supplied mapping from notification text to the message type `T`.
pub type Converter<T> = Box<dyn Fn(String) -> T + Send + Sync>;

/// Outcome of a single delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Queued,
    /// Channel was full; the message is gone.
    Dropped,
    /// Consumer side was dropped; the message is gone.
    Closed,
}

/// The producer half of the caller's queue plus its converter.
///
/// The monitor only ever enqueues here; the receiver stays with the caller.
pub struct Outbox<T> {
    tx: mpsc::Sender<T>,
    convert: Converter<T>,
}

impl<T> Outbox<T> {
    pub fn new(tx: mpsc::Sender<T>, convert: Converter<T>) -> Self {
        Self { tx, convert }
    }

    /// Convert `text` once and try to enqueue it.
    pub fn deliver(&self, text: String) -> Delivery {
        let msg = (self.convert)(text);
        match self.tx.try_send(msg) {
            Ok(()) => Delivery::Queued,
            Err(TrySendError::Full(_)) => {
                debug!(capacity = self.tx.max_capacity(), "Delivery channel full — message dropped");
                Delivery::Dropped
            }
            Err(TrySendError::Closed(_)) => {
                debug!("Delivery channel closed — message dropped");
                Delivery::Closed
            }
        }
    }
}
