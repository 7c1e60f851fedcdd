//! Push-based event sources.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Sink handed to an [`EventEmitter`] when it is subscribed.
///
/// The channel behind the sink is bounded, so [`emit`](Self::emit)
/// suspends until the consumer has taken the previous event. Producers
/// are backpressured by consumption rather than by a queue of their own.
pub struct EventSink<T> {
  tx: mpsc::Sender<T>,
}

impl<T: Send> EventSink<T> {
  pub(crate) fn new(tx: mpsc::Sender<T>) -> Self {
    Self { tx }
  }

  /// Deliver one event to the subscriber.
  ///
  /// Returns `false` once the subscription is gone (the consumer
  /// cancelled or dropped the sequence); producers should stop emitting.
  pub async fn emit(&self, event: T) -> bool {
    self.tx.send(event).await.is_ok()
  }

  /// Whether the subscriber has gone away.
  pub fn is_closed(&self) -> bool {
    self.tx.is_closed()
  }
}

impl<T> Clone for EventSink<T> {
  fn clone(&self) -> Self {
    Self {
      tx: self.tx.clone(),
    }
  }
}

/// A push-based event source.
///
/// Implementations begin producing when subscribed, typically by
/// spawning a task that emits into the sink until the source is
/// exhausted or `cancel` fires. Dropping the sink ends the subscription
/// from the producer side.
pub trait EventEmitter<T>: Send {
  /// Start producing events into `sink`.
  fn subscribe(self: Box<Self>, sink: EventSink<T>, cancel: CancellationToken);
}

/// Emitter over a fixed set of items.
///
/// Emits each item in order on a spawned task, then closes. Mostly
/// useful for hosts with precomputed events and for tests.
pub struct IterEmitter<I> {
  items: I,
}

impl<I> IterEmitter<I> {
  pub fn new(items: I) -> Self {
    Self { items }
  }
}

impl<T, I> EventEmitter<T> for IterEmitter<I>
where
  T: Send + 'static,
  I: IntoIterator<Item = T> + Send + 'static,
  I::IntoIter: Send,
{
  fn subscribe(self: Box<Self>, sink: EventSink<T>, cancel: CancellationToken) {
    tokio::spawn(async move {
      for item in self.items {
        tokio::select! {
          _ = cancel.cancelled() => break,
          delivered = sink.emit(item) => {
            if !delivered {
              break;
            }
          }
        }
      }
    });
  }
}
