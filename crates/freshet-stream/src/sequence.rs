//! The canonical pull-based event sequence.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};

use crate::emitter::{EventEmitter, EventSink};

/// Channel capacity between a push-based emitter and its sequence. One
/// slot keeps the producer at most one event ahead of the consumer.
const EMITTER_BUFFER: usize = 1;

/// Canonical representation of a live event source: asynchronous,
/// ordered, possibly infinite, not restartable.
///
/// Both supported source shapes map onto this type. Push-based emitters
/// are bridged through a bounded channel; pull streams are wrapped
/// directly. The sequence ends when the source ends or when it is
/// cancelled, and dropping the sequence cancels it, so an abandoned
/// consumer always stops its producer.
pub struct EventSequence<T> {
  inner: Pin<Box<dyn Stream<Item = T> + Send>>,
  cancel: CancellationToken,
  cancelled: Pin<Box<WaitForCancellationFutureOwned>>,
}

impl<T: Send + 'static> EventSequence<T> {
  /// Wrap a cooperative pull stream.
  ///
  /// The sequence is scoped under a child of `cancel`: cancelling the
  /// caller's token ends the sequence, cancelling the sequence leaves
  /// the caller's token untouched.
  pub fn from_stream<S>(stream: S, cancel: &CancellationToken) -> Self
  where
    S: Stream<Item = T> + Send + 'static,
  {
    Self::build(Box::pin(stream), cancel.child_token())
  }

  /// Subscribe a push-based emitter and expose it as a pull sequence.
  ///
  /// The emitter is handed the sequence's own cancellation token, so
  /// cancelling (or dropping) the sequence stops the producer.
  pub fn from_emitter(emitter: Box<dyn EventEmitter<T>>, cancel: &CancellationToken) -> Self {
    let cancel = cancel.child_token();
    let (tx, mut rx) = mpsc::channel(EMITTER_BUFFER);
    emitter.subscribe(EventSink::new(tx), cancel.clone());
    let stream = futures::stream::poll_fn(move |cx| rx.poll_recv(cx));
    Self::build(Box::pin(stream), cancel)
  }

  fn build(inner: Pin<Box<dyn Stream<Item = T> + Send>>, cancel: CancellationToken) -> Self {
    let cancelled = Box::pin(cancel.clone().cancelled_owned());
    Self {
      inner,
      cancel,
      cancelled,
    }
  }

  /// Pull the next event.
  ///
  /// Resolves to `None` at end-of-stream or once the sequence has been
  /// cancelled.
  pub async fn next(&mut self) -> Option<T> {
    futures::StreamExt::next(self).await
  }

  /// Stop the sequence. Propagates to the underlying producer.
  pub fn cancel(&self) {
    self.cancel.cancel();
  }

  /// Whether the sequence has been cancelled.
  pub fn is_cancelled(&self) -> bool {
    self.cancel.is_cancelled()
  }
}

impl<T> Stream for EventSequence<T> {
  type Item = T;

  fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
    let this = self.get_mut();
    if this.cancelled.as_mut().poll(cx).is_ready() {
      return Poll::Ready(None);
    }
    this.inner.as_mut().poll_next(cx)
  }
}

impl<T> Drop for EventSequence<T> {
  fn drop(&mut self) {
    self.cancel.cancel();
  }
}
