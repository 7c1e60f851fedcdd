//! Event sequence plumbing for freshet.
//!
//! Live sources come in two shapes: push-based emitters, where the
//! producer drives delivery, and cooperative pull streams, where the
//! consumer drives it. This crate unifies both behind
//! [`EventSequence`], a cancellable pull-based sequence that the
//! execution layer consumes one event at a time.

mod emitter;
mod sequence;

pub use emitter::{EventEmitter, EventSink, IterEmitter};
pub use sequence::EventSequence;
