//! Fetcher output shapes and value unboxing.

use std::pin::Pin;
use std::sync::Arc;

use futures::Stream;
use serde_json::Value;

use crate::context::ExecutionContext;
use crate::error::FieldError;
use crate::parameters::ExecutionParameters;
use freshet_stream::{EventEmitter, EventSequence};

/// Boxed pull stream of subscription events.
pub type EventStream = Pin<Box<dyn Stream<Item = FetcherOutput> + Send + Sync>>;

/// Canonical event sequence carrying fetcher-shaped event payloads.
pub type SourceEventStream = EventSequence<FetcherOutput>;

/// A fetched value after unboxing: one of the shapes downstream
/// execution distinguishes.
pub enum ResolvedValue {
  /// Explicitly absent.
  Null,
  /// A materialized value.
  Value(Value),
  /// A push-based emitter of events.
  Emitter(Box<dyn EventEmitter<FetcherOutput> + Sync>),
  /// A cooperative pull stream of events.
  Stream(EventStream),
}

impl ResolvedValue {
  /// The materialized value, when this is one.
  pub fn as_value(&self) -> Option<&Value> {
    match self {
      ResolvedValue::Value(value) => Some(value),
      _ => None,
    }
  }
}

impl Default for ResolvedValue {
  fn default() -> Self {
    ResolvedValue::Null
  }
}

impl std::fmt::Debug for ResolvedValue {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      ResolvedValue::Null => f.write_str("Null"),
      ResolvedValue::Value(value) => f.debug_tuple("Value").field(value).finish(),
      ResolvedValue::Emitter(_) => f.write_str("Emitter(..)"),
      ResolvedValue::Stream(_) => f.write_str("Stream(..)"),
    }
  }
}

/// A fetcher result that carries metadata alongside its value: partial
/// field errors and an optional local-context override.
#[derive(Debug, Default)]
pub struct PartialResult {
  /// The fetched value.
  pub value: ResolvedValue,
  /// Errors raised while producing the value.
  pub errors: Vec<FieldError>,
  /// Replacement local context for the sub-selection, if any. When
  /// absent, the parent parameters' local context is inherited.
  pub local_context: Option<Arc<Value>>,
  /// When set, the carried error paths are relative to the current
  /// field and are rebased onto its absolute path as they are recorded.
  pub errors_relative_to_field: bool,
}

/// Raw output of a fetcher invocation, before unboxing.
#[derive(Debug)]
pub enum FetcherOutput {
  /// A plain value.
  Value(Value),
  /// A value wrapped with metadata.
  Partial(PartialResult),
}

impl FetcherOutput {
  /// A plain null output.
  pub fn null() -> Self {
    FetcherOutput::Value(Value::Null)
  }

  /// Output carrying a push-based emitter.
  pub fn emitter(emitter: impl EventEmitter<FetcherOutput> + Sync + 'static) -> Self {
    FetcherOutput::Partial(PartialResult {
      value: ResolvedValue::Emitter(Box::new(emitter)),
      ..PartialResult::default()
    })
  }

  /// Output carrying a cooperative pull stream.
  pub fn stream(stream: EventStream) -> Self {
    FetcherOutput::Partial(PartialResult {
      value: ResolvedValue::Stream(stream),
      ..PartialResult::default()
    })
  }

  /// The plain JSON payload, when this output carries one.
  pub fn as_value(&self) -> Option<&Value> {
    match self {
      FetcherOutput::Value(value) => Some(value),
      FetcherOutput::Partial(partial) => partial.value.as_value(),
    }
  }
}

/// The unboxed form of a fetcher result.
#[derive(Debug)]
pub struct FetchedValue {
  /// The unboxed value.
  pub value: ResolvedValue,
  /// Partial errors carried by the raw result, already recorded into
  /// the execution context's error list.
  pub errors: Vec<FieldError>,
  /// Local context for the sub-selection. Inherited from the parent
  /// parameters when the raw result carried none, so a present context
  /// never silently becomes absent.
  pub local_context: Option<Arc<Value>>,
}

/// Normalize a raw fetcher result into a [`FetchedValue`].
///
/// This is the only place partial per-field errors enter the execution
/// context's error list; relative error paths are rebased onto the
/// current field's absolute path here. Never fails - absence of data
/// and absence of errors are both valid.
pub fn unbox(
  raw: FetcherOutput,
  parameters: &ExecutionParameters,
  ctx: &ExecutionContext,
) -> FetchedValue {
  match raw {
    FetcherOutput::Value(value) => FetchedValue {
      value: if value.is_null() {
        ResolvedValue::Null
      } else {
        ResolvedValue::Value(value)
      },
      errors: Vec::new(),
      local_context: parameters.local_context().cloned(),
    },
    FetcherOutput::Partial(partial) => {
      let PartialResult {
        value,
        errors,
        local_context,
        errors_relative_to_field,
      } = partial;

      let errors: Vec<FieldError> = errors
        .into_iter()
        .map(|error| {
          if errors_relative_to_field {
            error.rebased(parameters.path())
          } else {
            error
          }
        })
        .collect();
      ctx.record_errors(errors.iter().cloned());

      FetchedValue {
        value,
        local_context: local_context.or_else(|| parameters.local_context().cloned()),
        errors,
      }
    }
  }
}
