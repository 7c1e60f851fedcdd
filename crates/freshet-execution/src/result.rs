//! Execution results.

use futures::stream::BoxStream;
use serde_json::Value;

use crate::error::{ExecutionError, FieldError};

/// Live sequence of per-event execution results.
///
/// A failed element at position N reflects a failure executing event N;
/// it does not by itself terminate the sequence, which ends only when
/// the underlying source does.
pub type ResultStream = BoxStream<'static, Result<ExecutionResult, ExecutionError>>;

/// The data payload of an execution result.
pub enum ResponseData {
  /// No data could be produced.
  Null,
  /// A materialized value tree.
  Value(Value),
  /// A live sequence of per-event results (subscription operations).
  Stream(ResultStream),
}

impl ResponseData {
  /// The materialized value, when this is one.
  pub fn as_value(&self) -> Option<&Value> {
    match self {
      ResponseData::Value(value) => Some(value),
      _ => None,
    }
  }

  /// Whether this is the stream-typed payload.
  pub fn is_stream(&self) -> bool {
    matches!(self, ResponseData::Stream(_))
  }

  /// Take the stream payload out of the result.
  pub fn into_stream(self) -> Option<ResultStream> {
    match self {
      ResponseData::Stream(stream) => Some(stream),
      _ => None,
    }
  }
}

impl std::fmt::Debug for ResponseData {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      ResponseData::Null => f.write_str("Null"),
      ResponseData::Value(value) => f.debug_tuple("Value").field(value).finish(),
      ResponseData::Stream(_) => f.write_str("Stream(..)"),
    }
  }
}

/// Result of one execution pass.
#[derive(Debug)]
pub struct ExecutionResult {
  /// Response data. For the subscription operation itself this is the
  /// result stream; for each per-event pass it is the value tree under
  /// the root field's response key.
  pub data: ResponseData,
  /// Errors accumulated during this pass, in recording order.
  pub errors: Vec<FieldError>,
}

impl ExecutionResult {
  /// A result carrying data.
  pub fn new(data: ResponseData, errors: Vec<FieldError>) -> Self {
    Self { data, errors }
  }

  /// A terminal result with no data.
  pub fn null(errors: Vec<FieldError>) -> Self {
    Self {
      data: ResponseData::Null,
      errors,
    }
  }
}
