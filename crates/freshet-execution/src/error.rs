//! Error types for subscription execution.

use serde::Serialize;
use thiserror::Error;

use crate::parameters::ResponsePath;

/// One segment of a response path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PathSegment {
  /// An object field, keyed by response key.
  Key(String),
  /// A list index.
  Index(usize),
}

/// A field error recorded while executing one selection pass.
///
/// Field errors are response data, not control flow: they accumulate in
/// the execution context's error list and surface in the corresponding
/// [`ExecutionResult`](crate::ExecutionResult), never as exceptions
/// across event boundaries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
  /// Human-readable description of what went wrong.
  pub message: String,
  /// Path to the response position the error applies to.
  pub path: Vec<PathSegment>,
}

impl FieldError {
  /// An error with no path.
  pub fn new(message: impl Into<String>) -> Self {
    Self {
      message: message.into(),
      path: Vec::new(),
    }
  }

  /// An error at a specific response path.
  pub fn at(message: impl Into<String>, path: Vec<PathSegment>) -> Self {
    Self {
      message: message.into(),
      path,
    }
  }

  /// Rebase a relative error onto an absolute field path.
  ///
  /// The error's own path is treated as relative to `prefix` and the
  /// two are composed.
  pub fn rebased(mut self, prefix: &ResponsePath) -> Self {
    let mut path = prefix.segments().to_vec();
    path.append(&mut self.path);
    self.path = path;
    self
  }
}

/// Errors that can fail a subscription execution or one event's slot in
/// the result stream.
#[derive(Debug, Error)]
pub enum ExecutionError {
  /// The root field's fetcher failed.
  #[error("field resolution failed for '{field}': {message}")]
  FieldResolution { field: String, message: String },

  /// The selection-execution engine failed for one event.
  #[error("selection execution failed for '{field}': {message}")]
  SelectionExecution { field: String, message: String },

  /// The subscription selection set is malformed.
  #[error("invalid subscription: {message}")]
  InvalidSubscription { message: String },

  /// Execution was cancelled.
  #[error("subscription execution cancelled")]
  Cancelled,
}
