//! Per-pass execution state.

use std::sync::{Arc, Mutex};

use serde_json::Value;
use uuid::Uuid;

use crate::error::FieldError;
use crate::instrumentation::Instrumentation;

/// State scoped to one execution pass.
///
/// A subscription creates one top-level context, then derives a fresh
/// context per event via [`for_event`](Self::for_event). Each derived
/// context owns its error list exclusively, so errors from one event
/// never leak into another and no locking discipline beyond the
/// append-only list is needed.
pub struct ExecutionContext {
  execution_id: String,
  variables: Arc<serde_json::Map<String, Value>>,
  root: Arc<Value>,
  instrumentation: Arc<dyn Instrumentation>,
  errors: Mutex<Vec<FieldError>>,
}

impl ExecutionContext {
  /// Create a context rooted at `root`.
  pub fn new(root: Value, instrumentation: Arc<dyn Instrumentation>) -> Self {
    Self {
      execution_id: Uuid::new_v4().to_string(),
      variables: Arc::new(serde_json::Map::new()),
      root: Arc::new(root),
      instrumentation,
      errors: Mutex::new(Vec::new()),
    }
  }

  /// Attach operation variables.
  pub fn with_variables(mut self, variables: serde_json::Map<String, Value>) -> Self {
    self.variables = Arc::new(variables);
    self
  }

  /// Derive the context for one subscription event: same execution
  /// identity, variables, and instrumentation; root value replaced by
  /// the event payload; error list fresh and empty.
  pub fn for_event(&self, payload: Value) -> Self {
    Self {
      execution_id: self.execution_id.clone(),
      variables: Arc::clone(&self.variables),
      root: Arc::new(payload),
      instrumentation: Arc::clone(&self.instrumentation),
      errors: Mutex::new(Vec::new()),
    }
  }

  /// Identifier shared by every pass of one subscription.
  pub fn execution_id(&self) -> &str {
    &self.execution_id
  }

  pub fn variables(&self) -> &serde_json::Map<String, Value> {
    &self.variables
  }

  /// The value this pass executes against: the operation root for the
  /// top-level pass, the event payload for per-event passes.
  pub fn root(&self) -> &Value {
    &self.root
  }

  pub fn instrumentation(&self) -> &Arc<dyn Instrumentation> {
    &self.instrumentation
  }

  /// Record one field error.
  pub fn record_error(&self, error: FieldError) {
    self
      .errors
      .lock()
      .unwrap_or_else(|e| e.into_inner())
      .push(error);
  }

  /// Record several field errors, preserving order.
  pub fn record_errors(&self, errors: impl IntoIterator<Item = FieldError>) {
    self
      .errors
      .lock()
      .unwrap_or_else(|e| e.into_inner())
      .extend(errors);
  }

  /// Snapshot of the errors recorded so far.
  pub fn errors(&self) -> Vec<FieldError> {
    self.errors.lock().unwrap_or_else(|e| e.into_inner()).clone()
  }

  /// Drain the recorded errors into a result.
  pub fn take_errors(&self) -> Vec<FieldError> {
    std::mem::take(&mut *self.errors.lock().unwrap_or_else(|e| e.into_inner()))
  }
}
