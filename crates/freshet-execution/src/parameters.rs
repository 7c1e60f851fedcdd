//! The field-selection cursor.

use std::sync::Arc;

use serde_json::Value;

use crate::error::{ExecutionError, PathSegment};
use crate::selection::{Field, SelectionSet};

/// Path from the response root to the current position.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResponsePath {
  segments: Vec<PathSegment>,
}

impl ResponsePath {
  /// The root path.
  pub fn root() -> Self {
    Self::default()
  }

  /// Extend the path with one segment.
  pub fn child(&self, segment: PathSegment) -> Self {
    let mut segments = self.segments.clone();
    segments.push(segment);
    Self { segments }
  }

  pub fn segments(&self) -> &[PathSegment] {
    &self.segments
  }
}

/// The current position of a selection execution.
///
/// Parameters are transformed, never mutated: descending into a field
/// derives a new value pointing at that field, leaving the original
/// untouched.
#[derive(Debug, Clone)]
pub struct ExecutionParameters {
  selection: Arc<SelectionSet>,
  field: Option<Arc<Field>>,
  path: ResponsePath,
  local_context: Option<Arc<Value>>,
}

impl ExecutionParameters {
  /// Parameters at the root of an operation's selection set.
  pub fn for_operation(selection: SelectionSet) -> Self {
    Self {
      selection: Arc::new(selection),
      field: None,
      path: ResponsePath::root(),
      local_context: None,
    }
  }

  /// Seed the local context passed down to fetchers.
  pub fn with_local_context(mut self, local_context: Value) -> Self {
    self.local_context = Some(Arc::new(local_context));
    self
  }

  /// Derive parameters pointing at the single top-level field of a
  /// subscription selection set.
  ///
  /// Fails when the selection does not have exactly one root field.
  pub fn descend_to_root_field(&self) -> Result<ExecutionParameters, ExecutionError> {
    let field = self.selection.single_field()?.clone();
    let path = self
      .path
      .child(PathSegment::Key(field.response_key().to_string()));
    Ok(Self {
      selection: Arc::new(field.selection_set.clone()),
      field: Some(Arc::new(field)),
      path,
      local_context: self.local_context.clone(),
    })
  }

  /// The field this cursor points at, when it has descended into one.
  pub fn field(&self) -> Option<&Field> {
    self.field.as_deref()
  }

  /// Fields selected at the current level.
  pub fn selection(&self) -> &SelectionSet {
    &self.selection
  }

  pub fn path(&self) -> &ResponsePath {
    &self.path
  }

  pub fn local_context(&self) -> Option<&Arc<Value>> {
    self.local_context.as_ref()
  }
}
