//! Minimal field-selection model.
//!
//! Schema representation and document parsing are host concerns; the
//! subscription core only needs the shape of the selection it executes:
//! fields with aliases, coerced arguments, and nested selections.

use serde_json::Value;

use crate::error::ExecutionError;

/// One field of a selection set.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Field {
  /// Field name as the schema defines it.
  pub name: String,
  /// Response alias, when the selection renamed the field.
  pub alias: Option<String>,
  /// Coerced argument values.
  pub arguments: serde_json::Map<String, Value>,
  /// Sub-selection executed against the field's value.
  pub selection_set: SelectionSet,
}

impl Field {
  /// A field with no alias, arguments, or sub-selection.
  pub fn named(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      ..Self::default()
    }
  }

  /// Alias the field's response key.
  pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
    self.alias = Some(alias.into());
    self
  }

  /// Add one argument.
  pub fn with_argument(mut self, name: impl Into<String>, value: Value) -> Self {
    self.arguments.insert(name.into(), value);
    self
  }

  /// Attach a sub-selection.
  pub fn with_selection(mut self, selection_set: SelectionSet) -> Self {
    self.selection_set = selection_set;
    self
  }

  /// The key this field's value is delivered under: the alias when
  /// present, else the field name.
  pub fn response_key(&self) -> &str {
    self.alias.as_deref().unwrap_or(&self.name)
  }
}

/// An ordered set of fields selected at one level.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectionSet {
  pub fields: Vec<Field>,
}

impl SelectionSet {
  pub fn new(fields: Vec<Field>) -> Self {
    Self { fields }
  }

  /// The single top-level field of a subscription selection.
  ///
  /// Subscription operations must select exactly one root field. Both
  /// an empty selection and a multi-field selection are rejected
  /// rather than truncated to the first field.
  pub fn single_field(&self) -> Result<&Field, ExecutionError> {
    match self.fields.as_slice() {
      [field] => Ok(field),
      [] => Err(ExecutionError::InvalidSubscription {
        message: "selection set has no root field".to_string(),
      }),
      fields => Err(ExecutionError::InvalidSubscription {
        message: format!(
          "selection set has {} root fields, expected exactly one",
          fields.len()
        ),
      }),
    }
  }
}
