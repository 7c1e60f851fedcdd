//! Collaborator seams.
//!
//! The subscription core reuses a host engine's field resolution and
//! selection execution rather than extending it: both are injected as
//! trait objects, which keeps the strategy testable against fakes.

use async_trait::async_trait;
use serde_json::Value;

use crate::context::ExecutionContext;
use crate::error::ExecutionError;
use crate::parameters::ExecutionParameters;
use crate::value::{FetchedValue, FetcherOutput};

/// The field-resolution engine.
///
/// Invoked once per field with the current execution position. The raw
/// result may be a plain value, a metadata wrapper, a push-based
/// emitter, or a pull stream; callers normalize it with
/// [`unbox`](crate::unbox).
#[async_trait]
pub trait FieldResolver: Send + Sync {
  async fn resolve_field(
    &self,
    ctx: &ExecutionContext,
    parameters: &ExecutionParameters,
  ) -> Result<FetcherOutput, ExecutionError>;
}

/// The selection-execution engine.
///
/// Executes the selection set at `parameters` against an
/// already-fetched source value, recording field errors into `ctx`, and
/// returns the produced value tree. Reused unchanged for per-event
/// subscription execution.
#[async_trait]
pub trait SelectionExecutor: Send + Sync {
  async fn execute_selection(
    &self,
    ctx: &ExecutionContext,
    parameters: &ExecutionParameters,
    source: &FetchedValue,
  ) -> Result<Value, ExecutionError>;
}
