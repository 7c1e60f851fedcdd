//! Per-event execution.
//!
//! The second phase of subscription execution: treat one event payload
//! as a fresh top-level value and run a full selection pass against it.

use std::sync::Arc;

use serde_json::Value;
use tracing::{error, info};

use freshet_execution::{
  ExecutionContext, ExecutionError, ExecutionParameters, ExecutionResult, FetcherOutput,
  ResponseData, SelectionExecutor, unbox,
};

/// Executes one full selection pass per subscription event.
#[derive(Clone)]
pub struct PerEventExecutor {
  selections: Arc<dyn SelectionExecutor>,
}

impl PerEventExecutor {
  pub fn new(selections: Arc<dyn SelectionExecutor>) -> Self {
    Self { selections }
  }

  /// Execute the subscription selection against one event payload.
  ///
  /// Derives an event-scoped context (fresh error list, event payload
  /// as root value) so errors never leak across events, and wraps the
  /// produced value under the root field's response key. The
  /// subscribed-field-event hooks fire exactly once each, whether the
  /// pass succeeds or fails.
  pub async fn execute(
    &self,
    ctx: &ExecutionContext,
    parameters: &ExecutionParameters,
    event: FetcherOutput,
  ) -> Result<ExecutionResult, ExecutionError> {
    let root = event.as_value().cloned().unwrap_or(Value::Null);
    let event_ctx = ctx.for_event(root);

    let field = parameters.selection().single_field()?.clone();
    let field_parameters = parameters.descend_to_root_field()?;

    let observer = event_ctx
      .instrumentation()
      .begin_subscribed_field_event(&event_ctx, &field);

    let pass = self.execute_pass(&event_ctx, &field_parameters, event, field.response_key());
    observer.on_dispatched();
    let outcome = pass.await;

    match &outcome {
      Ok(result) => {
        observer.on_completed(Ok(result));
        info!(
          execution_id = %event_ctx.execution_id(),
          field = %field.name,
          errors = result.errors.len(),
          "event_completed"
        );
      }
      Err(e) => {
        observer.on_completed(Err(e));
        error!(
          execution_id = %event_ctx.execution_id(),
          field = %field.name,
          error = %e,
          "event_failed"
        );
      }
    }

    outcome
  }

  async fn execute_pass(
    &self,
    ctx: &ExecutionContext,
    parameters: &ExecutionParameters,
    event: FetcherOutput,
    response_key: &str,
  ) -> Result<ExecutionResult, ExecutionError> {
    // The event payload follows the same contract as a raw fetch
    // result: it may carry partial errors and a local context.
    let fetched = unbox(event, parameters, ctx);

    let value = self
      .selections
      .execute_selection(ctx, parameters, &fetched)
      .await?;

    let mut data = serde_json::Map::new();
    data.insert(response_key.to_string(), value);

    let result = ExecutionResult::new(ResponseData::Value(Value::Object(data)), ctx.take_errors());
    Ok(
      ctx
        .instrumentation()
        .instrument_execution_result(ctx, result),
    )
  }
}
