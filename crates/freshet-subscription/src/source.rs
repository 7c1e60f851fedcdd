//! Source stream resolution.
//!
//! The first phase of subscription execution: run the root field's
//! fetcher once and turn whatever it produced into the canonical event
//! sequence, or into "no stream" when it produced neither supported
//! asynchronous shape.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use freshet_execution::{
  ExecutionContext, ExecutionError, ExecutionParameters, FieldResolver, ResolvedValue,
  SourceEventStream, unbox,
};
use freshet_stream::EventSequence;

/// Convert an unboxed fetcher value into the canonical event sequence.
///
/// Push-based emitters are subscribed under a child of `cancel`, so
/// cancelling the sequence propagates to the producer; pull streams
/// pass through. Any other shape means "no event stream", which is not
/// an error by itself.
///
/// Bridging a push-based source does not carry producer-side task
/// state across the channel; events arrive as bare values.
pub fn adapt(value: ResolvedValue, cancel: &CancellationToken) -> Option<SourceEventStream> {
  match value {
    ResolvedValue::Emitter(emitter) => Some(EventSequence::from_emitter(emitter, cancel)),
    ResolvedValue::Stream(stream) => Some(EventSequence::from_stream(stream, cancel)),
    ResolvedValue::Null | ResolvedValue::Value(_) => None,
  }
}

/// Resolves the subscription root field into its source event stream.
#[derive(Clone)]
pub struct SourceStreamResolver {
  resolver: Arc<dyn FieldResolver>,
}

impl SourceStreamResolver {
  pub fn new(resolver: Arc<dyn FieldResolver>) -> Self {
    Self { resolver }
  }

  /// Run the root field's fetcher once and adapt its result.
  ///
  /// Returns `Ok(None)` when the fetcher produced neither an emitter
  /// nor a stream. A fetcher failure propagates to the caller; the
  /// strategy turns it into a failed outer result.
  pub async fn resolve(
    &self,
    ctx: &ExecutionContext,
    parameters: &ExecutionParameters,
    cancel: &CancellationToken,
  ) -> Result<Option<SourceEventStream>, ExecutionError> {
    let field_parameters = parameters.descend_to_root_field()?;
    let raw = self.resolver.resolve_field(ctx, &field_parameters).await?;
    let fetched = unbox(raw, &field_parameters, ctx);
    let stream = adapt(fetched.value, cancel);

    if stream.is_some() {
      info!(execution_id = %ctx.execution_id(), "source_stream_resolved");
    } else {
      info!(execution_id = %ctx.execution_id(), "source_stream_absent");
    }
    Ok(stream)
  }
}
