//! The subscription execution strategy.

use std::sync::Arc;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument};

use freshet_execution::{
  ExecutionContext, ExecutionError, ExecutionParameters, ExecutionResult, FieldResolver,
  ResponseData, ResultStream, SelectionExecutor, SourceEventStream,
};

use crate::event::PerEventExecutor;
use crate::source::SourceStreamResolver;

/// Execution strategy for subscription operations.
///
/// Resolves the root subscription field into a live source event
/// stream, then maps a full selection execution over every event. The
/// returned result's data is itself a stream: one [`ExecutionResult`]
/// per source event, in emission order.
pub struct SubscriptionExecutionStrategy {
  source: SourceStreamResolver,
  events: PerEventExecutor,
}

impl SubscriptionExecutionStrategy {
  /// Create a strategy over the host engine's collaborators.
  pub fn new(resolver: Arc<dyn FieldResolver>, selections: Arc<dyn SelectionExecutor>) -> Self {
    Self {
      source: SourceStreamResolver::new(resolver),
      events: PerEventExecutor::new(selections),
    }
  }

  /// Execute a subscription operation.
  ///
  /// On success the result's data is either [`ResponseData::Null`]
  /// (the fetcher produced no event stream) or
  /// [`ResponseData::Stream`]. Events are executed strictly one at a
  /// time: the next event is not pulled from the source until the
  /// previous result has settled, so result order matches emission
  /// order and the source is backpressured by consumption. Cancelling
  /// `cancel` or dropping the stream stops the underlying source; an
  /// in-flight event may still complete, with its result discarded.
  #[instrument(
    name = "subscription_execute",
    skip_all,
    fields(execution_id = %ctx.execution_id())
  )]
  pub async fn execute(
    &self,
    ctx: Arc<ExecutionContext>,
    parameters: ExecutionParameters,
    cancel: CancellationToken,
  ) -> Result<ExecutionResult, ExecutionError> {
    info!("subscription_started");

    let observer = ctx.instrumentation().begin_execution_strategy(&ctx);
    let outcome = self.attach(Arc::clone(&ctx), parameters, cancel).await;

    match &outcome {
      Ok(result) => {
        observer.on_dispatched();
        observer.on_completed(Ok(result));
        info!(has_stream = result.data.is_stream(), "subscription_dispatched");
      }
      Err(e) => {
        observer.on_completed(Err(e));
        error!(error = %e, "subscription_failed");
      }
    }

    outcome
  }

  /// Resolve the source stream and attach the per-event mapping.
  async fn attach(
    &self,
    ctx: Arc<ExecutionContext>,
    parameters: ExecutionParameters,
    cancel: CancellationToken,
  ) -> Result<ExecutionResult, ExecutionError> {
    let stream = self.source.resolve(&ctx, &parameters, &cancel).await?;

    match stream {
      None => {
        let result = ExecutionResult::null(ctx.take_errors());
        Ok(
          ctx
            .instrumentation()
            .instrument_execution_result(&ctx, result),
        )
      }
      Some(events) => {
        let results = self.map_events(Arc::clone(&ctx), parameters, events);
        Ok(ExecutionResult::new(
          ResponseData::Stream(results),
          ctx.take_errors(),
        ))
      }
    }
  }

  /// Lazily map the per-event executor over the source sequence.
  ///
  /// `then` drives exactly one per-event future at a time and only
  /// polls the sequence again after it settles. A failed element does
  /// not end the stream; only source termination does.
  fn map_events(
    &self,
    ctx: Arc<ExecutionContext>,
    parameters: ExecutionParameters,
    events: SourceEventStream,
  ) -> ResultStream {
    let executor = self.events.clone();
    events
      .then(move |event| {
        let ctx = Arc::clone(&ctx);
        let parameters = parameters.clone();
        let executor = executor.clone();
        async move { executor.execute(&ctx, &parameters, event).await }
      })
      .boxed()
  }
}
