//! Integration tests driving the full subscription pipeline with fake
//! collaborators.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

use freshet_execution::{
  ExecutionContext, ExecutionError, ExecutionParameters, ExecutionResult, FetchedValue,
  FetcherOutput, Field, FieldError, FieldResolver, Instrumentation, InstrumentationObserver,
  NoopInstrumentation, PartialResult, PathSegment, ResolvedValue, SelectionExecutor, SelectionSet,
};
use freshet_stream::{EventEmitter, EventSink, IterEmitter};
use freshet_subscription::SubscriptionExecutionStrategy;

/// Resolver that hands out a prepared fetcher output, once.
struct OneShotResolver {
  output: Mutex<Option<FetcherOutput>>,
}

impl OneShotResolver {
  fn new(output: FetcherOutput) -> Arc<Self> {
    Arc::new(Self {
      output: Mutex::new(Some(output)),
    })
  }
}

#[async_trait]
impl FieldResolver for OneShotResolver {
  async fn resolve_field(
    &self,
    _ctx: &ExecutionContext,
    parameters: &ExecutionParameters,
  ) -> Result<FetcherOutput, ExecutionError> {
    self.output.lock().unwrap().take().ok_or_else(|| {
      ExecutionError::FieldResolution {
        field: parameters.field().map(|f| f.name.clone()).unwrap_or_default(),
        message: "fetcher invoked more than once".to_string(),
      }
    })
  }
}

/// Resolver that always fails.
struct FailingResolver;

#[async_trait]
impl FieldResolver for FailingResolver {
  async fn resolve_field(
    &self,
    _ctx: &ExecutionContext,
    _parameters: &ExecutionParameters,
  ) -> Result<FetcherOutput, ExecutionError> {
    Err(ExecutionError::FieldResolution {
      field: "ticks".to_string(),
      message: "upstream unavailable".to_string(),
    })
  }
}

/// Selection executor that doubles integer payloads.
///
/// A payload of 13 records a field error and produces null; a payload
/// of 99 fails the whole pass.
struct DoublingExecutor {
  calls: AtomicUsize,
}

impl DoublingExecutor {
  fn new() -> Arc<Self> {
    Arc::new(Self {
      calls: AtomicUsize::new(0),
    })
  }

  fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl SelectionExecutor for DoublingExecutor {
  async fn execute_selection(
    &self,
    ctx: &ExecutionContext,
    parameters: &ExecutionParameters,
    source: &FetchedValue,
  ) -> Result<Value, ExecutionError> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    let n = source.value.as_value().and_then(Value::as_i64).unwrap_or(0);
    match n {
      13 => {
        ctx.record_error(FieldError::at(
          "unlucky payload",
          parameters.path().segments().to_vec(),
        ));
        Ok(Value::Null)
      }
      99 => Err(ExecutionError::SelectionExecution {
        field: parameters.field().map(|f| f.name.clone()).unwrap_or_default(),
        message: "payload rejected".to_string(),
      }),
      n => Ok(json!(n * 2)),
    }
  }
}

/// Selection executor that echoes the fetched local context.
struct ContextEchoExecutor;

#[async_trait]
impl SelectionExecutor for ContextEchoExecutor {
  async fn execute_selection(
    &self,
    _ctx: &ExecutionContext,
    _parameters: &ExecutionParameters,
    source: &FetchedValue,
  ) -> Result<Value, ExecutionError> {
    Ok(
      source
        .local_context
        .as_ref()
        .map(|c| c.as_ref().clone())
        .unwrap_or(Value::Null),
    )
  }
}

#[derive(Default)]
struct HookCounts {
  strategy_begun: AtomicUsize,
  strategy_dispatched: AtomicUsize,
  strategy_completed: AtomicUsize,
  strategy_failed: AtomicUsize,
  event_begun: AtomicUsize,
  event_dispatched: AtomicUsize,
  event_completed: AtomicUsize,
  event_failed: AtomicUsize,
  results_instrumented: AtomicUsize,
}

enum Phase {
  Strategy,
  Event,
}

/// Instrumentation that counts every hook invocation.
#[derive(Default)]
struct RecordingInstrumentation {
  counts: Arc<HookCounts>,
}

struct RecordingObserver {
  counts: Arc<HookCounts>,
  phase: Phase,
}

impl InstrumentationObserver for RecordingObserver {
  fn on_dispatched(&self) {
    let counter = match self.phase {
      Phase::Strategy => &self.counts.strategy_dispatched,
      Phase::Event => &self.counts.event_dispatched,
    };
    counter.fetch_add(1, Ordering::SeqCst);
  }

  fn on_completed(&self, outcome: Result<&ExecutionResult, &ExecutionError>) {
    let counter = match (&self.phase, outcome.is_ok()) {
      (Phase::Strategy, true) => &self.counts.strategy_completed,
      (Phase::Strategy, false) => &self.counts.strategy_failed,
      (Phase::Event, true) => &self.counts.event_completed,
      (Phase::Event, false) => &self.counts.event_failed,
    };
    counter.fetch_add(1, Ordering::SeqCst);
  }
}

impl Instrumentation for RecordingInstrumentation {
  fn begin_execution_strategy(&self, _ctx: &ExecutionContext) -> Box<dyn InstrumentationObserver> {
    self.counts.strategy_begun.fetch_add(1, Ordering::SeqCst);
    Box::new(RecordingObserver {
      counts: Arc::clone(&self.counts),
      phase: Phase::Strategy,
    })
  }

  fn begin_subscribed_field_event(
    &self,
    _ctx: &ExecutionContext,
    _field: &Field,
  ) -> Box<dyn InstrumentationObserver> {
    self.counts.event_begun.fetch_add(1, Ordering::SeqCst);
    Box::new(RecordingObserver {
      counts: Arc::clone(&self.counts),
      phase: Phase::Event,
    })
  }

  fn instrument_execution_result(
    &self,
    _ctx: &ExecutionContext,
    result: ExecutionResult,
  ) -> ExecutionResult {
    self.counts.results_instrumented.fetch_add(1, Ordering::SeqCst);
    result
  }
}

fn int_events(ns: &[i64]) -> Vec<FetcherOutput> {
  ns.iter().map(|n| FetcherOutput::Value(json!(n))).collect()
}

fn ticks_subscription() -> ExecutionParameters {
  ExecutionParameters::for_operation(SelectionSet::new(vec![
    Field::named("counter").with_alias("tick"),
  ]))
}

fn context() -> Arc<ExecutionContext> {
  Arc::new(ExecutionContext::new(
    Value::Null,
    Arc::new(NoopInstrumentation),
  ))
}

#[tokio::test]
async fn doubles_each_event_under_the_alias() {
  let resolver = OneShotResolver::new(FetcherOutput::emitter(IterEmitter::new(int_events(&[
    1, 2, 3,
  ]))));
  let selections = DoublingExecutor::new();
  let strategy = SubscriptionExecutionStrategy::new(resolver, selections.clone());

  let result = strategy
    .execute(context(), ticks_subscription(), CancellationToken::new())
    .await
    .unwrap();

  assert!(result.errors.is_empty());
  let mut stream = result.data.into_stream().unwrap();

  for expected in [2, 4, 6] {
    let event_result = stream.next().await.unwrap().unwrap();
    assert_eq!(
      event_result.data.as_value().unwrap(),
      &json!({"tick": expected})
    );
    assert!(event_result.errors.is_empty());
  }
  assert!(stream.next().await.is_none());
  assert_eq!(selections.calls(), 3);
}

#[tokio::test]
async fn pull_stream_sources_behave_like_emitters() {
  let stream = Box::pin(futures::stream::iter(int_events(&[4, 5])));
  let resolver = OneShotResolver::new(FetcherOutput::stream(stream));
  let strategy = SubscriptionExecutionStrategy::new(resolver, DoublingExecutor::new());

  let result = strategy
    .execute(context(), ticks_subscription(), CancellationToken::new())
    .await
    .unwrap();

  let mut results = result.data.into_stream().unwrap();
  assert_eq!(
    results.next().await.unwrap().unwrap().data.as_value().unwrap(),
    &json!({"tick": 8})
  );
  assert_eq!(
    results.next().await.unwrap().unwrap().data.as_value().unwrap(),
    &json!({"tick": 10})
  );
  assert!(results.next().await.is_none());
}

#[tokio::test]
async fn plain_value_yields_a_terminal_null_result() {
  let resolver = OneShotResolver::new(FetcherOutput::Partial(PartialResult {
    value: ResolvedValue::Value(json!({"not": "a stream"})),
    errors: vec![FieldError::new("fetcher produced no stream")],
    ..PartialResult::default()
  }));
  let selections = DoublingExecutor::new();
  let strategy = SubscriptionExecutionStrategy::new(resolver, selections.clone());

  let result = strategy
    .execute(context(), ticks_subscription(), CancellationToken::new())
    .await
    .unwrap();

  assert!(!result.data.is_stream());
  assert!(result.data.as_value().is_none());
  assert_eq!(result.errors.len(), 1);
  assert_eq!(result.errors[0].message, "fetcher produced no stream");
  // No per-event execution happened.
  assert_eq!(selections.calls(), 0);
}

#[tokio::test]
async fn event_errors_do_not_leak_into_later_events() {
  let resolver = OneShotResolver::new(FetcherOutput::emitter(IterEmitter::new(int_events(&[
    13, 2,
  ]))));
  let strategy = SubscriptionExecutionStrategy::new(resolver, DoublingExecutor::new());

  let result = strategy
    .execute(context(), ticks_subscription(), CancellationToken::new())
    .await
    .unwrap();
  let mut stream = result.data.into_stream().unwrap();

  let first = stream.next().await.unwrap().unwrap();
  assert_eq!(first.errors.len(), 1);
  assert_eq!(first.errors[0].message, "unlucky payload");
  assert_eq!(
    first.errors[0].path,
    vec![PathSegment::Key("tick".to_string())]
  );

  let second = stream.next().await.unwrap().unwrap();
  assert!(second.errors.is_empty());
  assert_eq!(second.data.as_value().unwrap(), &json!({"tick": 4}));
}

#[tokio::test]
async fn relative_event_errors_are_rebased_onto_the_field_path() {
  let event = FetcherOutput::Partial(PartialResult {
    value: ResolvedValue::Value(json!(5)),
    errors: vec![FieldError::at(
      "inner failure",
      vec![PathSegment::Key("inner".to_string())],
    )],
    errors_relative_to_field: true,
    ..PartialResult::default()
  });
  let resolver = OneShotResolver::new(FetcherOutput::emitter(IterEmitter::new(vec![event])));
  let strategy = SubscriptionExecutionStrategy::new(resolver, DoublingExecutor::new());

  let result = strategy
    .execute(context(), ticks_subscription(), CancellationToken::new())
    .await
    .unwrap();
  let mut stream = result.data.into_stream().unwrap();

  let event_result = stream.next().await.unwrap().unwrap();
  assert_eq!(
    event_result.errors[0].path,
    vec![
      PathSegment::Key("tick".to_string()),
      PathSegment::Key("inner".to_string()),
    ]
  );
  assert_eq!(event_result.data.as_value().unwrap(), &json!({"tick": 10}));
}

#[tokio::test]
async fn a_failed_event_does_not_end_the_stream() {
  let resolver = OneShotResolver::new(FetcherOutput::emitter(IterEmitter::new(int_events(&[
    1, 99, 3,
  ]))));
  let strategy = SubscriptionExecutionStrategy::new(resolver, DoublingExecutor::new());

  let result = strategy
    .execute(context(), ticks_subscription(), CancellationToken::new())
    .await
    .unwrap();
  let mut stream = result.data.into_stream().unwrap();

  assert!(stream.next().await.unwrap().is_ok());
  let failed = stream.next().await.unwrap();
  assert!(matches!(
    failed,
    Err(ExecutionError::SelectionExecution { .. })
  ));
  let third = stream.next().await.unwrap().unwrap();
  assert_eq!(third.data.as_value().unwrap(), &json!({"tick": 6}));
  assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn resolver_failure_fails_the_outer_result() {
  let strategy = SubscriptionExecutionStrategy::new(Arc::new(FailingResolver), DoublingExecutor::new());

  let outcome = strategy
    .execute(context(), ticks_subscription(), CancellationToken::new())
    .await;
  assert!(matches!(
    outcome,
    Err(ExecutionError::FieldResolution { .. })
  ));
}

#[tokio::test]
async fn multi_field_selections_are_rejected() {
  let resolver = OneShotResolver::new(FetcherOutput::emitter(IterEmitter::new(int_events(&[1]))));
  let strategy = SubscriptionExecutionStrategy::new(resolver, DoublingExecutor::new());

  let parameters = ExecutionParameters::for_operation(SelectionSet::new(vec![
    Field::named("counter"),
    Field::named("other"),
  ]));

  let outcome = strategy
    .execute(context(), parameters, CancellationToken::new())
    .await;
  assert!(matches!(
    outcome,
    Err(ExecutionError::InvalidSubscription { .. })
  ));
}

/// Emitter that counts how many events it managed to hand off.
struct CountingEmitter {
  emitted: Arc<AtomicUsize>,
}

impl EventEmitter<FetcherOutput> for CountingEmitter {
  fn subscribe(self: Box<Self>, sink: EventSink<FetcherOutput>, cancel: CancellationToken) {
    tokio::spawn(async move {
      for n in 0i64.. {
        tokio::select! {
          _ = cancel.cancelled() => break,
          delivered = sink.emit(FetcherOutput::Value(json!(n))) => {
            if !delivered {
              break;
            }
            self.emitted.fetch_add(1, Ordering::SeqCst);
          }
        }
      }
    });
  }
}

#[tokio::test]
async fn cancellation_stops_the_source_and_holds_backpressure() {
  let emitted = Arc::new(AtomicUsize::new(0));
  let resolver = OneShotResolver::new(FetcherOutput::emitter(CountingEmitter {
    emitted: emitted.clone(),
  }));
  let selections = DoublingExecutor::new();
  let strategy = SubscriptionExecutionStrategy::new(resolver, selections.clone());

  let cancel = CancellationToken::new();
  let result = strategy
    .execute(context(), ticks_subscription(), cancel.clone())
    .await
    .unwrap();
  let mut stream = result.data.into_stream().unwrap();

  let first = stream.next().await.unwrap().unwrap();
  assert_eq!(first.data.as_value().unwrap(), &json!({"tick": 0}));

  // Only event 0 went through the per-event executor; the source can
  // run at most one event ahead of consumption.
  assert_eq!(selections.calls(), 1);

  cancel.cancel();
  assert!(stream.next().await.is_none());

  tokio::time::sleep(Duration::from_millis(50)).await;
  let settled = emitted.load(Ordering::SeqCst);
  tokio::time::sleep(Duration::from_millis(50)).await;
  assert_eq!(emitted.load(Ordering::SeqCst), settled);
  assert_eq!(selections.calls(), 1);
}

#[tokio::test]
async fn local_context_flows_from_the_operation_to_events() {
  let resolver = OneShotResolver::new(FetcherOutput::emitter(IterEmitter::new(int_events(&[1]))));
  let strategy = SubscriptionExecutionStrategy::new(resolver, Arc::new(ContextEchoExecutor));

  let parameters = ticks_subscription().with_local_context(json!({"tenant": "acme"}));
  let result = strategy
    .execute(context(), parameters, CancellationToken::new())
    .await
    .unwrap();
  let mut stream = result.data.into_stream().unwrap();

  let event_result = stream.next().await.unwrap().unwrap();
  assert_eq!(
    event_result.data.as_value().unwrap(),
    &json!({"tick": {"tenant": "acme"}})
  );
}

#[tokio::test]
async fn event_local_context_overrides_the_inherited_one() {
  let event = FetcherOutput::Partial(PartialResult {
    value: ResolvedValue::Value(json!(1)),
    local_context: Some(Arc::new(json!({"tenant": "other"}))),
    ..PartialResult::default()
  });
  let resolver = OneShotResolver::new(FetcherOutput::emitter(IterEmitter::new(vec![event])));
  let strategy = SubscriptionExecutionStrategy::new(resolver, Arc::new(ContextEchoExecutor));

  let parameters = ticks_subscription().with_local_context(json!({"tenant": "acme"}));
  let result = strategy
    .execute(context(), parameters, CancellationToken::new())
    .await
    .unwrap();
  let mut stream = result.data.into_stream().unwrap();

  let event_result = stream.next().await.unwrap().unwrap();
  assert_eq!(
    event_result.data.as_value().unwrap(),
    &json!({"tick": {"tenant": "other"}})
  );
}

#[tokio::test]
async fn instrumentation_hooks_fire_once_per_phase() {
  let counts = Arc::new(HookCounts::default());
  let instrumentation = Arc::new(RecordingInstrumentation {
    counts: Arc::clone(&counts),
  });
  let ctx = Arc::new(ExecutionContext::new(Value::Null, instrumentation));

  let resolver = OneShotResolver::new(FetcherOutput::emitter(IterEmitter::new(int_events(&[
    1, 2,
  ]))));
  let strategy = SubscriptionExecutionStrategy::new(resolver, DoublingExecutor::new());

  let result = strategy
    .execute(ctx, ticks_subscription(), CancellationToken::new())
    .await
    .unwrap();
  let mut stream = result.data.into_stream().unwrap();
  while let Some(item) = stream.next().await {
    item.unwrap();
  }

  assert_eq!(counts.strategy_begun.load(Ordering::SeqCst), 1);
  assert_eq!(counts.strategy_dispatched.load(Ordering::SeqCst), 1);
  assert_eq!(counts.strategy_completed.load(Ordering::SeqCst), 1);
  assert_eq!(counts.strategy_failed.load(Ordering::SeqCst), 0);
  assert_eq!(counts.event_begun.load(Ordering::SeqCst), 2);
  assert_eq!(counts.event_dispatched.load(Ordering::SeqCst), 2);
  assert_eq!(counts.event_completed.load(Ordering::SeqCst), 2);
  assert_eq!(counts.event_failed.load(Ordering::SeqCst), 0);
  assert_eq!(counts.results_instrumented.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn failure_hooks_fire_for_failed_phases() {
  let counts = Arc::new(HookCounts::default());
  let instrumentation = Arc::new(RecordingInstrumentation {
    counts: Arc::clone(&counts),
  });
  let ctx = Arc::new(ExecutionContext::new(Value::Null, instrumentation));

  let strategy = SubscriptionExecutionStrategy::new(Arc::new(FailingResolver), DoublingExecutor::new());
  let outcome = strategy
    .execute(ctx, ticks_subscription(), CancellationToken::new())
    .await;

  assert!(outcome.is_err());
  assert_eq!(counts.strategy_begun.load(Ordering::SeqCst), 1);
  assert_eq!(counts.strategy_dispatched.load(Ordering::SeqCst), 0);
  assert_eq!(counts.strategy_failed.load(Ordering::SeqCst), 1);
}
