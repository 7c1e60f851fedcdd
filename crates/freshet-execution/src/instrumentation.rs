//! Instrumentation hooks.
//!
//! Hooks observe execution at defined lifecycle points without altering
//! control flow, with one exception: the result transform, whose return
//! value replaces the result it was given. Hosts implement
//! [`Instrumentation`]; everyone else passes [`NoopInstrumentation`].

use crate::context::ExecutionContext;
use crate::error::ExecutionError;
use crate::result::ExecutionResult;
use crate::selection::Field;

/// Observer handle returned by a `begin_*` hook.
///
/// For each instrumented phase, `on_dispatched` fires once when the
/// phase's work has been attached, and `on_completed` fires exactly
/// once when the phase settles, success or failure.
pub trait InstrumentationObserver: Send + Sync {
  /// The phase's work has been dispatched.
  fn on_dispatched(&self) {}

  /// The phase settled with `outcome`.
  fn on_completed(&self, outcome: Result<&ExecutionResult, &ExecutionError>) {
    let _ = outcome;
  }
}

/// Lifecycle hooks around subscription execution.
///
/// All methods have no-op defaults, so implementations override only
/// the phases they care about.
pub trait Instrumentation: Send + Sync {
  /// Called before the execution strategy starts.
  fn begin_execution_strategy(&self, ctx: &ExecutionContext) -> Box<dyn InstrumentationObserver> {
    let _ = ctx;
    Box::new(NoopObserver)
  }

  /// Called before one subscribed-field event is executed.
  fn begin_subscribed_field_event(
    &self,
    ctx: &ExecutionContext,
    field: &Field,
  ) -> Box<dyn InstrumentationObserver> {
    let _ = (ctx, field);
    Box::new(NoopObserver)
  }

  /// Transform a finished execution result before it reaches the
  /// caller. Applied to per-event results and to terminal results
  /// alike, so downstream consumers see a normalized result regardless
  /// of operation type.
  fn instrument_execution_result(
    &self,
    ctx: &ExecutionContext,
    result: ExecutionResult,
  ) -> ExecutionResult {
    let _ = ctx;
    result
  }
}

/// Observer that ignores every callback.
pub struct NoopObserver;

impl InstrumentationObserver for NoopObserver {}

/// Instrumentation that observes nothing.
///
/// Useful for tests or when observability is not needed.
#[derive(Debug, Clone, Default)]
pub struct NoopInstrumentation;

impl Instrumentation for NoopInstrumentation {}
