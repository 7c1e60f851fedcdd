//! Subscription execution for freshet.
//!
//! Implements the subscription operation of a query-execution engine
//! as a dual-phase algorithm:
//!
//! 1. Resolve the single root subscription field into a live source
//!    event stream ([`SourceStreamResolver`]).
//! 2. For every event the source emits, run a full field-selection
//!    execution pass against it as a fresh top-level value
//!    ([`PerEventExecutor`]).
//!
//! The output is itself a stream of execution results, not a single
//! result. [`SubscriptionExecutionStrategy`] ties the phases together;
//! the general selection-execution engine and the field resolvers are
//! injected collaborators (see `freshet_execution`).

mod event;
mod source;
mod strategy;

pub use event::PerEventExecutor;
pub use source::{SourceStreamResolver, adapt};
pub use strategy::SubscriptionExecutionStrategy;
