//! Execution data model for freshet.
//!
//! This crate provides the types shared by the subscription strategy:
//! - `context`: per-pass execution state and error accumulation
//! - `parameters`: the immutable field-selection cursor
//! - `selection`: the minimal field model (names, aliases, arguments)
//! - `value`: raw fetcher output shapes and value unboxing
//! - `result`: execution results, including the stream-typed payload
//! - `engine`: collaborator traits for the host engine
//! - `instrumentation`: lifecycle hooks

mod context;
mod engine;
mod error;
mod instrumentation;
mod parameters;
mod result;
mod selection;
mod value;

pub use context::ExecutionContext;
pub use engine::{FieldResolver, SelectionExecutor};
pub use error::{ExecutionError, FieldError, PathSegment};
pub use instrumentation::{
  Instrumentation, InstrumentationObserver, NoopInstrumentation, NoopObserver,
};
pub use parameters::{ExecutionParameters, ResponsePath};
pub use result::{ExecutionResult, ResponseData, ResultStream};
pub use selection::{Field, SelectionSet};
pub use value::{
  EventStream, FetchedValue, FetcherOutput, PartialResult, ResolvedValue, SourceEventStream, unbox,
};
