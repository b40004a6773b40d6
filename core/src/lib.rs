// src/lib.rs

#![doc = include_str!("../README.md")]

pub mod core;
pub mod error;
pub mod pipeline;

// --- Re-exports for the Public API ---

pub use crate::core::cancel::{CancelCause, CancelToken};
pub use crate::core::control::{Halt, HaltKind, ShardHalt};
pub use crate::core::step::{handler_step, step_fn, Step, StepHandler};

pub use crate::pipeline::adapter::{for_each, for_each_fn};
pub use crate::pipeline::definition::Pipeline;
pub use crate::pipeline::execution::execute;
pub use crate::pipeline::parallel::{parallel, ShardPlan};

pub use crate::error::{ConveyorError, ConveyorResult};

/*
    Core Workflow:
    1. Pick the value type `T` and an error type `Err: From<ConveyorError>` (or use `ConveyorError`).
    2. Build a `Pipeline<T, Err>` with `.then("name", |token, value| async move { ... })`.
       Batch pipelines (`Pipeline<Vec<T>, Err>`) can take element-level logic via `for_each`.
    3. Create a `CancelToken` (optionally with a deadline) and keep a clone to cancel from elsewhere.
    4. Call `pipeline.execute(&token, value).await` for one value, or
       `pipeline.parallel(&token, batch, jobs).await` to shard a batch across tasks.
    5. On failure, `Halt::kind` tells cancellation, step errors and panics apart;
       `parallel` returns a `ShardHalt` that also names the failing shard.
*/
