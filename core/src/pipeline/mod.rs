// conveyor/src/pipeline/mod.rs

//! Defines the `Pipeline<T>` struct, its construction, and its sequential and sharded execution.

pub mod adapter;
pub mod definition;
pub mod execution;
mod fault;
pub mod parallel;

// Re-export the main Pipeline struct
pub use definition::Pipeline;
