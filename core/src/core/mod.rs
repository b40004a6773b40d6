pub mod cancel;
pub mod control;
pub mod step;

// Re-export key types for easier access from other conveyor modules (and lib.rs)
pub use cancel::{CancelCause, CancelToken};
pub use control::{Halt, HaltKind, ShardHalt};
pub use step::{handler_step, step_fn, Step, StepDef, StepHandler};
