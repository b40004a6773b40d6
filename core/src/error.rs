// conveyor/src/error.rs
use anyhow::Error as AnyhowError;
use thiserror::Error;

use crate::core::cancel::CancelCause;

#[derive(Debug, Error)]
pub enum ConveyorError {
  #[error("Pipeline canceled before step '{step_name}' (index {step_index}): {cause}")]
  Cancelled {
    step_name: String,
    step_index: usize,
    cause: CancelCause,
  },

  #[error("Step '{step_name}' (index {step_index}) panicked at {location}: {message}{}", render_trace(.trace))]
  Panicked {
    step_name: String,
    step_index: usize,
    message: String,
    /// `file:line:column` where the step panicked.
    location: String,
    /// Backtrace from the panic site; `None` unless backtraces are enabled.
    trace: Option<String>,
  },

  #[error("Error in user-provided step. Source: {source}")]
  Step {
    #[source]
    source: AnyhowError,
  },

  #[error("Worker for shard {shard} did not report a result: {message}")]
  WorkerLost { shard: usize, message: String },

  #[error("Internal conveyor error: {0}")]
  Internal(String),
}

impl ConveyorError {
  /// True for errors produced by observing a canceled token.
  pub fn is_cancelled(&self) -> bool {
    matches!(self, ConveyorError::Cancelled { .. })
  }

  /// True for errors synthesized from a panic inside a step.
  pub fn is_panic(&self) -> bool {
    matches!(self, ConveyorError::Panicked { .. })
  }
}

// Steps written against anyhow can use `?` and still land in a Pipeline<_, ConveyorError>.
impl From<AnyhowError> for ConveyorError {
  fn from(err: AnyhowError) -> Self {
    match err.downcast::<ConveyorError>() {
      Ok(conveyor_err) => conveyor_err,
      Err(err) => ConveyorError::Step { source: err },
    }
  }
}

pub type ConveyorResult<T, E = ConveyorError> = std::result::Result<T, E>;

fn render_trace(trace: &Option<String>) -> String {
  match trace {
    Some(trace) => format!("\n{}", trace),
    None => String::new(),
  }
}
