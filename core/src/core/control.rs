// conveyor/src/core/control.rs

//! Defines why a run stopped early and what it hands back when it does.

use std::fmt;

/// Classification of an early stop, independent of the pipeline's error type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaltKind {
  /// The token was observed canceled at a step boundary.
  Cancelled,
  /// A step returned an error.
  StepFailed,
  /// A step panicked; the panic was converted into an error.
  Panicked,
  /// A shard's worker task ended without reporting a result. Only `parallel` produces this.
  WorkerLost,
}

/// Failure outcome of `Pipeline::execute`.
///
/// `partial` is the last value the run still owned when it stopped:
/// - `Cancelled`: the output of the last completed step (or the input, if no step ran).
/// - `StepFailed`: `None`; the value moved into the failing step, which returned only its error.
/// - `Panicked`: `None`; in-flight state is discarded.
pub struct Halt<T, Err> {
  pub error: Err,
  pub kind: HaltKind,
  pub partial: Option<T>,
  pub step_index: usize,
  pub step_name: String,
}

impl<T, Err> Halt<T, Err> {
  pub fn is_cancelled(&self) -> bool {
    self.kind == HaltKind::Cancelled
  }

  pub fn is_panic(&self) -> bool {
    self.kind == HaltKind::Panicked
  }

  /// Drops the partial value and keeps the error.
  pub fn into_error(self) -> Err {
    self.error
  }

  pub fn into_parts(self) -> (Err, Option<T>) {
    (self.error, self.partial)
  }
}

impl<T, Err: fmt::Debug> fmt::Debug for Halt<T, Err> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Halt")
      .field("error", &self.error)
      .field("kind", &self.kind)
      .field("partial_present", &self.partial.is_some())
      .field("step_index", &self.step_index)
      .field("step_name", &self.step_name)
      .finish()
  }
}

impl<T, Err: fmt::Display> fmt::Display for Halt<T, Err> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    fmt::Display::fmt(&self.error, f)
  }
}

impl<T, Err> std::error::Error for Halt<T, Err>
where
  Err: std::error::Error + 'static,
{
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    Some(&self.error)
  }
}

/// Failure outcome of `Pipeline::parallel`: the halt of the lowest-indexed failing shard.
///
/// The shard's partial value is not kept; partial output of one shard is not meaningful
/// for the whole batch. `step_index` and `step_name` are `None` only for `WorkerLost`.
pub struct ShardHalt<Err> {
  pub shard: usize,
  pub error: Err,
  pub kind: HaltKind,
  pub step_index: Option<usize>,
  pub step_name: Option<String>,
}

impl<Err> ShardHalt<Err> {
  pub(crate) fn from_halt<T>(shard: usize, halt: Halt<T, Err>) -> Self {
    ShardHalt {
      shard,
      error: halt.error,
      kind: halt.kind,
      step_index: Some(halt.step_index),
      step_name: Some(halt.step_name),
    }
  }

  pub(crate) fn worker_lost(shard: usize, error: Err) -> Self {
    ShardHalt {
      shard,
      error,
      kind: HaltKind::WorkerLost,
      step_index: None,
      step_name: None,
    }
  }

  pub fn is_cancelled(&self) -> bool {
    self.kind == HaltKind::Cancelled
  }

  pub fn is_panic(&self) -> bool {
    self.kind == HaltKind::Panicked
  }

  pub fn into_error(self) -> Err {
    self.error
  }
}

impl<Err: fmt::Debug> fmt::Debug for ShardHalt<Err> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ShardHalt")
      .field("shard", &self.shard)
      .field("error", &self.error)
      .field("kind", &self.kind)
      .field("step_index", &self.step_index)
      .field("step_name", &self.step_name)
      .finish()
  }
}

impl<Err: fmt::Display> fmt::Display for ShardHalt<Err> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "shard {}: {}", self.shard, self.error)
  }
}

impl<Err> std::error::Error for ShardHalt<Err>
where
  Err: std::error::Error + 'static,
{
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    Some(&self.error)
  }
}
