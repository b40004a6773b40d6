// conveyor/src/pipeline/definition.rs

//! Contains the `Pipeline<T, Err>` struct definition and methods for its construction.

use crate::core::cancel::CancelToken;
use crate::core::step::{handler_step, step_fn, Step, StepDef, StepHandler};
use crate::error::ConveyorError;
use std::future::Future;

/// An ordered sequence of steps over one value type `T`.
///
/// `Err` is the error type its steps return. It must be `From<ConveyorError>` so the
/// engine can inject cancellation and panic errors into it.
///
/// Application order equals insertion order. An empty pipeline is the identity.
/// Cloning a pipeline shares its steps; it does not copy them.
pub struct Pipeline<T, Err = ConveyorError>
where
  T: Send + 'static,
  Err: std::error::Error + From<ConveyorError> + Send + Sync + 'static,
{
  pub(crate) steps: Vec<StepDef<T, Err>>,
}

impl<T, Err> Pipeline<T, Err>
where
  T: Send + 'static,
  Err: std::error::Error + From<ConveyorError> + Send + Sync + 'static,
{
  pub fn new() -> Self {
    Self { steps: Vec::new() }
  }

  /// Builds a pipeline from already-wrapped steps. They are named `step-{index}`.
  pub fn from_steps(steps: impl IntoIterator<Item = Step<T, Err>>) -> Self {
    let mut pipeline = Self::new();
    for step in steps {
      pipeline.push_step(None, step);
    }
    pipeline
  }

  /// Appends an async closure as the next step.
  pub fn then<F, Fut, UserProvidedErr>(mut self, name: &str, handler_fn: F) -> Self
  where
    F: Fn(CancelToken, T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, UserProvidedErr>> + Send + 'static,
    UserProvidedErr: Into<Err> + Send + 'static,
  {
    self.push_step(Some(name), step_fn(handler_fn));
    self
  }

  /// Appends an already-wrapped step, such as one built by `for_each`.
  pub fn then_step(mut self, name: &str, step: Step<T, Err>) -> Self {
    self.push_step(Some(name), step);
    self
  }

  pub fn then_handler<H>(mut self, name: &str, handler: H) -> Self
  where
    H: StepHandler<T, Err> + 'static,
  {
    self.push_step(Some(name), handler_step(handler));
    self
  }

  /// In-place variant of `then_step`, for pipelines assembled in loops.
  pub fn push_step(&mut self, name: Option<&str>, step: Step<T, Err>) {
    let name = match name {
      Some(name) => name.to_string(),
      None => format!("step-{}", self.steps.len()),
    };
    self.steps.push(StepDef { name, step });
  }

  pub fn len(&self) -> usize {
    self.steps.len()
  }

  pub fn is_empty(&self) -> bool {
    self.steps.is_empty()
  }

  pub fn step_names(&self) -> Vec<&str> {
    self.steps.iter().map(|s| s.name.as_str()).collect()
  }
}

impl<T, Err> Clone for Pipeline<T, Err>
where
  T: Send + 'static,
  Err: std::error::Error + From<ConveyorError> + Send + Sync + 'static,
{
  fn clone(&self) -> Self {
    Self {
      steps: self.steps.clone(),
    }
  }
}

impl<T, Err> Default for Pipeline<T, Err>
where
  T: Send + 'static,
  Err: std::error::Error + From<ConveyorError> + Send + Sync + 'static,
{
  fn default() -> Self {
    Self::new()
  }
}

impl<T, Err> std::fmt::Debug for Pipeline<T, Err>
where
  T: Send + 'static,
  Err: std::error::Error + From<ConveyorError> + Send + Sync + 'static,
{
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Pipeline").field("steps", &self.step_names()).finish()
  }
}
