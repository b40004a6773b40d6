// conveyor/src/core/step.rs

//! Defines the step contract: the shape of a single transformation unit, and the
//! named wrapper a `Pipeline` stores it in.

use crate::core::cancel::CancelToken;
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;

/// Type alias for a pipeline step.
///
/// A step takes the shared `CancelToken` and ownership of the current value, and
/// returns a `Future` resolving to the transformed value or an error.
///
/// Steps are held behind an `Arc` so a pipeline can be shared with worker tasks
/// without copying the step's identity.
pub type Step<T, Err> = Arc<dyn Fn(CancelToken, T) -> BoxFuture<'static, Result<T, Err>> + Send + Sync>;

/// Object-style steps, for callers whose transformation carries its own state
/// (clients, lookup tables, counters).
#[async_trait]
pub trait StepHandler<T, Err>: Send + Sync
where
  T: Send + 'static,
{
  async fn handle(&self, token: CancelToken, input: T) -> Result<T, Err>;
}

/// Wraps an async closure as a `Step`.
///
/// `UserProvidedErr` only has to convert into the pipeline's `Err`.
pub fn step_fn<T, Err, F, Fut, UserProvidedErr>(f: F) -> Step<T, Err>
where
  T: Send + 'static,
  Err: Send + 'static,
  F: Fn(CancelToken, T) -> Fut + Send + Sync + 'static,
  Fut: Future<Output = Result<T, UserProvidedErr>> + Send + 'static,
  UserProvidedErr: Into<Err> + Send + 'static,
{
  Arc::new(move |token, input| {
    let user_fut = f(token, input);
    Box::pin(async move { user_fut.await.map_err(Into::into) })
  })
}

/// Wraps a `StepHandler` as a `Step`.
pub fn handler_step<T, Err, H>(handler: H) -> Step<T, Err>
where
  T: Send + 'static,
  Err: Send + 'static,
  H: StepHandler<T, Err> + 'static,
{
  let handler = Arc::new(handler);
  Arc::new(move |token, input| {
    let handler = Arc::clone(&handler);
    Box::pin(async move { handler.handle(token, input).await })
  })
}

/// A step plus the name it is reported under in spans and errors.
pub struct StepDef<T, Err> {
  pub name: String,
  pub(crate) step: Step<T, Err>,
}

impl<T, Err> Clone for StepDef<T, Err> {
  fn clone(&self) -> Self {
    StepDef {
      name: self.name.clone(),
      step: Arc::clone(&self.step),
    }
  }
}

// Step (Arc<dyn Fn...>) doesn't implement Debug.
impl<T, Err> std::fmt::Debug for StepDef<T, Err> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("StepDef").field("name", &self.name).finish()
  }
}
