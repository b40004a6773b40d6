// conveyor/src/pipeline/adapter.rs

//! Lifts single-element steps into batch steps.

use crate::core::cancel::CancelToken;
use crate::core::step::{step_fn, Step};
use std::future::Future;
use std::sync::Arc;
use tracing::{event, Level};

/// Builds a `Vec<T>` step that applies `element_step` to each element in index order.
///
/// The batch step returns a freshly built vector; the input vector is consumed, never
/// aliased. On the first element error the whole batch step fails with that error:
/// elements after the failing index are never passed to `element_step` and are dropped
/// along with the partially built output.
///
/// Elements are processed one after another. For parallelism, put the resulting step
/// in a pipeline and run it with `Pipeline::parallel`.
pub fn for_each<T, Err>(element_step: Step<T, Err>) -> Step<Vec<T>, Err>
where
  T: Send + 'static,
  Err: Send + 'static,
{
  Arc::new(move |token: CancelToken, batch: Vec<T>| {
    let element_step = Arc::clone(&element_step);
    Box::pin(async move {
      let mut out = Vec::with_capacity(batch.len());
      for (index, element) in batch.into_iter().enumerate() {
        match element_step(token.clone(), element).await {
          Ok(transformed) => out.push(transformed),
          Err(e) => {
            event!(Level::DEBUG, element_index = index, "Element step failed; abandoning batch.");
            return Err(e);
          }
        }
      }
      Ok(out)
    })
  })
}

/// `for_each` over an async closure.
pub fn for_each_fn<T, Err, F, Fut, UserProvidedErr>(f: F) -> Step<Vec<T>, Err>
where
  T: Send + 'static,
  Err: Send + 'static,
  F: Fn(CancelToken, T) -> Fut + Send + Sync + 'static,
  Fut: Future<Output = Result<T, UserProvidedErr>> + Send + 'static,
  UserProvidedErr: Into<Err> + Send + 'static,
{
  for_each(step_fn(f))
}
