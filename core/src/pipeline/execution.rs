// conveyor/src/pipeline/execution.rs

//! Contains `Pipeline::execute()`, the sequential executor: it threads one value
//! through every step in order, stopping at the first error, cancellation or panic.

use crate::core::cancel::{CancelCause, CancelToken};
use crate::core::control::{Halt, HaltKind};
use crate::error::ConveyorError;
use crate::pipeline::definition::Pipeline;
use crate::pipeline::fault::{self, GuardScope};
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::pin;
use tracing::{event, instrument, span, Instrument, Level};

impl<T, Err> Pipeline<T, Err>
where
  T: Send + 'static,
  Err: std::error::Error + From<ConveyorError> + Send + Sync + 'static,
{
  /// Runs the pipeline against `input`.
  ///
  /// The token is checked before every step, never during one. A panic inside a step
  /// is caught here and returned as `ConveyorError::Panicked` (converted into `Err`),
  /// so it never reaches the caller as an unwind.
  #[instrument(
        name = "Pipeline::execute",
        skip_all,
        fields(
            value_type = %std::any::type_name::<T>(),
            num_steps = self.steps.len(),
        )
    )]
  pub async fn execute(&self, token: &CancelToken, input: T) -> Result<T, Halt<T, Err>> {
    event!(Level::DEBUG, "Pipeline execution starting.");
    let mut value = input;

    for (step_index, step_def) in self.steps.iter().enumerate() {
      let step_name = step_def.name.as_str();

      if token.is_cancelled() {
        let cause = token.cause().unwrap_or(CancelCause::Cancelled);
        event!(Level::INFO, step_name, step_index, %cause, "Pipeline canceled at step boundary.");
        return Err(Halt {
          error: Err::from(ConveyorError::Cancelled {
            step_name: step_name.to_string(),
            step_index,
            cause,
          }),
          kind: HaltKind::Cancelled,
          partial: Some(value),
          step_index,
          step_name: step_name.to_string(),
        });
      }

      let step_span = span!(Level::DEBUG, "pipeline_step", step_name, step_index);
      let step = &step_def.step;
      let step_token = token.clone();
      // The closure call sits inside the async block so a panic while building the
      // future is caught along with one raised while polling it.
      let guarded = AssertUnwindSafe(async move { step(step_token, value).await }).catch_unwind();
      let mut guarded = pin!(guarded.instrument(step_span));
      // Each poll runs under a GuardScope so the panic hook records the site.
      let outcome = futures::future::poll_fn(|cx| {
        let _scope = GuardScope::enter();
        guarded.as_mut().poll(cx)
      })
      .await;

      match outcome {
        Ok(Ok(output)) => {
          event!(Level::TRACE, step_name, step_index, "Step finished.");
          value = output;
        }
        Ok(Err(e)) => {
          event!(Level::ERROR, step_name, step_index, error = %e, "Step failed.");
          return Err(Halt {
            error: e,
            kind: HaltKind::StepFailed,
            partial: None,
            step_index,
            step_name: step_name.to_string(),
          });
        }
        Err(payload) => {
          let message = fault::panic_message(payload.as_ref());
          let (location, trace) = match fault::take_site() {
            Some(site) => (site.location, site.trace),
            None => ("<unknown>".to_string(), None),
          };
          event!(Level::ERROR, step_name, step_index, %location, panic = %message, "Step panicked; converted to error.");
          return Err(Halt {
            error: Err::from(ConveyorError::Panicked {
              step_name: step_name.to_string(),
              step_index,
              message,
              location,
              trace,
            }),
            kind: HaltKind::Panicked,
            partial: None,
            step_index,
            step_name: step_name.to_string(),
          });
        }
      }
    }

    event!(Level::DEBUG, "Pipeline execution completed successfully.");
    Ok(value)
  }
}

/// Free-function form of `Pipeline::execute`.
pub async fn execute<T, Err>(token: &CancelToken, pipeline: &Pipeline<T, Err>, input: T) -> Result<T, Halt<T, Err>>
where
  T: Send + 'static,
  Err: std::error::Error + From<ConveyorError> + Send + Sync + 'static,
{
  pipeline.execute(token, input).await
}
