// conveyor/examples/batch_pipeline.rs

use conveyor::{for_each_fn, CancelToken, ConveyorError, Pipeline, ShardHalt};
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone)]
struct Reading {
  sensor: u32,
  celsius: f64,
}

#[tokio::main]
async fn main() -> Result<(), ConveyorError> {
  // Initialize tracing (optional, for demonstration)
  tracing_subscriber::fmt()
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .init();

  info!("--- Batch Pipeline Example ---");

  // 1. A scalar pipeline: one value in, one value out.
  let scalar = Pipeline::<i64>::new()
    .then("double", |_token, v: i64| async move { Ok::<_, ConveyorError>(v * 2) })
    .then("increment", |_token, v: i64| async move { Ok::<_, ConveyorError>(v + 1) });

  let token = CancelToken::new();
  let seven = scalar.execute(&token, 3).await.map_err(|halt| halt.into_error())?;
  info!("double then increment of 3 = {}", seven);

  // 2. A batch pipeline built from element-level logic.
  let batch_pipeline = Pipeline::<Vec<Reading>>::new()
    .then_step(
      "validate",
      for_each_fn(|_token, r: Reading| async move {
        if r.celsius < -273.15 {
          return Err(anyhow::anyhow!("sensor {} below absolute zero", r.sensor));
        }
        Ok(r)
      }),
    )
    .then_step(
      "to_fahrenheit",
      for_each_fn(|_token, mut r: Reading| async move {
        r.celsius = r.celsius * 9.0 / 5.0 + 32.0;
        Ok::<_, ConveyorError>(r)
      }),
    );

  let readings: Vec<Reading> = (0..12).map(|i| Reading { sensor: i, celsius: i as f64 * 2.5 }).collect();

  // 3. Shard the batch over four tasks, bounded by a deadline.
  let deadline = CancelToken::with_timeout(Duration::from_secs(5));
  let converted = batch_pipeline
    .parallel(&deadline, readings, 4)
    .await
    .map_err(ShardHalt::into_error)?;
  for r in &converted {
    info!("sensor {:>2}: {:.1} F", r.sensor, r.celsius);
  }

  // 4. A bad reading fails the whole batch with the first failing shard's error.
  let mut bad = converted.clone();
  bad[7].celsius = -500.0;
  match batch_pipeline.parallel(&deadline, bad, 4).await {
    Ok(_) => info!("unexpected success"),
    Err(halt) => info!("batch rejected by shard {} ({:?}): {}", halt.shard, halt.kind, halt.error),
  }

  Ok(())
}
