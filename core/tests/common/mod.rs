// tests/common/mod.rs
#![allow(dead_code)] // Allow unused code in this common test module

use conveyor::{step_fn, CancelToken, ConveyorError, Step};
use std::collections::hash_map::RandomState;
use std::hash::{BuildHasher, Hasher};
use std::sync::{
  atomic::{AtomicUsize, Ordering},
  Arc,
};
use std::time::Duration;
use tracing::Level;

// --- Common Error Type for Tests ---
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)] // Clone, PartialEq, Eq for assertions
pub enum TestError {
  #[error("Conveyor framework error: {0}")]
  Conveyor(String), // Store as String for Eq comparison

  #[error("Canceled: {0}")]
  Cancelled(String),

  #[error("Panicked: {0}")]
  Panicked(String),

  #[error("Test step failed: {0}")]
  Step(String),
}

impl From<ConveyorError> for TestError {
  fn from(ce: ConveyorError) -> Self {
    match ce {
      ConveyorError::Cancelled { cause, .. } => TestError::Cancelled(cause.to_string()),
      ConveyorError::Panicked { message, .. } => TestError::Panicked(message),
      other => TestError::Conveyor(format!("{:?}", other)),
    }
  }
}

// --- Common Step Creators ---
pub fn double() -> Step<i64, TestError> {
  step_fn(|_token: CancelToken, v: i64| async move { Ok::<_, TestError>(v * 2) })
}

pub fn increment_by(n: i64) -> Step<i64, TestError> {
  step_fn(move |_token: CancelToken, v: i64| async move { Ok::<_, TestError>(v + n) })
}

pub fn failing(message: &'static str) -> Step<i64, TestError> {
  step_fn(move |_token: CancelToken, _v: i64| async move { Err::<i64, _>(TestError::Step(message.to_string())) })
}

/// Bumps `counter` each time it runs; otherwise the identity.
pub fn counting(counter: Arc<AtomicUsize>) -> Step<i64, TestError> {
  step_fn(move |_token: CancelToken, v: i64| {
    let counter = Arc::clone(&counter);
    async move {
      counter.fetch_add(1, Ordering::SeqCst);
      Ok::<_, TestError>(v)
    }
  })
}

pub fn batch_identity() -> Step<Vec<i64>, TestError> {
  step_fn(|_token: CancelToken, batch: Vec<i64>| async move { Ok::<_, TestError>(batch) })
}

/// Identity over a batch, after sleeping `delay_for(batch)`.
pub fn delayed_batch_identity(
  delay_for: impl Fn(&[i64]) -> Duration + Send + Sync + 'static,
) -> Step<Vec<i64>, TestError> {
  let delay_for = Arc::new(delay_for);
  step_fn(move |_token: CancelToken, batch: Vec<i64>| {
    let delay = delay_for(batch.as_slice());
    async move {
      tokio::time::sleep(delay).await;
      Ok::<_, TestError>(batch)
    }
  })
}

/// A fresh pseudo-random number in `0..bound`, seeded per call by the std hasher.
pub fn jitter(bound: u64) -> u64 {
  let mut hasher = RandomState::new().build_hasher();
  hasher.write_u64(bound);
  hasher.finish() % bound.max(1)
}

// --- Helper for Tracing Setup (call once per test run if needed) ---
use once_cell::sync::Lazy;
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer() // Important for tests to capture output
    .try_init()
    .ok(); // Allow multiple initializations in tests (ok if fails)
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

// --- Atomic counters for checking execution counts ---
pub static STEP_EXEC_COUNTER: Lazy<Arc<AtomicUsize>> = Lazy::new(|| Arc::new(AtomicUsize::new(0)));
pub static ELEMENT_EXEC_COUNTER: Lazy<Arc<AtomicUsize>> = Lazy::new(|| Arc::new(AtomicUsize::new(0)));

pub fn reset_counters() {
  STEP_EXEC_COUNTER.store(0, Ordering::SeqCst);
  ELEMENT_EXEC_COUNTER.store(0, Ordering::SeqCst);
}
