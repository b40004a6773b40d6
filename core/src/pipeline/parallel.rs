// conveyor/src/pipeline/parallel.rs

//! Contains `Pipeline::parallel()`: splits a batch into contiguous shards, runs the
//! sequential executor once per shard on its own tokio task, waits for all of them,
//! and reassembles the output in input order.

use crate::core::cancel::CancelToken;
use crate::core::control::ShardHalt;
use crate::error::ConveyorError;
use crate::pipeline::definition::Pipeline;
use std::ops::Range;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{event, instrument, Level};

/// How a batch of `batch_len` elements is cut into `jobs` contiguous shards.
///
/// Every shard but the last holds `ceil(batch_len / jobs)` elements (or fewer once the
/// batch runs out); the last consumes the remainder. Shards may be empty when `jobs`
/// exceeds what the batch can fill. Concatenated in index order they cover
/// `0..batch_len` exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardPlan {
  batch_len: usize,
  jobs: usize,
  shard_size: usize,
}

impl ShardPlan {
  /// Panics if `jobs` is zero: a zero job count is a misuse of the API, not a runtime condition.
  pub fn new(batch_len: usize, jobs: usize) -> Self {
    assert!(jobs > 0, "conveyor: jobs value must be greater than zero (got {})", jobs);
    Self {
      batch_len,
      jobs,
      shard_size: batch_len.div_ceil(jobs),
    }
  }

  pub fn shard_size(&self) -> usize {
    self.shard_size
  }

  /// Number of shards, always equal to `jobs`.
  pub fn len(&self) -> usize {
    self.jobs
  }

  /// Always `false`: `new` rejects zero jobs. Present for Clippy's `len_without_is_empty`.
  pub fn is_empty(&self) -> bool {
    self.jobs == 0
  }

  pub fn range(&self, shard: usize) -> Range<usize> {
    let start = (shard * self.shard_size).min(self.batch_len);
    let end = if shard + 1 == self.jobs {
      self.batch_len
    } else {
      (start + self.shard_size).min(self.batch_len)
    };
    start..end
  }

  pub fn ranges(&self) -> impl Iterator<Item = Range<usize>> + '_ {
    (0..self.jobs).map(move |shard| self.range(shard))
  }
}

/// Cuts `batch` into owned shards following `plan`, preserving element order.
fn split_batch<T>(batch: Vec<T>, plan: &ShardPlan) -> Vec<Vec<T>> {
  let mut remaining = batch.into_iter();
  plan
    .ranges()
    .map(|range| remaining.by_ref().take(range.len()).collect())
    .collect()
}

impl<T, Err> Pipeline<Vec<T>, Err>
where
  T: Send + 'static,
  Err: std::error::Error + From<ConveyorError> + Send + Sync + 'static,
{
  /// Runs this batch pipeline over `input` split into `jobs` shards, one tokio task per shard.
  ///
  /// Every shard is joined before any result is inspected. Results are then read in
  /// shard order: the halt of the first shard carrying an error (by index, not by
  /// completion time) is returned with its shard index and `HaltKind`, and every other
  /// shard's output is dropped. Otherwise the shard outputs are concatenated in shard order.
  ///
  /// Must be called from within a tokio runtime.
  ///
  /// # Panics
  ///
  /// Panics immediately if `jobs` is zero.
  #[instrument(
        name = "Pipeline::parallel",
        skip_all,
        fields(
            value_type = %std::any::type_name::<T>(),
            num_steps = self.steps.len(),
            batch_len = input.len(),
            jobs = jobs,
        )
    )]
  pub async fn parallel(&self, token: &CancelToken, input: Vec<T>, jobs: usize) -> Result<Vec<T>, ShardHalt<Err>> {
    let plan = ShardPlan::new(input.len(), jobs);
    event!(Level::DEBUG, shard_size = plan.shard_size(), "Dispatching shards.");

    let pipeline = Arc::new(self.clone());
    let mut outputs: Vec<Option<Vec<T>>> = (0..plan.len()).map(|_| None).collect();
    let mut halts: Vec<Option<ShardHalt<Err>>> = (0..plan.len()).map(|_| None).collect();

    // Dropping the set aborts any worker still running, so none outlives this call.
    let mut workers = JoinSet::new();
    for (shard, batch) in split_batch(input, &plan).into_iter().enumerate() {
      let pipeline = Arc::clone(&pipeline);
      let token = token.clone();
      workers.spawn(async move {
        let result = pipeline
          .execute(&token, batch)
          .await
          .map_err(|halt| ShardHalt::from_halt(shard, halt));
        (shard, result)
      });
    }

    // Join barrier: drain every worker before looking at any slot.
    let mut lost: Option<String> = None;
    while let Some(joined) = workers.join_next().await {
      match joined {
        Ok((shard, Ok(output))) => {
          event!(Level::TRACE, shard, output_len = output.len(), "Shard completed.");
          outputs[shard] = Some(output);
        }
        Ok((shard, Err(halt))) => {
          event!(Level::DEBUG, shard, kind = ?halt.kind, error = %halt.error, "Shard failed.");
          halts[shard] = Some(halt);
        }
        Err(join_err) => {
          event!(Level::ERROR, error = %join_err, "Worker task lost.");
          lost.get_or_insert_with(|| join_err.to_string());
        }
      }
    }

    let mut out = Vec::with_capacity(plan.ranges().map(|r| r.len()).sum());
    for shard in 0..plan.len() {
      if let Some(halt) = halts[shard].take() {
        event!(Level::ERROR, shard, kind = ?halt.kind, error = %halt.error, "Parallel execution failed.");
        return Err(halt);
      }
      match outputs[shard].take() {
        Some(output) => out.extend(output),
        None => {
          let message = lost.clone().unwrap_or_else(|| "worker exited without a result".to_string());
          event!(Level::ERROR, shard, "Shard produced no result.");
          return Err(ShardHalt::worker_lost(
            shard,
            Err::from(ConveyorError::WorkerLost { shard, message }),
          ));
        }
      }
    }

    event!(Level::DEBUG, output_len = out.len(), "Parallel execution completed successfully.");
    Ok(out)
  }
}

/// Free-function form of `Pipeline::parallel`.
pub async fn parallel<T, Err>(
  token: &CancelToken,
  pipeline: &Pipeline<Vec<T>, Err>,
  input: Vec<T>,
  jobs: usize,
) -> Result<Vec<T>, ShardHalt<Err>>
where
  T: Send + 'static,
  Err: std::error::Error + From<ConveyorError> + Send + Sync + 'static,
{
  pipeline.parallel(token, input, jobs).await
}

#[cfg(test)]
mod tests {
  use super::*;

  fn collect(plan: &ShardPlan) -> Vec<Range<usize>> {
    plan.ranges().collect()
  }

  #[test]
  fn ten_elements_three_jobs() {
    let plan = ShardPlan::new(10, 3);
    assert_eq!(plan.shard_size(), 4);
    assert_eq!(collect(&plan), vec![0..4, 4..8, 8..10]);
  }

  #[test]
  fn final_shard_is_always_planned() {
    // The last shard must cover the tail, not be dropped.
    let plan = ShardPlan::new(10, 4);
    assert_eq!(collect(&plan), vec![0..3, 3..6, 6..9, 9..10]);
    assert_eq!(plan.len(), 4);
  }

  #[test]
  fn more_jobs_than_elements_yields_empty_tail_shards() {
    let plan = ShardPlan::new(3, 5);
    assert_eq!(plan.shard_size(), 1);
    assert_eq!(collect(&plan), vec![0..1, 1..2, 2..3, 3..3, 3..3]);
  }

  #[test]
  fn uneven_fill_leaves_trailing_empty_shard() {
    let plan = ShardPlan::new(10, 6);
    assert_eq!(collect(&plan), vec![0..2, 2..4, 4..6, 6..8, 8..10, 10..10]);
  }

  #[test]
  fn empty_batch() {
    let plan = ShardPlan::new(0, 3);
    assert_eq!(plan.shard_size(), 0);
    assert_eq!(collect(&plan), vec![0..0, 0..0, 0..0]);
  }

  #[test]
  fn shards_partition_the_batch() {
    for len in 0..40 {
      for jobs in 1..12 {
        let plan = ShardPlan::new(len, jobs);
        let mut next = 0;
        for range in plan.ranges() {
          assert_eq!(range.start, next, "len={} jobs={}", len, jobs);
          assert!(range.len() <= plan.shard_size());
          next = range.end;
        }
        assert_eq!(next, len, "len={} jobs={}", len, jobs);
      }
    }
  }

  #[test]
  fn split_batch_preserves_order() {
    let plan = ShardPlan::new(7, 3);
    let shards = split_batch((1..=7).collect::<Vec<i32>>(), &plan);
    assert_eq!(shards, vec![vec![1, 2, 3], vec![4, 5, 6], vec![7]]);
  }

  #[test]
  fn plan_is_never_empty() {
    assert!(!ShardPlan::new(0, 1).is_empty());
    assert!(!ShardPlan::new(10, 3).is_empty());
  }

  #[test]
  #[should_panic(expected = "jobs value must be greater than zero")]
  fn zero_jobs_panics() {
    let _ = ShardPlan::new(10, 0);
  }
}
