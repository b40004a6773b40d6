// conveyor/src/core/cancel.rs

//! Defines `CancelToken`, the shared cancellation/deadline handle threaded through
//! every step invocation.
//!
//! The engine only ever *observes* a token: it checks `is_cancelled()` at step
//! boundaries and reads `cause()` to build its cancellation error. Creating,
//! canceling and dropping tokens is the caller's business.

use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Why a token reports itself as done.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelCause {
  /// `cancel()` was called on this token or an ancestor.
  Cancelled,
  /// The token's deadline passed.
  DeadlineExceeded,
  /// `cancel_with(reason)` was called on this token or an ancestor.
  Reason(String),
}

impl fmt::Display for CancelCause {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      CancelCause::Cancelled => f.write_str("context canceled"),
      CancelCause::DeadlineExceeded => f.write_str("context deadline exceeded"),
      CancelCause::Reason(reason) => write!(f, "context canceled: {}", reason),
    }
  }
}

struct Shared {
  token: CancellationToken,
  cause: Mutex<Option<CancelCause>>,
  deadline: Option<Instant>,
  parent: Option<CancelToken>,
}

/// A cheap, cloneable cancellation handle. Clones observe the same signal.
#[derive(Clone)]
pub struct CancelToken(Arc<Shared>);

impl CancelToken {
  /// A token that is only done once `cancel()` is called.
  pub fn new() -> Self {
    Self::from_parts(CancellationToken::new(), None, None)
  }

  /// A token that reports `DeadlineExceeded` once `deadline` has passed.
  pub fn with_deadline(deadline: Instant) -> Self {
    Self::from_parts(CancellationToken::new(), Some(deadline), None)
  }

  pub fn with_timeout(timeout: Duration) -> Self {
    Self::with_deadline(Instant::now() + timeout)
  }

  /// A child is canceled whenever this token is, but canceling the child leaves
  /// the parent untouched. The child keeps the parent's deadline.
  pub fn child_token(&self) -> Self {
    Self::from_parts(self.0.token.child_token(), self.0.deadline, Some(self.clone()))
  }

  /// Like `child_token`, with an additional deadline. The earlier deadline applies.
  pub fn child_with_deadline(&self, deadline: Instant) -> Self {
    let effective = match self.0.deadline {
      Some(parent_deadline) if parent_deadline < deadline => parent_deadline,
      _ => deadline,
    };
    Self::from_parts(self.0.token.child_token(), Some(effective), Some(self.clone()))
  }

  fn from_parts(token: CancellationToken, deadline: Option<Instant>, parent: Option<CancelToken>) -> Self {
    CancelToken(Arc::new(Shared {
      token,
      cause: Mutex::new(None),
      deadline,
      parent,
    }))
  }

  pub fn cancel(&self) {
    self.cancel_with_cause(CancelCause::Cancelled);
  }

  pub fn cancel_with(&self, reason: impl Into<String>) {
    self.cancel_with_cause(CancelCause::Reason(reason.into()));
  }

  fn cancel_with_cause(&self, cause: CancelCause) {
    {
      let mut slot = self.0.cause.lock();
      if slot.is_none() {
        *slot = Some(cause);
      }
    }
    self.0.token.cancel();
  }

  /// The "done" query.
  pub fn is_cancelled(&self) -> bool {
    self.0.token.is_cancelled() || self.deadline_passed()
  }

  /// `None` while the token is live.
  pub fn cause(&self) -> Option<CancelCause> {
    if let Some(cause) = self.0.cause.lock().clone() {
      return Some(cause);
    }
    if self.0.token.is_cancelled() {
      // Canceled through an ancestor.
      return Some(
        self
          .0
          .parent
          .as_ref()
          .and_then(CancelToken::cause)
          .unwrap_or(CancelCause::Cancelled),
      );
    }
    if self.deadline_passed() {
      return Some(CancelCause::DeadlineExceeded);
    }
    None
  }

  pub fn deadline(&self) -> Option<Instant> {
    self.0.deadline
  }

  fn deadline_passed(&self) -> bool {
    self.0.deadline.map_or(false, |d| Instant::now() >= d)
  }
}

impl Default for CancelToken {
  fn default() -> Self {
    Self::new()
  }
}

impl fmt::Debug for CancelToken {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("CancelToken")
      .field("cancelled", &self.is_cancelled())
      .field("deadline", &self.0.deadline)
      .field("has_parent", &self.0.parent.is_some())
      .finish()
  }
}
