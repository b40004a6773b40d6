// conveyor/src/pipeline/fault.rs

//! Records where a step panicked.
//!
//! `catch_unwind` only hands back the payload, after the stack is gone. A panic hook
//! runs before unwinding, so the location and backtrace are taken there and parked in
//! a thread-local. Only panics raised while a guarded step is being polled on the
//! current thread are recorded; every panic is still passed on to the previous hook.

use once_cell::sync::Lazy;
use std::any::Any;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::cell::{Cell, RefCell};

/// Where a step panicked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PanicSite {
  /// `file:line:column` of the panic.
  pub location: String,
  /// `None` unless backtraces are enabled (`RUST_BACKTRACE` / `RUST_LIB_BACKTRACE`).
  pub trace: Option<String>,
}

thread_local! {
  static GUARD_DEPTH: Cell<usize> = const { Cell::new(0) };
  static LAST_SITE: RefCell<Option<PanicSite>> = const { RefCell::new(None) };
}

static HOOK_INSTALLED: Lazy<()> = Lazy::new(|| {
  let previous = std::panic::take_hook();
  std::panic::set_hook(Box::new(move |info| {
    if GUARD_DEPTH.with(Cell::get) > 0 {
      let location = info
        .location()
        .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
        .unwrap_or_else(|| "<unknown>".to_string());
      let backtrace = Backtrace::capture();
      let trace = (backtrace.status() == BacktraceStatus::Captured).then(|| backtrace.to_string());
      LAST_SITE.with(|slot| *slot.borrow_mut() = Some(PanicSite { location, trace }));
    }
    previous(info);
  }));
});

/// Marks the current thread as polling a guarded step until dropped.
///
/// Must not be held across an `.await`: create it inside a single `poll`.
pub(crate) struct GuardScope(());

impl GuardScope {
  pub(crate) fn enter() -> Self {
    Lazy::force(&HOOK_INSTALLED);
    GUARD_DEPTH.with(|d| d.set(d.get() + 1));
    GuardScope(())
  }
}

impl Drop for GuardScope {
  fn drop(&mut self) {
    GUARD_DEPTH.with(|d| d.set(d.get().saturating_sub(1)));
  }
}

/// Takes the site recorded for the last guarded panic on this thread.
///
/// `None` if another hook replaced ours after it was installed.
pub(crate) fn take_site() -> Option<PanicSite> {
  LAST_SITE.with(|slot| slot.borrow_mut().take())
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
  if let Some(s) = payload.downcast_ref::<&'static str>() {
    (*s).to_string()
  } else if let Some(s) = payload.downcast_ref::<String>() {
    s.clone()
  } else {
    "non-string panic payload".to_string()
  }
}
