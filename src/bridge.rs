//! Calling into codec libraries that bail out of a decode non-locally.
//!
//! Some codec libraries report a fatal error by unwinding straight out of the
//! middle of a decode (in Rust: a panic) instead of returning an error value.
//! Other times the library does return an error, but the *real* cause is one
//! of our own errors (say, an `EndOfFile` from the [IoContext](crate::IoContext)
//! the library was reading through) that got flattened into the library's
//! error type on the way out.
//!
//! A [Bridge] handles both. Every call into such a library goes through
//! [Bridge::call]. Our own code that runs underneath the library (the reader
//! adapter, callbacks) holds an [ErrorSink] and [stores](ErrorSink::store) the
//! real error before the library sees a failure. When the call comes back,
//! the stored error is the one the caller gets.
//!
//! Using the same bridge again from inside a bridged call is a bug, and
//! unwinds all the way out rather than being turned into an error.

use core::{
  cell::{Cell, RefCell},
  fmt::Display,
};
use std::{
  any::Any,
  panic::{catch_unwind, panic_any, resume_unwind, AssertUnwindSafe},
  rc::Rc,
};

use crate::{ImagineError, Result};

#[derive(Debug, Default)]
struct BridgeState {
  active: Cell<bool>,
  pending: RefCell<Option<ImagineError>>,
}

/// The panic payload used when a bridge is misused. Never caught.
#[derive(Debug, Clone, Copy)]
pub struct BridgeMisuse(pub &'static str);

/// Payload for [ErrorSink::bail], caught by the enclosing [Bridge::call].
#[derive(Debug, Clone, Copy)]
struct BridgeJump;

/// Owns the in-flight error slot for one decoder's library calls.
#[derive(Debug, Default)]
pub struct Bridge {
  state: Rc<BridgeState>,
}

/// A handle for storing the error that caused a library call to fail.
#[derive(Debug, Clone)]
pub struct ErrorSink {
  state: Rc<BridgeState>,
}

impl Bridge {
  #[inline]
  #[must_use]
  pub fn new() -> Self {
    Self::default()
  }

  #[inline]
  #[must_use]
  pub fn sink(&self) -> ErrorSink {
    ErrorSink { state: Rc::clone(&self.state) }
  }

  /// If a bridged call is in progress right now.
  #[inline]
  #[must_use]
  pub fn is_active(&self) -> bool {
    self.state.active.get()
  }

  /// Runs `f`, turning every way it can fail into an [ImagineError].
  ///
  /// * `Ok(v)` with nothing stored gives `Ok(v)`.
  /// * Anything stored in an [ErrorSink] during the call is returned, even if
  ///   `f` itself claimed success.
  /// * Otherwise an error or panic from `f` becomes `CannotDecodeImage`, with
  ///   `fatal_msg` and the library's own message.
  ///
  /// ## Panics
  /// * If this bridge is already inside a call.
  pub fn call<T, E: Display>(
    &self, fatal_msg: &str, f: impl FnOnce() -> core::result::Result<T, E>,
  ) -> Result<T> {
    if self.state.active.replace(true) {
      panic_any(BridgeMisuse("bridge re-entered while a call is in progress"));
    }
    self.state.pending.borrow_mut().take();
    let outcome = catch_unwind(AssertUnwindSafe(f));
    self.state.active.set(false);
    let pending = self.state.pending.borrow_mut().take();
    match outcome {
      Ok(Ok(v)) => match pending {
        None => Ok(v),
        Some(err) => Err(err),
      },
      Ok(Err(e)) => Err(pending.unwrap_or_else(|| fatal(fatal_msg, &e))),
      Err(payload) => {
        if payload.is::<BridgeMisuse>() {
          resume_unwind(payload);
        }
        Err(pending.unwrap_or_else(|| fatal(fatal_msg, &panic_message(payload.as_ref()))))
      }
    }
  }
}

impl ErrorSink {
  /// Records `err` as the cause of the current call's failure.
  ///
  /// The first stored error wins, later ones are dropped.
  ///
  /// ## Panics
  /// * If no bridged call is in progress.
  pub fn store(&self, err: ImagineError) {
    if !self.state.active.get() {
      panic_any(BridgeMisuse("error stored outside of a bridged call"));
    }
    let mut slot = self.state.pending.borrow_mut();
    if slot.is_none() {
      tracing::trace!(error = %err, "bridge stored error");
      *slot = Some(err);
    }
  }

  /// Stores `err` and unwinds back to the enclosing [Bridge::call].
  ///
  /// For use inside library callbacks that have no way to report failure.
  pub fn bail(&self, err: ImagineError) -> ! {
    self.store(err);
    panic_any(BridgeJump)
  }
}

fn fatal(fatal_msg: &str, e: &dyn Display) -> ImagineError {
  ImagineError::CannotDecodeImage(format!("{fatal_msg}: {e}"))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
  if let Some(s) = payload.downcast_ref::<&'static str>() {
    String::from(*s)
  } else if let Some(s) = payload.downcast_ref::<String>() {
    s.clone()
  } else {
    String::from("unknown failure")
  }
}
