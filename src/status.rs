//! Status codes, and the per-thread "last error" slot.
//!
//! Inside the crate errors travel as [ImagineError] values. At the boundary
//! functions in [api](crate::api) they get flattened into a [StatusCode], and
//! the message (plus the IO details, for IO errors) is parked in a per-thread
//! [ErrorSlot] until the next boundary call on that thread replaces or clears
//! it. Separate threads never see each other's errors.

use core::cell::RefCell;

use crate::{ImagineError, IoErrorDetails};

/// An integer status code.
///
/// Codes are grouped into categories by their high bits, see
/// [category](StatusCode::category). Branch on the category for recovery, and
/// on the specific code only for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum StatusCode {
  Unknown = -1,
  #[default]
  Success = 0,

  OutOfMemory = 1,

  Logic = 1 << 10,

  IllegalArgument = 2 << 10,

  UnsupportedOperation = 3 << 10,
  TooManyImagePlanes = (3 << 10) + 1,

  Codec = 4 << 10,
  CannotCreateCodec = (4 << 10) + 1,
  CannotDecodeImage = (4 << 10) + 2,

  Io = 5 << 10,
  CannotOpenFile = (5 << 10) + 1,
  EndOfFile = (5 << 10) + 2,
  ReadFailed = (5 << 10) + 3,
  WriteFailed = (5 << 10) + 4,
  SeekFailed = (5 << 10) + 5,
}

impl StatusCode {
  /// The bits of a code that select its category.
  pub const CATEGORY_MASK: i32 = 0x7C00;

  #[inline]
  #[must_use]
  pub const fn code(self) -> i32 {
    self as i32
  }

  #[must_use]
  pub const fn from_code(code: i32) -> Option<Self> {
    Some(match code {
      -1 => Self::Unknown,
      0 => Self::Success,
      1 => Self::OutOfMemory,
      0x400 => Self::Logic,
      0x800 => Self::IllegalArgument,
      0xC00 => Self::UnsupportedOperation,
      0xC01 => Self::TooManyImagePlanes,
      0x1000 => Self::Codec,
      0x1001 => Self::CannotCreateCodec,
      0x1002 => Self::CannotDecodeImage,
      0x1400 => Self::Io,
      0x1401 => Self::CannotOpenFile,
      0x1402 => Self::EndOfFile,
      0x1403 => Self::ReadFailed,
      0x1404 => Self::WriteFailed,
      0x1405 => Self::SeekFailed,
      _ => return None,
    })
  }

  /// The coarse category of this code.
  ///
  /// * Negative codes are their own category.
  /// * Otherwise the code is masked by [CATEGORY_MASK](Self::CATEGORY_MASK).
  ///   `Success` and `OutOfMemory` both sit below the mask, and they stay as
  ///   themselves.
  #[must_use]
  pub const fn category(self) -> Self {
    let code = self.code();
    if code < 0 {
      return self;
    }
    let masked = code & Self::CATEGORY_MASK;
    if masked == 0 {
      return self;
    }
    match Self::from_code(masked) {
      Some(c) => c,
      None => Self::Unknown,
    }
  }

  #[inline]
  #[must_use]
  pub const fn is_success(self) -> bool {
    matches!(self, Self::Success)
  }
}

/// The details of the most recent error on some thread.
///
/// There's one of these per thread backing the boundary functions (see
/// [with_thread_slot]), but it's a normal value type so that it can also be
/// used and tested on its own.
#[derive(Debug, Clone, Default)]
pub struct ErrorSlot {
  code: StatusCode,
  message: String,
  io: Option<IoErrorDetails>,
}

impl ErrorSlot {
  #[inline]
  #[must_use]
  pub const fn new() -> Self {
    Self { code: StatusCode::Success, message: String::new(), io: None }
  }

  /// Stores an error, returning its status code.
  ///
  /// If memory for the message can't be obtained the message is left empty,
  /// the code is still stored.
  pub fn record(&mut self, err: &ImagineError) -> StatusCode {
    let code = err.status_code();
    self.code = code;
    store_string_lossy(&mut self.message, err.message());
    self.io = if code.category() == StatusCode::Io {
      err.io_details().map(|d| {
        let mut path = String::new();
        let path = d.path.as_deref().map(|p| {
          store_string_lossy(&mut path, p);
          path
        });
        IoErrorDetails { path, ..*d }
      })
    } else {
      None
    };
    code
  }

  /// Stores a code and message that didn't come from an [ImagineError].
  pub fn record_code(&mut self, code: StatusCode, message: &str) -> StatusCode {
    self.code = code;
    store_string_lossy(&mut self.message, message);
    self.io = None;
    code
  }

  #[inline]
  #[must_use]
  pub fn status(&self) -> StatusCode {
    self.code
  }

  #[inline]
  #[must_use]
  pub fn message(&self) -> &str {
    &self.message
  }

  /// Copies as much of the message as fits into `buf`, followed by a 0 byte.
  ///
  /// The copy is cut to leave room for the terminator. An empty `buf` gets
  /// nothing. Returns the stored status code either way.
  pub fn copy_message(&self, buf: &mut [u8]) -> StatusCode {
    if let Some(room) = buf.len().checked_sub(1) {
      let bytes = self.message.as_bytes();
      let n = bytes.len().min(room);
      buf[..n].copy_from_slice(&bytes[..n]);
      buf[n] = 0;
    }
    self.code
  }

  /// The IO details of the stored error, only if its category is IO.
  #[inline]
  #[must_use]
  pub fn io_error_details(&self) -> Option<&IoErrorDetails> {
    if self.code.category() == StatusCode::Io {
      self.io.as_ref()
    } else {
      None
    }
  }

  #[inline]
  pub fn clear(&mut self) {
    self.code = StatusCode::Success;
    self.message.clear();
    self.io = None;
  }
}

fn store_string_lossy(dest: &mut String, src: &str) {
  dest.clear();
  if dest.try_reserve(src.len()).is_ok() {
    dest.push_str(src);
  }
}

thread_local! {
  static LAST_ERROR: RefCell<ErrorSlot> = const { RefCell::new(ErrorSlot::new()) };
}

/// Runs `op` with this thread's error slot.
#[inline]
pub fn with_thread_slot<T>(op: impl FnOnce(&mut ErrorSlot) -> T) -> T {
  LAST_ERROR.with(|slot| op(&mut slot.borrow_mut()))
}

/// Records `err` as this thread's last error.
#[inline]
pub fn record_last_error(err: &ImagineError) -> StatusCode {
  with_thread_slot(|slot| slot.record(err))
}

/// This thread's last status and message.
#[inline]
#[must_use]
pub fn last_error() -> (StatusCode, String) {
  with_thread_slot(|slot| (slot.status(), String::from(slot.message())))
}

/// Bounded copy of this thread's last message, see [ErrorSlot::copy_message].
#[inline]
pub fn copy_last_error(buf: &mut [u8]) -> StatusCode {
  with_thread_slot(|slot| slot.copy_message(buf))
}

/// This thread's last IO error details, if the last error was an IO error.
#[inline]
#[must_use]
pub fn io_error_details() -> Option<IoErrorDetails> {
  with_thread_slot(|slot| slot.io_error_details().cloned())
}

#[inline]
pub fn clear_last_error() {
  with_thread_slot(ErrorSlot::clear)
}
