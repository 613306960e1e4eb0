use core::num::TryFromIntError;
use std::collections::TryReserveError;

use crate::status::StatusCode;

/// Where an IO error happened.
///
/// `offset` is the stream position the failed transfer started at (plus
/// whatever part of it did succeed), and `count` is how many bytes were still
/// outstanding. `errno` is the platform error code, or 0 when the failure
/// didn't come from the OS (eg: running off the end of a memory buffer).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IoErrorDetails {
  pub path: Option<String>,
  pub offset: i64,
  pub count: u64,
  pub errno: i32,
}
impl IoErrorDetails {
  #[inline]
  #[must_use]
  pub fn new(path: Option<&str>, offset: i64, count: u64) -> Self {
    Self { path: path.map(String::from), offset, count, errno: 0 }
  }

  #[inline]
  #[must_use]
  pub fn with_os_error(mut self, err: &std::io::Error) -> Self {
    self.errno = err.raw_os_error().unwrap_or(0);
    self
  }
}

/// An error from the `imagine` crate.
///
/// The variants form a closed taxonomy: every variant belongs to exactly one
/// category of [StatusCode], and the IO flavored variants carry
/// [IoErrorDetails] along with their message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum ImagineError {
  #[error("{0}")]
  OutOfMemory(String),

  #[error("{0}")]
  LogicError(String),

  /// A caller supplied value was out of range or inconsistent.
  #[error("{0}")]
  IllegalArgument(String),

  #[error("{0}")]
  UnsupportedOperation(String),

  /// The image needs more planes than a [FrameFormat](crate::FrameFormat) can
  /// hold.
  #[error("{0}")]
  TooManyImagePlanes(String),

  #[error("{0}")]
  CodecError(String),

  #[error("{0}")]
  CannotCreateCodec(String),

  /// The data was recognized, but it's malformed or uses a feature that the
  /// decoder can't handle.
  #[error("{0}")]
  CannotDecodeImage(String),

  #[error("{msg}")]
  IoError { msg: String, details: IoErrorDetails },

  #[error("{msg}")]
  CannotOpenFile { msg: String, details: IoErrorDetails },

  /// The stream ran out before a `read_all` or `write_all` finished.
  #[error("{msg}")]
  EndOfFile { msg: String, details: IoErrorDetails },

  #[error("{msg}")]
  ReadFailed { msg: String, details: IoErrorDetails },

  #[error("{msg}")]
  WriteFailed { msg: String, details: IoErrorDetails },

  #[error("{msg}")]
  SeekFailed { msg: String, details: IoErrorDetails },

  /// A defect within the crate. Never expected in correct operation.
  #[error("{0}")]
  InternalError(String),

  /// An error that didn't come from within the crate at all.
  #[error("{0}")]
  UnknownError(String),
}

impl ImagineError {
  #[inline]
  pub(crate) fn cannot_decode(msg: impl Into<String>) -> Self {
    Self::CannotDecodeImage(msg.into())
  }

  #[inline]
  pub(crate) fn unsupported(msg: impl Into<String>) -> Self {
    Self::UnsupportedOperation(msg.into())
  }

  #[inline]
  pub(crate) fn illegal_argument(msg: impl Into<String>) -> Self {
    Self::IllegalArgument(msg.into())
  }

  #[inline]
  pub(crate) fn end_of_file(msg: impl Into<String>, details: IoErrorDetails) -> Self {
    Self::EndOfFile { msg: msg.into(), details }
  }

  #[inline]
  pub(crate) fn read_failed(msg: impl Into<String>, details: IoErrorDetails) -> Self {
    Self::ReadFailed { msg: msg.into(), details }
  }

  #[inline]
  pub(crate) fn write_failed(msg: impl Into<String>, details: IoErrorDetails) -> Self {
    Self::WriteFailed { msg: msg.into(), details }
  }

  #[inline]
  pub(crate) fn seek_failed(msg: impl Into<String>, details: IoErrorDetails) -> Self {
    Self::SeekFailed { msg: msg.into(), details }
  }

  /// The human readable message, without any IO details.
  #[must_use]
  pub fn message(&self) -> &str {
    use ImagineError::*;
    match self {
      OutOfMemory(m) | LogicError(m) | IllegalArgument(m) | UnsupportedOperation(m)
      | TooManyImagePlanes(m) | CodecError(m) | CannotCreateCodec(m)
      | CannotDecodeImage(m) | InternalError(m) | UnknownError(m) => m,
      IoError { msg, .. }
      | CannotOpenFile { msg, .. }
      | EndOfFile { msg, .. }
      | ReadFailed { msg, .. }
      | WriteFailed { msg, .. }
      | SeekFailed { msg, .. } => msg,
    }
  }

  /// The IO details, if this is an IO category error.
  #[must_use]
  pub fn io_details(&self) -> Option<&IoErrorDetails> {
    use ImagineError::*;
    match self {
      IoError { details, .. }
      | CannotOpenFile { details, .. }
      | EndOfFile { details, .. }
      | ReadFailed { details, .. }
      | WriteFailed { details, .. }
      | SeekFailed { details, .. } => Some(details),
      _ => None,
    }
  }

  #[inline]
  #[must_use]
  pub fn is_end_of_file(&self) -> bool {
    matches!(self, Self::EndOfFile { .. })
  }

  /// The specific status code for this error.
  ///
  /// `InternalError` is a defect and trips a debug assertion. Both it and
  /// `UnknownError` are reported as [StatusCode::Unknown].
  #[must_use]
  pub fn status_code(&self) -> StatusCode {
    use ImagineError::*;
    match self {
      OutOfMemory(_) => StatusCode::OutOfMemory,
      LogicError(_) => StatusCode::Logic,
      IllegalArgument(_) => StatusCode::IllegalArgument,
      UnsupportedOperation(_) => StatusCode::UnsupportedOperation,
      TooManyImagePlanes(_) => StatusCode::TooManyImagePlanes,
      CodecError(_) => StatusCode::Codec,
      CannotCreateCodec(_) => StatusCode::CannotCreateCodec,
      CannotDecodeImage(_) => StatusCode::CannotDecodeImage,
      IoError { .. } => StatusCode::Io,
      CannotOpenFile { .. } => StatusCode::CannotOpenFile,
      EndOfFile { .. } => StatusCode::EndOfFile,
      ReadFailed { .. } => StatusCode::ReadFailed,
      WriteFailed { .. } => StatusCode::WriteFailed,
      SeekFailed { .. } => StatusCode::SeekFailed,
      InternalError(m) => {
        debug_assert!(false, "internal error: {m}");
        StatusCode::Unknown
      }
      UnknownError(_) => StatusCode::Unknown,
    }
  }

  #[inline]
  #[must_use]
  pub fn category(&self) -> StatusCode {
    self.status_code().category()
  }
}

impl From<TryReserveError> for ImagineError {
  #[inline]
  fn from(_: TryReserveError) -> Self {
    Self::OutOfMemory(String::from("allocation failed"))
  }
}
impl From<TryFromIntError> for ImagineError {
  #[inline]
  fn from(_: TryFromIntError) -> Self {
    Self::IllegalArgument(String::from("integer value out of range"))
  }
}

/// A `Result` where the error defaults to [ImagineError].
pub type Result<T, E = ImagineError> = core::result::Result<T, E>;
