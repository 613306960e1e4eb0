use std::io::{ErrorKind, Read};

use super::IoContext;
use crate::{ImagineError, IoErrorDetails, Result};

/// A forward-only [IoContext] over any [Read].
///
/// This is for pipes, sockets, stdin, and anything else that can't seek. It
/// counts the bytes it has read so that [tell](IoContext::tell) still works.
#[derive(Debug)]
pub struct StreamIoContext<R> {
  inner: R,
  path: Option<String>,
  offset: i64,
  eof: bool,
}

impl<R: Read> StreamIoContext<R> {
  #[inline]
  #[must_use]
  pub fn new(inner: R) -> Self {
    Self { inner, path: None, offset: 0, eof: false }
  }

  #[inline]
  #[must_use]
  pub fn with_path(mut self, path: impl Into<String>) -> Self {
    self.path = Some(path.into());
    self
  }

  #[inline]
  pub fn into_inner(self) -> R {
    self.inner
  }

  fn not_seekable(&self, offset: i64) -> ImagineError {
    ImagineError::seek_failed(
      "stream not seekable",
      IoErrorDetails::new(self.path.as_deref(), offset, 0),
    )
  }
}

impl<R: Read> IoContext for StreamIoContext<R> {
  #[inline]
  fn path(&self) -> Option<&str> {
    self.path.as_deref()
  }

  #[inline]
  fn eof(&self) -> bool {
    self.eof
  }

  #[inline]
  fn seekable(&self) -> bool {
    false
  }

  #[inline]
  fn tell(&self) -> i64 {
    self.offset
  }

  fn size(&mut self) -> Result<i64> {
    Err(ImagineError::unsupported("stream size unknown"))
  }

  fn seek_set(&mut self, offset: i64) -> Result<i64> {
    Err(self.not_seekable(offset))
  }

  fn seek_end(&mut self, offset: i64) -> Result<i64> {
    Err(self.not_seekable(offset))
  }

  fn seek_rel(&mut self, offset: i64) -> Result<i64> {
    Err(self.not_seekable(self.offset.saturating_add(offset)))
  }

  fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
    let mut n = 0;
    while n < buf.len() {
      match self.inner.read(&mut buf[n..]) {
        Ok(0) => {
          self.eof = true;
          break;
        }
        Ok(c) => n += c,
        Err(e) if e.kind() == ErrorKind::Interrupted => continue,
        Err(e) => {
          self.offset += n as i64;
          return Err(ImagineError::read_failed(
            "error reading",
            IoErrorDetails::new(self.path.as_deref(), self.offset, (buf.len() - n) as u64)
              .with_os_error(&e),
          ));
        }
      }
    }
    self.offset += n as i64;
    Ok(n)
  }

  fn write(&mut self, buf: &[u8]) -> Result<usize> {
    Err(ImagineError::write_failed(
      "stream is read only",
      IoErrorDetails::new(self.path.as_deref(), self.offset, buf.len() as u64),
    ))
  }
}
