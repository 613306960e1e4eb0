use super::IoContext;
use crate::{ImagineError, IoErrorDetails, Result};

#[derive(Debug)]
enum Storage<'a> {
  ReadOnly(&'a [u8]),
  Writable(&'a mut [u8]),
  Owned(Vec<u8>),
}

/// An [IoContext] over a fixed size span of memory.
///
/// The size never changes: writes past the end come up short just like reads
/// do. It's always seekable, and any seek outside of `0..=len` fails.
#[derive(Debug)]
pub struct MemoryIoContext<'a> {
  storage: Storage<'a>,
  pos: usize,
  path: Option<String>,
}

impl<'a> MemoryIoContext<'a> {
  /// A read only view. Writing gives `WriteFailed`.
  #[inline]
  #[must_use]
  pub fn new(data: &'a [u8]) -> Self {
    Self { storage: Storage::ReadOnly(data), pos: 0, path: None }
  }

  #[inline]
  #[must_use]
  pub fn new_writable(data: &'a mut [u8]) -> Self {
    Self { storage: Storage::Writable(data), pos: 0, path: None }
  }

  /// Takes ownership of the bytes. The context is writable.
  #[inline]
  #[must_use]
  pub fn from_vec(data: Vec<u8>) -> MemoryIoContext<'static> {
    MemoryIoContext { storage: Storage::Owned(data), pos: 0, path: None }
  }

  /// Sets the path reported in errors.
  #[inline]
  #[must_use]
  pub fn with_path(mut self, path: impl Into<String>) -> Self {
    self.path = Some(path.into());
    self
  }

  #[inline]
  #[must_use]
  pub fn as_slice(&self) -> &[u8] {
    match &self.storage {
      Storage::ReadOnly(d) => d,
      Storage::Writable(d) => d,
      Storage::Owned(v) => v,
    }
  }

  #[inline]
  #[must_use]
  pub fn len(&self) -> usize {
    self.as_slice().len()
  }

  #[inline]
  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  #[inline]
  fn remaining(&self) -> usize {
    self.len() - self.pos
  }

  fn seek_to(&mut self, target: Option<i64>, requested: i64) -> Result<i64> {
    match target.and_then(|t| usize::try_from(t).ok()).filter(|t| *t <= self.len()) {
      Some(t) => {
        self.pos = t;
        Ok(t as i64)
      }
      None => Err(ImagineError::seek_failed(
        "seek out of bounds",
        IoErrorDetails::new(self.path.as_deref(), requested, 0),
      )),
    }
  }

  fn insufficient(&self, count: usize) -> ImagineError {
    ImagineError::end_of_file(
      "insufficient data in buffer",
      IoErrorDetails::new(self.path.as_deref(), self.tell(), count as u64),
    )
  }
}

impl IoContext for MemoryIoContext<'_> {
  #[inline]
  fn path(&self) -> Option<&str> {
    self.path.as_deref()
  }

  #[inline]
  fn eof(&self) -> bool {
    self.pos == self.len()
  }

  #[inline]
  fn seekable(&self) -> bool {
    true
  }

  #[inline]
  fn tell(&self) -> i64 {
    self.pos as i64
  }

  #[inline]
  fn size(&mut self) -> Result<i64> {
    Ok(self.len() as i64)
  }

  fn seek_set(&mut self, offset: i64) -> Result<i64> {
    self.seek_to(Some(offset), offset)
  }

  fn seek_end(&mut self, offset: i64) -> Result<i64> {
    let target = if offset <= 0 { (self.len() as i64).checked_add(offset) } else { None };
    self.seek_to(target, offset)
  }

  fn seek_rel(&mut self, offset: i64) -> Result<i64> {
    let target = self.tell().checked_add(offset);
    self.seek_to(target, target.unwrap_or(offset))
  }

  fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
    let n = buf.len().min(self.remaining());
    buf[..n].copy_from_slice(&self.as_slice()[self.pos..self.pos + n]);
    self.pos += n;
    Ok(n)
  }

  fn write(&mut self, buf: &[u8]) -> Result<usize> {
    let n = buf.len().min(self.remaining());
    let pos = self.pos;
    let dest: &mut [u8] = match &mut self.storage {
      Storage::ReadOnly(_) => {
        return Err(ImagineError::write_failed(
          "buffer not writable",
          IoErrorDetails::new(self.path.as_deref(), pos as i64, buf.len() as u64),
        ))
      }
      Storage::Writable(d) => d,
      Storage::Owned(v) => v,
    };
    dest[pos..pos + n].copy_from_slice(&buf[..n]);
    self.pos += n;
    Ok(n)
  }

  fn read_all(&mut self, buf: &mut [u8]) -> Result<()> {
    if buf.len() > self.remaining() {
      return Err(self.insufficient(buf.len()));
    }
    self.read(buf).map(|_| ())
  }

  fn write_all(&mut self, buf: &[u8]) -> Result<()> {
    if buf.len() > self.remaining() {
      return Err(self.insufficient(buf.len()));
    }
    self.write(buf).map(|_| ())
  }
}
