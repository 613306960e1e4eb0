use std::{
  fs::{File, OpenOptions},
  io::{ErrorKind, IsTerminal, Read, Seek, SeekFrom, Write},
  path::Path,
};

use super::IoContext;
use crate::{ImagineError, IoErrorDetails, Result};

/// How to open a [FileIoContext].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileMode {
  /// Read only. The file must exist.
  Read,
  /// Write only. Creates or truncates the file.
  Write,
  /// Read and write. Creates or truncates the file.
  Append,
  /// Read and write. The file must exist, and is not truncated.
  ReadWrite,
}

/// An [IoContext] over an OS file.
///
/// The logical offset is cached, so [tell](IoContext::tell) never touches the
/// OS. Whether the handle can seek is worked out once when the context is
/// built: it must be a regular file and not a terminal.
#[derive(Debug)]
pub struct FileIoContext {
  file: File,
  path: String,
  offset: i64,
  seekable: bool,
  eof: bool,
}

impl FileIoContext {
  /// ## Failure
  /// * `CannotOpenFile` with the OS error number if the open fails.
  pub fn open(path: impl AsRef<Path>, mode: FileMode) -> Result<Self> {
    let path = path.as_ref();
    let mut opts = OpenOptions::new();
    match mode {
      FileMode::Read => opts.read(true),
      FileMode::Write => opts.write(true).create(true).truncate(true),
      FileMode::Append => opts.read(true).write(true).create(true).truncate(true),
      FileMode::ReadWrite => opts.read(true).write(true),
    };
    let path_str = path.to_string_lossy().into_owned();
    let file = opts.open(path).map_err(|e| ImagineError::CannotOpenFile {
      msg: format!("error opening file: {e}"),
      details: IoErrorDetails::new(Some(&path_str), 0, 0).with_os_error(&e),
    })?;
    tracing::trace!(path = %path_str, ?mode, "opened file");
    Ok(Self::from_file(file, path_str))
  }

  /// Wraps an already open file. The file's current position is taken as the
  /// starting offset when it's seekable.
  #[must_use]
  pub fn from_file(mut file: File, path: String) -> Self {
    let seekable = !file.is_terminal() && file.metadata().map(|m| m.is_file()).unwrap_or(false);
    let offset = if seekable {
      file.stream_position().ok().and_then(|p| i64::try_from(p).ok()).unwrap_or(0)
    } else {
      0
    };
    Self { file, path, offset, seekable, eof: false }
  }

  fn details(&self, offset: i64, count: u64) -> IoErrorDetails {
    IoErrorDetails::new(Some(&self.path), offset, count)
  }

  fn check_seekable(&self) -> Result<()> {
    if self.seekable {
      Ok(())
    } else {
      Err(ImagineError::seek_failed("file not seekable", self.details(self.offset, 0)))
    }
  }

  fn seek_to(&mut self, from: SeekFrom, off: i64, msg: &str) -> Result<i64> {
    self.check_seekable()?;
    match self.file.seek(from) {
      Ok(p) => {
        self.offset = i64::try_from(p)?;
        self.eof = false;
        Ok(self.offset)
      }
      Err(e) => {
        Err(ImagineError::seek_failed(msg, self.details(off, 0).with_os_error(&e)))
      }
    }
  }
}

impl IoContext for FileIoContext {
  #[inline]
  fn path(&self) -> Option<&str> {
    Some(&self.path)
  }

  #[inline]
  fn eof(&self) -> bool {
    self.eof
  }

  #[inline]
  fn seekable(&self) -> bool {
    self.seekable
  }

  #[inline]
  fn tell(&self) -> i64 {
    self.offset
  }

  fn size(&mut self) -> Result<i64> {
    if !self.seekable {
      return Err(ImagineError::unsupported("file size unknown: file not seekable"));
    }
    let meta = self.file.metadata().map_err(|e| {
      ImagineError::seek_failed("unable to determine file size", self.details(0, 0).with_os_error(&e))
    })?;
    Ok(i64::try_from(meta.len())?)
  }

  fn seek_set(&mut self, offset: i64) -> Result<i64> {
    let target = u64::try_from(offset).map_err(|_| {
      ImagineError::seek_failed("error seeking (from begin)", self.details(offset, 0))
    })?;
    self.seek_to(SeekFrom::Start(target), offset, "error seeking (from begin)")
  }

  fn seek_end(&mut self, offset: i64) -> Result<i64> {
    self.seek_to(SeekFrom::End(offset), offset, "error seeking (from end)")
  }

  fn seek_rel(&mut self, offset: i64) -> Result<i64> {
    let target = self.offset.saturating_add(offset);
    self.seek_to(SeekFrom::Current(offset), target, "error seeking")
  }

  fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
    let mut n = 0;
    while n < buf.len() {
      match self.file.read(&mut buf[n..]) {
        Ok(0) => {
          self.eof = true;
          break;
        }
        Ok(c) => n += c,
        Err(e) if e.kind() == ErrorKind::Interrupted => continue,
        Err(e) => {
          self.offset += n as i64;
          let details = self.details(self.offset, (buf.len() - n) as u64).with_os_error(&e);
          return Err(ImagineError::read_failed("error reading", details));
        }
      }
    }
    self.offset += n as i64;
    Ok(n)
  }

  fn write(&mut self, buf: &[u8]) -> Result<usize> {
    let mut n = 0;
    while n < buf.len() {
      match self.file.write(&buf[n..]) {
        Ok(0) => {
          self.eof = true;
          break;
        }
        Ok(c) => n += c,
        Err(e) if e.kind() == ErrorKind::Interrupted => continue,
        Err(e) => {
          self.offset += n as i64;
          let details = self.details(self.offset, (buf.len() - n) as u64).with_os_error(&e);
          return Err(ImagineError::write_failed("error writing", details));
        }
      }
    }
    self.offset += n as i64;
    Ok(n)
  }

  fn flush(&mut self) -> Result<()> {
    self.file.flush().map_err(|e| {
      ImagineError::write_failed("error flushing", self.details(self.offset, 0).with_os_error(&e))
    })
  }
}
