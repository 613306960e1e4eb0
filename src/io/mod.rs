//! Byte sources (and sinks) that decoders read through.
//!
//! Every decoder reads its file through an [IoContext]. A context might be
//! seekable (files, memory) or not (pipes, sockets, terminals), and the
//! recognition and decoding logic is careful to handle both.
//!
//! * [read](IoContext::read) and [write](IoContext::write) report how many
//!   bytes actually moved. A short transfer isn't an error on its own.
//! * [read_all](IoContext::read_all) and [write_all](IoContext::write_all)
//!   keep going until everything has moved, or fail with `EndOfFile`.
//! * The `seek_*` methods fail with `SeekFailed` on a non-seekable context, and
//!   for any target outside of the stream.

use crate::{ImagineError, IoErrorDetails, Result};

mod file;
pub use file::*;

mod memory;
pub use memory::*;

mod stream;
pub use stream::*;

mod reader;
pub use reader::*;

/// A byte-addressable source and/or sink.
pub trait IoContext {
  /// The path this context came from, if any. Only used for error reporting.
  fn path(&self) -> Option<&str>;

  /// If the end of the stream has been reached.
  fn eof(&self) -> bool;

  fn seekable(&self) -> bool;

  /// The current offset from the start of the stream.
  fn tell(&self) -> i64;

  /// The total size of the stream.
  ///
  /// Non-seekable contexts can't know this and give `UnsupportedOperation`.
  fn size(&mut self) -> Result<i64>;

  /// Seeks to `offset` from the start, returning the new position.
  fn seek_set(&mut self, offset: i64) -> Result<i64>;

  /// Seeks to `offset` from the end (so `offset <= 0`), returning the new
  /// position.
  fn seek_end(&mut self, offset: i64) -> Result<i64>;

  /// Seeks by `offset` relative to the current position, returning the new
  /// position.
  fn seek_rel(&mut self, offset: i64) -> Result<i64>;

  /// Reads up to `buf.len()` bytes.
  fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

  /// Writes up to `buf.len()` bytes.
  fn write(&mut self, buf: &[u8]) -> Result<usize>;

  fn flush(&mut self) -> Result<()> {
    Ok(())
  }

  /// Fills all of `buf`.
  ///
  /// ## Failure
  /// * `EndOfFile` if the stream ends first. The details give the offset the
  ///   stream got to and how many bytes were still missing.
  fn read_all(&mut self, buf: &mut [u8]) -> Result<()> {
    let start = self.tell();
    let mut done = 0;
    while done < buf.len() {
      let n = self.read(&mut buf[done..])?;
      done += n;
      if done < buf.len() && (n == 0 || self.eof()) {
        return Err(ImagineError::end_of_file(
          "eof during read",
          IoErrorDetails::new(self.path(), start + done as i64, (buf.len() - done) as u64),
        ));
      }
    }
    Ok(())
  }

  /// Writes all of `buf`.
  ///
  /// ## Failure
  /// * `EndOfFile` if the sink fills up first.
  fn write_all(&mut self, buf: &[u8]) -> Result<()> {
    let start = self.tell();
    let mut done = 0;
    while done < buf.len() {
      let n = self.write(&buf[done..])?;
      done += n;
      if done < buf.len() && (n == 0 || self.eof()) {
        return Err(ImagineError::end_of_file(
          "eof during write",
          IoErrorDetails::new(self.path(), start + done as i64, (buf.len() - done) as u64),
        ));
      }
    }
    Ok(())
  }
}

macro_rules! forward_io_context {
  ($($t:tt)*) => {
    $($t)* {
      #[inline]
      fn path(&self) -> Option<&str> {
        (**self).path()
      }
      #[inline]
      fn eof(&self) -> bool {
        (**self).eof()
      }
      #[inline]
      fn seekable(&self) -> bool {
        (**self).seekable()
      }
      #[inline]
      fn tell(&self) -> i64 {
        (**self).tell()
      }
      #[inline]
      fn size(&mut self) -> Result<i64> {
        (**self).size()
      }
      #[inline]
      fn seek_set(&mut self, offset: i64) -> Result<i64> {
        (**self).seek_set(offset)
      }
      #[inline]
      fn seek_end(&mut self, offset: i64) -> Result<i64> {
        (**self).seek_end(offset)
      }
      #[inline]
      fn seek_rel(&mut self, offset: i64) -> Result<i64> {
        (**self).seek_rel(offset)
      }
      #[inline]
      fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).read(buf)
      }
      #[inline]
      fn write(&mut self, buf: &[u8]) -> Result<usize> {
        (**self).write(buf)
      }
      #[inline]
      fn flush(&mut self) -> Result<()> {
        (**self).flush()
      }
      #[inline]
      fn read_all(&mut self, buf: &mut [u8]) -> Result<()> {
        (**self).read_all(buf)
      }
      #[inline]
      fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        (**self).write_all(buf)
      }
    }
  };
}
forward_io_context!(impl<T: IoContext + ?Sized> IoContext for &mut T);
forward_io_context!(impl<T: IoContext + ?Sized> IoContext for Box<T>);

/// Reads exactly `N` bytes into an array.
#[inline]
pub(crate) fn read_array<const N: usize>(io: &mut (impl IoContext + ?Sized)) -> Result<[u8; N]> {
  let mut a = [0_u8; N];
  io.read_all(&mut a)?;
  Ok(a)
}

/// Reads up to `buf.len()` bytes then puts the position back.
///
/// Only for seekable contexts. Returns how many bytes were available, since
/// recognition just wants to know "is this my magic" and a short stream
/// simply isn't.
pub(crate) fn peek(io: &mut (impl IoContext + ?Sized), buf: &mut [u8]) -> Result<usize> {
  debug_assert!(io.seekable());
  let start = io.tell();
  let mut done = 0;
  while done < buf.len() {
    let n = io.read(&mut buf[done..])?;
    if n == 0 {
      break;
    }
    done += n;
  }
  io.seek_set(start)?;
  Ok(done)
}

/// Moves forward to `offset` by reading and discarding bytes.
///
/// This is how a non-seekable stream gets to a later position. If the stream
/// is already past `offset` it fails with `CannotDecodeImage`, since a
/// non-seekable stream can't go back.
pub(crate) fn skip_to(io: &mut (impl IoContext + ?Sized), offset: i64) -> Result<()> {
  if io.seekable() {
    io.seek_set(offset)?;
    return Ok(());
  }
  let here = io.tell();
  let mut remaining = u64::try_from(offset - here)
    .map_err(|_| ImagineError::cannot_decode("data offset lies behind the current position"))?;
  let mut scratch = [0_u8; 512];
  while remaining > 0 {
    let n = remaining.min(scratch.len() as u64) as usize;
    io.read_all(&mut scratch[..n])?;
    remaining -= n as u64;
  }
  Ok(())
}
