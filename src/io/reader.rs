use std::io::{self, Read, Seek, SeekFrom};

use super::IoContext;
use crate::{bridge::ErrorSink, ImagineError};

/// Adapts an owned [IoContext] into [Read] + [Seek] for codec libraries.
///
/// A library only sees a plain [io::Error] when something goes wrong. If an
/// [ErrorSink] is attached, the original [ImagineError] is stored there first,
/// so the bridged call hands the caller the real error instead of whatever
/// the library made of it.
pub struct IoReader<'a> {
  io: Box<dyn IoContext + 'a>,
  sink: Option<ErrorSink>,
}

impl<'a> IoReader<'a> {
  #[inline]
  #[must_use]
  pub fn new(io: Box<dyn IoContext + 'a>) -> Self {
    Self { io, sink: None }
  }

  #[inline]
  #[must_use]
  pub fn with_sink(mut self, sink: ErrorSink) -> Self {
    self.sink = Some(sink);
    self
  }

  #[inline]
  #[must_use]
  pub fn io(&self) -> &dyn IoContext {
    &*self.io
  }

  #[inline]
  pub fn into_inner(self) -> Box<dyn IoContext + 'a> {
    self.io
  }

  fn convert(&self, err: ImagineError) -> io::Error {
    let kind = match &err {
      ImagineError::EndOfFile { .. } => io::ErrorKind::UnexpectedEof,
      ImagineError::SeekFailed { .. } => io::ErrorKind::Unsupported,
      _ => io::ErrorKind::Other,
    };
    let out = io::Error::new(kind, err.message().to_owned());
    if let Some(sink) = &self.sink {
      sink.store(err);
    }
    out
  }
}

impl core::fmt::Debug for IoReader<'_> {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.debug_struct("IoReader")
      .field("path", &self.io.path())
      .field("offset", &self.io.tell())
      .finish()
  }
}

impl Read for IoReader<'_> {
  fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
    self.io.read(buf).map_err(|e| self.convert(e))
  }
}

impl Seek for IoReader<'_> {
  fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
    let result = match pos {
      // a zero relative seek is just a position query, even without seeking
      SeekFrom::Current(0) => Ok(self.io.tell()),
      SeekFrom::Start(off) => match i64::try_from(off) {
        Ok(off) => self.io.seek_set(off),
        Err(e) => Err(e.into()),
      },
      SeekFrom::End(off) => self.io.seek_end(off),
      SeekFrom::Current(off) => self.io.seek_rel(off),
    };
    match result {
      Ok(p) => u64::try_from(p).map_err(|_| io::Error::other("negative stream position")),
      Err(e) => Err(self.convert(e)),
    }
  }
}
