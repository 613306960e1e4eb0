//! The decoder provider protocol.
//!
//! A [DecoderProvider] looks at a stream and either claims it, producing an
//! [ImageDecoder] that owns the stream from then on, or declines and hands the
//! stream back. See [Registry](crate::Registry) for how providers get tried.

use std::path::Path;

use crate::{io::peek, FileFormat, FrameFormat, ImageType, IoContext, OutputBuffer, Result};

/// Tried before everything else.
pub const PRIORITY_MAX: i32 = i32::MIN;
pub const PRIORITY_HIGH: i32 = -0x4000;
pub const PRIORITY_NORMAL: i32 = 0;
pub const PRIORITY_LOW: i32 = 0x4000;
/// Tried after everything else.
pub const PRIORITY_MIN: i32 = i32::MAX;

/// Decodes the frames of one file, in order.
///
/// A decoder is single use: it owns one stream, and each frame is obtained
/// with one [next_frame_format](Self::next_frame_format) followed by one
/// [decode](Self::decode). When `next_frame_format` gives back a format that
/// isn't constant (see [FrameFormat::is_constant]) there are no more frames.
pub trait ImageDecoder {
  fn name(&self) -> &'static str;

  /// The format of the file as a whole.
  fn file_format(&mut self) -> Result<FileFormat>;

  /// The format of the next frame, or [FrameFormat::EMPTY] when there are no
  /// more frames.
  fn next_frame_format(&mut self) -> Result<FrameFormat>;

  /// Decodes the next frame into `buffer`.
  ///
  /// The buffer must have a plane span for every plane of the format that
  /// [next_frame_format](Self::next_frame_format) reported. Rows are written
  /// top to bottom.
  fn decode(&mut self, buffer: &mut OutputBuffer<'_>) -> Result<()>;
}

/// The outcome of a provider looking at a stream.
pub enum Recognition<'a> {
  /// The provider claimed the stream.
  Decoder(Box<dyn ImageDecoder + 'a>),
  /// Not this provider's format. The stream is handed back, at the position
  /// it was given at if it's seekable.
  Declined(Box<dyn IoContext + 'a>),
}
impl<'a> Recognition<'a> {
  #[inline]
  #[must_use]
  pub fn is_decoder(&self) -> bool {
    matches!(self, Self::Decoder(_))
  }

  #[inline]
  #[must_use]
  pub fn into_decoder(self) -> Option<Box<dyn ImageDecoder + 'a>> {
    match self {
      Self::Decoder(d) => Some(d),
      Self::Declined(_) => None,
    }
  }
}
impl core::fmt::Debug for Recognition<'_> {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    match self {
      Self::Decoder(d) => write!(f, "Decoder({})", d.name()),
      Self::Declined(_) => f.write_str("Declined"),
    }
  }
}

/// Recognizes streams of one format and builds decoders for them.
pub trait DecoderProvider {
  fn name(&self) -> &'static str;

  /// Lower values are tried first.
  fn priority(&self) -> i32;

  /// Claims `io` or hands it back.
  ///
  /// * `path` is only a hint, used for extension matching.
  /// * `format`, if its `image_type` isn't `Unknown`, says what the stream is
  ///   and the provider should trust that instead of looking at the data.
  ///
  /// An `Err` means "this is my format but it's broken", and the stream is
  /// gone along with the error. Declining must leave a seekable stream where
  /// it was.
  fn create_decoder<'a>(
    &self, path: Option<&str>, format: Option<&FileFormat>, io: Box<dyn IoContext + 'a>,
  ) -> Result<Recognition<'a>>;
}

/// How a format identifies itself.
#[derive(Debug, Clone, Copy)]
pub struct Signature {
  pub image_type: ImageType,
  /// Any one of these at the start of the stream is a match.
  pub magic: &'static [&'static [u8]],
  /// Lowercase, without the dot.
  pub extensions: &'static [&'static str],
}

impl Signature {
  /// Decides if a stream belongs to this format.
  ///
  /// 1. A known `image_type` in `format` is trusted outright.
  /// 2. Otherwise, a seekable stream has its first bytes checked against the
  ///    magic (and the position is restored).
  /// 3. Otherwise the `path` extension is checked.
  pub fn recognize(
    &self, path: Option<&str>, format: Option<&FileFormat>, io: &mut dyn IoContext,
  ) -> Result<bool> {
    if let Some(f) = format.filter(|f| f.image_type != ImageType::Unknown) {
      return Ok(f.image_type == self.image_type);
    }
    if io.seekable() {
      let mut buf = [0_u8; 16];
      let n = peek(io, &mut buf)?;
      let head = &buf[..n];
      return Ok(self.magic.iter().any(|m| head.starts_with(m)));
    }
    Ok(matches_extension(path, self.extensions))
  }
}

/// If the extension of `path` is one of `extensions`, ignoring ASCII case.
#[must_use]
pub fn matches_extension(path: Option<&str>, extensions: &[&str]) -> bool {
  let Some(ext) = path.and_then(|p| Path::new(p).extension()).and_then(|e| e.to_str()) else {
    return false;
  };
  extensions.iter().any(|x| x.eq_ignore_ascii_case(ext))
}
