use std::io::BufReader;

use ::tiff::{
  decoder::{Decoder, DecodingResult},
  ColorType,
};

use super::{deinterleave_u16, deinterleave_u8};
use crate::{
  bridge::Bridge,
  decoder::{Signature, PRIORITY_NORMAL},
  io::IoReader,
  ColorFamily, DecoderProvider, FileFormat, FrameFormat, ImageDecoder, ImageType, ImagineError,
  IoContext, OutputBuffer, Recognition, Result,
};

pub const TIFF_NAME: &str = "tiff";

const TIFF_SIGNATURE: Signature = Signature {
  image_type: ImageType::Tiff,
  magic: &[b"MM\0*", b"II*\0"],
  extensions: &["tif", "tiff"],
};

/// Provides [TiffDecoder]s, backed by the `tiff` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct TiffProvider;

impl DecoderProvider for TiffProvider {
  #[inline]
  fn name(&self) -> &'static str {
    TIFF_NAME
  }

  #[inline]
  fn priority(&self) -> i32 {
    PRIORITY_NORMAL
  }

  fn create_decoder<'a>(
    &self, path: Option<&str>, format: Option<&FileFormat>, mut io: Box<dyn IoContext + 'a>,
  ) -> Result<Recognition<'a>> {
    if TIFF_SIGNATURE.recognize(path, format, io.as_mut())? {
      Ok(Recognition::Decoder(Box::new(TiffDecoder::new(io))))
    } else {
      Ok(Recognition::Declined(io))
    }
  }
}

type Inner<'a> = Decoder<BufReader<IoReader<'a>>>;

/// Decodes each directory of a TIFF as one frame.
///
/// 8 and 16 bit gray, gray + alpha, RGB, RGBA, and CMYK are supported.
pub struct TiffDecoder<'a> {
  bridge: Bridge,
  io: Option<Box<dyn IoContext + 'a>>,
  inner: Option<Inner<'a>>,
  /// The current directory's format, or `EMPTY` if it's not been read yet.
  frame: FrameFormat,
  first: FrameFormat,
  alive: bool,
}

impl core::fmt::Debug for TiffDecoder<'_> {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.debug_struct("TiffDecoder")
      .field("frame", &self.frame)
      .field("alive", &self.alive)
      .finish_non_exhaustive()
  }
}

fn gone() -> ImagineError {
  ImagineError::LogicError(String::from("TIFF stream already consumed"))
}

impl<'a> TiffDecoder<'a> {
  #[inline]
  #[must_use]
  pub fn new(io: Box<dyn IoContext + 'a>) -> Self {
    Self {
      bridge: Bridge::new(),
      io: Some(io),
      inner: None,
      frame: FrameFormat::EMPTY,
      first: FrameFormat::EMPTY,
      alive: true,
    }
  }

  fn open(&mut self) -> Result<&mut Inner<'a>> {
    if self.inner.is_none() {
      let io = self.io.take().ok_or_else(gone)?;
      let source = BufReader::new(IoReader::new(io).with_sink(self.bridge.sink()));
      let inner = self.bridge.call("libtiff error", move || Decoder::new(source))?;
      self.inner = Some(inner);
      self.frame = self.directory_format()?;
      self.first = self.frame;
    }
    self.inner.as_mut().ok_or_else(gone)
  }

  fn directory_format(&mut self) -> Result<FrameFormat> {
    let inner = self.inner.as_mut().ok_or_else(gone)?;
    let ((width, height), color) = self.bridge.call("libtiff error", || {
      Ok::<_, ::tiff::TiffError>((inner.dimensions()?, inner.colortype()?))
    })?;
    let (family, depth) = match color {
      ColorType::Gray(d) => (ColorFamily::Gray, d),
      ColorType::GrayA(d) => (ColorFamily::GrayAlpha, d),
      ColorType::RGB(d) => (ColorFamily::Rgb, d),
      ColorType::RGBA(d) => (ColorFamily::Rgba, d),
      ColorType::CMYK(d) => (ColorFamily::Cmyk, d),
      other => return Err(ImagineError::unsupported(format!("TIFF color {other:?} not supported"))),
    };
    if !matches!(depth, 8 | 16) {
      return Err(ImagineError::unsupported(format!("TIFF bit depth {depth} not supported")));
    }
    tracing::trace!(width, height, ?color, "TIFF directory");
    Ok(FrameFormat::uniform(family, width, height, depth.into()))
  }
}

impl ImageDecoder for TiffDecoder<'_> {
  #[inline]
  fn name(&self) -> &'static str {
    TIFF_NAME
  }

  fn file_format(&mut self) -> Result<FileFormat> {
    self.open()?;
    Ok(FileFormat::new(self.first, ImageType::Tiff, 0))
  }

  fn next_frame_format(&mut self) -> Result<FrameFormat> {
    if !self.alive {
      return Ok(FrameFormat::EMPTY);
    }
    self.open()?;
    if !self.frame.is_constant() {
      let inner = self.inner.as_mut().ok_or_else(gone)?;
      self.bridge.call("error reading TIFF directory", || inner.next_image())?;
      self.frame = self.directory_format()?;
    }
    Ok(self.frame)
  }

  fn decode(&mut self, buffer: &mut OutputBuffer<'_>) -> Result<()> {
    if !self.alive {
      return Ok(());
    }
    self.next_frame_format()?;
    let format = self.frame;
    let inner = self.inner.as_mut().ok_or_else(gone)?;
    let image = self.bridge.call("error decoding TIFF image", || inner.read_image())?;
    self.frame = FrameFormat::EMPTY;
    if !inner.more_images() {
      self.alive = false;
    }
    match image {
      DecodingResult::U8(data) => deinterleave_u8(&data, &format, buffer),
      DecodingResult::U16(data) => deinterleave_u16(data.into_iter(), &format, buffer),
      _ => Err(ImagineError::unsupported("TIFF sample type not supported")),
    }
  }
}
