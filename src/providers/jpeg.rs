use std::io::BufReader;

use jpeg_decoder::PixelFormat;

use super::{deinterleave_u16, deinterleave_u8};
use crate::{
  bridge::Bridge,
  decoder::{Signature, PRIORITY_HIGH},
  io::IoReader,
  ColorFamily, DecoderProvider, FileFormat, FrameFormat, ImageDecoder, ImageType, ImagineError,
  IoContext, OutputBuffer, Recognition, Result,
};

pub const JPEG_NAME: &str = "jpeg";

const JPEG_SIGNATURE: Signature = Signature {
  image_type: ImageType::Jpeg,
  magic: &[&[0xFF, 0xD8, 0xFF]],
  extensions: &["jpg", "jpeg", "jpe", "jif", "jfif", "jfi"],
};

/// Provides [JpegDecoder]s, backed by the `jpeg-decoder` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct JpegProvider;

impl DecoderProvider for JpegProvider {
  #[inline]
  fn name(&self) -> &'static str {
    JPEG_NAME
  }

  #[inline]
  fn priority(&self) -> i32 {
    PRIORITY_HIGH
  }

  fn create_decoder<'a>(
    &self, path: Option<&str>, format: Option<&FileFormat>, mut io: Box<dyn IoContext + 'a>,
  ) -> Result<Recognition<'a>> {
    if JPEG_SIGNATURE.recognize(path, format, io.as_mut())? {
      Ok(Recognition::Decoder(Box::new(JpegDecoder::new(io))))
    } else {
      Ok(Recognition::Declined(io))
    }
  }
}

type Inner<'a> = jpeg_decoder::Decoder<BufReader<IoReader<'a>>>;

/// Decodes the single frame of a baseline, progressive, or lossless JPEG.
///
/// Color images come out as RGB, already converted from YCbCr.
pub struct JpegDecoder<'a> {
  bridge: Bridge,
  inner: Inner<'a>,
  pixel_format: Option<PixelFormat>,
  format: FrameFormat,
  alive: bool,
}

impl core::fmt::Debug for JpegDecoder<'_> {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.debug_struct("JpegDecoder")
      .field("pixel_format", &self.pixel_format)
      .field("format", &self.format)
      .field("alive", &self.alive)
      .finish_non_exhaustive()
  }
}

impl<'a> JpegDecoder<'a> {
  #[must_use]
  pub fn new(io: Box<dyn IoContext + 'a>) -> Self {
    let bridge = Bridge::new();
    let source = BufReader::new(IoReader::new(io).with_sink(bridge.sink()));
    Self {
      bridge,
      inner: jpeg_decoder::Decoder::new(source),
      pixel_format: None,
      format: FrameFormat::EMPTY,
      alive: true,
    }
  }

  fn read_header(&mut self) -> Result<()> {
    if !self.alive || self.pixel_format.is_some() {
      return Ok(());
    }
    let inner = &mut self.inner;
    self.bridge.call("jpeglib error", || inner.read_info())?;
    let info = self
      .inner
      .info()
      .ok_or_else(|| ImagineError::cannot_decode("JPEG header missing frame info"))?;
    let (family, depth) = match info.pixel_format {
      PixelFormat::L8 => (ColorFamily::Gray, 8),
      PixelFormat::L16 => (ColorFamily::Gray, 16),
      PixelFormat::RGB24 => (ColorFamily::Rgb, 8),
      PixelFormat::CMYK32 => (ColorFamily::Cmyk, 8),
      #[allow(unreachable_patterns)]
      _ => return Err(ImagineError::unsupported("JPEG pixel format not supported")),
    };
    tracing::trace!(
      width = info.width,
      height = info.height,
      pixel_format = ?info.pixel_format,
      "JPEG header"
    );
    self.format = FrameFormat::uniform(family, info.width.into(), info.height.into(), depth);
    self.pixel_format = Some(info.pixel_format);
    Ok(())
  }
}

impl ImageDecoder for JpegDecoder<'_> {
  #[inline]
  fn name(&self) -> &'static str {
    JPEG_NAME
  }

  fn file_format(&mut self) -> Result<FileFormat> {
    self.read_header()?;
    Ok(FileFormat::new(self.format, ImageType::Jpeg, 1))
  }

  fn next_frame_format(&mut self) -> Result<FrameFormat> {
    if !self.alive {
      return Ok(FrameFormat::EMPTY);
    }
    self.read_header()?;
    Ok(self.format)
  }

  fn decode(&mut self, buffer: &mut OutputBuffer<'_>) -> Result<()> {
    if !self.alive {
      return Ok(());
    }
    self.read_header()?;
    self.alive = false;
    let inner = &mut self.inner;
    let data = self.bridge.call("jpeglib error", || inner.decode())?;
    if self.pixel_format == Some(PixelFormat::L16) {
      let samples = data.chunks_exact(2).map(|c| u16::from_be_bytes([c[0], c[1]]));
      deinterleave_u16(samples, &self.format, buffer)
    } else {
      deinterleave_u8(&data, &self.format, buffer)
    }
  }
}
