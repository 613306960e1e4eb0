use std::io::BufReader;

use ::png::{BitDepth, Transformations};

use super::{deinterleave_u16, deinterleave_u8, family_for_channels, frame_bytes};
use crate::{
  bridge::Bridge,
  decoder::{Signature, PRIORITY_HIGH},
  io::IoReader,
  DecoderProvider, FileFormat, FrameFormat, ImageDecoder, ImageType, ImagineError, IoContext,
  OutputBuffer, Recognition, Result,
};

pub const PNG_NAME: &str = "png";

const PNG_SIGNATURE: Signature = Signature {
  image_type: ImageType::Png,
  magic: &[&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]],
  extensions: &["png"],
};

/// Provides [PngDecoder]s, backed by the `png` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct PngProvider;

impl DecoderProvider for PngProvider {
  #[inline]
  fn name(&self) -> &'static str {
    PNG_NAME
  }

  #[inline]
  fn priority(&self) -> i32 {
    PRIORITY_HIGH
  }

  fn create_decoder<'a>(
    &self, path: Option<&str>, format: Option<&FileFormat>, mut io: Box<dyn IoContext + 'a>,
  ) -> Result<Recognition<'a>> {
    if PNG_SIGNATURE.recognize(path, format, io.as_mut())? {
      Ok(Recognition::Decoder(Box::new(PngDecoder::new(io))))
    } else {
      Ok(Recognition::Declined(io))
    }
  }
}

type PngReader<'a> = ::png::Reader<BufReader<IoReader<'a>>>;

/// Decodes the single frame of a PNG.
///
/// Palettes and low bit gray are expanded to 8 bits, and transparency chunks
/// become an alpha plane. 16 bit images stay 16 bit.
pub struct PngDecoder<'a> {
  bridge: Bridge,
  io: Option<Box<dyn IoContext + 'a>>,
  reader: Option<PngReader<'a>>,
  format: FrameFormat,
  alive: bool,
}

impl core::fmt::Debug for PngDecoder<'_> {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.debug_struct("PngDecoder")
      .field("format", &self.format)
      .field("alive", &self.alive)
      .finish_non_exhaustive()
  }
}

impl<'a> PngDecoder<'a> {
  #[inline]
  #[must_use]
  pub fn new(io: Box<dyn IoContext + 'a>) -> Self {
    Self { bridge: Bridge::new(), io: Some(io), reader: None, format: FrameFormat::EMPTY, alive: true }
  }

  fn read_header(&mut self) -> Result<()> {
    if !self.alive || self.reader.is_some() {
      return Ok(());
    }
    let io = self
      .io
      .take()
      .ok_or_else(|| ImagineError::LogicError(String::from("PNG stream already consumed")))?;
    let source = BufReader::new(IoReader::new(io).with_sink(self.bridge.sink()));
    let reader = self.bridge.call("pnglib error", move || {
      let mut decoder = ::png::Decoder::new(source);
      decoder.set_transformations(Transformations::EXPAND);
      decoder.read_info()
    })?;
    let (color, depth) = reader.output_color_type();
    let info = reader.info();
    let bit_depth = if depth == BitDepth::Sixteen { 16 } else { 8 };
    let channels = color.samples() as u32;
    self.format =
      FrameFormat::uniform(family_for_channels(channels), info.width, info.height, bit_depth);
    tracing::trace!(width = info.width, height = info.height, ?color, ?depth, "PNG header");
    self.reader = Some(reader);
    Ok(())
  }
}

impl ImageDecoder for PngDecoder<'_> {
  #[inline]
  fn name(&self) -> &'static str {
    PNG_NAME
  }

  fn file_format(&mut self) -> Result<FileFormat> {
    self.read_header()?;
    Ok(FileFormat::new(self.format, ImageType::Png, 1))
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
    let Some(mut reader) = self.reader.take() else {
      return Err(ImagineError::LogicError(String::from("PNG stream already consumed")));
    };
    self.alive = false;
    let mut data = frame_bytes(&self.format)?;
    self.bridge.call("pnglib error", || reader.next_frame(&mut data))?;
    if self.format.planes[0].bit_depth == 16 {
      let samples = data.chunks_exact(2).map(|c| u16::from_be_bytes([c[0], c[1]]));
      deinterleave_u16(samples, &self.format, buffer)
    } else {
      deinterleave_u8(&data, &self.format, buffer)
    }
  }
}
