#![forbid(unsafe_code)]

//! Windows Bitmap (BMP) decoding.
//!
//! All multi-byte values in a BMP are little-endian.
//!
//! * The file starts with a 14 byte file header: the `BM` tag, the file size,
//!   and the offset of the pixel array.
//! * An info header follows. Its first 4 bytes are its own size, and the size
//!   picks the version: core (12), OS/2 (64), info (40), v2 (52), v3 (56), v4
//!   (108), or v5 (124). Later versions only add fields to the end.
//! * With the plain info header, bitfield compression puts the channel masks
//!   right after the header instead of inside it.
//! * Then there's a color table for 8 bpp and below. The core header uses 3
//!   byte entries, everything else uses 4. Entries are stored `[b, g, r, _]`.
//! * Then there might be a gap, and then the pixel array at the offset that
//!   the file header gave.
//!
//! Rows are padded to 4 bytes, and stored bottom row first unless the height
//! is negative. Paletted images can't be top-down.
//!
//! The decoder always outputs planar R, G, B (and A, when the bitfields have
//! an alpha mask). Paletted images come out at 8 bits per channel, bitfield
//! images at the width of each mask.

pub mod header;
pub mod pixels;
pub mod raw_headers;
pub mod rle;

pub use header::*;

use crate::{
  decoder::{Signature, PRIORITY_NORMAL},
  DecoderProvider, FileFormat, FrameFormat, ImageDecoder, ImageType, ImagineError, IoContext,
  OutputBuffer, Recognition, Registry, Result,
};

pub const BMP_NAME: &str = "bmp";

const BMP_SIGNATURE: Signature =
  Signature { image_type: ImageType::Bmp, magic: &[b"BM"], extensions: &["bmp", "dib"] };

/// Provides [BmpDecoder]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct BmpProvider;

impl DecoderProvider for BmpProvider {
  #[inline]
  fn name(&self) -> &'static str {
    BMP_NAME
  }

  #[inline]
  fn priority(&self) -> i32 {
    PRIORITY_NORMAL
  }

  fn create_decoder<'a>(
    &self, path: Option<&str>, format: Option<&FileFormat>, mut io: Box<dyn IoContext + 'a>,
  ) -> Result<Recognition<'a>> {
    if BMP_SIGNATURE.recognize(path, format, io.as_mut())? {
      Ok(Recognition::Decoder(Box::new(BmpDecoder::new(io))))
    } else {
      Ok(Recognition::Declined(io))
    }
  }
}

/// Decodes the single frame of a BMP.
///
/// The headers are read on first use, from wherever the stream was when the
/// decoder was made. After one call to `decode`, whether it worked or not,
/// there are no more frames.
///
/// When the pixel array is a nested JPEG or PNG, the formats reported are the
/// nested file's own.
pub struct BmpDecoder<'a> {
  io: Option<Box<dyn IoContext + 'a>>,
  header: Option<BmpHeader>,
  /// Takes over for JPEG and PNG compression, where the pixel array is a
  /// whole other file.
  nested: Option<Box<dyn ImageDecoder + 'a>>,
  decoded: bool,
}

impl core::fmt::Debug for BmpDecoder<'_> {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.debug_struct("BmpDecoder")
      .field("header", &self.header)
      .field("nested", &self.nested.as_ref().map(|d| d.name()))
      .field("decoded", &self.decoded)
      .finish_non_exhaustive()
  }
}

impl<'a> BmpDecoder<'a> {
  #[inline]
  #[must_use]
  pub fn new(io: Box<dyn IoContext + 'a>) -> Self {
    Self { io: Some(io), header: None, nested: None, decoded: false }
  }

  fn gone() -> ImagineError {
    ImagineError::LogicError(String::from("BMP decoder stream already handed off"))
  }

  fn ensure_header(&mut self) -> Result<&BmpHeader> {
    if self.header.is_none() {
      let io = self.io.as_mut().ok_or_else(Self::gone)?;
      let header = read_bmp_header(io.as_mut())?;
      if header.compression.is_nested() {
        let image_type =
          if header.compression == BmpCompression::Png { ImageType::Png } else { ImageType::Jpeg };
        let mut registry = Registry::with_default_providers()?;
        registry.disable_provider(BMP_NAME);
        let io = self.io.take().ok_or_else(Self::gone)?;
        let nested = registry
          .create_decoder(None, Some(&FileFormat::of_type(image_type)), io)?
          .ok_or_else(|| {
            ImagineError::CannotCreateCodec(String::from(
              "no codec available for nested JPEG/PNG in BMP",
            ))
          })?;
        tracing::debug!(codec = nested.name(), "BMP pixel array is a nested file");
        self.nested = Some(nested);
      }
      self.header = Some(header);
    }
    self.header.as_ref().ok_or_else(Self::gone)
  }
}

impl ImageDecoder for BmpDecoder<'_> {
  #[inline]
  fn name(&self) -> &'static str {
    BMP_NAME
  }

  fn file_format(&mut self) -> Result<FileFormat> {
    let header = self.ensure_header()?.clone();
    match self.nested.as_mut() {
      Some(nested) => nested.file_format(),
      None => Ok(header.file_format()),
    }
  }

  fn next_frame_format(&mut self) -> Result<FrameFormat> {
    if self.decoded {
      return Ok(FrameFormat::EMPTY);
    }
    let frame = self.ensure_header()?.frame_format();
    match self.nested.as_mut() {
      Some(nested) => nested.next_frame_format(),
      None => Ok(frame),
    }
  }

  fn decode(&mut self, buffer: &mut OutputBuffer<'_>) -> Result<()> {
    if self.decoded {
      return Ok(());
    }
    self.ensure_header()?;
    // a failed decode has already eaten part of the stream, so it's final too
    self.decoded = true;
    if let Some(nested) = self.nested.as_mut() {
      return nested.decode(buffer);
    }
    let (Some(header), Some(io)) = (self.header.as_ref(), self.io.as_mut()) else {
      return Err(Self::gone());
    };
    let io = io.as_mut();
    match header.compression {
      BmpCompression::Rle8 | BmpCompression::Rle4 => decode_rle(header, io, buffer),
      _ if header.bits_per_pixel <= 8 => pixels::decode_paletted(header, io, buffer),
      _ => pixels::decode_direct(header, io, buffer),
    }
  }
}

const RLE_READ_CHUNK: usize = 64 * 1024;

fn decode_rle(
  header: &BmpHeader, io: &mut dyn IoContext, out: &mut OutputBuffer<'_>,
) -> Result<()> {
  let width = usize::try_from(header.width)?;
  let height = usize::try_from(header.abs_height())?;
  let mut data = Vec::new();
  if header.image_size != 0 {
    // grown as the data actually arrives, the header's size can't be trusted
    let size = usize::try_from(header.image_size)?;
    while data.len() < size {
      let at = data.len();
      let n = (size - at).min(RLE_READ_CHUNK);
      data.try_reserve(n)?;
      data.resize(at + n, 0);
      io.read_all(&mut data[at..])?;
    }
  } else {
    let mut chunk = [0_u8; 4096];
    loop {
      let n = io.read(&mut chunk)?;
      if n == 0 {
        break;
      }
      data.try_reserve(n)?;
      data.extend_from_slice(&chunk[..n]);
    }
  }
  let cells = width
    .checked_mul(height)
    .ok_or_else(|| ImagineError::cannot_decode("BMP dimensions overflow"))?;
  let mut grid = Vec::new();
  grid.try_reserve_exact(cells)?;
  grid.resize(cells, 0);
  rle::paint_rle(&data, header.bits_per_pixel, width, height, &mut grid);
  if width == 0 {
    return Ok(());
  }
  for (row, indexes) in (0_u32..).zip(grid.chunks_exact(width)) {
    pixels::write_palette_row(&header.palette, indexes, out, row)?;
  }
  Ok(())
}
