//! Reading and checking the headers, up to the start of the pixel array.

use bytemuck::pod_read_unaligned;

use super::raw_headers::*;
use crate::{
  io::{read_array, skip_to},
  ColorFamily, FileFormat, FrameFormat, ImageType, ImagineError, IoContext, Result,
};

/// Which info header the file used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BmpVersion {
  Core,
  Os2,
  Info,
  V2,
  V3,
  V4,
  V5,
}
impl BmpVersion {
  #[inline]
  #[must_use]
  pub const fn from_header_size(size: u32) -> Option<Self> {
    Some(match size {
      CORE_HEADER_SIZE => Self::Core,
      OS2_HEADER_SIZE => Self::Os2,
      INFO_HEADER_SIZE => Self::Info,
      V2_HEADER_SIZE => Self::V2,
      V3_HEADER_SIZE => Self::V3,
      V4_HEADER_SIZE => Self::V4,
      V5_HEADER_SIZE => Self::V5,
      _ => return None,
    })
  }

  /// If the header has an alpha mask field.
  #[inline]
  #[must_use]
  pub const fn has_alpha_mask(self) -> bool {
    matches!(self, Self::V3 | Self::V4 | Self::V5)
  }
}

/// How the pixel array is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BmpCompression {
  Rgb,
  Rle8,
  Rle4,
  Bitfields,
  /// The pixel array is an entire JPEG file.
  Jpeg,
  /// The pixel array is an entire PNG file.
  Png,
  AlphaBitfields,
}
impl TryFrom<u32> for BmpCompression {
  type Error = ImagineError;
  #[inline]
  fn try_from(value: u32) -> Result<Self> {
    Ok(match value {
      BI_RGB => Self::Rgb,
      BI_RLE8 => Self::Rle8,
      BI_RLE4 => Self::Rle4,
      BI_BITFIELDS => Self::Bitfields,
      BI_JPEG => Self::Jpeg,
      BI_PNG => Self::Png,
      BI_ALPHABITFIELDS => Self::AlphaBitfields,
      _ => return Err(ImagineError::cannot_decode("BMP compression not supported")),
    })
  }
}
impl BmpCompression {
  #[inline]
  #[must_use]
  pub const fn is_bitfields(self) -> bool {
    matches!(self, Self::Bitfields | Self::AlphaBitfields)
  }

  #[inline]
  #[must_use]
  pub const fn is_nested(self) -> bool {
    matches!(self, Self::Jpeg | Self::Png)
  }
}

/// Where one channel sits within a pixel value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ChannelSpec {
  pub shift: u32,
  pub bits: u32,
}
impl ChannelSpec {
  /// The span of the mask, from its lowest set bit to its highest.
  #[inline]
  #[must_use]
  pub const fn from_mask(mask: u32) -> Self {
    if mask == 0 {
      return Self { shift: 0, bits: 0 };
    }
    let shift = mask.trailing_zeros();
    Self { shift, bits: 32 - mask.leading_zeros() - shift }
  }

  #[inline]
  #[must_use]
  pub const fn extract(self, pixel: u32) -> u32 {
    let mask = match self.bits {
      0 => 0,
      32.. => u32::MAX,
      b => (1 << b) - 1,
    };
    let shifted = if self.shift >= 32 { 0 } else { pixel >> self.shift };
    shifted & mask
  }
}

/// The parts of the headers that decoding needs, normalized across versions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BmpHeader {
  pub version: BmpVersion,
  pub data_offset: u32,
  pub width: u32,
  /// Positive: rows are stored bottom-up. Negative: top-down.
  pub height: i32,
  pub bits_per_pixel: u16,
  pub compression: BmpCompression,
  /// Byte size of the pixel array, if the file says.
  pub image_size: u32,
  /// `[r, g, b]` for each entry.
  pub palette: Vec<[u8; 3]>,
  /// R, G, B, A. Only meaningful for 16, 24, and 32 bpp.
  pub channels: [ChannelSpec; 4],
}

impl BmpHeader {
  #[inline]
  #[must_use]
  pub const fn is_bottom_up(&self) -> bool {
    self.height >= 0
  }

  #[inline]
  #[must_use]
  pub const fn abs_height(&self) -> u32 {
    self.height.unsigned_abs()
  }

  #[inline]
  #[must_use]
  pub const fn has_alpha(&self) -> bool {
    self.channels[3].bits != 0
  }

  /// Bytes per stored row, padded to 4.
  pub fn row_size(&self) -> Result<usize> {
    padded_row_size(self.width, self.bits_per_pixel)
  }

  #[must_use]
  pub fn frame_format(&self) -> FrameFormat {
    let family = if self.has_alpha() { ColorFamily::Rgba } else { ColorFamily::Rgb };
    let mut format = FrameFormat::uniform(family, self.width, self.abs_height(), 8);
    if self.bits_per_pixel > 8 {
      for (plane, spec) in format.active_planes_mut().iter_mut().zip(self.channels) {
        plane.bit_depth = spec.bits;
      }
    }
    format
  }

  #[inline]
  #[must_use]
  pub fn file_format(&self) -> FileFormat {
    FileFormat::new(self.frame_format(), ImageType::Bmp, 1)
  }
}

pub(crate) fn padded_row_size(width: u32, bits_per_pixel: u16) -> Result<usize> {
  let too_big = || ImagineError::cannot_decode("BMP row size overflow");
  let width: usize = width.try_into()?;
  let bits_per_line = width.checked_mul(usize::from(bits_per_pixel)).ok_or_else(too_big)?;
  let bytes_per_line = bits_per_line.div_ceil(8);
  bytes_per_line.checked_next_multiple_of(4).ok_or_else(too_big)
}

/// Reads from the file header through the palette, then moves to the pixel
/// array.
///
/// The stream must be at the start of the file header.
pub fn read_bmp_header(io: &mut dyn IoContext) -> Result<BmpHeader> {
  let file_header: BitmapFileHeader = pod_read_unaligned(&read_array::<FILE_HEADER_SIZE>(io)?);
  if &file_header.ty != b"BM" {
    return Err(ImagineError::cannot_decode("not a BMP file"));
  }
  let size_bytes = read_array::<4>(io)?;
  let header_size = u32::from_le_bytes(size_bytes);
  let mut version = BmpVersion::from_header_size(header_size)
    .ok_or_else(|| ImagineError::cannot_decode("unrecognized biSize value"))?;

  let mut raw = [0_u8; V5_HEADER_SIZE as usize];
  raw[..4].copy_from_slice(&size_bytes);
  let info: BitmapV5Header = match version {
    BmpVersion::Core => {
      io.read_all(&mut raw[4..CORE_HEADER_SIZE as usize])?;
      BitmapV5Header::from(pod_read_unaligned::<BitmapCoreHeader>(
        &raw[..CORE_HEADER_SIZE as usize],
      ))
    }
    BmpVersion::Os2 => {
      // the first 40 bytes line up with the info header, the rest is
      // informational only.
      io.read_all(&mut raw[4..INFO_HEADER_SIZE as usize])?;
      let mut rest = [0_u8; (OS2_HEADER_SIZE - INFO_HEADER_SIZE) as usize];
      io.read_all(&mut rest)?;
      let info: BitmapV5Header = pod_read_unaligned(&raw);
      if matches!(info.compression.get(), BI_BITFIELDS | BI_JPEG) {
        return Err(ImagineError::unsupported("OS/2 Huffman and RLE24 compression not supported"));
      }
      info
    }
    _ => {
      io.read_all(&mut raw[4..header_size as usize])?;
      pod_read_unaligned(&raw)
    }
  };
  tracing::trace!(
    ?version,
    width = info.width.get(),
    height = info.height.get(),
    bpp = info.bits_per_pixel.get(),
    compression = info.compression.get(),
    offset = file_header.bitmap_offset.get(),
    "BMP header"
  );

  let bits_per_pixel = info.bits_per_pixel.get();
  if !matches!(bits_per_pixel, 1 | 4 | 8 | 16 | 24 | 32) {
    return Err(ImagineError::cannot_decode("unknown biBitCount"));
  }
  let compression = BmpCompression::try_from(info.compression.get())?;
  match compression {
    BmpCompression::Rle8 if bits_per_pixel != 8 => {
      return Err(ImagineError::cannot_decode("BI_RLE8 requires 8-bit bitmap"))
    }
    BmpCompression::Rle4 if bits_per_pixel != 4 => {
      return Err(ImagineError::cannot_decode("BI_RLE4 requires 4-bit bitmap"))
    }
    c if c.is_bitfields() && !matches!(bits_per_pixel, 16 | 32) => {
      return Err(ImagineError::cannot_decode("BI_BITFIELDS requires 16 or 32-bit bitmap"))
    }
    _ => (),
  }
  let width = u32::try_from(info.width.get())
    .map_err(|_| ImagineError::cannot_decode("negative width"))?;
  let height = info.height.get();
  if bits_per_pixel <= 8 && height < 0 {
    return Err(ImagineError::cannot_decode("paletted top-down DIB not allowed"));
  }

  // The plain info header keeps its masks where the palette would go.
  let mut masks =
    [info.r_mask.get(), info.g_mask.get(), info.b_mask.get(), info.a_mask.get()];
  if version == BmpVersion::Info && compression.is_bitfields() {
    if compression == BmpCompression::AlphaBitfields {
      let m = read_array::<16>(io)?;
      for (dst, src) in masks.iter_mut().zip(m.chunks_exact(4)) {
        *dst = u32::from_le_bytes([src[0], src[1], src[2], src[3]]);
      }
      version = BmpVersion::V3;
    } else {
      let m = read_array::<12>(io)?;
      for (dst, src) in masks.iter_mut().zip(m.chunks_exact(4)) {
        *dst = u32::from_le_bytes([src[0], src[1], src[2], src[3]]);
      }
      version = BmpVersion::V2;
    }
  }

  let palette = if bits_per_pixel <= 8 {
    read_palette(io, bits_per_pixel, info.colors_used.get(), version == BmpVersion::Core)?
  } else {
    Vec::new()
  };

  let channels = match (bits_per_pixel, compression.is_bitfields()) {
    (_, true) => bitfield_channels(bits_per_pixel, masks, version, compression)?,
    (16, false) => [
      ChannelSpec { shift: 10, bits: 5 },
      ChannelSpec { shift: 5, bits: 5 },
      ChannelSpec { shift: 0, bits: 5 },
      ChannelSpec::default(),
    ],
    (24 | 32, false) => [
      ChannelSpec { shift: 16, bits: 8 },
      ChannelSpec { shift: 8, bits: 8 },
      ChannelSpec { shift: 0, bits: 8 },
      ChannelSpec::default(),
    ],
    _ => [ChannelSpec::default(); 4],
  };

  let data_offset = file_header.bitmap_offset.get();
  if !io.seekable() && io.tell() > i64::from(data_offset) {
    return Err(ImagineError::cannot_decode("incorrect bfOffBits"));
  }
  skip_to(io, i64::from(data_offset))?;

  Ok(BmpHeader {
    version,
    data_offset,
    width,
    height,
    bits_per_pixel,
    compression,
    image_size: info.image_size.get(),
    palette,
    channels,
  })
}

fn read_palette(
  io: &mut dyn IoContext, bits_per_pixel: u16, colors_used: u32, core: bool,
) -> Result<Vec<[u8; 3]>> {
  let max = 1_usize << bits_per_pixel;
  let count = match usize::try_from(colors_used) {
    Ok(0) => max,
    Ok(n) if n <= max => n,
    _ => {
      tracing::warn!(colors_used, max, "palette size clamped");
      max
    }
  };
  let entry_size = if core { 3 } else { 4 };
  let mut raw = [0_u8; 256 * 4];
  let raw = &mut raw[..count * entry_size];
  io.read_all(raw)?;
  let mut palette = Vec::new();
  palette.try_reserve_exact(count)?;
  palette.extend(raw.chunks_exact(entry_size).map(|bgr| [bgr[2], bgr[1], bgr[0]]));
  Ok(palette)
}

fn bitfield_channels(
  bits_per_pixel: u16, masks: [u32; 4], version: BmpVersion, compression: BmpCompression,
) -> Result<[ChannelSpec; 4]> {
  let alpha_allowed = version.has_alpha_mask() || compression == BmpCompression::AlphaBitfields;
  let masks = if alpha_allowed { masks } else { [masks[0], masks[1], masks[2], 0] };
  if bits_per_pixel == 16 && masks.iter().any(|m| m & 0xFFFF_0000 != 0) {
    return Err(ImagineError::cannot_decode("high WORD set in 16-bit BI_BITFIELDS"));
  }
  let specs = masks.map(ChannelSpec::from_mask);
  if specs[..3].iter().any(|s| s.bits == 0) {
    return Err(ImagineError::cannot_decode("RGB channels required in BI_BITFIELDS"));
  }
  if specs.iter().any(|s| s.bits > 16) {
    return Err(ImagineError::unsupported("BI_BITFIELDS channel wider than 16 bits"));
  }
  Ok(specs)
}
