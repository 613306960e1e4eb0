//! On-disk header layouts.
//!
//! Every info header version after "core" is a strict prefix of the V5 header,
//! so all of them can be read into a zeroed [BitmapV5Header] and the fields the
//! file didn't have just stay zero.

use pack1::*;

pub const BI_RGB: u32 = 0;
pub const BI_RLE8: u32 = 1;
pub const BI_RLE4: u32 = 2;
pub const BI_BITFIELDS: u32 = 3;
pub const BI_JPEG: u32 = 4;
pub const BI_PNG: u32 = 5;
pub const BI_ALPHABITFIELDS: u32 = 6;

pub const LCS_GM_IMAGES: u32 = 0x0000_0004;
#[allow(non_upper_case_globals)]
pub const LCS_sRGB: u32 = 0x7352_4742;

pub const FILE_HEADER_SIZE: usize = 14;
pub const CORE_HEADER_SIZE: u32 = 12;
pub const OS2_HEADER_SIZE: u32 = 64;
pub const INFO_HEADER_SIZE: u32 = 40;
pub const V2_HEADER_SIZE: u32 = 52;
pub const V3_HEADER_SIZE: u32 = 56;
pub const V4_HEADER_SIZE: u32 = 108;
pub const V5_HEADER_SIZE: u32 = 124;

#[derive(Debug, Clone, Copy, bytemuck::Zeroable, bytemuck::Pod)]
#[repr(C)]
pub(crate) struct BitmapFileHeader {
  /// `BM` for every file we can read.
  pub ty: [u8; 2],
  pub file_size: U32LE,
  pub reserved1: U16LE,
  pub reserved2: U16LE,
  /// Where the pixel array starts, from the start of the file.
  pub bitmap_offset: U32LE,
}

#[derive(Debug, Clone, Copy, bytemuck::Zeroable, bytemuck::Pod)]
#[repr(C)]
pub(crate) struct BitmapCoreHeader {
  pub size: U32LE,
  pub width: U16LE,
  pub height: U16LE,
  pub planes: U16LE,
  pub bits_per_pixel: U16LE,
}

/// The biggest header. Older versions fill in a prefix of it.
#[derive(Debug, Clone, Copy, bytemuck::Zeroable, bytemuck::Pod)]
#[repr(C)]
pub(crate) struct BitmapV5Header {
  pub size: U32LE,
  pub width: I32LE,
  /// Positive for bottom-up rows, negative for top-down.
  pub height: I32LE,
  pub planes: U16LE,
  pub bits_per_pixel: U16LE,
  // since the info header
  pub compression: U32LE,
  /// Byte size of the pixel data. Can be 0 for `BI_RGB`.
  pub image_size: U32LE,
  pub pixels_per_meter_x: I32LE,
  pub pixels_per_meter_y: I32LE,
  /// Palette entries in use, 0 means "all of them".
  pub colors_used: U32LE,
  pub important_colors: U32LE,
  // since v2
  pub r_mask: U32LE,
  pub g_mask: U32LE,
  pub b_mask: U32LE,
  // since v3
  pub a_mask: U32LE,
  // since v4
  pub colorspace_type: U32LE,
  pub endpoints: [[U32LE; 3]; 3],
  pub r_gamma: U32LE,
  pub g_gamma: U32LE,
  pub b_gamma: U32LE,
  // since v5
  pub render_intent: U32LE,
  pub color_profile_offset: U32LE,
  pub color_profile_size: U32LE,
  pub reserved: U32LE,
}

impl From<BitmapCoreHeader> for BitmapV5Header {
  fn from(
    BitmapCoreHeader { size: _, width, height, planes, bits_per_pixel }: BitmapCoreHeader,
  ) -> Self {
    let mut v5: Self = bytemuck::Zeroable::zeroed();
    v5.size = INFO_HEADER_SIZE.into();
    v5.width = i32::from(width.get()).into();
    v5.height = i32::from(height.get()).into();
    v5.planes = planes;
    v5.bits_per_pixel = bits_per_pixel;
    v5.compression = BI_RGB.into();
    v5.colorspace_type = LCS_sRGB.into();
    v5.render_intent = LCS_GM_IMAGES.into();
    v5
  }
}
