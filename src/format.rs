//! Value types that describe an image's layout.

use core::ops::{Deref, DerefMut};

/// The most planes that a frame can have.
pub const MAX_PLANE_COUNT: usize = 4;

/// One channel's grid of samples.
///
/// `bit_depth` is how many low bits of each sample are valid. Samples are
/// stored in the narrowest native type that holds that many bits (see
/// [bytes_per_sample](Self::bytes_per_sample)), never packed below a byte.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PlaneFormat {
  pub width: u32,
  pub height: u32,
  pub bit_depth: u32,
  pub floating_point: bool,
}
impl PlaneFormat {
  #[inline]
  #[must_use]
  pub const fn new(width: u32, height: u32, bit_depth: u32) -> Self {
    Self { width, height, bit_depth, floating_point: false }
  }

  /// Bytes per stored sample: 1 up to 8 bits, 2 up to 16, 4 up to 32.
  ///
  /// A depth of 0 or above 32 gives 0.
  #[inline]
  #[must_use]
  pub const fn bytes_per_sample(&self) -> usize {
    match self.bit_depth {
      1..=8 => 1,
      9..=16 => 2,
      17..=32 => 4,
      _ => 0,
    }
  }

  /// Bytes for one row of this plane, without any padding.
  #[inline]
  #[must_use]
  pub const fn row_size(&self) -> usize {
    self.width as usize * self.bytes_per_sample()
  }
}

/// What the planes of a frame mean.
///
/// Each family fixes the order of its planes, and decoders must fill the planes
/// in that order:
///
/// * `Gray`: Y
/// * `GrayAlpha`: Y, A
/// * `Yuv`: Y, U, V
/// * `Yuva`: Y, U, V, A
/// * `Rgb`: R, G, B
/// * `Rgba`: R, G, B, A
/// * `Ycck`: Y, Cb, Cr, K
/// * `Cmyk`: C, M, Y, K
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(i32)]
pub enum ColorFamily {
  #[default]
  Unknown = 0,
  Gray = 1,
  Yuv = 2,
  Rgb = 3,
  GrayAlpha = 4,
  Yuva = 5,
  Rgba = 6,
  Ycck = 7,
  Cmyk = 8,
}
impl ColorFamily {
  /// The number of planes this family always has (0 for `Unknown`).
  #[inline]
  #[must_use]
  pub const fn plane_count(self) -> u32 {
    match self {
      Self::Unknown => 0,
      Self::Gray => 1,
      Self::GrayAlpha => 2,
      Self::Yuv | Self::Rgb => 3,
      Self::Yuva | Self::Rgba | Self::Ycck | Self::Cmyk => 4,
    }
  }

  #[inline]
  #[must_use]
  pub const fn from_i32(i: i32) -> Option<Self> {
    Some(match i {
      0 => Self::Unknown,
      1 => Self::Gray,
      2 => Self::Yuv,
      3 => Self::Rgb,
      4 => Self::GrayAlpha,
      5 => Self::Yuva,
      6 => Self::Rgba,
      7 => Self::Ycck,
      8 => Self::Cmyk,
      _ => return None,
    })
  }
}

/// The container format of a file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(i32)]
pub enum ImageType {
  #[default]
  Unknown = 0,
  Bmp = 1,
  Dpx = 2,
  Exr = 3,
  Jpeg = 4,
  Jpeg2000 = 5,
  Png = 6,
  Tiff = 7,
  /// Raw planar frames. There's no header, the caller must supply the format.
  YuvTest = 8,
}
impl ImageType {
  #[inline]
  #[must_use]
  pub const fn from_i32(i: i32) -> Option<Self> {
    Some(match i {
      0 => Self::Unknown,
      1 => Self::Bmp,
      2 => Self::Dpx,
      3 => Self::Exr,
      4 => Self::Jpeg,
      5 => Self::Jpeg2000,
      6 => Self::Png,
      7 => Self::Tiff,
      8 => Self::YuvTest,
      _ => return None,
    })
  }
}

/// The layout of one decodable frame.
///
/// A frame with `plane_count != 0` is "constant": its geometry is fully known
/// and a buffer can be allocated for it. The all zero [EMPTY](Self::EMPTY)
/// value means there are no more frames.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct FrameFormat {
  pub planes: [PlaneFormat; MAX_PLANE_COUNT],
  pub plane_count: u32,
  pub color_family: ColorFamily,
}
impl FrameFormat {
  pub const EMPTY: Self = Self {
    planes: [PlaneFormat { width: 0, height: 0, bit_depth: 0, floating_point: false };
      MAX_PLANE_COUNT],
    plane_count: 0,
    color_family: ColorFamily::Unknown,
  };

  /// A frame where every plane has the same size and depth.
  #[must_use]
  pub fn uniform(color_family: ColorFamily, width: u32, height: u32, bit_depth: u32) -> Self {
    let mut out = Self::EMPTY;
    out.color_family = color_family;
    out.plane_count = color_family.plane_count();
    for p in out.active_planes_mut() {
      *p = PlaneFormat::new(width, height, bit_depth);
    }
    out
  }

  #[inline]
  #[must_use]
  pub const fn is_constant(&self) -> bool {
    self.plane_count != 0
  }

  /// The planes in use, clamped to [MAX_PLANE_COUNT].
  #[inline]
  #[must_use]
  pub fn active_planes(&self) -> &[PlaneFormat] {
    let n = (self.plane_count as usize).min(MAX_PLANE_COUNT);
    &self.planes[..n]
  }

  #[inline]
  #[must_use]
  pub fn active_planes_mut(&mut self) -> &mut [PlaneFormat] {
    let n = (self.plane_count as usize).min(MAX_PLANE_COUNT);
    &mut self.planes[..n]
  }

  /// Total bytes of all active planes, each row tightly packed.
  ///
  /// Saturates instead of overflowing.
  #[must_use]
  pub fn frame_size(&self) -> usize {
    self
      .active_planes()
      .iter()
      .map(|p| p.row_size().saturating_mul(p.height as usize))
      .fold(0, usize::saturating_add)
  }
}

/// The layout of a whole file: the first frame, plus file level info.
///
/// `frame_count == 0` means the count isn't known ahead of time. Derefs to the
/// [FrameFormat] of the first frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct FileFormat {
  pub frame: FrameFormat,
  pub image_type: ImageType,
  pub frame_count: u32,
}
impl FileFormat {
  #[inline]
  #[must_use]
  pub const fn new(frame: FrameFormat, image_type: ImageType, frame_count: u32) -> Self {
    Self { frame, image_type, frame_count }
  }

  /// An otherwise empty format that only names the image type.
  ///
  /// This is what you pass to the registry to skip sniffing.
  #[inline]
  #[must_use]
  pub const fn of_type(image_type: ImageType) -> Self {
    Self { frame: FrameFormat::EMPTY, image_type, frame_count: 0 }
  }

  #[inline]
  pub fn clear(&mut self) {
    *self = Self::default();
  }
}
impl Deref for FileFormat {
  type Target = FrameFormat;
  #[inline]
  fn deref(&self) -> &FrameFormat {
    &self.frame
  }
}
impl DerefMut for FileFormat {
  #[inline]
  fn deref_mut(&mut self) -> &mut FrameFormat {
    &mut self.frame
  }
}
