//! Providers for formats that other crates decode, plus the raw YUV test
//! format.
//!
//! Every call into a codec crate goes through a [Bridge](crate::bridge::Bridge),
//! so a failure in our own stream surfaces as our own error and a panic in the
//! codec becomes `CannotDecodeImage`.

#[cfg(feature = "jpeg")]
mod jpeg;
#[cfg(feature = "png")]
mod png;
#[cfg(feature = "tiff")]
mod tiff;
mod yuv;

#[cfg(feature = "jpeg")]
pub use self::jpeg::*;
#[cfg(feature = "png")]
pub use self::png::*;
#[cfg(feature = "tiff")]
pub use self::tiff::*;
pub use self::yuv::*;

#[cfg(any(feature = "png", feature = "jpeg", feature = "tiff"))]
use crate::{FrameFormat, OutputBuffer, Result};

/// Splits interleaved 8 bit samples into planes, one row at a time.
#[cfg(any(feature = "png", feature = "jpeg", feature = "tiff"))]
pub(crate) fn deinterleave_u8(
  data: &[u8], format: &FrameFormat, out: &mut OutputBuffer<'_>,
) -> Result<()> {
  let planes = format.plane_count as usize;
  let width = format.planes[0].width as usize;
  if planes == 0 || width == 0 {
    return Ok(());
  }
  let rows = data.chunks_exact(width * planes).take(format.planes[0].height as usize);
  for (row, line) in (0_u32..).zip(rows) {
    for p in 0..planes {
      let dst = out.row_mut(p, row, width)?;
      for (d, px) in dst.iter_mut().zip(line.chunks_exact(planes)) {
        *d = px[p];
      }
    }
  }
  Ok(())
}

/// Splits interleaved 16 bit samples into planes of native endian `u16`.
#[cfg(any(feature = "png", feature = "jpeg", feature = "tiff"))]
pub(crate) fn deinterleave_u16(
  samples: impl Iterator<Item = u16>, format: &FrameFormat, out: &mut OutputBuffer<'_>,
) -> Result<()> {
  let planes = format.plane_count as usize;
  let width = format.planes[0].width as usize;
  if planes == 0 || width == 0 {
    return Ok(());
  }
  let mut line = Vec::new();
  line.try_reserve_exact(width * planes)?;
  let mut samples = samples;
  for row in 0..format.planes[0].height {
    line.clear();
    line.extend(samples.by_ref().take(width * planes));
    if line.len() < width * planes {
      break;
    }
    for p in 0..planes {
      let dst = out.row_mut(p, row, width * 2)?;
      crate::buffer::put_u16_samples(dst, line.iter().skip(p).step_by(planes).copied());
    }
  }
  Ok(())
}

/// The family for a sample count where the samples are plain color
/// channels.
#[cfg(any(feature = "png", feature = "tiff"))]
pub(crate) const fn family_for_channels(channels: u32) -> crate::ColorFamily {
  use crate::ColorFamily;
  match channels {
    1 => ColorFamily::Gray,
    2 => ColorFamily::GrayAlpha,
    3 => ColorFamily::Rgb,
    4 => ColorFamily::Rgba,
    _ => ColorFamily::Unknown,
  }
}

/// Interleaved bytes for a whole frame, zero filled.
#[cfg(any(feature = "png", feature = "jpeg", feature = "tiff"))]
pub(crate) fn frame_bytes(format: &FrameFormat) -> Result<Vec<u8>> {
  let plane = format.planes[0];
  let len = plane
    .row_size()
    .checked_mul(plane.height as usize)
    .and_then(|n| n.checked_mul(format.plane_count as usize))
    .ok_or_else(|| crate::ImagineError::OutOfMemory(String::from("frame size overflow")))?;
  let mut v = Vec::new();
  v.try_reserve_exact(len)?;
  v.resize(len, 0);
  Ok(v)
}
