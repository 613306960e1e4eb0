//! Caller owned planar buffers that decoders write into.

use crate::{FrameFormat, ImagineError, Result, MAX_PLANE_COUNT};

/// A mutable span plus a signed row stride in bytes.
///
/// With a positive stride, row `r` starts at `r * stride`. With a negative
/// stride the rows run backwards through memory: row 0 is the *last*
/// `|stride|` bytes of the span, row 1 the chunk before that, and so on.
#[derive(Debug, Default)]
pub struct PlaneSlot<'a> {
  pub data: &'a mut [u8],
  pub stride: isize,
}

/// Up to [MAX_PLANE_COUNT] plane spans, one per plane of the frame.
///
/// Unused slots are left empty (zero length and zero stride).
#[derive(Debug, Default)]
pub struct OutputBuffer<'a> {
  planes: [PlaneSlot<'a>; MAX_PLANE_COUNT],
}

impl<'a> OutputBuffer<'a> {
  #[inline]
  #[must_use]
  pub fn new() -> Self {
    Self::default()
  }

  /// Assigns the span for plane `p`.
  pub fn set_plane(&mut self, p: usize, data: &'a mut [u8], stride: isize) -> Result<()> {
    let slot = self
      .planes
      .get_mut(p)
      .ok_or_else(|| ImagineError::illegal_argument("plane index out of range"))?;
    *slot = PlaneSlot { data, stride };
    Ok(())
  }

  /// Builder form of [set_plane](Self::set_plane).
  #[inline]
  pub fn with_plane(mut self, p: usize, data: &'a mut [u8], stride: isize) -> Result<Self> {
    self.set_plane(p, data, stride)?;
    Ok(self)
  }

  #[inline]
  #[must_use]
  pub fn stride(&self, p: usize) -> isize {
    self.planes.get(p).map_or(0, |s| s.stride)
  }

  /// Gets `len` bytes of row `row` in plane `p`.
  ///
  /// ## Failure
  /// * `IllegalArgument` if the stride is smaller than `len` or the span is too
  ///   short to hold the row.
  pub fn row_mut(&mut self, p: usize, row: u32, len: usize) -> Result<&mut [u8]> {
    let slot = self
      .planes
      .get_mut(p)
      .ok_or_else(|| ImagineError::illegal_argument("plane index out of range"))?;
    let range = row_range(slot.data.len(), slot.stride, row, len)?;
    Ok(&mut slot.data[range])
  }

  /// Views the buffer as read only, for inspecting the decoded samples.
  #[must_use]
  pub fn as_input(&self) -> InputBuffer<'_> {
    let mut out = InputBuffer::default();
    for (dst, src) in out.planes.iter_mut().zip(self.planes.iter()) {
      *dst = (&*src.data, src.stride);
    }
    out
  }
}

/// The read only counterpart of [OutputBuffer].
#[derive(Debug, Default, Clone, Copy)]
pub struct InputBuffer<'a> {
  planes: [(&'a [u8], isize); MAX_PLANE_COUNT],
}

impl<'a> InputBuffer<'a> {
  pub fn set_plane(&mut self, p: usize, data: &'a [u8], stride: isize) -> Result<()> {
    let slot = self
      .planes
      .get_mut(p)
      .ok_or_else(|| ImagineError::illegal_argument("plane index out of range"))?;
    *slot = (data, stride);
    Ok(())
  }

  #[inline]
  #[must_use]
  pub fn stride(&self, p: usize) -> isize {
    self.planes.get(p).map_or(0, |s| s.1)
  }

  pub fn row(&self, p: usize, row: u32, len: usize) -> Result<&'a [u8]> {
    let (data, stride) = *self
      .planes
      .get(p)
      .ok_or_else(|| ImagineError::illegal_argument("plane index out of range"))?;
    let range = row_range(data.len(), stride, row, len)?;
    Ok(&data[range])
  }
}

fn row_range(
  span_len: usize, stride: isize, row: u32, len: usize,
) -> Result<core::ops::Range<usize>> {
  let bad = || ImagineError::illegal_argument("output buffer too small for image");
  let abs_stride = stride.unsigned_abs();
  if abs_stride < len {
    return Err(ImagineError::illegal_argument("row stride smaller than row size"));
  }
  let row = usize::try_from(row)?;
  let step = row.checked_mul(abs_stride).ok_or_else(bad)?;
  let start = if stride >= 0 {
    step
  } else {
    span_len.checked_sub(abs_stride).and_then(|top| top.checked_sub(step)).ok_or_else(bad)?
  };
  let end = start.checked_add(len).ok_or_else(bad)?;
  if end > span_len {
    return Err(bad());
  }
  Ok(start..end)
}

/// Stores one `u16` sample per 2 bytes of `row`, native endian.
#[inline]
pub(crate) fn put_u16_samples(row: &mut [u8], samples: impl IntoIterator<Item = u16>) {
  for (dst, s) in row.chunks_exact_mut(2).zip(samples) {
    dst.copy_from_slice(&s.to_ne_bytes());
  }
}

/// Heap planes sized for a frame, rows tightly packed.
///
/// This is the simple way to get an [OutputBuffer]: allocate for the format
/// that the decoder reported, then decode into [as_output](Self::as_output).
#[derive(Debug, Clone, Default)]
pub struct PlaneBuffers {
  planes: Vec<(Vec<u8>, usize)>,
}

impl PlaneBuffers {
  /// ## Failure
  /// * `OutOfMemory` if the allocation fails.
  /// * `TooManyImagePlanes` if the format claims more than [MAX_PLANE_COUNT].
  pub fn allocate(format: &FrameFormat) -> Result<Self> {
    if format.plane_count as usize > MAX_PLANE_COUNT {
      return Err(ImagineError::TooManyImagePlanes(String::from("too many planes")));
    }
    let mut planes = Vec::new();
    planes.try_reserve(format.active_planes().len())?;
    for p in format.active_planes() {
      let stride = p.row_size();
      let size = stride
        .checked_mul(p.height as usize)
        .ok_or_else(|| ImagineError::OutOfMemory(String::from("plane size overflow")))?;
      let mut v = Vec::new();
      v.try_reserve_exact(size)?;
      v.resize(size, 0);
      planes.push((v, stride));
    }
    Ok(Self { planes })
  }

  #[inline]
  #[must_use]
  pub fn plane_count(&self) -> usize {
    self.planes.len()
  }

  #[inline]
  #[must_use]
  pub fn plane(&self, p: usize) -> &[u8] {
    self.planes.get(p).map_or(&[][..], |(v, _)| v.as_slice())
  }

  #[inline]
  #[must_use]
  pub fn stride(&self, p: usize) -> usize {
    self.planes.get(p).map_or(0, |(_, s)| *s)
  }

  #[must_use]
  pub fn as_output(&mut self) -> OutputBuffer<'_> {
    let mut out = OutputBuffer::new();
    for (slot, (v, stride)) in out.planes.iter_mut().zip(self.planes.iter_mut()) {
      *slot = PlaneSlot { data: v.as_mut_slice(), stride: *stride as isize };
    }
    out
  }

  #[must_use]
  pub fn as_input(&self) -> InputBuffer<'_> {
    let mut out = InputBuffer::default();
    for (slot, (v, stride)) in out.planes.iter_mut().zip(self.planes.iter()) {
      *slot = (v.as_slice(), *stride as isize);
    }
    out
  }
}
