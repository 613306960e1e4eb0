//! Turning stored rows into output planes.

use bitfrob::U8BitIterHigh;

use super::header::{BmpHeader, ChannelSpec};
use crate::{buffer::put_u16_samples, IoContext, OutputBuffer, Result};

/// The output row that stored row `i` lands on.
#[inline]
#[must_use]
fn output_row(header: &BmpHeader, i: u32) -> u32 {
  if header.is_bottom_up() {
    header.abs_height() - i - 1
  } else {
    i
  }
}

/// Unpacks the palette indexes of one stored row.
///
/// Indexes are packed high bits first.
pub(crate) fn unpack_indexes(row: &[u8], bits_per_pixel: u16, out: &mut [u8]) {
  let count = u32::from(bits_per_pixel);
  let it = row.iter().copied().flat_map(move |bits| U8BitIterHigh::from_count_and_bits(count, bits));
  for (dst, i) in out.iter_mut().zip(it) {
    *dst = i;
  }
}

/// Writes one row of indexes out as R, G, B planes.
///
/// Indexes past the end of the palette come out black.
pub(crate) fn write_palette_row(
  palette: &[[u8; 3]], indexes: &[u8], out: &mut OutputBuffer<'_>, row: u32,
) -> Result<()> {
  for channel in 0..3 {
    let dst = out.row_mut(channel, row, indexes.len())?;
    for (d, &i) in dst.iter_mut().zip(indexes) {
      *d = palette.get(usize::from(i)).map_or(0, |rgb| rgb[channel]);
    }
  }
  Ok(())
}

/// 1, 4, and 8 bpp without compression.
pub(crate) fn decode_paletted(
  header: &BmpHeader, io: &mut dyn IoContext, out: &mut OutputBuffer<'_>,
) -> Result<()> {
  if header.abs_height() == 0 {
    return Ok(());
  }
  let width = usize::try_from(header.width)?;
  let mut stored = Vec::new();
  stored.try_reserve_exact(header.row_size()?)?;
  stored.resize(header.row_size()?, 0);
  let mut indexes = Vec::new();
  indexes.try_reserve_exact(width)?;
  indexes.resize(width, 0);
  for i in 0..header.abs_height() {
    io.read_all(&mut stored)?;
    unpack_indexes(&stored, header.bits_per_pixel, &mut indexes);
    write_palette_row(&header.palette, &indexes, out, output_row(header, i))?;
  }
  Ok(())
}

/// Gets the little endian pixel values out of a stored row.
fn pixel_words(row: &[u8], bytes_per_pixel: usize) -> impl Iterator<Item = u32> + '_ {
  row.chunks_exact(bytes_per_pixel).map(|c| match *c {
    [a, b] => u32::from(u16::from_le_bytes([a, b])),
    [a, b, c] => u32::from_le_bytes([a, b, c, 0]),
    [a, b, c, d] => u32::from_le_bytes([a, b, c, d]),
    _ => 0,
  })
}

/// 16, 24, and 32 bpp, with fixed layouts or bitfields.
pub(crate) fn decode_direct(
  header: &BmpHeader, io: &mut dyn IoContext, out: &mut OutputBuffer<'_>,
) -> Result<()> {
  if header.abs_height() == 0 {
    return Ok(());
  }
  let width = usize::try_from(header.width)?;
  let bytes_per_pixel = usize::from(header.bits_per_pixel / 8);
  let used = width * bytes_per_pixel;
  let mut stored = Vec::new();
  stored.try_reserve_exact(header.row_size()?)?;
  stored.resize(header.row_size()?, 0);
  let channels: &[ChannelSpec] =
    if header.has_alpha() { &header.channels } else { &header.channels[..3] };
  for i in 0..header.abs_height() {
    io.read_all(&mut stored)?;
    let row = output_row(header, i);
    let line = &stored[..used];
    let words = move || pixel_words(line, bytes_per_pixel);
    for (p, spec) in channels.iter().enumerate() {
      if spec.bits <= 8 {
        let dst = out.row_mut(p, row, width)?;
        for (d, w) in dst.iter_mut().zip(words()) {
          *d = spec.extract(w) as u8;
        }
      } else {
        let dst = out.row_mut(p, row, width * 2)?;
        put_u16_samples(dst, words().map(|w| spec.extract(w) as u16));
      }
    }
  }
  Ok(())
}
