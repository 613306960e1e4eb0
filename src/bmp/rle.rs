//! The BMP format's run-length encoding.
//!
//! The stream is read two bytes at a time. A non-zero first byte is a run
//! length and the second byte gives the index (or, for RLE4, two indexes that
//! alternate). A zero first byte is an escape, and the second byte says which:
//!
//! * 0: end of line
//! * 1: end of bitmap
//! * 2: delta, the next two bytes move the position right and up
//! * 3+: absolute, that many indexes follow as-is, padded to an even byte
//!   count
//!
//! Positions start at the lower left corner.

/// One step of an RLE stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RleOp<'b> {
  /// `count` pixels of `value`. For RLE4 the high then low nibble alternate.
  Run { count: u8, value: u8 },
  /// `count` indexes packed into `data` the same way as uncompressed rows.
  Absolute { count: u8, data: &'b [u8] },
  /// x = 0, y += 1.
  Newline,
  /// No more ops.
  EndOfBmp,
  Delta { right: u8, up: u8 },
}

/// Iterates the ops of RLE8 (`bits_per_pixel == 8`) or RLE4 data.
///
/// Stops early, without error, if the data runs out mid op.
pub fn rle_ops(data: &[u8], bits_per_pixel: u16) -> impl Iterator<Item = RleOp<'_>> + '_ {
  let mut rest = data;
  let mut done = false;
  core::iter::from_fn(move || {
    if done {
      return None;
    }
    let (&[a, b], tail) = rest.split_first_chunk::<2>()?;
    rest = tail;
    let op = match (a, b) {
      (0, 0) => RleOp::Newline,
      (0, 1) => RleOp::EndOfBmp,
      (0, 2) => {
        let (&[right, up], tail) = rest.split_first_chunk::<2>()?;
        rest = tail;
        RleOp::Delta { right, up }
      }
      (0, count) => {
        let bytes = if bits_per_pixel == 4 {
          usize::from(count).div_ceil(2)
        } else {
          usize::from(count)
        };
        let padded = bytes.next_multiple_of(2);
        if rest.len() < padded {
          return None;
        }
        let (d, tail) = rest.split_at(padded);
        rest = tail;
        RleOp::Absolute { count, data: &d[..bytes] }
      }
      (count, value) => RleOp::Run { count, value },
    };
    if op == RleOp::EndOfBmp {
      done = true;
    }
    Some(op)
  })
}

/// Paints RLE data into a grid of palette indexes, top row first.
///
/// Pixels the stream never touches stay at index 0. Pixels that would land
/// outside the image are dropped.
pub fn paint_rle(
  data: &[u8], bits_per_pixel: u16, width: usize, height: usize, grid: &mut [u8],
) {
  debug_assert!(grid.len() >= width * height);
  let mut x = 0_usize;
  let mut y = 0_usize;
  let mut put = |x: usize, y: usize, index: u8| {
    if x < width && y < height {
      grid[(height - 1 - y) * width + x] = index;
    }
  };
  for op in rle_ops(data, bits_per_pixel) {
    match op {
      RleOp::Run { count, value } => {
        for n in 0..usize::from(count) {
          let index = match bits_per_pixel {
            4 if n % 2 == 0 => value >> 4,
            4 => value & 0xF,
            _ => value,
          };
          put(x + n, y, index);
        }
        x += usize::from(count);
      }
      RleOp::Absolute { count, data } => {
        for n in 0..usize::from(count) {
          let index = match bits_per_pixel {
            4 if n % 2 == 0 => data[n / 2] >> 4,
            4 => data[n / 2] & 0xF,
            _ => data[n],
          };
          put(x + n, y, index);
        }
        x += usize::from(count);
      }
      RleOp::Newline => {
        x = 0;
        y += 1;
      }
      RleOp::EndOfBmp => break,
      RleOp::Delta { right, up } => {
        x += usize::from(right);
        y += usize::from(up);
      }
    }
    if y >= height {
      break;
    }
  }
}
