use crate::{
  decoder::PRIORITY_MIN, DecoderProvider, FileFormat, FrameFormat, ImageDecoder, ImageType,
  IoContext, OutputBuffer, Recognition, Result,
};

pub const YUV_NAME: &str = "yuv";

/// Provides [YuvDecoder]s for headerless planar files.
///
/// There's nothing in the data to recognize, so this only claims a stream
/// when the caller passes a constant format with type
/// [YuvTest](ImageType::YuvTest).
#[derive(Debug, Clone, Copy, Default)]
pub struct YuvProvider;

impl DecoderProvider for YuvProvider {
  #[inline]
  fn name(&self) -> &'static str {
    YUV_NAME
  }

  #[inline]
  fn priority(&self) -> i32 {
    PRIORITY_MIN
  }

  fn create_decoder<'a>(
    &self, _path: Option<&str>, format: Option<&FileFormat>, io: Box<dyn IoContext + 'a>,
  ) -> Result<Recognition<'a>> {
    match format {
      Some(f) if f.image_type == ImageType::YuvTest && f.is_constant() => {
        Ok(Recognition::Decoder(Box::new(YuvDecoder::new(*f, io)?)))
      }
      _ => Ok(Recognition::Declined(io)),
    }
  }
}

/// Reads back to back frames of raw planar samples.
///
/// Each plane is stored whole, one tightly packed row after another, in plane
/// order.
pub struct YuvDecoder<'a> {
  format: FileFormat,
  frame_no: u32,
  io: Box<dyn IoContext + 'a>,
}

impl core::fmt::Debug for YuvDecoder<'_> {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.debug_struct("YuvDecoder")
      .field("format", &self.format)
      .field("frame_no", &self.frame_no)
      .finish_non_exhaustive()
  }
}

impl<'a> YuvDecoder<'a> {
  /// When `format` has no frame count and the stream is seekable, the count
  /// is worked out from the stream size.
  pub fn new(format: FileFormat, mut io: Box<dyn IoContext + 'a>) -> Result<Self> {
    let mut format = format;
    let frame_size = format.frame_size() as u64;
    if format.frame_count == 0 && io.seekable() && frame_size != 0 {
      let size = u64::try_from(io.size()?).unwrap_or(0);
      format.frame_count = u32::try_from(size / frame_size).unwrap_or(u32::MAX);
    }
    Ok(Self { format, frame_no: 0, io })
  }
}

impl ImageDecoder for YuvDecoder<'_> {
  #[inline]
  fn name(&self) -> &'static str {
    YUV_NAME
  }

  #[inline]
  fn file_format(&mut self) -> Result<FileFormat> {
    Ok(self.format)
  }

  fn next_frame_format(&mut self) -> Result<FrameFormat> {
    let counted_out = self.format.frame_count != 0 && self.frame_no >= self.format.frame_count;
    if counted_out || self.io.eof() {
      return Ok(FrameFormat::EMPTY);
    }
    Ok(self.format.frame)
  }

  fn decode(&mut self, buffer: &mut OutputBuffer<'_>) -> Result<()> {
    for (p, plane) in self.format.active_planes().iter().enumerate() {
      let row_size = plane.row_size();
      for row in 0..plane.height {
        self.io.read_all(buffer.row_mut(p, row, row_size)?)?;
      }
    }
    self.frame_no += 1;
    Ok(())
  }
}
