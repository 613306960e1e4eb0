#![allow(unused_imports)]

use imagine::{
  ColorFamily, FileFormat, ImageDecoder, ImageType, MemoryIoContext, PlaneBuffers, Registry,
  StatusCode, StreamIoContext,
};

/// Decodes every frame, giving the family and planes of each.
fn decode_frames(decoder: &mut dyn ImageDecoder) -> Vec<(ColorFamily, PlaneBuffers)> {
  let mut out = Vec::new();
  loop {
    let f = decoder.next_frame_format().unwrap();
    if !f.is_constant() {
      return out;
    }
    let mut planes = PlaneBuffers::allocate(&f).unwrap();
    decoder.decode(&mut planes.as_output()).unwrap();
    out.push((f.color_family, planes));
  }
}

fn as_u16(bytes: &[u8]) -> Vec<u16> {
  bytes.chunks_exact(2).map(|c| u16::from_ne_bytes([c[0], c[1]])).collect()
}

#[cfg(feature = "png")]
fn encode_png(
  width: u32, height: u32, color: png::ColorType, depth: png::BitDepth, palette: Option<&[u8]>,
  data: &[u8],
) -> Vec<u8> {
  let mut out = Vec::new();
  {
    let mut encoder = png::Encoder::new(&mut out, width, height);
    encoder.set_color(color);
    encoder.set_depth(depth);
    if let Some(p) = palette {
      encoder.set_palette(p.to_vec());
    }
    let mut writer = encoder.write_header().unwrap();
    writer.write_image_data(data).unwrap();
  }
  out
}

#[cfg(feature = "png")]
#[test]
fn png_rgba_through_registry() {
  let data = encode_png(
    2,
    1,
    png::ColorType::Rgba,
    png::BitDepth::Eight,
    None,
    &[1, 2, 3, 4, 5, 6, 7, 8],
  );
  let r = Registry::with_default_providers().unwrap();
  let mut d = r.create_decoder(None, None, Box::new(MemoryIoContext::new(&data))).unwrap().unwrap();
  assert_eq!(d.name(), "png");
  let file = d.file_format().unwrap();
  assert_eq!(file.image_type, ImageType::Png);
  assert_eq!(file.frame_count, 1);
  assert_eq!(file.color_family, ColorFamily::Rgba);

  let frames = decode_frames(d.as_mut());
  assert_eq!(frames.len(), 1);
  let (family, planes) = &frames[0];
  assert_eq!(*family, ColorFamily::Rgba);
  assert_eq!(planes.plane(0), [1, 5]);
  assert_eq!(planes.plane(1), [2, 6]);
  assert_eq!(planes.plane(2), [3, 7]);
  assert_eq!(planes.plane(3), [4, 8]);
}

#[cfg(feature = "png")]
#[test]
fn png_sixteen_bit_gray_is_native_endian() {
  let data = encode_png(
    2,
    1,
    png::ColorType::Grayscale,
    png::BitDepth::Sixteen,
    None,
    &[0x01, 0x02, 0xFF, 0xFE],
  );
  let r = Registry::with_default_providers().unwrap();
  let mut d = r.create_decoder(None, None, Box::new(MemoryIoContext::new(&data))).unwrap().unwrap();
  let frames = decode_frames(d.as_mut());
  let (family, planes) = &frames[0];
  assert_eq!(*family, ColorFamily::Gray);
  assert_eq!(as_u16(planes.plane(0)), [0x0102, 0xFFFE]);
}

#[cfg(feature = "png")]
#[test]
fn png_palette_expands_to_rgb() {
  let palette = [0, 0, 0, 255, 128, 0];
  let data = encode_png(
    3,
    1,
    png::ColorType::Indexed,
    png::BitDepth::One,
    Some(&palette),
    &[0b1010_0000],
  );
  let r = Registry::with_default_providers().unwrap();
  let mut d = r.create_decoder(None, None, Box::new(MemoryIoContext::new(&data))).unwrap().unwrap();
  let frames = decode_frames(d.as_mut());
  let (family, planes) = &frames[0];
  assert_eq!(*family, ColorFamily::Rgb);
  assert_eq!(planes.plane(0), [255, 0, 255]);
  assert_eq!(planes.plane(1), [128, 0, 128]);
  assert_eq!(planes.plane(2), [0, 0, 0]);
}

#[cfg(feature = "png")]
#[test]
fn png_from_a_stream_by_extension() {
  let data = encode_png(1, 1, png::ColorType::Grayscale, png::BitDepth::Eight, None, &[77]);
  let r = Registry::with_default_providers().unwrap();
  let io = StreamIoContext::new(&data[..]).with_path("pipe.PNG");
  let mut d = r.create_decoder(Some("pipe.PNG"), None, Box::new(io)).unwrap().unwrap();
  assert_eq!(d.name(), "png");
  let frames = decode_frames(d.as_mut());
  assert_eq!(frames[0].1.plane(0), [77]);
}

#[cfg(feature = "png")]
#[test]
fn truncated_png_is_a_codec_error() {
  let data = encode_png(4, 4, png::ColorType::Rgb, png::BitDepth::Eight, None, &[9; 48]);
  let data = &data[..data.len() - 18];
  let r = Registry::with_default_providers().unwrap();
  let mut d = r.create_decoder(None, None, Box::new(MemoryIoContext::new(data))).unwrap().unwrap();
  let f = d.next_frame_format().unwrap();
  let mut planes = PlaneBuffers::allocate(&f).unwrap();
  let err = d.decode(&mut planes.as_output()).unwrap_err();
  assert_eq!(err.status_code(), StatusCode::CannotDecodeImage);
  assert!(err.message().starts_with("pnglib error"));
}

#[cfg(feature = "png")]
#[test]
fn png_type_hint_skips_sniffing() {
  let data = [0_u8; 16];
  let r = Registry::with_default_providers().unwrap();
  let hint = FileFormat::of_type(ImageType::Png);
  let mut d =
    r.create_decoder(None, Some(&hint), Box::new(MemoryIoContext::new(&data))).unwrap().unwrap();
  assert_eq!(d.name(), "png");
  assert_eq!(d.file_format().unwrap_err().category(), StatusCode::Codec);
}

#[cfg(feature = "jpeg")]
#[test]
fn broken_jpeg_is_a_codec_error() {
  let mut data = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];
  data.extend(b"JFIF");
  let r = Registry::with_default_providers().unwrap();
  let mut d = r.create_decoder(None, None, Box::new(MemoryIoContext::new(&data))).unwrap().unwrap();
  assert_eq!(d.name(), "jpeg");
  let err = d.file_format().unwrap_err();
  assert_eq!(err.category(), StatusCode::Codec);
  assert!(err.message().starts_with("jpeglib error"));
}

#[cfg(feature = "jpeg")]
#[test]
fn jpeg_random_tail_never_panics() {
  let mut data = crate::rand_bytes(256);
  data[..3].copy_from_slice(&[0xFF, 0xD8, 0xFF]);
  let r = Registry::with_default_providers().unwrap();
  let mut d = r.create_decoder(None, None, Box::new(MemoryIoContext::new(&data))).unwrap().unwrap();
  if let Ok(f) = d.next_frame_format() {
    if let Ok(mut planes) = PlaneBuffers::allocate(&f) {
      let _ = d.decode(&mut planes.as_output());
    }
  }
}

#[cfg(feature = "tiff")]
#[test]
fn tiff_directories_are_frames() {
  use tiff::encoder::{colortype, TiffEncoder};

  let mut data = Vec::new();
  {
    let mut encoder = TiffEncoder::new(std::io::Cursor::new(&mut data)).unwrap();
    encoder.write_image::<colortype::RGB8>(2, 1, &[10, 20, 30, 40, 50, 60]).unwrap();
    encoder.write_image::<colortype::Gray16>(1, 2, &[1000, 60000]).unwrap();
  }
  let r = Registry::with_default_providers().unwrap();
  let mut d = r.create_decoder(None, None, Box::new(MemoryIoContext::new(&data))).unwrap().unwrap();
  assert_eq!(d.name(), "tiff");
  let file = d.file_format().unwrap();
  assert_eq!(file.image_type, ImageType::Tiff);
  assert_eq!(file.frame_count, 0);
  assert_eq!(file.color_family, ColorFamily::Rgb);

  let frames = decode_frames(d.as_mut());
  assert_eq!(frames.len(), 2);
  assert_eq!(frames[0].0, ColorFamily::Rgb);
  assert_eq!(frames[0].1.plane(0), [10, 40]);
  assert_eq!(frames[0].1.plane(2), [30, 60]);
  assert_eq!(frames[1].0, ColorFamily::Gray);
  assert_eq!(as_u16(frames[1].1.plane(0)), [1000, 60000]);
}
