use imagine::{
  api::{self, Handle},
  ColorFamily, ImageType, OutputBuffer, StatusCode,
};

use crate::bmp::TestBmp;

fn last_message() -> (StatusCode, String) {
  let mut buf = [0_u8; 256];
  let code = api::get_last_error(&mut buf);
  let end = buf.iter().position(|b| *b == 0).unwrap();
  (code, String::from_utf8_lossy(&buf[..end]).into_owned())
}

fn red_green_bmp() -> Vec<u8> {
  // one row, stored as BGR plus padding
  TestBmp { width: 2, height: 1, pixels: vec![0, 0, 255, 0, 255, 0, 0, 0], ..Default::default() }
    .build()
}

fn open_decoder(data: &[u8], path: Option<&str>) -> (Handle, Handle) {
  let registry = api::decoder_registry_alloc().unwrap();
  let io = api::io_context_from_memory(data, path).unwrap();
  let decoder = api::decoder_registry_create_decoder(registry, path, None, io).unwrap();
  (registry, decoder)
}

#[test]
fn decode_through_handles() {
  api::clear_last_error();
  let (registry, decoder) = open_decoder(&red_green_bmp(), Some("tiny.bmp"));
  assert_eq!(api::decoder_name(decoder), "bmp");

  let format = api::file_format_alloc().unwrap();
  assert_eq!(api::decoder_file_format(decoder, format), StatusCode::Success);
  assert_eq!(api::file_format_image_type_get(format), ImageType::Bmp as i32);
  assert_eq!(api::file_format_frame_count_get(format), 1);

  assert_eq!(api::decoder_next_frame_format(decoder, format), StatusCode::Success);
  assert!(api::is_constant_format(format));
  // file level fields are cleared for a frame
  assert_eq!(api::file_format_image_type_get(format), 0);
  assert_eq!(api::file_format_color_family_get(format), ColorFamily::Rgb as i32);
  assert_eq!(api::file_format_plane_count_get(format), 3);
  for p in 0..3 {
    assert_eq!(api::file_format_width_get(format, p), 2);
    assert_eq!(api::file_format_height_get(format, p), 1);
    assert_eq!(api::file_format_bit_depth_get(format, p), 8);
    assert!(!api::file_format_floating_point_get(format, p));
  }

  let mut r = [0_u8; 2];
  let mut g = [0_u8; 2];
  let mut b = [0_u8; 2];
  let mut out = OutputBuffer::new();
  out.set_plane(0, &mut r, 2).unwrap();
  out.set_plane(1, &mut g, 2).unwrap();
  out.set_plane(2, &mut b, 2).unwrap();
  assert_eq!(api::decoder_decode(decoder, &mut out), StatusCode::Success);
  drop(out);
  assert_eq!((r, g, b), ([255, 0], [0, 255], [0, 0]));

  assert_eq!(api::decoder_next_frame_format(decoder, format), StatusCode::Success);
  assert!(!api::is_constant_format(format));
  assert_eq!(last_message().0, StatusCode::Success);

  api::decoder_free(decoder);
  api::file_format_free(format);
  api::decoder_registry_free(registry);
  assert_eq!(api::decoder_name(decoder), "");
  assert_eq!(last_message().0, StatusCode::IllegalArgument);
}

#[test]
fn missing_file_records_io_details() {
  api::clear_last_error();
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("missing.bmp");
  let path = path.to_str().unwrap();
  assert!(api::io_context_from_file_ro(path).is_none());
  let (code, msg) = last_message();
  assert_eq!(code, StatusCode::CannotOpenFile);
  assert!(msg.starts_with("error opening file"));
  let details = api::get_io_error_details().unwrap();
  assert_eq!(details.path.as_deref(), Some(path));
  assert_ne!(details.errno, 0);

  api::clear_last_error();
  assert_eq!(last_message(), (StatusCode::Success, String::new()));
  assert!(api::get_io_error_details().is_none());
}

#[test]
fn file_handles_decode_too() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("on_disk.bmp");
  std::fs::write(&path, red_green_bmp()).unwrap();
  let path = path.to_str().unwrap();
  let registry = api::decoder_registry_alloc().unwrap();
  let io = api::io_context_from_file_ro(path).unwrap();
  let decoder = api::decoder_registry_create_decoder(registry, Some(path), None, io).unwrap();
  assert_eq!(api::decoder_name(decoder), "bmp");
  api::free(decoder);
  api::free(registry);
}

#[test]
fn unclaimed_streams_give_none_and_consume_io() {
  api::clear_last_error();
  let registry = api::decoder_registry_alloc().unwrap();
  let io = api::io_context_from_memory(&[0_u8; 32], None).unwrap();
  assert!(api::decoder_registry_create_decoder(registry, None, None, io).is_none());
  assert_eq!(last_message().0, StatusCode::Success);
  // the io handle went to the registry
  api::io_context_free(io);
  let again = api::decoder_registry_create_decoder(registry, None, None, io);
  assert!(again.is_none());
  assert_eq!(last_message().0, StatusCode::IllegalArgument);
  api::free(registry);
}

#[test]
fn disabled_bmp_is_not_tried() {
  api::clear_last_error();
  let registry = api::decoder_registry_alloc().unwrap();
  assert_eq!(api::decoder_registry_disable_provider(registry, "bmp"), StatusCode::Success);
  let io = api::io_context_from_memory(&red_green_bmp(), None).unwrap();
  assert!(api::decoder_registry_create_decoder(registry, None, None, io).is_none());
  api::free(registry);
}

#[test]
fn broken_bmp_reports_decode_error() {
  api::clear_last_error();
  let mut data = red_green_bmp();
  // bits per pixel
  data[28] = 7;
  let registry = api::decoder_registry_alloc().unwrap();
  let io = api::io_context_from_memory(&data, None).unwrap();
  let decoder = api::decoder_registry_create_decoder(registry, None, None, io).unwrap();
  let format = api::file_format_alloc().unwrap();
  assert_eq!(api::decoder_file_format(decoder, format), StatusCode::CannotDecodeImage);
  let (code, msg) = last_message();
  assert_eq!(code.category(), StatusCode::Codec);
  assert!(!msg.is_empty());
  assert!(api::get_io_error_details().is_none());
  api::free(format);
  api::free(decoder);
  api::free(registry);
}

#[test]
fn format_hint_from_handle() {
  let registry = api::decoder_registry_alloc().unwrap();
  let hint = api::file_format_alloc().unwrap();
  assert_eq!(api::file_format_image_type_set(hint, ImageType::YuvTest as i32), StatusCode::Success);
  assert_eq!(api::file_format_color_family_set(hint, ColorFamily::Gray as i32), StatusCode::Success);
  assert_eq!(api::file_format_plane_count_set(hint, 1), StatusCode::Success);
  assert_eq!(api::file_format_width_set(hint, 0, 2), StatusCode::Success);
  assert_eq!(api::file_format_height_set(hint, 0, 2), StatusCode::Success);
  assert_eq!(api::file_format_bit_depth_set(hint, 0, 8), StatusCode::Success);
  assert!(api::is_constant_format(hint));

  let io = api::io_context_from_memory(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12], None).unwrap();
  let decoder = api::decoder_registry_create_decoder(registry, None, Some(hint), io).unwrap();
  assert_eq!(api::decoder_name(decoder), "yuv");
  let format = api::file_format_alloc().unwrap();
  assert_eq!(api::decoder_file_format(decoder, format), StatusCode::Success);
  assert_eq!(api::file_format_frame_count_get(format), 3);
  for h in [format, decoder, hint, registry] {
    api::free(h);
  }
}

#[test]
fn format_fields_round_trip() {
  let f = api::file_format_alloc().unwrap();
  assert!(!api::is_constant_format(f));
  assert_eq!(api::file_format_frame_count_set(f, 9), StatusCode::Success);
  assert_eq!(api::file_format_floating_point_set(f, 2, true), StatusCode::Success);
  assert!(api::file_format_floating_point_get(f, 2));
  assert_eq!(api::file_format_color_family_set(f, 1234), StatusCode::Success);
  assert_eq!(api::file_format_color_family_get(f), 0);
  assert_eq!(api::file_format_bit_depth_get(f, 9), 0);
  assert_eq!(last_message().0, StatusCode::IllegalArgument);
  assert_eq!(api::file_format_clear(f), StatusCode::Success);
  assert_eq!(api::file_format_frame_count_get(f), 0);
  assert!(!api::file_format_floating_point_get(f, 2));
  api::free(f);
}

#[test]
fn short_message_buffers() {
  let f = api::file_format_alloc().unwrap();
  api::free(f);
  assert_eq!(api::file_format_clear(f), StatusCode::IllegalArgument);
  let mut tiny = [0xFF_u8; 4];
  assert_eq!(api::get_last_error(&mut tiny), StatusCode::IllegalArgument);
  assert_eq!(tiny[3], 0);
  assert_eq!(&tiny[..3], b"inv");
  assert_eq!(api::get_last_error(&mut []), StatusCode::IllegalArgument);
}

#[test]
fn handles_are_per_thread() {
  let f = api::file_format_alloc().unwrap();
  assert_eq!(api::file_format_frame_count_set(f, 5), StatusCode::Success);
  let code = std::thread::spawn(move || api::file_format_frame_count_set(f, 6)).join().unwrap();
  assert_eq!(code, StatusCode::IllegalArgument);
  assert_eq!(api::file_format_frame_count_get(f), 5);
  api::free(f);
}
