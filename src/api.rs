//! The flat, handle based boundary.
//!
//! Everything here deals in [Handle]s and [StatusCode]s instead of Rust
//! values and `Result`s, for embedding the library behind an interface that
//! can't carry either (a C shim, a scripting host). Each thread has its own
//! handle table, and a handle is only valid on the thread that made it.
//!
//! Failures are recorded in the thread's error slot (see
//! [crate::status]), which the caller reads back with [get_last_error]. A
//! function that returns a value instead of a status gives back the value's
//! default when it fails. A panic inside a call is caught and reported as
//! [StatusCode::Unknown].

use core::cell::RefCell;
use std::{
  collections::HashMap,
  panic::{catch_unwind, AssertUnwindSafe},
};

use crate::{
  status::{self, ErrorSlot},
  ColorFamily, FileFormat, FileIoContext, FileMode, ImageDecoder, ImageType, ImagineError,
  IoContext, IoErrorDetails, MemoryIoContext, OutputBuffer, Registry, Result, StatusCode,
  MAX_PLANE_COUNT,
};

pub const API_VERSION_MAJOR: u32 = 0;
pub const API_VERSION_MINOR: u32 = 0;
pub const API_VERSION: u32 = (API_VERSION_MAJOR << 8) | API_VERSION_MINOR;

/// Names one object in this thread's handle table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Handle(u32);

enum Object {
  FileFormat(FileFormat),
  IoContext(Box<dyn IoContext>),
  Registry(Registry),
  Decoder(Box<dyn ImageDecoder>),
}
impl Object {
  fn kind(&self) -> &'static str {
    match self {
      Self::FileFormat(_) => "file format",
      Self::IoContext(_) => "io context",
      Self::Registry(_) => "decoder registry",
      Self::Decoder(_) => "decoder",
    }
  }
}

#[derive(Default)]
struct HandleTable {
  last: u32,
  objects: HashMap<u32, Object>,
}

thread_local! {
  static HANDLES: RefCell<HandleTable> = RefCell::new(HandleTable::default());
}

fn bad_handle(h: Handle) -> ImagineError {
  ImagineError::illegal_argument(format!("invalid handle {}", h.0))
}

fn insert(obj: Object) -> Result<Handle> {
  HANDLES.with(|t| {
    let mut t = t.borrow_mut();
    let id = t
      .last
      .checked_add(1)
      .ok_or_else(|| ImagineError::OutOfMemory(String::from("handle space exhausted")))?;
    t.objects.try_reserve(1)?;
    tracing::trace!(handle = id, kind = obj.kind(), "handle allocated");
    t.objects.insert(id, obj);
    t.last = id;
    Ok(Handle(id))
  })
}

fn remove(h: Handle) -> Option<Object> {
  HANDLES.with(|t| t.borrow_mut().objects.remove(&h.0))
}

fn with_object<T>(h: Handle, op: impl FnOnce(&mut Object) -> Result<T>) -> Result<T> {
  HANDLES.with(|t| {
    let mut t = t.borrow_mut();
    let obj = t.objects.get_mut(&h.0).ok_or_else(|| bad_handle(h))?;
    op(obj)
  })
}

fn wrong_kind(obj: &Object, want: &str) -> ImagineError {
  ImagineError::illegal_argument(format!("handle is a {}, not a {want}", obj.kind()))
}

fn with_format<T>(h: Handle, op: impl FnOnce(&mut FileFormat) -> Result<T>) -> Result<T> {
  with_object(h, |obj| match obj {
    Object::FileFormat(f) => op(f),
    other => Err(wrong_kind(other, "file format")),
  })
}

fn with_registry<T>(h: Handle, op: impl FnOnce(&mut Registry) -> Result<T>) -> Result<T> {
  with_object(h, |obj| match obj {
    Object::Registry(r) => op(r),
    other => Err(wrong_kind(other, "decoder registry")),
  })
}

fn with_decoder<T>(h: Handle, op: impl FnOnce(&mut dyn ImageDecoder) -> Result<T>) -> Result<T> {
  with_object(h, |obj| match obj {
    Object::Decoder(d) => op(d.as_mut()),
    other => Err(wrong_kind(other, "decoder")),
  })
}

fn plane_index(plane: u32) -> Result<usize> {
  let p = plane as usize;
  if p < MAX_PLANE_COUNT {
    Ok(p)
  } else {
    Err(ImagineError::illegal_argument("plane index out of range"))
  }
}

/// Runs `op`, recording any failure in the thread's error slot.
fn guarded<T>(op: impl FnOnce() -> Result<T>) -> core::result::Result<T, StatusCode> {
  match catch_unwind(AssertUnwindSafe(op)) {
    Ok(Ok(v)) => Ok(v),
    Ok(Err(e)) => {
      tracing::debug!(error = %e, "boundary call failed");
      Err(status::record_last_error(&e))
    }
    Err(_) => {
      tracing::error!("panic caught at boundary");
      Err(status::with_thread_slot(|s: &mut ErrorSlot| {
        s.record_code(StatusCode::Unknown, "panic during call")
      }))
    }
  }
}

fn status_of(op: impl FnOnce() -> Result<()>) -> StatusCode {
  match guarded(op) {
    Ok(()) => StatusCode::Success,
    Err(code) => code,
  }
}

fn value_of<T: Default>(op: impl FnOnce() -> Result<T>) -> T {
  guarded(op).unwrap_or_default()
}

/// `(major, minor, micro)` of this library.
#[must_use]
pub fn get_version() -> (u32, u32, u32) {
  let part = |s: &str| s.parse().unwrap_or(0);
  (
    part(env!("CARGO_PKG_VERSION_MAJOR")),
    part(env!("CARGO_PKG_VERSION_MINOR")),
    part(env!("CARGO_PKG_VERSION_PATCH")),
  )
}

/// `(major, minor)` of this interface. Also see [API_VERSION].
#[inline]
#[must_use]
pub const fn get_api_version() -> (u32, u32) {
  (API_VERSION_MAJOR, API_VERSION_MINOR)
}

/// This thread's last status, with the message copied into `buf`.
///
/// The message is truncated to fit and always NUL terminated, unless `buf` is
/// empty.
#[inline]
pub fn get_last_error(buf: &mut [u8]) -> StatusCode {
  status::copy_last_error(buf)
}

/// The details of this thread's last error, if it was an IO error.
#[inline]
#[must_use]
pub fn get_io_error_details() -> Option<IoErrorDetails> {
  status::io_error_details()
}

#[inline]
pub fn clear_last_error() {
  status::clear_last_error();
}

// file formats

#[must_use]
pub fn file_format_alloc() -> Option<Handle> {
  guarded(|| insert(Object::FileFormat(FileFormat::default()))).ok()
}

/// Frees any kind of handle. Unknown handles are ignored.
pub fn free(h: Handle) {
  if let Some(obj) = remove(h) {
    tracing::trace!(handle = h.0, kind = obj.kind(), "handle freed");
  }
}

#[inline]
pub fn file_format_free(h: Handle) {
  free(h);
}

pub fn file_format_clear(h: Handle) -> StatusCode {
  status_of(|| {
    with_format(h, |f| {
      f.clear();
      Ok(())
    })
  })
}

macro_rules! plane_accessors {
  ($($get:ident / $set:ident => $field:ident: $t:ty),* $(,)?) => {
    $(
      #[must_use]
      pub fn $get(h: Handle, plane: u32) -> $t {
        value_of(|| with_format(h, |f| Ok(f.planes[plane_index(plane)?].$field)))
      }

      pub fn $set(h: Handle, plane: u32, value: $t) -> StatusCode {
        status_of(|| with_format(h, |f| {
          f.planes[plane_index(plane)?].$field = value;
          Ok(())
        }))
      }
    )*
  };
}
plane_accessors! {
  file_format_width_get / file_format_width_set => width: u32,
  file_format_height_get / file_format_height_set => height: u32,
  file_format_bit_depth_get / file_format_bit_depth_set => bit_depth: u32,
  file_format_floating_point_get / file_format_floating_point_set => floating_point: bool,
}

#[must_use]
pub fn file_format_plane_count_get(h: Handle) -> u32 {
  value_of(|| with_format(h, |f| Ok(f.plane_count)))
}

pub fn file_format_plane_count_set(h: Handle, plane_count: u32) -> StatusCode {
  status_of(|| {
    with_format(h, |f| {
      f.plane_count = plane_count;
      Ok(())
    })
  })
}

/// The color family as its integer code.
#[must_use]
pub fn file_format_color_family_get(h: Handle) -> i32 {
  value_of(|| with_format(h, |f| Ok(f.color_family as i32)))
}

/// Codes that don't name a family store `Unknown`.
pub fn file_format_color_family_set(h: Handle, color_family: i32) -> StatusCode {
  status_of(|| {
    with_format(h, |f| {
      f.color_family = ColorFamily::from_i32(color_family).unwrap_or_default();
      Ok(())
    })
  })
}

/// The image type as its integer code.
#[must_use]
pub fn file_format_image_type_get(h: Handle) -> i32 {
  value_of(|| with_format(h, |f| Ok(f.image_type as i32)))
}

/// Codes that don't name a type store `Unknown`.
pub fn file_format_image_type_set(h: Handle, image_type: i32) -> StatusCode {
  status_of(|| {
    with_format(h, |f| {
      f.image_type = ImageType::from_i32(image_type).unwrap_or_default();
      Ok(())
    })
  })
}

#[must_use]
pub fn file_format_frame_count_get(h: Handle) -> u32 {
  value_of(|| with_format(h, |f| Ok(f.frame_count)))
}

pub fn file_format_frame_count_set(h: Handle, frame_count: u32) -> StatusCode {
  status_of(|| {
    with_format(h, |f| {
      f.frame_count = frame_count;
      Ok(())
    })
  })
}

#[must_use]
pub fn is_constant_format(h: Handle) -> bool {
  value_of(|| with_format(h, |f| Ok(f.is_constant())))
}

// io contexts

/// Opens a file for reading.
#[must_use]
pub fn io_context_from_file_ro(path: &str) -> Option<Handle> {
  guarded(|| {
    let io = FileIoContext::open(path, FileMode::Read)?;
    insert(Object::IoContext(Box::new(io)))
  })
  .ok()
}

/// Copies `data` into a new read only memory context.
///
/// `path` is only used for error reports and extension matching.
#[must_use]
pub fn io_context_from_memory(data: &[u8], path: Option<&str>) -> Option<Handle> {
  guarded(|| {
    let mut v = Vec::new();
    v.try_reserve_exact(data.len())?;
    v.extend_from_slice(data);
    let mut io = MemoryIoContext::from_vec(v);
    if let Some(p) = path {
      io = io.with_path(p);
    }
    insert(Object::IoContext(Box::new(io)))
  })
  .ok()
}

#[inline]
pub fn io_context_free(h: Handle) {
  free(h);
}

// registries

/// A registry with the default providers.
#[must_use]
pub fn decoder_registry_alloc() -> Option<Handle> {
  guarded(|| insert(Object::Registry(Registry::with_default_providers()?))).ok()
}

#[inline]
pub fn decoder_registry_free(h: Handle) {
  free(h);
}

pub fn decoder_registry_disable_provider(h: Handle, name: &str) -> StatusCode {
  status_of(|| {
    with_registry(h, |r| {
      r.disable_provider(name);
      Ok(())
    })
  })
}

/// Finds a decoder for the stream behind `io`.
///
/// The `io` handle is consumed whether or not a decoder is made. `None` with
/// a clear error slot means no provider claimed the stream.
#[must_use]
pub fn decoder_registry_create_decoder(
  registry: Handle, path: Option<&str>, format: Option<Handle>, io: Handle,
) -> Option<Handle> {
  guarded(|| {
    let io = match remove(io) {
      Some(Object::IoContext(io)) => io,
      Some(other) => return Err(wrong_kind(&other, "io context")),
      None => return Err(bad_handle(io)),
    };
    let format = format.map(|h| with_format(h, |f| Ok(*f))).transpose()?;
    let decoder = with_registry(registry, |r| r.create_decoder(path, format.as_ref(), io))?;
    decoder.map(|d| insert(Object::Decoder(d))).transpose()
  })
  .ok()
  .flatten()
}

// decoders

#[inline]
pub fn decoder_free(h: Handle) {
  free(h);
}

/// The decoder's name, or `""` for a bad handle.
#[must_use]
pub fn decoder_name(h: Handle) -> &'static str {
  value_of(|| with_decoder(h, |d| Ok(d.name())))
}

/// Stores the decoder's file format into the `format` handle.
pub fn decoder_file_format(h: Handle, format: Handle) -> StatusCode {
  status_of(|| {
    let f = with_decoder(h, |d| d.file_format())?;
    with_format(format, |dst| {
      *dst = f;
      Ok(())
    })
  })
}

/// Stores the next frame's format into the `format` handle.
///
/// The file level fields of `format` are cleared.
pub fn decoder_next_frame_format(h: Handle, format: Handle) -> StatusCode {
  status_of(|| {
    let f = with_decoder(h, |d| d.next_frame_format())?;
    with_format(format, |dst| {
      dst.clear();
      dst.frame = f;
      Ok(())
    })
  })
}

pub fn decoder_decode(h: Handle, buffer: &mut OutputBuffer<'_>) -> StatusCode {
  status_of(|| with_decoder(h, |d| d.decode(buffer)))
}
