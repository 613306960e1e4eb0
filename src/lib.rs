#![cfg_attr(docs_rs, feature(doc_cfg))]
#![warn(missing_debug_implementations)]

//! A crate for image decoding, with pluggable formats.
//!
//! * An [IoContext] is where the bytes come from: a file, memory, or a plain
//!   [Read](std::io::Read) stream that can't seek.
//! * A [Registry] holds [DecoderProvider]s in priority order. Give it a
//!   stream, and the first provider that recognizes the stream hands back an
//!   [ImageDecoder].
//! * The decoder reports a [FileFormat], then the [FrameFormat] of each frame
//!   in turn, and decodes frames into caller owned planar buffers (see
//!   [OutputBuffer] and [PlaneBuffers]).
//!
//! ```no_run
//! use imagine::{FileIoContext, FileMode, PlaneBuffers, Registry};
//! # fn main() -> imagine::Result<()> {
//! let registry = Registry::with_default_providers()?;
//! let io = FileIoContext::open("pic.bmp", FileMode::Read)?;
//! let mut decoder = registry.create_decoder(Some("pic.bmp"), None, Box::new(io))?.unwrap();
//! let frame = decoder.next_frame_format()?;
//! let mut planes = PlaneBuffers::allocate(&frame)?;
//! decoder.decode(&mut planes.as_output())?;
//! # Ok(())
//! # }
//! ```
//!
//! BMP is decoded entirely by this crate. PNG, JPEG, and TIFF use the `png`,
//! `jpeg-decoder`, and `tiff` crates, and each has a cargo feature of the same
//! name (all on by default).

#[cfg(target_pointer_width = "16")]
compile_error!("this crate assumes 32-bit or bigger pointers!");

mod error;
pub use error::*;

pub mod status;
pub use status::StatusCode;

mod format;
pub use format::*;

mod buffer;
pub use buffer::*;

pub mod io;
pub use io::{FileIoContext, FileMode, IoContext, IoReader, MemoryIoContext, StreamIoContext};

pub mod bridge;

pub mod decoder;
pub use decoder::{DecoderProvider, ImageDecoder, Recognition};

mod registry;
pub use registry::*;

pub mod bmp;

pub mod providers;

pub mod api;
