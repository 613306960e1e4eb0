//! Decodes an image file frame by frame, optionally dumping the raw planes.

use std::{fmt, process::ExitCode};

use anyhow::{anyhow, Context};
use clap::Parser;
use imagine::{
  ColorFamily, FileFormat, FileIoContext, FileMode, FrameFormat, ImageType, ImagineError,
  IoContext, PlaneBuffers, PlaneFormat, Registry,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "imagine", version, about = "Decode an image and dump its planes")]
struct Cli {
  /// Input image path
  input: String,

  /// Save each frame's planes, back to back, to `<PREFIX>NNNNNN.bin`
  ///
  /// A prefix of `NUL` is used as the path as-is.
  #[arg(long)]
  prefix: Option<String>,

  /// Stop after this many frames
  #[arg(long)]
  max_frames: Option<u32>,

  /// Read the input as headerless 8-bit 4:2:0 frames of this size (eg: 640x480)
  #[arg(long, value_name = "WxH", value_parser = parse_dims)]
  yuv_test: Option<(u32, u32)>,
}

fn parse_dims(s: &str) -> Result<(u32, u32), String> {
  let (w, h) = s.split_once(['x', 'X']).ok_or_else(|| String::from("expected WxH"))?;
  let w = w.parse().map_err(|e| format!("bad width: {e}"))?;
  let h = h.parse().map_err(|e| format!("bad height: {e}"))?;
  Ok((w, h))
}

fn yuv420_format(width: u32, height: u32) -> FileFormat {
  let mut frame = FrameFormat::uniform(ColorFamily::Yuv, width, height, 8);
  for chroma in &mut frame.planes[1..3] {
    *chroma = PlaneFormat::new(width.div_ceil(2), height.div_ceil(2), 8);
  }
  FileFormat::new(frame, ImageType::YuvTest, 0)
}

struct ShowType(ImageType);
impl fmt::Display for ShowType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self.0 {
      ImageType::Bmp => "bmp",
      ImageType::Dpx => "dpx",
      ImageType::Exr => "exr",
      ImageType::Jpeg => "jpeg",
      ImageType::Jpeg2000 => "jpeg2000",
      ImageType::Png => "png",
      ImageType::Tiff => "tiff",
      ImageType::YuvTest => "yuv",
      ImageType::Unknown => "",
    })
  }
}

struct ShowFrame<'f>(&'f FrameFormat);
impl fmt::Display for ShowFrame<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "planes:{}", self.0.plane_count)?;
    if !self.0.is_constant() {
      return Ok(());
    }
    f.write_str(" [")?;
    for (i, p) in self.0.active_planes().iter().enumerate() {
      if i != 0 {
        f.write_str(" ")?;
      }
      write!(f, "{}x{}", p.width, p.height)?;
    }
    f.write_str("]")
  }
}

struct ShowFile<'f>(&'f FileFormat);
impl fmt::Display for ShowFile<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "type:{} frames:{} {}",
      ShowType(self.0.image_type),
      self.0.frame_count,
      ShowFrame(&self.0.frame)
    )
  }
}

fn save_frame(planes: &PlaneBuffers, prefix: &str, n: u32) -> imagine::Result<()> {
  let path =
    if prefix == "NUL" { String::from(prefix) } else { format!("{prefix}{n:06}.bin") };
  let mut io = FileIoContext::open(&path, FileMode::Write)?;
  for p in 0..planes.plane_count() {
    io.write_all(planes.plane(p))?;
  }
  io.flush()
}

fn run(cli: &Cli) -> anyhow::Result<()> {
  let registry = Registry::with_default_providers()?;
  let hint = cli.yuv_test.map(|(w, h)| yuv420_format(w, h));
  let io = FileIoContext::open(&cli.input, FileMode::Read)?;
  let mut decoder = registry
    .create_decoder(Some(&cli.input), hint.as_ref(), Box::new(io))?
    .ok_or_else(|| anyhow!("no decoder for file"))?;

  let file_format = decoder.file_format()?;
  println!("image decoder: {}", decoder.name());
  println!("{}", ShowFile(&file_format));

  let mut decoded = 0_u32;
  loop {
    if cli.max_frames.is_some_and(|max| decoded >= max) {
      break;
    }
    let format = decoder.next_frame_format()?;
    if !format.is_constant() {
      break;
    }
    if !file_format.is_constant() {
      println!("frame {decoded}: {}", ShowFrame(&format));
    }
    let mut planes = PlaneBuffers::allocate(&format)?;
    match decoder.decode(&mut planes.as_output()) {
      Ok(()) => (),
      Err(e) if e.is_end_of_file() => {
        println!("eof on frame: {decoded}");
        break;
      }
      Err(e) => return Err(e.into()),
    }
    tracing::trace!(frame = decoded, "frame decoded");
    if let Some(prefix) = &cli.prefix {
      save_frame(&planes, prefix, decoded)
        .with_context(|| format!("saving frame {decoded}"))?;
    }
    decoded += 1;
  }
  println!("decoded {decoded} frames");
  Ok(())
}

/// The lines to print on stderr for a failed run.
fn describe(err: &anyhow::Error) -> Vec<String> {
  let Some(e) = err.downcast_ref::<ImagineError>() else {
    return vec![format!("error: {err:#}")];
  };
  let Some(d) = e.io_details() else {
    return vec![format!("imagine error: {e}")];
  };
  let mut lines = vec![format!(
    "IO error: path='{}' offset={} count={} {}",
    d.path.as_deref().unwrap_or(""),
    d.offset,
    d.count,
    e
  )];
  if d.errno != 0 {
    lines.push(format!("reason: {}", std::io::Error::from_raw_os_error(d.errno)));
  }
  lines
}

fn main() -> ExitCode {
  let cli = Cli::parse();
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
    .with_writer(std::io::stderr)
    .init();
  match run(&cli) {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      for line in describe(&e) {
        eprintln!("{line}");
      }
      ExitCode::FAILURE
    }
  }
}
