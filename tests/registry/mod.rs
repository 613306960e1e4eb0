use std::{cell::RefCell, rc::Rc};

use imagine::{
  decoder::{PRIORITY_HIGH, PRIORITY_LOW, PRIORITY_NORMAL},
  ColorFamily, DecoderProvider, FileFormat, FrameFormat, ImageDecoder, ImageType, IoContext,
  MemoryIoContext, OutputBuffer, PlaneBuffers, Recognition, Registry, Result, StatusCode,
  StreamIoContext,
};

type Log = Rc<RefCell<Vec<&'static str>>>;

/// Reads a few bytes, notes where it was when called, then either claims or
/// declines.
struct Probe {
  name: &'static str,
  priority: i32,
  claim: bool,
  greedy: usize,
  log: Log,
  seen_at: Rc<RefCell<Vec<i64>>>,
}

impl Probe {
  fn new(name: &'static str, priority: i32, log: &Log) -> Self {
    Self {
      name,
      priority,
      claim: false,
      greedy: 0,
      log: log.clone(),
      seen_at: Rc::new(RefCell::new(Vec::new())),
    }
  }
}

impl DecoderProvider for Probe {
  fn name(&self) -> &'static str {
    self.name
  }
  fn priority(&self) -> i32 {
    self.priority
  }
  fn create_decoder<'a>(
    &self, _path: Option<&str>, _format: Option<&FileFormat>, mut io: Box<dyn IoContext + 'a>,
  ) -> Result<Recognition<'a>> {
    self.log.borrow_mut().push(self.name);
    self.seen_at.borrow_mut().push(io.tell());
    let mut junk = vec![0; self.greedy];
    io.read(&mut junk)?;
    if self.claim {
      Ok(Recognition::Decoder(Box::new(Dummy(self.name))))
    } else {
      Ok(Recognition::Declined(io))
    }
  }
}

struct Dummy(&'static str);
impl ImageDecoder for Dummy {
  fn name(&self) -> &'static str {
    self.0
  }
  fn file_format(&mut self) -> Result<FileFormat> {
    Ok(FileFormat::default())
  }
  fn next_frame_format(&mut self) -> Result<FrameFormat> {
    Ok(FrameFormat::EMPTY)
  }
  fn decode(&mut self, _buffer: &mut OutputBuffer<'_>) -> Result<()> {
    Ok(())
  }
}

#[test]
fn tried_by_priority_then_registration() {
  let log = Log::default();
  let mut r = Registry::new();
  for p in [
    Probe::new("low", PRIORITY_LOW, &log),
    Probe::new("normal_a", PRIORITY_NORMAL, &log),
    Probe::new("high", PRIORITY_HIGH, &log),
    Probe::new("normal_b", PRIORITY_NORMAL, &log),
  ] {
    r.register_provider(Box::new(p)).unwrap();
  }
  assert_eq!(r.provider_names().collect::<Vec<_>>(), ["high", "normal_a", "normal_b", "low"]);

  let data = [0_u8; 4];
  let found = r.create_decoder(None, None, Box::new(MemoryIoContext::new(&data))).unwrap();
  assert!(found.is_none());
  assert_eq!(*log.borrow(), ["high", "normal_a", "normal_b", "low"]);
}

#[test]
fn first_claim_wins() {
  let log = Log::default();
  let mut r = Registry::new();
  let mut a = Probe::new("a", PRIORITY_NORMAL, &log);
  a.claim = true;
  let mut b = Probe::new("b", PRIORITY_NORMAL, &log);
  b.claim = true;
  r.register_provider(Box::new(a)).unwrap();
  r.register_provider(Box::new(b)).unwrap();
  let data = [0_u8; 4];
  let d = r.create_decoder(None, None, Box::new(MemoryIoContext::new(&data))).unwrap().unwrap();
  assert_eq!(d.name(), "a");
  assert_eq!(*log.borrow(), ["a"]);
}

#[test]
fn declines_are_rolled_back() {
  let log = Log::default();
  let mut r = Registry::new();
  let mut greedy = Probe::new("greedy", PRIORITY_HIGH, &log);
  greedy.greedy = 3;
  let next = Probe::new("next", PRIORITY_NORMAL, &log);
  let seen = next.seen_at.clone();
  r.register_provider(Box::new(greedy)).unwrap();
  r.register_provider(Box::new(next)).unwrap();

  let data = [0_u8; 8];
  let mut io = MemoryIoContext::new(&data);
  io.seek_set(2).unwrap();
  assert!(r.create_decoder(None, None, Box::new(io)).unwrap().is_none());
  assert_eq!(*seen.borrow(), [2]);
}

#[test]
fn streams_are_not_rolled_back() {
  let log = Log::default();
  let mut r = Registry::new();
  let mut greedy = Probe::new("greedy", PRIORITY_HIGH, &log);
  greedy.greedy = 3;
  let next = Probe::new("next", PRIORITY_NORMAL, &log);
  let seen = next.seen_at.clone();
  r.register_provider(Box::new(greedy)).unwrap();
  r.register_provider(Box::new(next)).unwrap();

  let io = StreamIoContext::new(&[0_u8; 8][..]);
  assert!(r.create_decoder(None, None, Box::new(io)).unwrap().is_none());
  assert_eq!(*seen.borrow(), [3]);
}

#[test]
fn disabled_providers_are_skipped() {
  let log = Log::default();
  let mut r = Registry::new();
  r.register_provider(Box::new(Probe::new("a", PRIORITY_NORMAL, &log))).unwrap();
  r.register_provider(Box::new(Probe::new("b", PRIORITY_NORMAL, &log))).unwrap();
  r.disable_provider("a");
  r.disable_provider("not there");
  assert_eq!(r.provider_names().collect::<Vec<_>>(), ["b"]);
  r.disable_provider("b");
  assert!(r.is_empty());
}

#[test]
fn default_providers_order() {
  let r = Registry::with_default_providers().unwrap();
  let names: Vec<_> = r.provider_names().collect();
  assert_eq!(names.last(), Some(&"yuv"));
  let bmp = names.iter().position(|n| *n == "bmp").unwrap();
  for high in ["png", "jpeg"] {
    if let Some(i) = names.iter().position(|n| *n == high) {
      assert!(i < bmp);
    }
  }
  #[cfg(feature = "tiff")]
  assert!(names.contains(&"tiff"));
}

#[test]
fn unrecognized_data_gives_none() {
  let r = Registry::with_default_providers().unwrap();
  let mut data = crate::rand_bytes(64);
  // no format starts with a zero byte
  data[0] = 0;
  let found = r.create_decoder(Some("noise.dat"), None, Box::new(MemoryIoContext::new(&data)));
  assert!(found.unwrap().is_none());
}

#[test]
fn yuv_needs_a_constant_format() {
  let r = Registry::with_default_providers().unwrap();
  let data = [0_u8; 8];
  let hint = FileFormat::of_type(ImageType::YuvTest);
  let found = r.create_decoder(None, Some(&hint), Box::new(MemoryIoContext::new(&data)));
  assert!(found.unwrap().is_none());
}

#[test]
fn yuv_frames_until_the_data_runs_out() {
  let r = Registry::with_default_providers().unwrap();
  let data: Vec<u8> = (0..8).collect();
  let frame = FrameFormat::uniform(ColorFamily::Gray, 2, 2, 8);
  let hint = FileFormat::new(frame, ImageType::YuvTest, 0);
  let mut d = r
    .create_decoder(Some("x.yuv"), Some(&hint), Box::new(MemoryIoContext::new(&data)))
    .unwrap()
    .unwrap();
  assert_eq!(d.name(), "yuv");
  assert_eq!(d.file_format().unwrap().frame_count, 2);

  let mut frames = Vec::new();
  loop {
    let f = d.next_frame_format().unwrap();
    if !f.is_constant() {
      break;
    }
    let mut planes = PlaneBuffers::allocate(&f).unwrap();
    d.decode(&mut planes.as_output()).unwrap();
    frames.push(planes.plane(0).to_vec());
  }
  assert_eq!(frames, [vec![0, 1, 2, 3], vec![4, 5, 6, 7]]);
}

#[test]
fn yuv_stream_reports_short_frames() {
  let r = Registry::with_default_providers().unwrap();
  let frame = FrameFormat::uniform(ColorFamily::Gray, 2, 2, 8);
  let hint = FileFormat::new(frame, ImageType::YuvTest, 0);
  let io = StreamIoContext::new(&[1_u8, 2, 3, 4, 5, 6][..]);
  let mut d = r.create_decoder(None, Some(&hint), Box::new(io)).unwrap().unwrap();
  assert_eq!(d.file_format().unwrap().frame_count, 0);

  let f = d.next_frame_format().unwrap();
  let mut planes = PlaneBuffers::allocate(&f).unwrap();
  d.decode(&mut planes.as_output()).unwrap();
  let f = d.next_frame_format().unwrap();
  assert!(f.is_constant());
  let mut planes = PlaneBuffers::allocate(&f).unwrap();
  let err = d.decode(&mut planes.as_output()).unwrap_err();
  assert_eq!(err.status_code(), StatusCode::EndOfFile);
}
