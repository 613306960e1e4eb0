use std::io::{Read, Seek, SeekFrom};

use imagine::{
  FileIoContext, FileMode, IoContext, IoReader, MemoryIoContext, StatusCode, StreamIoContext,
};

#[test]
fn memory_read_all_reports_where_it_failed() {
  let data = [0_u8; 10];
  let mut io = MemoryIoContext::new(&data).with_path("mem");
  io.seek_set(6).unwrap();
  let err = io.read_all(&mut [0; 8]).unwrap_err();
  assert_eq!(err.status_code(), StatusCode::EndOfFile);
  let d = err.io_details().unwrap();
  assert_eq!(d.path.as_deref(), Some("mem"));
  assert_eq!(d.offset, 6);
  assert_eq!(d.count, 8);
  assert_eq!(d.errno, 0);
}

#[test]
fn memory_seeks_are_bounded() {
  let data = [0_u8; 10];
  let mut io = MemoryIoContext::new(&data);
  assert_eq!(io.seek_end(-3).unwrap(), 7);
  assert_eq!(io.seek_rel(3).unwrap(), 10);
  assert!(io.eof());
  assert_eq!(io.seek_rel(1).unwrap_err().status_code(), StatusCode::SeekFailed);
  assert_eq!(io.seek_set(-1).unwrap_err().status_code(), StatusCode::SeekFailed);
  assert_eq!(io.seek_end(1).unwrap_err().status_code(), StatusCode::SeekFailed);
  assert_eq!(io.tell(), 10);
  assert_eq!(io.size().unwrap(), 10);
}

#[test]
fn memory_writes() {
  let mut data = [0_u8; 4];
  {
    let mut io = MemoryIoContext::new_writable(&mut data);
    io.write_all(&[1, 2, 3]).unwrap();
    assert!(io.write_all(&[4, 5]).unwrap_err().is_end_of_file());
  }
  assert_eq!(data, [1, 2, 3, 0]);
  let mut io = MemoryIoContext::new(&data);
  assert_eq!(io.write(&[9]).unwrap_err().status_code(), StatusCode::WriteFailed);
}

#[test]
fn file_round_trip_and_eof() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("data.bin");
  {
    let mut io = FileIoContext::open(&path, FileMode::Write).unwrap();
    io.write_all(b"hello world").unwrap();
    io.flush().unwrap();
  }
  let mut io = FileIoContext::open(&path, FileMode::Read).unwrap();
  assert!(io.seekable());
  assert_eq!(io.size().unwrap(), 11);
  let mut buf = [0_u8; 5];
  io.seek_set(6).unwrap();
  io.read_all(&mut buf).unwrap();
  assert_eq!(&buf, b"world");
  assert_eq!(io.tell(), 11);
  let err = io.read_all(&mut buf).unwrap_err();
  assert!(err.is_end_of_file());
  assert_eq!(err.io_details().unwrap().offset, 11);
  assert_eq!(err.io_details().unwrap().count, 5);
  assert!(io.eof());
  io.seek_set(0).unwrap();
  assert!(!io.eof());
}

#[test]
fn missing_file_keeps_the_os_error() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("nope.bmp");
  let err = FileIoContext::open(&path, FileMode::Read).unwrap_err();
  assert_eq!(err.status_code(), StatusCode::CannotOpenFile);
  assert_eq!(err.category(), StatusCode::Io);
  let d = err.io_details().unwrap();
  assert!(d.path.as_deref().unwrap().ends_with("nope.bmp"));
  assert_ne!(d.errno, 0);
}

#[test]
fn streams_count_but_never_seek() {
  let mut io = StreamIoContext::new(&b"0123456789"[..]);
  assert!(!io.seekable());
  let mut buf = [0_u8; 4];
  io.read_all(&mut buf).unwrap();
  assert_eq!(io.tell(), 4);
  assert_eq!(io.seek_set(0).unwrap_err().status_code(), StatusCode::SeekFailed);
  assert_eq!(io.size().unwrap_err().status_code(), StatusCode::UnsupportedOperation);
  assert!(io.read_all(&mut [0; 8]).unwrap_err().is_end_of_file());
  assert!(io.eof());
}

#[test]
fn reader_adapter_is_read_and_seek() {
  let data = *b"abcdefgh";
  let mut r = IoReader::new(Box::new(MemoryIoContext::new(&data)));
  let mut buf = [0_u8; 3];
  r.read_exact(&mut buf).unwrap();
  assert_eq!(&buf, b"abc");
  assert_eq!(r.stream_position().unwrap(), 3);
  assert_eq!(r.seek(SeekFrom::End(-2)).unwrap(), 6);
  let mut rest = Vec::new();
  r.read_to_end(&mut rest).unwrap();
  assert_eq!(rest, b"gh");
  assert!(r.seek(SeekFrom::Current(-100)).is_err());

  let mut s = IoReader::new(Box::new(StreamIoContext::new(&data[..])));
  assert_eq!(s.stream_position().unwrap(), 0);
  assert_eq!(s.seek(SeekFrom::Start(1)).unwrap_err().kind(), std::io::ErrorKind::Unsupported);
}

#[test]
fn boxed_and_borrowed_contexts_forward() {
  fn tell_after_read(io: &mut dyn IoContext) -> i64 {
    io.read_all(&mut [0; 2]).unwrap();
    io.tell()
  }
  let data = [0_u8; 4];
  let mut io = MemoryIoContext::new(&data);
  let mut borrowed = &mut io;
  assert_eq!(tell_after_read(&mut borrowed), 2);
  let mut boxed: Box<dyn IoContext + '_> = Box::new(io);
  assert_eq!(tell_after_read(&mut boxed), 4);
}
