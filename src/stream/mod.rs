//! Stream plumbing shared by every filter.
//!
//! Filters never hand out their input directly. Instead they keep a
//! [`Source`] (a path, an in-memory buffer or a shared caller stream) and
//! derive independent readers from it:
//!
//! - [`OffsetStream`] exposes an inclusive byte range of a base stream as a
//!   standalone seekable stream, used for the forks stored inside
//!   AppleSingle, AppleDouble and MacBinary containers.
//! - [`ForcedSeekStream`] makes a forward-only decompressor seekable by
//!   spilling its output into an anonymous scratch file.

mod forced_seek;
mod offset;

pub use forced_seek::ForcedSeekStream;
pub use offset::OffsetStream;

use std::fmt;
use std::fs::{self, File};
use std::io::{self, Cursor, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::{Error, Result};

/// A readable, seekable stream that can move between threads.
///
/// Implemented for every `Read + Seek + Send` type, including
/// `Box<dyn ReadSeek>`.
pub trait ReadSeek: Read + Seek + Send {}

impl<T: Read + Seek + Send + ?Sized> ReadSeek for T {}

/// A caller-supplied stream shared between several readers.
///
/// Every handle tracks its own position and re-seeks the underlying stream
/// under a lock before each operation, so handles obtained from the same
/// filter never disturb each other.
#[derive(Clone)]
pub struct SharedStream {
    inner: Arc<Mutex<Box<dyn ReadSeek>>>,
    position: u64,
}

impl fmt::Debug for SharedStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedStream")
            .field("position", &self.position)
            .finish_non_exhaustive()
    }
}

impl SharedStream {
    /// Wraps a stream for shared use.
    pub fn new(stream: Box<dyn ReadSeek>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(stream)),
            position: 0,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Box<dyn ReadSeek>> {
        self.inner.lock().unwrap_or_else(|poisoned| {
            log::warn!("Shared stream lock was poisoned, continuing with inner stream");
            poisoned.into_inner()
        })
    }

    /// Returns the total length of the underlying stream.
    pub fn len(&self) -> io::Result<u64> {
        self.lock().seek(SeekFrom::End(0))
    }

    /// Returns `true` if the underlying stream is empty.
    pub fn is_empty(&self) -> io::Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl Read for SharedStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut inner = self.lock();
        inner.seek(SeekFrom::Start(self.position))?;
        let n = inner.read(buf)?;
        drop(inner);
        self.position += n as u64;
        Ok(n)
    }
}

impl Seek for SharedStream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(n) => Some(n),
            SeekFrom::Current(n) => self.position.checked_add_signed(n),
            SeekFrom::End(n) => self.len()?.checked_add_signed(n),
        };
        let target = target.ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "Cannot seek before stream start")
        })?;
        self.position = target;
        Ok(target)
    }
}

/// Where a filter's input lives.
///
/// Cloning a source is cheap: paths are reopened, buffers and streams are
/// reference counted.
#[derive(Debug, Clone)]
pub enum Source {
    /// A file on disk, reopened for every reader.
    Path(PathBuf),
    /// An in-memory buffer.
    Bytes(Arc<[u8]>),
    /// A caller-supplied stream.
    Stream(SharedStream),
}

impl Source {
    /// Wraps a caller stream.
    pub fn from_stream(stream: Box<dyn ReadSeek>) -> Self {
        Source::Stream(SharedStream::new(stream))
    }

    /// Opens a new independent reader positioned at offset 0.
    pub fn open(&self) -> io::Result<Box<dyn ReadSeek>> {
        match self {
            Source::Path(path) => Ok(Box::new(File::open(path)?)),
            Source::Bytes(bytes) => Ok(Box::new(Cursor::new(Arc::clone(bytes)))),
            Source::Stream(shared) => {
                let mut handle = shared.clone();
                handle.rewind()?;
                Ok(Box::new(handle))
            }
        }
    }

    /// Returns the length of the input in bytes.
    pub fn len(&self) -> io::Result<u64> {
        match self {
            Source::Path(path) => Ok(fs::metadata(path)?.len()),
            Source::Bytes(bytes) => Ok(bytes.len() as u64),
            Source::Stream(shared) => shared.len(),
        }
    }

    /// Returns `true` if the input is empty.
    pub fn is_empty(&self) -> io::Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Returns the path for file-backed sources.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Source::Path(path) => Some(path),
            _ => None,
        }
    }

    /// Opens a bounded view of `length` bytes starting at `offset`.
    ///
    /// Returns `Ok(None)` for a zero-length range.
    pub fn view(&self, offset: u64, length: u64) -> Result<Option<OffsetStream<Box<dyn ReadSeek>>>> {
        if length == 0 {
            return Ok(None);
        }
        let end = offset.checked_add(length - 1).ok_or(Error::OutOfRange {
            start: offset,
            end: u64::MAX,
            length: self.len()?,
        })?;
        OffsetStream::new(self.open()?, offset, end).map(Some)
    }

    /// Reads exactly `buf.len()` bytes starting at `offset`.
    pub fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        let mut reader = self.open()?;
        reader.seek(SeekFrom::Start(offset))?;
        reader.read_exact(buf)
    }
}

/// Reads until `buf` is full or the reader is exhausted.
///
/// Returns the number of bytes read, which is less than `buf.len()` only at
/// end of stream.
pub(crate) fn read_full<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_shared_stream_handles_are_independent() {
        let shared = SharedStream::new(Box::new(Cursor::new(b"abcdefgh".to_vec())));
        let mut first = shared.clone();
        let mut second = shared.clone();

        let mut buf = [0u8; 3];
        first.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"abc");

        second.seek(SeekFrom::Start(5)).unwrap();
        second.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"fgh");

        first.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"def");
    }

    #[test]
    fn test_shared_stream_seek_before_start() {
        let mut shared = SharedStream::new(Box::new(Cursor::new(vec![0u8; 4])));
        assert!(shared.seek(SeekFrom::Current(-1)).is_err());
        assert_eq!(shared.seek(SeekFrom::End(-1)).unwrap(), 3);
    }

    #[test]
    fn test_source_bytes_view() {
        let source = Source::Bytes(Arc::from(&b"0123456789"[..]));
        assert_eq!(source.len().unwrap(), 10);

        let mut view = source.view(2, 4).unwrap().unwrap();
        let mut out = Vec::new();
        view.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"2345");

        assert!(source.view(5, 0).unwrap().is_none());
        assert!(source.view(8, 4).is_err());
    }

    #[test]
    fn test_source_path_read_at() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"hello world").unwrap();
        file.flush().unwrap();

        let source = Source::Path(file.path().to_path_buf());
        assert_eq!(source.path(), Some(file.path()));
        let mut buf = [0u8; 5];
        source.read_at(6, &mut buf).unwrap();
        assert_eq!(&buf, b"world");
    }

    #[test]
    fn test_source_stream_open_rewinds() {
        let source = Source::from_stream(Box::new(Cursor::new(b"xyz".to_vec())));
        let mut a = source.open().unwrap();
        let mut byte = [0u8; 1];
        a.read_exact(&mut byte).unwrap();

        let mut b = source.open().unwrap();
        b.read_exact(&mut byte).unwrap();
        assert_eq!(byte[0], b'x');
    }

    #[test]
    fn test_read_full_short_input() {
        let mut reader = Cursor::new(vec![1u8, 2, 3]);
        let mut buf = [0u8; 8];
        assert_eq!(read_full(&mut reader, &mut buf).unwrap(), 3);
        assert_eq!(&buf[..3], &[1, 2, 3]);
    }
}
