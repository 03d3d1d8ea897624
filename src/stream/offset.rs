//! Bounded views over a base stream.

use std::fmt;
use std::fs::File;
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::Arc;

use crate::{Error, Result};

/// A stream exposing the inclusive byte range `[start, end]` of a base
/// stream.
///
/// Position 0 of the view is byte `start` of the base. Seeking before the
/// start or past the end fails with [`io::ErrorKind::InvalidInput`].
///
/// Reads and writes treat the end of the view differently:
///
/// - [`Read::read`] is clipped to the range and returns `Ok(0)` once the view
///   is exhausted, so `read_to_end` and `io::copy` stop cleanly at `end`.
/// - [`OffsetStream::read_byte`] and `read_exact` fail with
///   [`io::ErrorKind::UnexpectedEof`] when the bytes are not there.
/// - [`Write::write`] never clips: a buffer that would run past `end` fails
///   with [`io::ErrorKind::InvalidInput`] and nothing is written.
///
/// # Example
///
/// ```rust
/// use std::io::Read;
/// use forkfilter::OffsetStream;
///
/// let mut view = OffsetStream::from_bytes(&b"..fork.."[..], 2, 5).unwrap();
/// let mut fork = String::new();
/// view.read_to_string(&mut fork).unwrap();
/// assert_eq!(fork, "fork");
/// ```
pub struct OffsetStream<S> {
    base: S,
    start: u64,
    end: u64,
    position: u64,
}

impl<S> fmt::Debug for OffsetStream<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OffsetStream")
            .field("start", &self.start)
            .field("end", &self.end)
            .field("position", &self.position)
            .finish_non_exhaustive()
    }
}

impl<S: Read + Seek> OffsetStream<S> {
    /// Creates a view over `[start, end]` of `base`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] if `start > end` or if `end` is not a
    /// valid offset in `base`.
    pub fn new(mut base: S, start: u64, end: u64) -> Result<Self> {
        let length = base.seek(SeekFrom::End(0))?;
        if start > end || end >= length {
            return Err(Error::OutOfRange { start, end, length });
        }
        base.seek(SeekFrom::Start(start))?;
        Ok(Self {
            base,
            start,
            end,
            position: 0,
        })
    }
}

impl OffsetStream<File> {
    /// Opens `path` and creates a view over `[start, end]` of it.
    pub fn open_path(path: impl AsRef<Path>, start: u64, end: u64) -> Result<Self> {
        Self::new(File::open(path)?, start, end)
    }
}

impl OffsetStream<Cursor<Arc<[u8]>>> {
    /// Creates a view over `[start, end]` of an in-memory buffer.
    pub fn from_bytes(bytes: impl Into<Arc<[u8]>>, start: u64, end: u64) -> Result<Self> {
        Self::new(Cursor::new(bytes.into()), start, end)
    }
}

impl<S> OffsetStream<S> {
    /// Returns the number of bytes in the view.
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Always `false`: a view covers at least one byte.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Returns the current position relative to the start of the view.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Returns the first base offset covered by the view.
    pub fn start(&self) -> u64 {
        self.start
    }

    /// Returns the last base offset covered by the view (inclusive).
    pub fn end(&self) -> u64 {
        self.end
    }

    /// Changing the length of a bounded view is not supported.
    pub fn set_len(&mut self, _len: u64) -> Result<()> {
        Err(Error::Unsupported("resizing a bounded view"))
    }

    /// Consumes the view and returns the base stream.
    pub fn into_inner(self) -> S {
        self.base
    }

    fn remaining(&self) -> u64 {
        self.len() - self.position
    }
}

impl<S: Read> OffsetStream<S> {
    /// Reads a single byte.
    ///
    /// Fails with [`io::ErrorKind::UnexpectedEof`] at the end of the view.
    pub fn read_byte(&mut self) -> io::Result<u8> {
        if self.remaining() == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "Cannot read past stream end",
            ));
        }
        let mut byte = [0u8; 1];
        self.read_exact(&mut byte)?;
        Ok(byte[0])
    }
}

impl<S: Write> OffsetStream<S> {
    /// Writes a single byte.
    pub fn write_byte(&mut self, byte: u8) -> io::Result<()> {
        self.write_all(&[byte])
    }
}

impl<S: Read> Read for OffsetStream<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = self.remaining();
        if remaining == 0 || buf.is_empty() {
            return Ok(0);
        }
        let wanted = (buf.len() as u64).min(remaining) as usize;
        let n = self.base.read(&mut buf[..wanted])?;
        self.position += n as u64;
        Ok(n)
    }
}

impl<S: Write> Write for OffsetStream<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.len() as u64 > self.remaining() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "Cannot write past stream end",
            ));
        }
        let n = self.base.write(buf)?;
        self.position += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.base.flush()
    }
}

impl<S: Seek> Seek for OffsetStream<S> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let len = self.len();
        let target = match pos {
            SeekFrom::Start(n) => Some(n),
            SeekFrom::Current(n) => self.position.checked_add_signed(n),
            SeekFrom::End(n) => len.checked_add_signed(n),
        };
        let target = target.ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "Cannot seek before stream start")
        })?;
        if target > len {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "Cannot seek after stream end",
            ));
        }
        self.base.seek(SeekFrom::Start(self.start + target))?;
        self.position = target;
        Ok(target)
    }

    fn stream_position(&mut self) -> io::Result<u64> {
        Ok(self.position)
    }
}
