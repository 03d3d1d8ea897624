//! Random access over forward-only decoders.

use std::fmt;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};

use super::read_full;
use crate::{Error, FilterOptions, Result};

/// Makes a forward-only reader seekable.
///
/// Decoded bytes are appended to an anonymous scratch file as they are
/// produced. Reads and backward seeks are served from the scratch file;
/// forward seeks decode up to the target first. The scratch file is removed
/// when the stream is dropped.
///
/// The logical length is either supplied up front (for formats that record
/// it, such as xz) or discovered by draining the decoder once. With a
/// supplied length, the decoder is read once more after the last byte so
/// that trailing checksums are verified; a decoder that produces more data
/// or fails that check makes every later read fail.
pub struct ForcedSeekStream<R> {
    inner: R,
    scratch: File,
    length: Option<u64>,
    position: u64,
    cached: u64,
    exhausted: bool,
    end_error: Option<String>,
    chunk_size: usize,
}

impl<R> fmt::Debug for ForcedSeekStream<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForcedSeekStream")
            .field("length", &self.length)
            .field("position", &self.position)
            .field("cached", &self.cached)
            .finish_non_exhaustive()
    }
}

impl<R: Read> ForcedSeekStream<R> {
    /// Wraps `inner`; the length is unknown until it is needed.
    pub fn new(inner: R, options: &FilterOptions) -> io::Result<Self> {
        let scratch = match &options.scratch_dir {
            Some(dir) => tempfile::tempfile_in(dir)?,
            None => tempfile::tempfile()?,
        };
        Ok(Self {
            inner,
            scratch,
            length: None,
            position: 0,
            cached: 0,
            exhausted: false,
            end_error: None,
            chunk_size: options.chunk_size.max(1),
        })
    }

    /// Wraps `inner` whose decoded length is already known.
    pub fn with_length(inner: R, length: u64, options: &FilterOptions) -> io::Result<Self> {
        let mut stream = Self::new(inner, options)?;
        stream.length = Some(length);
        Ok(stream)
    }

    /// Decodes the whole input and returns its length.
    ///
    /// The position is reset to 0 afterwards. When the length is already
    /// known this returns it without decoding.
    pub fn calculate_length(&mut self) -> io::Result<u64> {
        if let Some(length) = self.length {
            return Ok(length);
        }
        self.scratch.seek(SeekFrom::Start(self.cached))?;
        let mut chunk = vec![0u8; self.chunk_size];
        while !self.exhausted {
            let n = read_full(&mut self.inner, &mut chunk)?;
            self.scratch.write_all(&chunk[..n])?;
            self.cached += n as u64;
            if n < chunk.len() {
                self.exhausted = true;
            }
        }
        log::trace!("Decoded {} bytes into scratch store", self.cached);
        self.length = Some(self.cached);
        self.position = 0;
        Ok(self.cached)
    }

    /// Returns the logical length, decoding the input if it is unknown.
    ///
    /// Unlike [`calculate_length`](Self::calculate_length) this keeps the
    /// current position.
    pub fn len(&mut self) -> io::Result<u64> {
        let position = self.position;
        let length = self.calculate_length()?;
        self.position = position;
        Ok(length)
    }

    /// Returns `true` if the decoded stream is empty.
    pub fn is_empty(&mut self) -> io::Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Returns the length if it is already known.
    pub fn known_len(&self) -> Option<u64> {
        self.length
    }

    /// Returns the current position.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Moves to `target`, decoding forward when it lies past the scratch
    /// frontier.
    pub fn set_position(&mut self, target: u64) -> io::Result<u64> {
        if self.length.is_some_and(|length| target > length) {
            return Err(seek_past_end());
        }
        if target > self.cached {
            self.fill_to(target)?;
            if target > self.cached {
                return Err(seek_past_end());
            }
        }
        self.position = target;
        Ok(target)
    }

    /// Reads a single byte.
    ///
    /// Fails with [`io::ErrorKind::UnexpectedEof`] at the end of the stream.
    pub fn read_byte(&mut self) -> io::Result<u8> {
        let mut byte = [0u8; 1];
        self.read_exact(&mut byte)?;
        Ok(byte[0])
    }

    /// Changing the length of a decompressed view is not supported.
    pub fn set_len(&mut self, _len: u64) -> Result<()> {
        Err(Error::Unsupported("resizing a decompression stream"))
    }

    /// Releases the decoder and deletes the scratch file.
    pub fn close(self) {
        drop(self);
    }

    /// Appends decoded bytes to the scratch file until it holds `target`
    /// bytes or the decoder is exhausted.
    fn fill_to(&mut self, target: u64) -> io::Result<()> {
        if let Some(reason) = &self.end_error {
            return Err(io::Error::new(io::ErrorKind::InvalidData, reason.clone()));
        }
        if target > self.cached && !self.exhausted {
            self.scratch.seek(SeekFrom::Start(self.cached))?;
            let mut to_go = target - self.cached;
            let mut chunk = vec![0u8; (self.chunk_size as u64).min(to_go) as usize];
            while to_go > 0 {
                let wanted = (chunk.len() as u64).min(to_go) as usize;
                let n = read_full(&mut self.inner, &mut chunk[..wanted])?;
                self.scratch.write_all(&chunk[..n])?;
                self.cached += n as u64;
                to_go -= n as u64;
                if n < wanted {
                    self.exhausted = true;
                    if self.length.is_none() {
                        self.length = Some(self.cached);
                    }
                    break;
                }
            }
            log::trace!("Scratch store filled to {} bytes", self.cached);
        }
        if !self.exhausted && self.length == Some(self.cached) {
            self.confirm_end()?;
        }
        Ok(())
    }

    /// Reads past the known length so the decoder verifies its trailer.
    fn confirm_end(&mut self) -> io::Result<()> {
        let mut extra = [0u8; 1];
        let reason = match read_full(&mut self.inner, &mut extra) {
            Ok(0) => {
                self.exhausted = true;
                return Ok(());
            }
            Ok(_) => format!("decoded data continues past the recorded length of {}", self.cached),
            Err(e) => format!("decoded data fails its final check: {e}"),
        };
        log::debug!("{}", reason);
        self.end_error = Some(reason.clone());
        Err(io::Error::new(io::ErrorKind::InvalidData, reason))
    }
}

fn seek_past_end() -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, "Cannot seek after stream end")
}

impl<R: Read> Read for ForcedSeekStream<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let mut wanted_end = self.position.saturating_add(buf.len() as u64);
        if let Some(length) = self.length {
            wanted_end = wanted_end.min(length);
        }
        self.fill_to(wanted_end)?;

        let limit = match self.length {
            Some(length) => self.cached.min(length),
            None => self.cached,
        };
        if self.position >= limit {
            if let Some(length) = self.length.filter(|&length| self.exhausted && self.position < length) {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("decoded data ends at {} bytes, expected {}", self.cached, length),
                ));
            }
            return Ok(0);
        }
        let available = (limit - self.position).min(buf.len() as u64) as usize;
        self.scratch.seek(SeekFrom::Start(self.position))?;
        self.scratch.read_exact(&mut buf[..available])?;
        self.position += available as u64;
        Ok(available)
    }
}

impl<R: Read> Seek for ForcedSeekStream<R> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(n) => n,
            SeekFrom::End(n) => {
                if n > 0 {
                    return Err(seek_past_end());
                }
                self.len()?.checked_add_signed(n).ok_or_else(|| {
                    io::Error::new(io::ErrorKind::InvalidInput, "Cannot seek before stream start")
                })?
            }
            SeekFrom::Current(n) => self.position.checked_add_signed(n).ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidInput, "Cannot seek before stream start")
            })?,
        };
        self.set_position(target)
    }

    fn stream_position(&mut self) -> io::Result<u64> {
        Ok(self.position)
    }
}

impl<R> Write for ForcedSeekStream<R> {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(Error::Unsupported("writing to a decompression stream").into_io())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
