//! Gzip codec implementation.
//!
//! A gzip file is one or more members written back to back; the decoder
//! yields their concatenated output.

use std::io::{self, Read};

use flate2::read::MultiGzDecoder;

use super::{Compression, Decoder};

/// Gzip member header magic: ID1, ID2 and the deflate method byte.
pub const GZIP_MAGIC: [u8; 3] = [0x1F, 0x8B, 0x08];

/// Size of the fixed part of a gzip member header.
pub const HEADER_SIZE: usize = 10;

/// Size of the member trailer (CRC32 and ISIZE).
pub const TRAILER_SIZE: usize = 8;

/// Fields of the fixed gzip header relevant to filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GzipHeader {
    /// Modification time in Unix seconds, 0 when not stored.
    pub mtime: u32,
    /// Header flag byte.
    pub flags: u8,
    /// Operating system that produced the member.
    pub os: u8,
}

impl GzipHeader {
    /// Parses the fixed 10-byte header. Returns `None` without the magic.
    pub fn parse(buf: &[u8]) -> Option<Self> {
        if buf.len() < HEADER_SIZE || !buf.starts_with(&GZIP_MAGIC) {
            return None;
        }
        Some(Self {
            flags: buf[3],
            mtime: u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]),
            os: buf[9],
        })
    }
}

/// Gzip decoder over every member of a file.
pub struct GzipDecoder<R> {
    inner: MultiGzDecoder<R>,
}

impl<R> std::fmt::Debug for GzipDecoder<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GzipDecoder").finish_non_exhaustive()
    }
}

impl<R: Read + Send> GzipDecoder<R> {
    /// Creates a new gzip decoder over a complete file.
    pub fn new(input: R) -> Self {
        Self {
            inner: MultiGzDecoder::new(input),
        }
    }
}

impl<R: Read + Send> Read for GzipDecoder<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl<R: Read + Send> Decoder for GzipDecoder<R> {
    fn compression(&self) -> Compression {
        Compression::Gzip
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use std::io::Write;

    #[test]
    fn test_gzip_decode() {
        let data = b"Hello, World! Hello, World!";
        let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(data).unwrap();
        let compressed = encoder.finish().unwrap();

        let mut decoder = GzipDecoder::new(compressed.as_slice());
        let mut out = Vec::new();
        decoder.read_to_end(&mut out).unwrap();
        assert_eq!(out, data);
        assert_eq!(decoder.compression(), Compression::Gzip);
    }

    #[test]
    fn test_gzip_decode_concatenated_members() {
        let mut compressed = Vec::new();
        for part in [&b"first member, "[..], &b"second member"[..]] {
            let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
            encoder.write_all(part).unwrap();
            compressed.extend(encoder.finish().unwrap());
        }

        let mut decoder = GzipDecoder::new(compressed.as_slice());
        let mut out = Vec::new();
        decoder.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"first member, second member");
    }

    #[test]
    fn test_header_parse() {
        let header = [0x1F, 0x8B, 0x08, 0x00, 0x10, 0x00, 0x00, 0x00, 0x00, 0x03];
        let parsed = GzipHeader::parse(&header).unwrap();
        assert_eq!(parsed.mtime, 16);
        assert_eq!(parsed.os, 3);
        assert!(GzipHeader::parse(&header[..9]).is_none());
        assert!(GzipHeader::parse(&[0x1F, 0x8B, 0x07, 0, 0, 0, 0, 0, 0, 0]).is_none());
    }
}
