//! BZip2 codec implementation.

use std::io::{self, Read};

use bzip2::read::BzDecoder;

use super::{Compression, Decoder};

/// Returns `true` if `buf` starts with a bzip2 stream header (`BZh1`..`BZh9`).
pub fn is_stream_header(buf: &[u8]) -> bool {
    buf.len() >= 4 && buf.starts_with(b"BZh") && (b'1'..=b'9').contains(&buf[3])
}

/// BZip2 decoder.
pub struct Bzip2Decoder<R> {
    inner: BzDecoder<R>,
}

impl<R> std::fmt::Debug for Bzip2Decoder<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bzip2Decoder").finish_non_exhaustive()
    }
}

impl<R: Read + Send> Bzip2Decoder<R> {
    /// Creates a new BZip2 decoder.
    ///
    /// # Arguments
    ///
    /// * `input` - The compressed data source
    pub fn new(input: R) -> Self {
        Self {
            inner: BzDecoder::new(input),
        }
    }
}

impl<R: Read + Send> Read for Bzip2Decoder<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl<R: Read + Send> Decoder for Bzip2Decoder<R> {
    fn compression(&self) -> Compression {
        Compression::Bzip2
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bzip2::Compression as Level;
    use bzip2::write::BzEncoder;
    use std::io::Write;

    #[test]
    fn test_bzip2_decode() {
        let data = b"Hello, World! Hello, World! Hello, World!";
        let mut encoder = BzEncoder::new(Vec::new(), Level::new(9));
        encoder.write_all(data).unwrap();
        let compressed = encoder.finish().unwrap();
        assert!(is_stream_header(&compressed));

        let mut decoder = Bzip2Decoder::new(compressed.as_slice());
        let mut decompressed = Vec::new();
        decoder.read_to_end(&mut decompressed).unwrap();
        assert_eq!(decompressed, data);
    }

    #[test]
    fn test_stream_header() {
        assert!(is_stream_header(b"BZh9"));
        assert!(!is_stream_header(b"BZh0"));
        assert!(!is_stream_header(b"BZ"));
    }
}
