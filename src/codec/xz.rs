//! XZ container codec.
//!
//! An xz file is one or more streams, each optionally followed by stream
//! padding (a multiple of four zero bytes):
//!
//! ```text
//! +--------------+---------+-----+---------+-------+--------------+---------+
//! | Stream       | Block 0 | ... | Block n | Index | Stream       | Padding |
//! | Header (12)  |         |     |         |       | Footer (12)  |         |
//! +--------------+---------+-----+---------+-------+--------------+---------+
//! ```
//!
//! The index lists, per block, the unpadded size (header, compressed data
//! and check) and the uncompressed size. [`XzIndex::read`] walks backwards
//! from the end of the file, stream by stream, so the total decoded length
//! is known before any data is decompressed. [`XzDecoder`] decodes the
//! streams in order, including BCJ and delta filter chains.

use std::io::{self, BufReader, Read, SeekFrom};

use super::{Compression, Decoder};
use crate::stream::{ReadSeek, Source};
use crate::{Error, Result};

/// Stream header magic.
pub const HEADER_MAGIC: [u8; 6] = [0xFD, b'7', b'z', b'X', b'Z', 0x00];

/// Stream footer magic.
pub const FOOTER_MAGIC: [u8; 2] = [b'Y', b'Z'];

/// Size of the stream header and of the stream footer.
pub const STREAM_HEADER_SIZE: u64 = 12;

/// Decodes a multibyte integer as used by the xz format.
///
/// Returns the value and the number of bytes consumed, or `(0, 0)` when the
/// encoding is truncated, longer than 9 bytes, or uses a zero continuation
/// byte.
///
/// ```rust
/// use forkfilter::codec::xz::decode_varint;
///
/// assert_eq!(decode_varint(&[0x01]), (1, 1));
/// assert_eq!(decode_varint(&[0x80, 0x01]), (128, 2));
/// assert_eq!(decode_varint(&[0x80, 0x00]), (0, 0));
/// ```
pub fn decode_varint(buf: &[u8]) -> (u64, usize) {
    let size_max = buf.len().min(9);
    if size_max == 0 {
        return (0, 0);
    }
    let mut num = u64::from(buf[0] & 0x7F);
    let mut i = 0;
    while buf[i] & 0x80 != 0 {
        i += 1;
        if i >= size_max || buf[i] == 0x00 {
            return (0, 0);
        }
        num |= u64::from(buf[i] & 0x7F) << (i * 7);
    }
    (num, i + 1)
}

/// Counts the zero bytes directly before `end`.
///
/// Used to step over stream padding when scanning backwards.
pub fn zeros_before(reader: &mut dyn ReadSeek, end: u64) -> io::Result<u64> {
    let mut chunk = vec![0u8; 4096];
    let mut pos = end;
    while pos > 0 {
        let n = pos.min(chunk.len() as u64);
        let start = pos - n;
        reader.seek(SeekFrom::Start(start))?;
        reader.read_exact(&mut chunk[..n as usize])?;
        if let Some(i) = chunk[..n as usize].iter().rposition(|&b| b != 0) {
            return Ok(end - (start + i as u64 + 1));
        }
        pos = start;
    }
    Ok(end)
}

/// Returns the size of the integrity check for a check type.
fn check_size(check_type: u8) -> u64 {
    match check_type {
        0 => 0,
        1..=3 => 4,
        4..=6 => 8,
        7..=9 => 16,
        10..=12 => 32,
        _ => 64,
    }
}

fn round_up4(n: u64) -> u64 {
    n.div_ceil(4) * 4
}

fn crc_matches(data: &[u8], stored: &[u8]) -> bool {
    stored.len() == 4 && crc32fast::hash(data).to_le_bytes() == stored
}

/// Position and sizes of one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XzBlock {
    /// Offset of the block header in the file.
    pub offset: u64,
    /// Size of block header, compressed data and check, without padding.
    pub unpadded_size: u64,
    /// Decoded size of the block.
    pub uncompressed_size: u64,
}

/// One stream of an xz file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XzStream {
    /// Offset of the stream header in the file.
    pub offset: u64,
    /// Check type from the stream flags.
    pub check_type: u8,
    /// Blocks in stream order.
    pub blocks: Vec<XzBlock>,
    /// Zero bytes following the stream footer.
    pub padding: u64,
}

impl XzStream {
    /// Returns the decoded size of the stream.
    pub fn uncompressed_size(&self) -> u64 {
        self.blocks.iter().map(|b| b.uncompressed_size).sum()
    }
}

/// The decoded indexes of every stream in an xz file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XzIndex {
    /// Streams in file order.
    pub streams: Vec<XzStream>,
}

impl XzIndex {
    /// Reads the stream headers, footers and indexes of `source`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFormat`] if the magics are missing and
    /// [`Error::CorruptHeader`] if a footer, index or padding is
    /// inconsistent.
    pub fn read(source: &Source) -> Result<Self> {
        let len = source.len()?;
        if len < STREAM_HEADER_SIZE * 2 {
            return Err(Error::InvalidFormat("file too small for an xz stream".into()));
        }
        let mut magic = [0u8; 6];
        source.read_at(0, &mut magic)?;
        if magic != HEADER_MAGIC {
            return Err(Error::InvalidFormat("missing xz stream header".into()));
        }

        let mut reader = source.open()?;
        let mut streams = Vec::new();
        let mut end = len;
        while end > 0 {
            let padding = zeros_before(reader.as_mut(), end)?;
            if padding % 4 != 0 {
                return Err(Error::corrupt_header(
                    end - padding,
                    "stream padding is not a multiple of four bytes",
                ));
            }
            let footer_end = end - padding;
            if footer_end < STREAM_HEADER_SIZE * 2 {
                return Err(Error::InvalidFormat("missing xz stream footer".into()));
            }
            let stream = read_stream(source, footer_end - STREAM_HEADER_SIZE, padding)?;
            end = stream.offset;
            streams.push(stream);
        }
        streams.reverse();

        log::debug!(
            "xz index: {} streams, {} blocks",
            streams.len(),
            streams.iter().map(|s| s.blocks.len()).sum::<usize>()
        );
        Ok(Self { streams })
    }

    /// Returns the total decoded size of all streams.
    pub fn uncompressed_size(&self) -> u64 {
        self.streams.iter().map(XzStream::uncompressed_size).sum()
    }

    /// Returns the number of blocks across all streams.
    pub fn block_count(&self) -> usize {
        self.streams.iter().map(|s| s.blocks.len()).sum()
    }
}

/// Reads the stream whose footer starts at `footer_offset`.
fn read_stream(source: &Source, footer_offset: u64, padding: u64) -> Result<XzStream> {
    let mut footer = [0u8; 12];
    source.read_at(footer_offset, &mut footer)?;
    if footer[10..12] != FOOTER_MAGIC {
        return Err(Error::InvalidFormat("missing xz stream footer".into()));
    }
    if !crc_matches(&footer[4..10], &footer[0..4]) {
        return Err(Error::corrupt_header(footer_offset, "stream footer CRC mismatch"));
    }
    let check_type = footer[9] & 0x0F;

    let backward = u64::from(u32::from_le_bytes([footer[4], footer[5], footer[6], footer[7]]));
    let index_size = (backward + 1) * 4;
    let index_offset = footer_offset
        .checked_sub(index_size)
        .filter(|&offset| offset >= STREAM_HEADER_SIZE)
        .ok_or_else(|| Error::corrupt_header(footer_offset + 4, "backward size past file start"))?;

    let mut index = vec![0u8; index_size as usize];
    source.read_at(index_offset, &mut index)?;
    let records = parse_index(&index, index_offset, check_type)?;

    let blocks_size = records
        .iter()
        .try_fold(0u64, |total, &(unpadded, _)| total.checked_add(round_up4(unpadded)))
        .ok_or_else(|| Error::corrupt_header(index_offset, "index sizes overflow"))?;
    let offset = index_offset
        .checked_sub(blocks_size)
        .and_then(|start| start.checked_sub(STREAM_HEADER_SIZE))
        .ok_or_else(|| {
            Error::corrupt_header(index_offset, format!("{blocks_size} bytes of blocks do not fit before the index"))
        })?;

    let mut header = [0u8; 12];
    source.read_at(offset, &mut header)?;
    if !header.starts_with(&HEADER_MAGIC) {
        return Err(Error::corrupt_header(offset, "index does not lead to a stream header"));
    }
    if !crc_matches(&header[6..8], &header[8..12]) {
        return Err(Error::corrupt_header(offset + 6, "stream header CRC mismatch"));
    }
    if footer[8..10] != header[6..8] {
        return Err(Error::corrupt_header(
            footer_offset + 8,
            "stream flags differ between header and footer",
        ));
    }

    let mut blocks = Vec::with_capacity(records.len());
    let mut block_offset = offset + STREAM_HEADER_SIZE;
    for (unpadded_size, uncompressed_size) in records {
        blocks.push(XzBlock {
            offset: block_offset,
            unpadded_size,
            uncompressed_size,
        });
        block_offset += round_up4(unpadded_size);
    }
    Ok(XzStream {
        offset,
        check_type,
        blocks,
        padding,
    })
}

/// Parses an index field read from `offset` into `(unpadded, uncompressed)`
/// records.
fn parse_index(index: &[u8], offset: u64, check_type: u8) -> Result<Vec<(u64, u64)>> {
    let n = index.len();
    if n < 8 || index[0] != 0x00 {
        return Err(Error::corrupt_header(offset, "missing index indicator"));
    }
    if !crc_matches(&index[..n - 4], &index[n - 4..]) {
        return Err(Error::corrupt_header(offset, "index CRC mismatch"));
    }
    let body = &index[..n - 4];

    let mut pos = 1;
    let next_varint = |pos: &mut usize| -> Result<u64> {
        let (value, used) = decode_varint(&body[*pos..]);
        if used == 0 {
            return Err(Error::corrupt_header(offset + *pos as u64, "bad index integer"));
        }
        *pos += used;
        Ok(value)
    };

    let count = next_varint(&mut pos)?;
    let mut records = Vec::new();
    let check = check_size(check_type);
    for _ in 0..count {
        let unpadded_size = next_varint(&mut pos)?;
        let uncompressed_size = next_varint(&mut pos)?;
        if unpadded_size <= check {
            return Err(Error::corrupt_header(offset + pos as u64, "index record too small"));
        }
        records.push((unpadded_size, uncompressed_size));
    }

    if round_up4(pos as u64) != body.len() as u64 || body[pos..].iter().any(|&b| b != 0) {
        return Err(Error::corrupt_header(offset + pos as u64, "bad index padding"));
    }
    Ok(records)
}

/// XZ decoder over every stream of a file.
///
/// Block checks, indexes and footers are verified as they are reached.
pub struct XzDecoder<R: Read> {
    inner: lzma_rust2::XzReader<BufReader<R>>,
}

impl<R: Read> std::fmt::Debug for XzDecoder<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XzDecoder").finish_non_exhaustive()
    }
}

impl<R: Read + Send> XzDecoder<R> {
    /// Creates a decoder reading from the start of the first stream.
    pub fn new(input: R) -> Self {
        Self {
            inner: lzma_rust2::XzReader::new(BufReader::new(input), true),
        }
    }
}

impl<R: Read + Send> Read for XzDecoder<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl<R: Read + Send> Decoder for XzDecoder<R> {
    fn compression(&self) -> Compression {
        Compression::Xz
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lzma_rust2::{XzOptions, XzWriter};
    use std::io::{Cursor, Write};

    fn xz(data: &[u8]) -> Vec<u8> {
        let mut writer = XzWriter::new(Vec::new(), XzOptions::with_preset(6)).unwrap();
        writer.write_all(data).unwrap();
        writer.finish().unwrap()
    }

    #[test]
    fn test_decode_varint() {
        assert_eq!(decode_varint(&[0x01]), (1, 1));
        assert_eq!(decode_varint(&[0x80, 0x01]), (128, 2));
        assert_eq!(decode_varint(&[0x80, 0x00]), (0, 0));
        assert_eq!(decode_varint(&[]), (0, 0));
        assert_eq!(decode_varint(&[0x80]), (0, 0));
        assert_eq!(decode_varint(&[0xFF, 0x7F, 0x55]), (0x3FFF, 2));
        assert_eq!(decode_varint(&[0x80; 10]), (0, 0));
    }

    #[test]
    fn test_check_sizes() {
        assert_eq!(check_size(0), 0);
        assert_eq!(check_size(1), 4);
        assert_eq!(check_size(4), 8);
        assert_eq!(check_size(10), 32);
    }

    fn index_bytes(records: &[(u8, u8)]) -> Vec<u8> {
        let mut index = vec![0x00, records.len() as u8];
        for &(unpadded, uncompressed) in records {
            index.push(unpadded);
            index.push(uncompressed);
        }
        while index.len() % 4 != 0 {
            index.push(0);
        }
        let crc = crc32fast::hash(&index);
        index.extend_from_slice(&crc.to_le_bytes());
        index
    }

    #[test]
    fn test_parse_index() {
        let index = index_bytes(&[(0x25, 0x40), (0x11, 0x07)]);
        let records = parse_index(&index, 100, 1).unwrap();
        assert_eq!(records, vec![(0x25, 0x40), (0x11, 0x07)]);
    }

    #[test]
    fn test_parse_index_bad_crc() {
        let mut index = index_bytes(&[(0x25, 0x40)]);
        let last = index.len() - 1;
        index[last] ^= 0xFF;
        assert!(parse_index(&index, 0, 1).unwrap_err().is_corruption());
    }

    #[test]
    fn test_zeros_before() {
        let mut cursor = Cursor::new(vec![1u8, 0, 0, 2, 0, 0, 0, 0]);
        assert_eq!(zeros_before(&mut cursor, 8).unwrap(), 4);
        assert_eq!(zeros_before(&mut cursor, 3).unwrap(), 2);
        assert_eq!(zeros_before(&mut cursor, 1).unwrap(), 0);

        let mut zeros = Cursor::new(vec![0u8; 10_000]);
        assert_eq!(zeros_before(&mut zeros, 10_000).unwrap(), 10_000);
    }

    #[test]
    fn test_read_index_across_streams() {
        let first = xz(&[1u8; 3_000]);
        let first_len = first.len() as u64;
        let mut bytes = first;
        bytes.extend_from_slice(&[0u8; 8]);
        bytes.extend(xz(&[2u8; 700]));
        bytes.extend_from_slice(&[0u8; 4]);
        let source = Source::Bytes(bytes.clone().into());

        let index = XzIndex::read(&source).unwrap();
        assert_eq!(index.streams.len(), 2);
        assert_eq!(index.streams[0].offset, 0);
        assert_eq!(index.streams[0].padding, 8);
        assert_eq!(index.streams[1].offset, first_len + 8);
        assert_eq!(index.streams[1].padding, 4);
        assert_eq!(index.uncompressed_size(), 3_700);

        let mut out = Vec::new();
        XzDecoder::new(bytes.as_slice()).read_to_end(&mut out).unwrap();
        assert_eq!(out.len(), 3_700);
        assert_eq!(out[2_999], 1);
        assert_eq!(out[3_000], 2);
    }

    #[test]
    fn test_read_rejects_odd_padding() {
        let mut bytes = xz(b"payload");
        bytes.extend_from_slice(&[0u8; 3]);
        let err = XzIndex::read(&Source::Bytes(bytes.into())).unwrap_err();
        assert!(err.is_corruption());
    }

    #[test]
    fn test_read_rejects_plain_data() {
        let source = Source::Bytes(vec![0u8; 64].into());
        assert!(matches!(XzIndex::read(&source), Err(Error::InvalidFormat(_))));
    }
}
