//! LZip codec implementation.
//!
//! An lzip file is one or more members written back to back. Each member is
//! a 6-byte header, a raw LZMA stream with fixed `lc=3 lp=0 pb=2`
//! properties and a 20-byte trailer:
//!
//! | Offset      | Size | Field                       |
//! |-------------|------|-----------------------------|
//! | 0           | 4    | `LZIP` magic                |
//! | 4           | 1    | Version (1)                 |
//! | 5           | 1    | Coded dictionary size       |
//! | len - 20    | 4    | CRC32 of the decoded data   |
//! | len - 16    | 8    | Decoded data size           |
//! | len - 8     | 8    | Member size                 |
//!
//! [`scan_members`] walks the trailers backwards from the end of the file to
//! size every member without decoding. [`LzipDecoder`] decodes all members
//! in order and checks each trailer.

use std::io::{self, BufReader, Read};

use super::{Compression, Decoder};
use crate::stream::Source;
use crate::{Error, Result};

/// Member header magic including the version byte.
pub const LZIP_MAGIC: [u8; 5] = [b'L', b'Z', b'I', b'P', 0x01];

/// Size of the member header.
pub const HEADER_SIZE: u64 = 6;

/// Size of the member trailer.
pub const TRAILER_SIZE: u64 = 20;

/// Decodes the coded dictionary size byte of an lzip header.
///
/// The low 5 bits give a power of two, the top 3 bits subtract sixteenths
/// of it.
pub fn decode_dict_size(coded: u8) -> Result<u32> {
    let exponent = u32::from(coded & 0x1F);
    if !(12..=29).contains(&exponent) {
        return Err(Error::InvalidFormat(format!(
            "invalid lzip dictionary size byte: {:#04x}",
            coded
        )));
    }
    let base = 1u32 << exponent;
    Ok(base - (base / 16) * u32::from(coded >> 5))
}

/// Position and sizes of one member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LzipMember {
    /// Offset of the member header in the file.
    pub offset: u64,
    /// Decoded size recorded in the trailer.
    pub data_size: u64,
    /// Size of header, LZMA stream and trailer.
    pub member_size: u64,
    /// Dictionary size from the header.
    pub dict_size: u32,
}

/// Trailer fields of the member ending at `end`.
fn read_trailer(source: &Source, end: u64) -> Result<(u64, u64)> {
    let mut trailer = [0u8; TRAILER_SIZE as usize];
    source.read_at(end - TRAILER_SIZE, &mut trailer)?;
    let mut data_size = [0u8; 8];
    data_size.copy_from_slice(&trailer[4..12]);
    let mut member_size = [0u8; 8];
    member_size.copy_from_slice(&trailer[12..20]);
    Ok((u64::from_le_bytes(data_size), u64::from_le_bytes(member_size)))
}

/// Locates every member of an lzip file from its trailers.
///
/// Members are returned in file order.
///
/// # Errors
///
/// Returns [`Error::InvalidFormat`] if the file does not start with a
/// member and [`Error::CorruptHeader`] if a trailer records a member size
/// that does not lead back to a member header.
pub fn scan_members(source: &Source) -> Result<Vec<LzipMember>> {
    let len = source.len()?;
    if len < HEADER_SIZE + TRAILER_SIZE {
        return Err(Error::InvalidFormat("file too small for an lzip member".into()));
    }
    let mut header = [0u8; HEADER_SIZE as usize];
    source.read_at(0, &mut header)?;
    if !header.starts_with(&LZIP_MAGIC) {
        return Err(Error::InvalidFormat("missing lzip magic".into()));
    }

    let mut members = Vec::new();
    let mut end = len;
    while end > 0 {
        if end < HEADER_SIZE + TRAILER_SIZE {
            return Err(Error::corrupt_header(0, format!("{end} bytes before the first member")));
        }
        let (data_size, member_size) = read_trailer(source, end)?;
        if member_size < HEADER_SIZE + TRAILER_SIZE || member_size > end {
            return Err(Error::corrupt_header(
                end - 8,
                format!("member size {member_size} does not fit before offset {end}"),
            ));
        }
        let offset = end - member_size;
        source.read_at(offset, &mut header)?;
        if !header.starts_with(&LZIP_MAGIC) {
            return Err(Error::corrupt_header(offset, "trailer does not lead to a member header"));
        }
        members.push(LzipMember {
            offset,
            data_size,
            member_size,
            dict_size: decode_dict_size(header[5])?,
        });
        end = offset;
    }
    members.reverse();
    log::debug!("lzip: {} members", members.len());
    Ok(members)
}

/// Returns the total decoded size of `members`.
pub fn total_data_size(members: &[LzipMember]) -> Result<u64> {
    members.iter().try_fold(0u64, |total, member| {
        total
            .checked_add(member.data_size)
            .ok_or_else(|| Error::corrupt_header(member.offset, "decoded sizes overflow"))
    })
}

/// LZip decoder over every member of a file.
///
/// The CRC32, data size and member size in each trailer are checked once
/// the member is decoded.
pub struct LzipDecoder<R> {
    inner: lzma_rust2::LzipReader<BufReader<R>>,
}

impl<R> std::fmt::Debug for LzipDecoder<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LzipDecoder").finish_non_exhaustive()
    }
}

impl<R: Read + Send> LzipDecoder<R> {
    /// Creates a decoder reading from the start of the first member.
    pub fn new(input: R) -> Self {
        Self {
            inner: lzma_rust2::LzipReader::new(BufReader::new(input)),
        }
    }
}

impl<R: Read + Send> Read for LzipDecoder<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl<R: Read + Send> Decoder for LzipDecoder<R> {
    fn compression(&self) -> Compression {
        Compression::Lzip
    }
}
