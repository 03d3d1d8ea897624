//! MacBinary filter (versions I, II and III).
//!
//! A MacBinary file is a 128-byte header followed by an optional secondary
//! header, the data fork and the resource fork, each padded to a multiple
//! of 128 bytes.

use std::path::{Path, PathBuf};

use super::{Filter, FilterId, FinderInfo, Fork, Forks, opened, pascal_string, read_path_prefix, read_stream_at};
use crate::stream::{ReadSeek, Source};
use crate::timestamp::Timestamp;
use crate::{Error, Result};

/// Size of the fixed header and of the padding blocks.
pub const BLOCK_SIZE: u64 = 128;

/// MacBinary III signature at offset 102.
pub const MACBINARY_MAGIC: [u8; 4] = *b"mBIN";

/// Decoded 128-byte MacBinary header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacBinaryHeader {
    /// Old version number, always zero.
    pub old_version: u8,
    /// Length of the file name (1 to 63).
    pub name_len: u8,
    /// File name bytes including the length prefix.
    pub name: [u8; 64],
    /// Finder file type.
    pub file_type: [u8; 4],
    /// Finder creator code.
    pub creator: [u8; 4],
    /// High byte of the Finder flags.
    pub finder_flags: u8,
    /// Must be zero.
    pub zero1: u8,
    /// Vertical position in the window.
    pub vertical: u16,
    /// Horizontal position in the window.
    pub horizontal: u16,
    /// Window or folder id.
    pub window_id: u16,
    /// Protected flag.
    pub protected: u8,
    /// Must be zero.
    pub zero2: u8,
    /// Data fork length.
    pub data_len: u32,
    /// Resource fork length.
    pub resource_len: u32,
    /// Creation date, seconds since 1904.
    pub created: u32,
    /// Modification date, seconds since 1904.
    pub modified: u32,
    /// Length of the Get Info comment following the forks.
    pub comment_len: u16,
    /// Low byte of the Finder flags (version II).
    pub finder_flags2: u8,
    /// `mBIN` in version III.
    pub signature: [u8; 4],
    /// Script of the file name (version III).
    pub script: u8,
    /// Extended Finder flags (version III).
    pub ext_flags: u8,
    /// Unused, zero.
    pub reserved: [u8; 8],
    /// Total unpacked length for compressed files.
    pub unpacked_total: u32,
    /// Length of the secondary header.
    pub secondary_header_len: u16,
    /// Version of the writer (129 for II, 130 for III).
    pub version: u8,
    /// Minimum version needed to read the file.
    pub min_version: u8,
    /// CRC of the first 124 bytes.
    pub crc: u16,
    /// Reserved for computer type.
    pub computer: u16,
}

fn be_u16(buf: &[u8], at: usize) -> u16 {
    u16::from_be_bytes([buf[at], buf[at + 1]])
}

fn be_u32(buf: &[u8], at: usize) -> u32 {
    u32::from_be_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

fn array<const N: usize>(buf: &[u8], at: usize) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&buf[at..at + N]);
    out
}

impl MacBinaryHeader {
    /// Parses a 128-byte header. Returns `None` if `buf` is shorter.
    pub fn parse(buf: &[u8]) -> Option<Self> {
        if buf.len() < BLOCK_SIZE as usize {
            return None;
        }
        Some(Self {
            old_version: buf[0],
            name_len: buf[1],
            name: array(buf, 1),
            file_type: array(buf, 65),
            creator: array(buf, 69),
            finder_flags: buf[73],
            zero1: buf[74],
            vertical: be_u16(buf, 75),
            horizontal: be_u16(buf, 77),
            window_id: be_u16(buf, 79),
            protected: buf[81],
            zero2: buf[82],
            data_len: be_u32(buf, 83),
            resource_len: be_u32(buf, 87),
            created: be_u32(buf, 91),
            modified: be_u32(buf, 95),
            comment_len: be_u16(buf, 99),
            finder_flags2: buf[101],
            signature: array(buf, 102),
            script: buf[106],
            ext_flags: buf[107],
            reserved: array(buf, 108),
            unpacked_total: be_u32(buf, 116),
            secondary_header_len: be_u16(buf, 120),
            version: buf[122],
            min_version: buf[123],
            crc: be_u16(buf, 124),
            computer: be_u16(buf, 126),
        })
    }

    /// Returns `true` if the header is MacBinary: either the version III
    /// signature, or the layout checks every MacBinary I writer satisfies.
    pub fn is_valid(&self) -> bool {
        self.signature == MACBINARY_MAGIC
            || (self.old_version == 0
                && self.name_len > 0
                && self.name_len < 64
                && self.zero1 == 0
                && self.zero2 == 0
                && self.reserved.iter().all(|&b| b == 0)
                && (self.data_len > 0 || self.resource_len > 0))
    }

    /// Offset of the data fork.
    pub fn data_offset(&self) -> u64 {
        BLOCK_SIZE * (1 + u64::from(self.secondary_header_len).div_ceil(BLOCK_SIZE))
    }

    /// Offset of the resource fork.
    pub fn resource_offset(&self) -> u64 {
        self.data_offset() + BLOCK_SIZE * u64::from(self.data_len).div_ceil(BLOCK_SIZE)
    }

    /// Returns the file name.
    pub fn filename(&self) -> Option<String> {
        pascal_string(&self.name)
    }

    /// Returns the Finder type, creator and combined flags.
    pub fn finder_info(&self) -> FinderInfo {
        FinderInfo {
            file_type: self.file_type,
            creator: self.creator,
            flags: u16::from_be_bytes([self.finder_flags, self.finder_flags2]),
        }
    }
}

#[derive(Debug, Clone)]
struct Opened {
    forks: Forks,
    header: MacBinaryHeader,
}

/// Presents both forks of a MacBinary file.
#[derive(Debug, Default)]
pub struct MacBinary {
    state: Option<Opened>,
}

impl MacBinary {
    /// Creates a closed filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the decoded header.
    pub fn header(&self) -> Option<&MacBinaryHeader> {
        Some(&self.state.as_ref()?.header)
    }

    /// Returns the Finder type, creator and flags.
    pub fn finder_info(&self) -> Option<FinderInfo> {
        Some(self.state.as_ref()?.header.finder_info())
    }

    fn open_source(&mut self, source: Source, base_path: Option<PathBuf>) -> Result<()> {
        let len = source.len()?;
        let mut buf = [0u8; BLOCK_SIZE as usize];
        if len < BLOCK_SIZE {
            return Err(Error::InvalidFormat("file too small for a MacBinary header".into()));
        }
        source.read_at(0, &mut buf)?;
        let header = MacBinaryHeader::parse(&buf)
            .filter(MacBinaryHeader::is_valid)
            .ok_or_else(|| Error::InvalidFormat("not a MacBinary header".into()))?;

        let data_offset = header.data_offset();
        let resource_offset = header.resource_offset();
        let data_len = u64::from(header.data_len);
        let resource_len = u64::from(header.resource_len);
        if data_len > 0 && data_offset + data_len > len {
            return Err(Error::corrupt_header(83, "data fork past end of file"));
        }
        if resource_len > 0 && resource_offset + resource_len > len {
            return Err(Error::corrupt_header(87, "resource fork past end of file"));
        }

        let forks = Forks {
            base_path,
            creation_time: Timestamp::from_mac_secs(header.created),
            last_write_time: Timestamp::from_mac_secs(header.modified),
            data: Some(Fork::new(source.clone(), data_offset, data_len)),
            resource: Some(Fork::new(source, resource_offset, resource_len)),
        };
        log::debug!(
            "MacBinary: data {} bytes at {}, resource {} bytes at {}",
            data_len,
            data_offset,
            resource_len,
            resource_offset
        );
        self.state = Some(Opened { forks, header });
        Ok(())
    }
}

impl Filter for MacBinary {
    fn name(&self) -> &'static str {
        "MacBinary"
    }

    fn id(&self) -> FilterId {
        FilterId::from_u128(0xD7C321D3_E51F_45DF_A150_F6BFDF0D7704)
    }

    fn identify_bytes(&self, buffer: &[u8]) -> bool {
        MacBinaryHeader::parse(buffer).is_some_and(|header| header.is_valid())
    }

    fn identify_stream(&self, stream: &mut dyn ReadSeek) -> bool {
        let mut header = [0u8; BLOCK_SIZE as usize];
        read_stream_at(stream, 0, &mut header).is_ok() && self.identify_bytes(&header)
    }

    fn identify_path(&self, path: &Path) -> bool {
        read_path_prefix(path, BLOCK_SIZE as usize).is_ok_and(|header| self.identify_bytes(&header))
    }

    fn open_bytes(&mut self, buffer: Vec<u8>) -> Result<()> {
        self.open_source(Source::Bytes(buffer.into()), None)
    }

    fn open_stream(&mut self, stream: Box<dyn ReadSeek>) -> Result<()> {
        self.open_source(Source::from_stream(stream), None)
    }

    fn open_path(&mut self, path: &Path) -> Result<()> {
        self.open_source(Source::Path(path.to_path_buf()), Some(path.to_path_buf()))
    }

    fn close(&mut self) {
        self.state = None;
    }

    fn is_opened(&self) -> bool {
        self.state.is_some()
    }

    fn data_fork_len(&self) -> u64 {
        self.state.as_ref().map_or(0, |s| s.forks.data_len())
    }

    fn data_fork_stream(&self) -> Result<Option<Box<dyn ReadSeek>>> {
        opened(&self.state)?.forks.data_stream()
    }

    fn resource_fork_len(&self) -> u64 {
        self.state.as_ref().map_or(0, |s| s.forks.resource_len())
    }

    fn resource_fork_stream(&self) -> Result<Option<Box<dyn ReadSeek>>> {
        opened(&self.state)?.forks.resource_stream()
    }

    fn creation_time(&self) -> Option<Timestamp> {
        self.state.as_ref().map(|s| s.forks.creation_time)
    }

    fn last_write_time(&self) -> Option<Timestamp> {
        self.state.as_ref().map(|s| s.forks.last_write_time)
    }

    fn base_path(&self) -> Option<&Path> {
        self.state.as_ref()?.forks.base_path.as_deref()
    }

    fn filename(&self) -> Option<String> {
        self.state.as_ref()?.header.filename()
    }
}
