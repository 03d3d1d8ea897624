//! AppleSingle filter and the container layout shared with AppleDouble.
//!
//! Both formats start with a 26-byte big-endian header followed by an entry
//! table:
//!
//! | Offset | Size | Field                         |
//! |--------|------|-------------------------------|
//! | 0      | 4    | Magic number                  |
//! | 4      | 4    | Version                       |
//! | 8      | 16   | Home file system (version 1)  |
//! | 24     | 2    | Number of entries             |
//! | 26     | 12n  | Entries: id, offset, length   |
//!
//! AppleSingle carries both forks; AppleDouble stores everything except
//! the data fork in a separate header file.

use std::path::{Path, PathBuf};

use super::{
    Filter, FilterId, FinderInfo, Fork, Forks, mac_roman, opened, read_path_prefix, read_stream_at,
};
use crate::stream::{ReadSeek, Source};
use crate::timestamp::Timestamp;
use crate::{Error, Result};

/// Magic number of an AppleSingle file.
pub const APPLE_SINGLE_MAGIC: u32 = 0x0005_1600;

/// Magic number of an AppleDouble header file.
pub const APPLE_DOUBLE_MAGIC: u32 = 0x0005_1607;

/// Version 1 of the format.
pub const VERSION_1: u32 = 0x0001_0000;

/// Version 2 of the format.
pub const VERSION_2: u32 = 0x0002_0000;

/// Size of the fixed header.
pub const HEADER_SIZE: usize = 26;

/// Size of one entry descriptor.
pub const ENTRY_SIZE: usize = 12;

/// Metadata entries larger than this are not read.
const MAX_METADATA_LEN: u32 = 64 * 1024;

/// Entry identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryId {
    /// Data fork.
    DataFork,
    /// Resource fork.
    ResourceFork,
    /// File name on the home file system.
    RealName,
    /// Finder comment.
    Comment,
    /// Black and white icon.
    Icon,
    /// Color icon.
    ColorIcon,
    /// File dates and attributes, laid out per home file system (version 1).
    FileInfo,
    /// Creation, modification, backup and access dates.
    FileDates,
    /// Finder type, creator and flags.
    FinderInfo,
    /// Macintosh file attributes.
    MacFileInfo,
    /// ProDOS file type and access.
    ProDosFileInfo,
    /// MS-DOS attributes.
    DosFileInfo,
    /// AFP short name.
    ShortName,
    /// AFP file attributes.
    AfpFileInfo,
    /// AFP directory id.
    DirectoryId,
    /// An id outside the registered range.
    Unknown(u32),
}

impl From<u32> for EntryId {
    fn from(id: u32) -> Self {
        match id {
            1 => EntryId::DataFork,
            2 => EntryId::ResourceFork,
            3 => EntryId::RealName,
            4 => EntryId::Comment,
            5 => EntryId::Icon,
            6 => EntryId::ColorIcon,
            7 => EntryId::FileInfo,
            8 => EntryId::FileDates,
            9 => EntryId::FinderInfo,
            10 => EntryId::MacFileInfo,
            11 => EntryId::ProDosFileInfo,
            12 => EntryId::DosFileInfo,
            13 => EntryId::ShortName,
            14 => EntryId::AfpFileInfo,
            15 => EntryId::DirectoryId,
            other => EntryId::Unknown(other),
        }
    }
}

impl EntryId {
    /// Returns the numeric id.
    pub fn as_u32(&self) -> u32 {
        match self {
            EntryId::DataFork => 1,
            EntryId::ResourceFork => 2,
            EntryId::RealName => 3,
            EntryId::Comment => 4,
            EntryId::Icon => 5,
            EntryId::ColorIcon => 6,
            EntryId::FileInfo => 7,
            EntryId::FileDates => 8,
            EntryId::FinderInfo => 9,
            EntryId::MacFileInfo => 10,
            EntryId::ProDosFileInfo => 11,
            EntryId::DosFileInfo => 12,
            EntryId::ShortName => 13,
            EntryId::AfpFileInfo => 14,
            EntryId::DirectoryId => 15,
            EntryId::Unknown(id) => *id,
        }
    }
}

/// One entry of the entry table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry {
    /// What the entry holds.
    pub id: EntryId,
    /// Offset of the entry data from the start of the file.
    pub offset: u32,
    /// Length of the entry data.
    pub length: u32,
}

impl Entry {
    fn parse(buf: &[u8]) -> Self {
        Self {
            id: EntryId::from(be_u32(&buf[0..4])),
            offset: be_u32(&buf[4..8]),
            length: be_u32(&buf[8..12]),
        }
    }

    fn end(&self) -> u64 {
        u64::from(self.offset) + u64::from(self.length)
    }
}

/// File system named in the version 1 home file system field.
///
/// Version 2 files leave the field zeroed, which reads as [`Other`](Self::Other).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HomeFilesystem {
    /// `Macintosh`
    Macintosh,
    /// `ProDOS`
    ProDos,
    /// `Unix`
    Unix,
    /// `MS-DOS`
    MsDos,
    /// Anything else, including an empty field.
    Other,
}

impl HomeFilesystem {
    fn from_field(field: &[u8]) -> Self {
        let name = field
            .iter()
            .rposition(|&b| b != b' ' && b != 0)
            .map_or(&field[..0], |last| &field[..=last]);
        match name {
            b"Macintosh" => HomeFilesystem::Macintosh,
            b"ProDOS" => HomeFilesystem::ProDos,
            b"Unix" => HomeFilesystem::Unix,
            b"MS-DOS" => HomeFilesystem::MsDos,
            _ => HomeFilesystem::Other,
        }
    }
}

/// The fixed header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppleHeader {
    /// Magic number.
    pub magic: u32,
    /// Format version.
    pub version: u32,
    /// Home file system, meaningful in version 1 only.
    pub home_filesystem: HomeFilesystem,
    /// Number of entries in the table.
    pub entry_count: u16,
}

impl AppleHeader {
    /// Parses the first 26 bytes of `buf`.
    pub fn parse(buf: &[u8]) -> Option<Self> {
        if buf.len() < HEADER_SIZE {
            return None;
        }
        Some(Self {
            magic: be_u32(&buf[0..4]),
            version: be_u32(&buf[4..8]),
            home_filesystem: HomeFilesystem::from_field(&buf[8..24]),
            entry_count: u16::from_be_bytes([buf[24], buf[25]]),
        })
    }

    /// Returns `true` for a known version with the given magic.
    pub fn is_valid(&self, magic: u32) -> bool {
        self.magic == magic && (self.version == VERSION_1 || self.version == VERSION_2)
    }
}

fn be_u32(buf: &[u8]) -> u32 {
    u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]])
}

/// Returns `true` if `buf` starts with a valid header for `magic`.
pub(crate) fn has_valid_header(buf: &[u8], magic: u32) -> bool {
    AppleHeader::parse(buf).is_some_and(|header| header.is_valid(magic))
}

/// A parsed AppleSingle or AppleDouble container.
#[derive(Debug, Clone)]
pub(crate) struct Container {
    pub header: AppleHeader,
    pub entries: Vec<Entry>,
    pub creation_time: Timestamp,
    pub last_write_time: Timestamp,
    pub data: Option<Entry>,
    pub resource: Option<Entry>,
    pub real_name: Option<String>,
    pub finder_info: Option<FinderInfo>,
}

impl Container {
    /// Reads the header, entry table and metadata entries of `source`.
    pub(crate) fn read(source: &Source, magic: u32) -> Result<Self> {
        let len = source.len()?;
        if len < HEADER_SIZE as u64 {
            return Err(Error::InvalidFormat("file too small for an Apple container".into()));
        }
        let mut buf = [0u8; HEADER_SIZE];
        source.read_at(0, &mut buf)?;
        let header = AppleHeader::parse(&buf)
            .filter(|header| header.is_valid(magic))
            .ok_or_else(|| Error::InvalidFormat(format!("missing Apple container magic {magic:#010x}")))?;

        let table_len = usize::from(header.entry_count) * ENTRY_SIZE;
        if (HEADER_SIZE + table_len) as u64 > len {
            return Err(Error::corrupt_header(24, "entry table past end of file"));
        }
        let mut table = vec![0u8; table_len];
        source.read_at(HEADER_SIZE as u64, &mut table)?;
        let entries: Vec<Entry> = table.chunks_exact(ENTRY_SIZE).map(Entry::parse).collect();

        let now = Timestamp::now();
        let mut container = Self {
            header,
            entries: Vec::with_capacity(entries.len()),
            creation_time: now,
            last_write_time: now,
            data: None,
            resource: None,
            real_name: None,
            finder_info: None,
        };
        let mut info_dates = (None, None);
        let mut file_dates = None;

        for (i, entry) in entries.iter().enumerate() {
            let descriptor = (HEADER_SIZE + i * ENTRY_SIZE) as u64;
            match entry.id {
                EntryId::DataFork | EntryId::ResourceFork => {
                    if entry.end() > len {
                        return Err(Error::corrupt_header(
                            descriptor,
                            format!("{:?} entry ends at {} past end of file {}", entry.id, entry.end(), len),
                        ));
                    }
                    if entry.id == EntryId::DataFork {
                        container.data = Some(*entry);
                    } else {
                        container.resource = Some(*entry);
                    }
                }
                EntryId::FileDates => {
                    let payload = read_entry(source, entry, len, descriptor)?;
                    if payload.len() >= 8 {
                        file_dates = Some((
                            Timestamp::from_unix_unsigned(be_u32(&payload[0..4])),
                            Timestamp::from_unix_unsigned(be_u32(&payload[4..8])),
                        ));
                    }
                }
                EntryId::FileInfo => {
                    let payload = read_entry(source, entry, len, descriptor)?;
                    info_dates = file_info_dates(header.home_filesystem, &payload);
                }
                EntryId::RealName => {
                    let payload = read_entry(source, entry, len, descriptor)?;
                    if !payload.is_empty() {
                        container.real_name = Some(mac_roman(&payload));
                    }
                }
                EntryId::FinderInfo => {
                    let payload = read_entry(source, entry, len, descriptor)?;
                    if payload.len() >= 10 {
                        container.finder_info = Some(FinderInfo {
                            file_type: [payload[0], payload[1], payload[2], payload[3]],
                            creator: [payload[4], payload[5], payload[6], payload[7]],
                            flags: u16::from_be_bytes([payload[8], payload[9]]),
                        });
                    }
                }
                _ => {}
            }
        }

        if let Some(created) = info_dates.0 {
            container.creation_time = created;
        }
        if let Some(modified) = info_dates.1 {
            container.last_write_time = modified;
        }
        // FileDates wins over FileInfo regardless of entry order
        if let Some((created, modified)) = file_dates {
            container.creation_time = created;
            container.last_write_time = modified;
        }
        container.entries = entries;
        Ok(container)
    }

    pub(crate) fn fork(&self, source: &Source, entry: Option<Entry>) -> Option<Fork> {
        entry.map(|e| Fork::new(source.clone(), u64::from(e.offset), u64::from(e.length)))
    }
}

fn read_entry(source: &Source, entry: &Entry, len: u64, descriptor: u64) -> Result<Vec<u8>> {
    if entry.end() > len {
        return Err(Error::corrupt_header(
            descriptor,
            format!("{:?} entry past end of file", entry.id),
        ));
    }
    let mut payload = vec![0u8; entry.length.min(MAX_METADATA_LEN) as usize];
    source.read_at(u64::from(entry.offset), &mut payload)?;
    Ok(payload)
}

/// Creation and modification times from a FileInfo entry.
fn file_info_dates(home: HomeFilesystem, payload: &[u8]) -> (Option<Timestamp>, Option<Timestamp>) {
    match home {
        HomeFilesystem::Macintosh | HomeFilesystem::ProDos if payload.len() >= 8 => (
            Some(Timestamp::from_mac_secs(be_u32(&payload[0..4]))),
            Some(Timestamp::from_mac_secs(be_u32(&payload[4..8]))),
        ),
        HomeFilesystem::Unix if payload.len() >= 12 => (
            Some(Timestamp::from_unix_unsigned(be_u32(&payload[0..4]))),
            Some(Timestamp::from_unix_unsigned(be_u32(&payload[8..12]))),
        ),
        HomeFilesystem::MsDos if payload.len() >= 4 => {
            let date = u16::from_be_bytes([payload[0], payload[1]]);
            let time = u16::from_be_bytes([payload[2], payload[3]]);
            let modified = Timestamp::from_dos(date, time);
            if modified.is_none() {
                log::warn!("Ignoring invalid MS-DOS date {:#06x} time {:#06x}", date, time);
            }
            (None, modified)
        }
        _ => (None, None),
    }
}

/// Opened state of an AppleSingle filter.
#[derive(Debug, Clone)]
struct Opened {
    forks: Forks,
    container: Container,
}

/// Presents both forks of an AppleSingle file.
#[derive(Debug, Default)]
pub struct AppleSingle {
    state: Option<Opened>,
}

impl AppleSingle {
    /// Creates a closed filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the file name recorded in the RealName entry.
    pub fn real_name(&self) -> Option<&str> {
        self.state.as_ref()?.container.real_name.as_deref()
    }

    /// Returns the Finder type, creator and flags.
    pub fn finder_info(&self) -> Option<FinderInfo> {
        self.state.as_ref()?.container.finder_info
    }

    /// Returns the entry table.
    pub fn entries(&self) -> &[Entry] {
        match &self.state {
            Some(state) => &state.container.entries,
            None => &[],
        }
    }

    /// Returns the home file system of a version 1 file.
    pub fn home_filesystem(&self) -> Option<HomeFilesystem> {
        Some(self.state.as_ref()?.container.header.home_filesystem)
    }

    fn open_source(&mut self, source: Source, base_path: Option<PathBuf>) -> Result<()> {
        let container = Container::read(&source, APPLE_SINGLE_MAGIC)?;
        let forks = Forks {
            base_path,
            creation_time: container.creation_time,
            last_write_time: container.last_write_time,
            data: container.fork(&source, container.data),
            resource: container.fork(&source, container.resource),
        };
        log::debug!(
            "AppleSingle: {} entries, data {} bytes, resource {} bytes",
            container.entries.len(),
            forks.data_len(),
            forks.resource_len()
        );
        self.state = Some(Opened { forks, container });
        Ok(())
    }
}

impl Filter for AppleSingle {
    fn name(&self) -> &'static str {
        "AppleSingle"
    }

    fn id(&self) -> FilterId {
        FilterId::from_u128(0xA69B20E8_F4D3_42BB_BD2B_4A7263394A05)
    }

    fn identify_bytes(&self, buffer: &[u8]) -> bool {
        has_valid_header(buffer, APPLE_SINGLE_MAGIC)
    }

    fn identify_stream(&self, stream: &mut dyn ReadSeek) -> bool {
        let mut header = [0u8; HEADER_SIZE];
        read_stream_at(stream, 0, &mut header).is_ok() && self.identify_bytes(&header)
    }

    fn identify_path(&self, path: &Path) -> bool {
        read_path_prefix(path, HEADER_SIZE).is_ok_and(|header| self.identify_bytes(&header))
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
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn container(magic: u32, home: &[u8], entries: &[(u32, &[u8])]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&magic.to_be_bytes());
        out.extend_from_slice(&VERSION_1.to_be_bytes());
        let mut field = [b' '; 16];
        field[..home.len()].copy_from_slice(home);
        out.extend_from_slice(&field);
        out.extend_from_slice(&(entries.len() as u16).to_be_bytes());
        let mut offset = HEADER_SIZE + entries.len() * ENTRY_SIZE;
        for (id, payload) in entries {
            out.extend_from_slice(&id.to_be_bytes());
            out.extend_from_slice(&(offset as u32).to_be_bytes());
            out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
            offset += payload.len();
        }
        for (_, payload) in entries {
            out.extend_from_slice(payload);
        }
        out
    }

    fn read_all(stream: Option<Box<dyn ReadSeek>>) -> Vec<u8> {
        let mut out = Vec::new();
        stream.unwrap().read_to_end(&mut out).unwrap();
        out
    }

    #[test]
    fn test_entry_ids() {
        assert_eq!(EntryId::from(2), EntryId::ResourceFork);
        assert_eq!(EntryId::from(15), EntryId::DirectoryId);
        assert_eq!(EntryId::from(99), EntryId::Unknown(99));
        for id in 1..=16 {
            assert_eq!(EntryId::from(id).as_u32(), id);
        }
    }

    #[test]
    fn test_home_filesystem() {
        assert_eq!(HomeFilesystem::from_field(b"Macintosh       "), HomeFilesystem::Macintosh);
        assert_eq!(HomeFilesystem::from_field(b"MS-DOS          "), HomeFilesystem::MsDos);
        assert_eq!(HomeFilesystem::from_field(&[0u8; 16]), HomeFilesystem::Other);
    }

    #[test]
    fn test_both_forks() {
        let buffer = container(
            APPLE_SINGLE_MAGIC,
            b"Macintosh",
            &[(1, b"data fork"), (2, b"RSRC"), (3, b"Read Me")],
        );
        let mut filter = AppleSingle::new();
        assert!(filter.identify_bytes(&buffer));
        filter.open_bytes(buffer).unwrap();

        assert_eq!(filter.data_fork_len(), 9);
        assert_eq!(filter.resource_fork_len(), 4);
        assert_eq!(filter.len(), 13);
        assert!(filter.has_resource_fork());
        assert_eq!(read_all(filter.data_fork_stream().unwrap()), b"data fork");
        assert_eq!(read_all(filter.resource_fork_stream().unwrap()), b"RSRC");
        assert_eq!(filter.real_name(), Some("Read Me"));
        assert_eq!(filter.entries().len(), 3);
    }

    #[test]
    fn test_missing_data_fork() {
        let buffer = container(APPLE_SINGLE_MAGIC, b"Macintosh", &[(2, b"RSRC")]);
        let mut filter = AppleSingle::new();
        filter.open_bytes(buffer).unwrap();
        assert_eq!(filter.data_fork_len(), 0);
        assert!(filter.data_fork_stream().unwrap().is_none());
    }

    #[test]
    fn test_file_dates_override_file_info() {
        let mut info = Vec::new();
        info.extend_from_slice(&100u32.to_be_bytes());
        info.extend_from_slice(&200u32.to_be_bytes());
        let mut dates = Vec::new();
        dates.extend_from_slice(&1_000u32.to_be_bytes());
        dates.extend_from_slice(&2_000u32.to_be_bytes());
        dates.extend_from_slice(&[0u8; 8]);

        // FileDates before FileInfo in the table
        let buffer = container(APPLE_SINGLE_MAGIC, b"Macintosh", &[(8, &dates), (7, &info)]);
        let mut filter = AppleSingle::new();
        filter.open_bytes(buffer).unwrap();
        assert_eq!(filter.creation_time().unwrap().as_unix_secs(), 1_000);
        assert_eq!(filter.last_write_time().unwrap().as_unix_secs(), 2_000);
    }

    #[test]
    fn test_mac_file_info_dates() {
        let mut info = Vec::new();
        info.extend_from_slice(&2_082_844_800u32.to_be_bytes());
        info.extend_from_slice(&2_082_844_860u32.to_be_bytes());
        let buffer = container(APPLE_SINGLE_MAGIC, b"Macintosh", &[(7, &info)]);
        let mut filter = AppleSingle::new();
        filter.open_bytes(buffer).unwrap();
        assert_eq!(filter.creation_time().unwrap().as_unix_secs(), 0);
        assert_eq!(filter.last_write_time().unwrap().as_unix_secs(), 60);
    }

    #[test]
    fn test_prodos_file_info_dates() {
        let mut info = Vec::new();
        info.extend_from_slice(&2_082_844_920u32.to_be_bytes());
        info.extend_from_slice(&2_082_848_400u32.to_be_bytes());
        // access and file type follow the dates
        info.extend_from_slice(&[0xC3, 0x00, 0x06, 0x00, 0x00, 0x20, 0x00, 0x00]);
        let buffer = container(APPLE_SINGLE_MAGIC, b"ProDOS", &[(7, &info)]);
        let mut filter = AppleSingle::new();
        filter.open_bytes(buffer).unwrap();
        assert_eq!(filter.creation_time().unwrap().as_unix_secs(), 120);
        assert_eq!(filter.last_write_time().unwrap().as_unix_secs(), 3_600);
    }

    #[test]
    fn test_unix_file_info_dates() {
        let mut info = Vec::new();
        info.extend_from_slice(&1_000u32.to_be_bytes());
        // access time is not reported
        info.extend_from_slice(&9_999u32.to_be_bytes());
        info.extend_from_slice(&3_000u32.to_be_bytes());
        info.extend_from_slice(&[0u8; 4]);
        let buffer = container(APPLE_SINGLE_MAGIC, b"Unix", &[(7, &info)]);
        let mut filter = AppleSingle::new();
        filter.open_bytes(buffer).unwrap();
        assert_eq!(filter.creation_time().unwrap().as_unix_secs(), 1_000);
        assert_eq!(filter.last_write_time().unwrap().as_unix_secs(), 3_000);

        let (created, modified) = file_info_dates(HomeFilesystem::Unix, &info[..8]);
        assert!(created.is_none());
        assert!(modified.is_none());
    }

    #[test]
    fn test_msdos_file_info_dates() {
        // 2000-01-02 13:45:30
        let date: u16 = (20 << 9) | (1 << 5) | 2;
        let time: u16 = (13 << 11) | (45 << 5) | 15;
        let mut info = Vec::new();
        info.extend_from_slice(&date.to_be_bytes());
        info.extend_from_slice(&time.to_be_bytes());
        info.extend_from_slice(&0x20u16.to_be_bytes());

        let (created, modified) = file_info_dates(HomeFilesystem::MsDos, &info);
        assert!(created.is_none());
        assert_eq!(modified.unwrap().as_unix_secs(), 946_820_730);

        // month 13 is rejected
        let bad: u16 = (20 << 9) | (13 << 5) | 2;
        let mut invalid = info.clone();
        invalid[0..2].copy_from_slice(&bad.to_be_bytes());
        assert_eq!(file_info_dates(HomeFilesystem::MsDos, &invalid), (None, None));

        let buffer = container(APPLE_SINGLE_MAGIC, b"MS-DOS", &[(7, &info)]);
        let mut filter = AppleSingle::new();
        filter.open_bytes(buffer).unwrap();
        assert_eq!(filter.last_write_time().unwrap().as_unix_secs(), 946_820_730);
    }

    #[test]
    fn test_finder_info() {
        let mut finder = Vec::new();
        finder.extend_from_slice(b"TEXTttxt");
        finder.extend_from_slice(&0x0100u16.to_be_bytes());
        finder.extend_from_slice(&[0u8; 22]);
        let buffer = container(APPLE_SINGLE_MAGIC, b"Macintosh", &[(9, &finder)]);
        let mut filter = AppleSingle::new();
        filter.open_bytes(buffer).unwrap();
        let info = filter.finder_info().unwrap();
        assert_eq!(&info.file_type, b"TEXT");
        assert_eq!(&info.creator, b"ttxt");
        assert_eq!(info.flags, 0x0100);
    }

    #[test]
    fn test_fork_past_end_is_corrupt() {
        let mut buffer = container(APPLE_SINGLE_MAGIC, b"Macintosh", &[(1, b"data")]);
        // grow the data fork length beyond the file
        buffer[HEADER_SIZE + 8..HEADER_SIZE + 12].copy_from_slice(&1_000u32.to_be_bytes());
        let mut filter = AppleSingle::new();
        let err = filter.open_bytes(buffer).unwrap_err();
        assert!(err.is_corruption());
        assert!(!filter.is_opened());
    }

    #[test]
    fn test_rejects_apple_double_magic() {
        let buffer = container(APPLE_DOUBLE_MAGIC, b"Macintosh", &[(2, b"RSRC")]);
        let filter = AppleSingle::new();
        assert!(!filter.identify_bytes(&buffer));
    }

    #[test]
    fn test_rejects_unknown_version() {
        let mut buffer = container(APPLE_SINGLE_MAGIC, b"Unix", &[]);
        buffer[4..8].copy_from_slice(&0x0003_0000u32.to_be_bytes());
        assert!(!AppleSingle::new().identify_bytes(&buffer));
    }
}
