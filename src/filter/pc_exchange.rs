//! PC Exchange filter.
//!
//! PC Exchange stores Macintosh files on FAT volumes as a plain data file,
//! a resource fork file under `RESOURCE.FRK` and a `FINDER.DAT` catalog
//! mapping 8.3 names to Macintosh names and Finder metadata.

use std::fs;
use std::path::{Path, PathBuf};

use super::{Filter, FilterId, FinderInfo, Fork, Forks, file_times, opened, pascal_string};
use crate::stream::{ReadSeek, Source};
use crate::timestamp::Timestamp;
use crate::{Error, Result};

/// Name of the catalog file.
pub const FINDER_INFO: &str = "FINDER.DAT";

/// Name of the resource fork directory.
pub const RESOURCES: &str = "RESOURCE.FRK";

/// Size of one catalog record.
pub const RECORD_SIZE: usize = 0x5C;

/// One `FINDER.DAT` record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Macintosh file name.
    pub mac_name: String,
    /// 8.3 name as stored on the FAT volume.
    pub dos_name: String,
    /// Finder type, creator and flags.
    pub finder_info: FinderInfo,
    /// Creation date, seconds since 1904.
    pub created: u32,
    /// Modification date, seconds since 1904.
    pub modified: u32,
    /// Backup date, seconds since 1904.
    pub backup: u32,
    /// Unique id, counting down from the first file.
    pub id: u32,
}

fn be_u32(buf: &[u8], at: usize) -> u32 {
    u32::from_be_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

impl CatalogEntry {
    /// Parses a 0x5C-byte record.
    pub fn parse(record: &[u8]) -> Option<Self> {
        if record.len() < RECORD_SIZE {
            return None;
        }
        Some(Self {
            mac_name: pascal_string(&record[0..32]).unwrap_or_default(),
            dos_name: dos_name(&record[76..87]),
            finder_info: FinderInfo {
                file_type: [record[32], record[33], record[34], record[35]],
                creator: [record[36], record[37], record[38], record[39]],
                flags: u16::from_be_bytes([record[40], record[41]]),
            },
            created: be_u32(record, 60),
            modified: be_u32(record, 64),
            backup: be_u32(record, 68),
            id: be_u32(record, 72),
        })
    }

    /// Returns `true` if `name` is this record's Macintosh name, DOS name or
    /// lowercased DOS name.
    pub fn matches(&self, name: &str) -> bool {
        (!self.mac_name.is_empty() && self.mac_name == name)
            || (!self.dos_name.is_empty()
                && (self.dos_name == name || self.dos_name.to_lowercase() == name))
    }

    fn data_candidates(&self) -> [String; 3] {
        [
            self.mac_name.clone(),
            self.dos_name.clone(),
            self.dos_name.to_lowercase(),
        ]
    }

    fn resource_candidates(&self) -> [String; 2] {
        [self.dos_name.clone(), self.dos_name.to_lowercase()]
    }
}

/// Joins the 8 + 3 space padded name parts, adding the dot only when there
/// is an extension.
fn dos_name(field: &[u8]) -> String {
    let base = String::from_utf8_lossy(&field[..8]);
    let ext = String::from_utf8_lossy(&field[8..11]);
    let base = base.trim_end_matches([' ', '\0']);
    let ext = ext.trim_end_matches([' ', '\0']);
    if ext.is_empty() {
        base.to_string()
    } else {
        format!("{base}.{ext}")
    }
}

/// Reads every record of a catalog file.
pub fn read_catalog(path: &Path) -> Result<Vec<CatalogEntry>> {
    let bytes = fs::read(path)?;
    if bytes.len() % RECORD_SIZE != 0 {
        log::warn!(
            "{} has {} trailing bytes",
            path.display(),
            bytes.len() % RECORD_SIZE
        );
    }
    Ok(bytes.chunks_exact(RECORD_SIZE).filter_map(CatalogEntry::parse).collect())
}

fn first_existing(dir: &Path, names: &[String]) -> Option<PathBuf> {
    names
        .iter()
        .filter(|name| !name.is_empty())
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

/// Companion files of a data file stored by PC Exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Lookup {
    entry: CatalogEntry,
    data: Option<PathBuf>,
    resource: Option<PathBuf>,
}

/// Finds the catalog record for `path` and the fork files it names.
fn lookup(path: &Path) -> Result<Option<Lookup>> {
    let parent = path.parent().unwrap_or_else(|| Path::new(""));
    let finder = parent.join(FINDER_INFO);
    let resources = parent.join(RESOURCES);
    if !finder.is_file() || !resources.is_dir() {
        return Ok(None);
    }
    let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
        return Ok(None);
    };

    let entry = read_catalog(&finder)?.into_iter().find(|entry| entry.matches(&name));
    Ok(entry.map(|entry| Lookup {
        data: first_existing(parent, &entry.data_candidates()),
        resource: first_existing(&resources, &entry.resource_candidates()),
        entry,
    }))
}

#[derive(Debug, Clone)]
struct Opened {
    forks: Forks,
    entry: CatalogEntry,
}

/// Presents a file stored by PC Exchange on a FAT volume.
///
/// Only paths can be opened. Opening fails with
/// [`Error::MissingCompanion`] when the catalog has no record for the file
/// or the data file named by the record is missing; a missing resource file
/// yields an empty resource fork.
#[derive(Debug, Default)]
pub struct PcExchange {
    state: Option<Opened>,
}

impl PcExchange {
    /// Creates a closed filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the catalog record of the opened file.
    pub fn catalog_entry(&self) -> Option<&CatalogEntry> {
        Some(&self.state.as_ref()?.entry)
    }

    /// Returns the Finder type, creator and flags.
    pub fn finder_info(&self) -> Option<FinderInfo> {
        Some(self.state.as_ref()?.entry.finder_info)
    }
}

impl Filter for PcExchange {
    fn name(&self) -> &'static str {
        "PCExchange"
    }

    fn id(&self) -> FilterId {
        FilterId::from_u128(0x9264EB9F_D634_4F9B_BE12_C24CD44988C6)
    }

    fn identify_bytes(&self, _buffer: &[u8]) -> bool {
        false
    }

    fn identify_stream(&self, _stream: &mut dyn ReadSeek) -> bool {
        false
    }

    fn identify_path(&self, path: &Path) -> bool {
        matches!(
            lookup(path),
            Ok(Some(Lookup {
                data: Some(_),
                resource: Some(_),
                ..
            }))
        )
    }

    fn open_bytes(&mut self, _buffer: Vec<u8>) -> Result<()> {
        Err(Error::Unsupported("PC Exchange needs a path to find its catalog"))
    }

    fn open_stream(&mut self, _stream: Box<dyn ReadSeek>) -> Result<()> {
        Err(Error::Unsupported("PC Exchange needs a path to find its catalog"))
    }

    fn open_path(&mut self, path: &Path) -> Result<()> {
        let found = lookup(path)?.ok_or_else(|| Error::MissingCompanion(path.to_path_buf()))?;
        let data_path = found
            .data
            .ok_or_else(|| Error::MissingCompanion(path.to_path_buf()))?;

        let resource = match &found.resource {
            Some(rsrc) => Some(Fork::whole(Source::Path(rsrc.clone()))?),
            None => {
                log::debug!("No resource fork file for {}", path.display());
                None
            }
        };
        let (fs_created, fs_modified) = file_times(&data_path);
        let entry = found.entry;
        let forks = Forks {
            base_path: Some(path.to_path_buf()),
            creation_time: if entry.created != 0 {
                Timestamp::from_mac_secs(entry.created)
            } else {
                fs_created
            },
            last_write_time: if entry.modified != 0 {
                Timestamp::from_mac_secs(entry.modified)
            } else {
                fs_modified
            },
            data: Some(Fork::whole(Source::Path(data_path))?),
            resource,
        };
        self.state = Some(Opened { forks, entry });
        Ok(())
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
        let entry = &self.state.as_ref()?.entry;
        if entry.mac_name.is_empty() {
            Some(entry.dos_name.clone())
        } else {
            Some(entry.mac_name.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(mac: &str, dos: &[u8; 11]) -> Vec<u8> {
        let mut rec = vec![0u8; RECORD_SIZE];
        rec[0] = mac.len() as u8;
        rec[1..1 + mac.len()].copy_from_slice(mac.as_bytes());
        rec[32..36].copy_from_slice(b"APPL");
        rec[36..40].copy_from_slice(b"MACS");
        rec[60..64].copy_from_slice(&2_082_844_800u32.to_be_bytes());
        rec[72..76].copy_from_slice(&0xFFFF_FFFFu32.to_be_bytes());
        rec[76..87].copy_from_slice(dos);
        rec
    }

    #[test]
    fn test_dos_name() {
        assert_eq!(dos_name(b"README  TXT"), "README.TXT");
        assert_eq!(dos_name(b"SYSTEM     "), "SYSTEM");
    }

    #[test]
    fn test_parse_record() {
        let entry = CatalogEntry::parse(&record("Read Me", b"README  TXT")).unwrap();
        assert_eq!(entry.mac_name, "Read Me");
        assert_eq!(entry.dos_name, "README.TXT");
        assert_eq!(&entry.finder_info.file_type, b"APPL");
        assert_eq!(entry.id, 0xFFFF_FFFF);
        assert!(entry.matches("Read Me"));
        assert!(entry.matches("README.TXT"));
        assert!(entry.matches("readme.txt"));
        assert!(!entry.matches("ReadMe.txt"));
    }

    #[test]
    fn test_without_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("README.TXT");
        fs::write(&data, b"text").unwrap();
        let mut filter = PcExchange::new();
        assert!(!filter.identify_path(&data));
        assert!(matches!(filter.open_path(&data), Err(Error::MissingCompanion(_))));
    }

    #[test]
    fn test_open_with_catalog() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(FINDER_INFO), record("Read Me", b"README  TXT")).unwrap();
        fs::create_dir(dir.path().join(RESOURCES)).unwrap();
        fs::write(dir.path().join(RESOURCES).join("README.TXT"), b"rsrc").unwrap();
        let data = dir.path().join("README.TXT");
        fs::write(&data, b"text data").unwrap();

        let mut filter = PcExchange::new();
        assert!(filter.identify_path(&data));
        filter.open_path(&data).unwrap();
        assert_eq!(filter.filename().as_deref(), Some("Read Me"));
        assert_eq!(filter.data_fork_len(), 9);
        assert_eq!(filter.resource_fork_len(), 4);
        assert_eq!(filter.creation_time().unwrap().as_unix_secs(), 0);
    }
}
