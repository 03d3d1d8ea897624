//! AppleDouble filter.
//!
//! The data fork is an ordinary file; the resource fork and metadata live in
//! a separate header file whose name depends on the tool that wrote it.

use std::fs;
use std::path::{Path, PathBuf};

use super::apple_single::{APPLE_DOUBLE_MAGIC, Container, Entry, HEADER_SIZE, has_valid_header};
use super::{Filter, FilterId, FinderInfo, Fork, Forks, opened, read_path_prefix};
use crate::stream::{ReadSeek, Source};
use crate::timestamp::Timestamp;
use crate::{Error, Result};

/// Naming conventions for AppleDouble header files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Convention {
    /// ProDOS: `R.<name>`.
    ProDos,
    /// UNIX: `%<name>`.
    Unix,
    /// MS-DOS: extension replaced by `.ADF`.
    DosUpper,
    /// MS-DOS: extension replaced by `.adf`.
    DosLower,
    /// Netatalk: `.AppleDouble/<name>`.
    Netatalk,
    /// DAVE: `resource.frk/<name>`.
    Dave,
    /// Mac OS X: `._<name>`.
    MacOsX,
    /// The Unarchiver: `<name>.rsrc`.
    Unarchiver,
}

impl Convention {
    /// All conventions in lookup order.
    pub const ALL: [Convention; 8] = [
        Convention::ProDos,
        Convention::Unix,
        Convention::DosUpper,
        Convention::DosLower,
        Convention::Netatalk,
        Convention::Dave,
        Convention::MacOsX,
        Convention::Unarchiver,
    ];

    /// Returns where this convention places the header of `data_path`.
    pub fn header_path(&self, data_path: &Path) -> Option<PathBuf> {
        let name = data_path.file_name()?.to_string_lossy();
        let parent = data_path.parent().unwrap_or_else(|| Path::new(""));
        let path = match self {
            Convention::ProDos => parent.join(format!("R.{name}")),
            Convention::Unix => parent.join(format!("%{name}")),
            Convention::DosUpper => parent.join(format!("{}.ADF", dos_stem(&name))),
            Convention::DosLower => parent.join(format!("{}.adf", dos_stem(&name))),
            Convention::Netatalk => parent.join(".AppleDouble").join(&*name),
            Convention::Dave => parent.join("resource.frk").join(&*name),
            Convention::MacOsX => parent.join(format!("._{name}")),
            Convention::Unarchiver => parent.join(format!("{name}.rsrc")),
        };
        Some(path)
    }
}

/// Returns `name` without its last extension.
fn dos_stem(name: &str) -> &str {
    match name.rfind('.') {
        Some(dot) if dot > 0 => &name[..dot],
        _ => name,
    }
}

fn is_header_file(path: &Path) -> bool {
    let Ok(meta) = fs::metadata(path) else {
        return false;
    };
    meta.is_file()
        && meta.len() > HEADER_SIZE as u64
        && read_path_prefix(path, HEADER_SIZE).is_ok_and(|buf| has_valid_header(&buf, APPLE_DOUBLE_MAGIC))
}

/// Finds the header file for `data_path`, trying each convention in order.
pub fn find_header(data_path: &Path) -> Option<(Convention, PathBuf)> {
    Convention::ALL.iter().find_map(|convention| {
        let candidate = convention.header_path(data_path)?;
        is_header_file(&candidate).then_some((*convention, candidate))
    })
}

#[derive(Debug, Clone)]
struct Opened {
    forks: Forks,
    container: Container,
    convention: Convention,
    header_path: PathBuf,
}

/// Presents a plain data file together with its AppleDouble header.
///
/// Only paths can be opened: the header is located next to the data file.
#[derive(Debug, Default)]
pub struct AppleDouble {
    state: Option<Opened>,
}

impl AppleDouble {
    /// Creates a closed filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the path of the header file in use.
    pub fn header_path(&self) -> Option<&Path> {
        Some(&self.state.as_ref()?.header_path)
    }

    /// Returns the naming convention of the header file in use.
    pub fn convention(&self) -> Option<Convention> {
        Some(self.state.as_ref()?.convention)
    }

    /// Returns the file name recorded in the RealName entry.
    pub fn real_name(&self) -> Option<&str> {
        self.state.as_ref()?.container.real_name.as_deref()
    }

    /// Returns the Finder type, creator and flags.
    pub fn finder_info(&self) -> Option<FinderInfo> {
        self.state.as_ref()?.container.finder_info
    }

    /// Returns the entry table of the header file.
    pub fn entries(&self) -> &[Entry] {
        match &self.state {
            Some(state) => &state.container.entries,
            None => &[],
        }
    }
}

impl Filter for AppleDouble {
    fn name(&self) -> &'static str {
        "AppleDouble"
    }

    fn id(&self) -> FilterId {
        FilterId::from_u128(0x1B2165EE_C9DF_4B21_BBBB_1E5892B2DF4D)
    }

    fn identify_bytes(&self, _buffer: &[u8]) -> bool {
        false
    }

    fn identify_stream(&self, _stream: &mut dyn ReadSeek) -> bool {
        false
    }

    fn identify_path(&self, path: &Path) -> bool {
        find_header(path).is_some()
    }

    fn open_bytes(&mut self, _buffer: Vec<u8>) -> Result<()> {
        Err(Error::Unsupported("AppleDouble needs a path to find its header file"))
    }

    fn open_stream(&mut self, _stream: Box<dyn ReadSeek>) -> Result<()> {
        Err(Error::Unsupported("AppleDouble needs a path to find its header file"))
    }

    fn open_path(&mut self, path: &Path) -> Result<()> {
        let (convention, header_path) =
            find_header(path).ok_or_else(|| Error::MissingCompanion(path.to_path_buf()))?;
        let header = Source::Path(header_path.clone());
        let container = Container::read(&header, APPLE_DOUBLE_MAGIC)?;

        let data = Fork::whole(Source::Path(path.to_path_buf()))?;
        let forks = Forks {
            base_path: Some(path.to_path_buf()),
            creation_time: container.creation_time,
            last_write_time: container.last_write_time,
            data: Some(data),
            resource: container.fork(&header, container.resource),
        };
        log::debug!(
            "AppleDouble: {:?} header {} for {}",
            convention,
            header_path.display(),
            path.display()
        );
        self.state = Some(Opened {
            forks,
            container,
            convention,
            header_path,
        });
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
}
