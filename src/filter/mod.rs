//! Filters: views that present a container file as a data fork and a
//! resource fork.
//!
//! Every filter follows the same lifecycle:
//!
//! 1. `identify_*` answers whether the input looks like the filter's format.
//!    It never fails; unreadable input simply does not match.
//! 2. `open_*` parses the container and records where the forks live.
//! 3. `data_fork_stream` / `resource_fork_stream` hand out independent
//!    seekable readers, any number of times.
//! 4. `close` releases everything; the filter can be opened again.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::io::Read;
//! use std::path::Path;
//! use forkfilter::filter::{AppleSingle, Filter};
//!
//! let mut filter = AppleSingle::new();
//! let path = Path::new("Read Me.as");
//! if filter.identify_path(path) {
//!     filter.open_path(path)?;
//!     if let Some(mut rsrc) = filter.resource_fork_stream()? {
//!         let mut bytes = Vec::new();
//!         rsrc.read_to_end(&mut bytes)?;
//!         println!("{} bytes of resources", bytes.len());
//!     }
//! }
//! # Ok::<(), forkfilter::Error>(())
//! ```

pub mod apple_double;
pub mod apple_single;
pub mod identity;
pub mod macbinary;
pub mod pc_exchange;

#[cfg(feature = "bzip2")]
pub mod bzip2;
#[cfg(feature = "gzip")]
pub mod gzip;
#[cfg(feature = "lzma")]
pub mod lzip;
#[cfg(feature = "lzma")]
pub mod xz;

pub use apple_double::AppleDouble;
pub use apple_single::AppleSingle;
pub use identity::Identity;
pub use macbinary::MacBinary;
pub use pc_exchange::PcExchange;

#[cfg(feature = "bzip2")]
pub use self::bzip2::BZip2;
#[cfg(feature = "gzip")]
pub use gzip::GZip;
#[cfg(feature = "lzma")]
pub use lzip::LZip;
#[cfg(feature = "lzma")]
pub use xz::Xz;

use std::fmt;
use std::fs;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::codec::Decoder;
use crate::config::FilterOptions;
use crate::stream::{ForcedSeekStream, ReadSeek, Source};
use crate::timestamp::Timestamp;
use crate::{Error, Result};

/// Stable identifier of a filter implementation.
///
/// Displayed in the usual 8-4-4-4-12 hexadecimal form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FilterId(u128);

impl FilterId {
    /// Creates an id from its 128-bit value.
    pub const fn from_u128(value: u128) -> Self {
        Self(value)
    }

    /// Returns the 128-bit value.
    pub const fn as_u128(&self) -> u128 {
        self.0
    }
}

impl fmt::Display for FilterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v = self.0;
        write!(
            f,
            "{:08X}-{:04X}-{:04X}-{:04X}-{:012X}",
            (v >> 96) as u32,
            (v >> 80) as u16,
            (v >> 64) as u16,
            (v >> 48) as u16,
            v & 0xFFFF_FFFF_FFFF
        )
    }
}

/// Finder metadata stored alongside a Macintosh file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FinderInfo {
    /// Four-character file type, e.g. `TEXT`.
    pub file_type: [u8; 4],
    /// Four-character creator code, e.g. `ttxt`.
    pub creator: [u8; 4],
    /// Finder flags.
    pub flags: u16,
}

impl FinderInfo {
    /// Returns the file type as text.
    pub fn file_type_str(&self) -> String {
        mac_roman(&self.file_type)
    }

    /// Returns the creator code as text.
    pub fn creator_str(&self) -> String {
        mac_roman(&self.creator)
    }
}

/// A container format that yields a data fork and a resource fork.
///
/// Implementations are created closed. All accessors on a closed filter
/// return zero, `None` or [`Error::NotOpened`].
pub trait Filter: Send + fmt::Debug {
    /// Returns the human-readable filter name.
    fn name(&self) -> &'static str;

    /// Returns the stable identifier of this filter.
    fn id(&self) -> FilterId;

    /// Returns `true` if `buffer` holds this filter's format.
    fn identify_bytes(&self, buffer: &[u8]) -> bool;

    /// Returns `true` if `stream` holds this filter's format.
    ///
    /// The stream position is unspecified afterwards.
    fn identify_stream(&self, stream: &mut dyn ReadSeek) -> bool;

    /// Returns `true` if the file at `path` holds this filter's format.
    fn identify_path(&self, path: &Path) -> bool;

    /// Opens an in-memory container.
    fn open_bytes(&mut self, buffer: Vec<u8>) -> Result<()>;

    /// Opens a container from a caller stream.
    fn open_stream(&mut self, stream: Box<dyn ReadSeek>) -> Result<()>;

    /// Opens the container at `path`.
    fn open_path(&mut self, path: &Path) -> Result<()>;

    /// Releases the opened input. Safe to call on a closed filter.
    fn close(&mut self);

    /// Returns `true` between a successful `open_*` and `close`.
    fn is_opened(&self) -> bool;

    /// Returns the data fork length in bytes.
    fn data_fork_len(&self) -> u64;

    /// Returns a new reader over the data fork, `None` if it is absent or
    /// empty.
    fn data_fork_stream(&self) -> Result<Option<Box<dyn ReadSeek>>>;

    /// Returns the resource fork length in bytes.
    fn resource_fork_len(&self) -> u64;

    /// Returns a new reader over the resource fork, `None` if it is absent
    /// or empty.
    fn resource_fork_stream(&self) -> Result<Option<Box<dyn ReadSeek>>>;

    /// Returns the combined length of both forks.
    fn len(&self) -> u64 {
        self.data_fork_len() + self.resource_fork_len()
    }

    /// Returns `true` if both forks are empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if the resource fork holds data.
    fn has_resource_fork(&self) -> bool {
        self.resource_fork_len() > 0
    }

    /// Returns the creation time recorded by the container.
    fn creation_time(&self) -> Option<Timestamp>;

    /// Returns the modification time recorded by the container.
    fn last_write_time(&self) -> Option<Timestamp>;

    /// Returns the path the filter was opened from.
    fn base_path(&self) -> Option<&Path>;

    /// Returns the path of the file the forks are presented for.
    fn path(&self) -> Option<&Path> {
        self.base_path()
    }

    /// Returns the name of the contained file.
    fn filename(&self) -> Option<String> {
        self.base_path()?
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
    }

    /// Returns the directory containing the opened file.
    fn parent_folder(&self) -> Option<PathBuf> {
        self.base_path()?.parent().map(Path::to_path_buf)
    }
}

/// A fork stored as a byte range of a source.
#[derive(Debug, Clone)]
pub(crate) struct Fork {
    source: Source,
    offset: u64,
    length: u64,
}

impl Fork {
    pub(crate) fn new(source: Source, offset: u64, length: u64) -> Self {
        Self {
            source,
            offset,
            length,
        }
    }

    /// A fork spanning the whole source.
    pub(crate) fn whole(source: Source) -> Result<Self> {
        let length = source.len()?;
        Ok(Self::new(source, 0, length))
    }

    pub(crate) fn stream(&self) -> Result<Option<Box<dyn ReadSeek>>> {
        Ok(self
            .source
            .view(self.offset, self.length)?
            .map(|view| Box::new(view) as Box<dyn ReadSeek>))
    }
}

/// Opened state shared by filters whose forks are stored uncompressed.
#[derive(Debug, Clone)]
pub(crate) struct Forks {
    pub base_path: Option<PathBuf>,
    pub creation_time: Timestamp,
    pub last_write_time: Timestamp,
    pub data: Option<Fork>,
    pub resource: Option<Fork>,
}

impl Forks {
    pub(crate) fn data_len(&self) -> u64 {
        self.data.as_ref().map_or(0, |fork| fork.length)
    }

    pub(crate) fn resource_len(&self) -> u64 {
        self.resource.as_ref().map_or(0, |fork| fork.length)
    }

    pub(crate) fn data_stream(&self) -> Result<Option<Box<dyn ReadSeek>>> {
        match &self.data {
            Some(fork) => fork.stream(),
            None => Ok(None),
        }
    }

    pub(crate) fn resource_stream(&self) -> Result<Option<Box<dyn ReadSeek>>> {
        match &self.resource {
            Some(fork) => fork.stream(),
            None => Ok(None),
        }
    }
}

/// Opened state shared by the single-file decompressing filters.
///
/// When the decoded length had to be measured by decoding at open time, the
/// measured stream is kept and handed out by the first `data_fork_stream`
/// call instead of decoding again.
pub(crate) struct Compressed {
    pub source: Source,
    pub base_path: Option<PathBuf>,
    pub creation_time: Timestamp,
    pub last_write_time: Timestamp,
    pub length: u64,
    options: FilterOptions,
    measured: Mutex<Option<ForcedSeekStream<Box<dyn Decoder>>>>,
}

impl fmt::Debug for Compressed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Compressed")
            .field("base_path", &self.base_path)
            .field("length", &self.length)
            .finish_non_exhaustive()
    }
}

impl Compressed {
    /// State for a format that records its decoded length.
    pub(crate) fn with_length(
        source: Source,
        base_path: Option<PathBuf>,
        length: u64,
        options: &FilterOptions,
    ) -> Self {
        let (creation_time, last_write_time) = source_times(base_path.as_deref());
        Self {
            source,
            base_path,
            creation_time,
            last_write_time,
            length,
            options: options.clone(),
            measured: Mutex::new(None),
        }
    }

    /// State for a format whose decoded length is found by decoding.
    pub(crate) fn measure(
        source: Source,
        base_path: Option<PathBuf>,
        decoder: Box<dyn Decoder>,
        options: &FilterOptions,
    ) -> Result<Self> {
        let mut stream = ForcedSeekStream::new(decoder, options)?;
        let length = stream.calculate_length()?;
        let mut state = Self::with_length(source, base_path, length, options);
        state.measured = Mutex::new(Some(stream));
        Ok(state)
    }

    /// Returns a reader over the decoded data.
    pub(crate) fn stream(
        &self,
        decoder: impl FnOnce(&Source) -> Result<Box<dyn Decoder>>,
    ) -> Result<Option<Box<dyn ReadSeek>>> {
        if self.length == 0 {
            return Ok(None);
        }
        let measured = self
            .measured
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(mut stream) = measured {
            stream.seek(SeekFrom::Start(0))?;
            return Ok(Some(Box::new(stream)));
        }
        let stream = ForcedSeekStream::with_length(decoder(&self.source)?, self.length, &self.options)?;
        Ok(Some(Box::new(stream)))
    }
}

/// Creation and modification times for a source, from the file system when
/// it is a file and the current time otherwise.
pub(crate) fn source_times(path: Option<&Path>) -> (Timestamp, Timestamp) {
    match path {
        Some(path) => file_times(path),
        None => {
            let now = Timestamp::now();
            (now, now)
        }
    }
}

/// Creation and modification times of a file.
pub(crate) fn file_times(path: &Path) -> (Timestamp, Timestamp) {
    let Ok(meta) = fs::metadata(path) else {
        let now = Timestamp::now();
        return (now, now);
    };
    let modified = meta
        .modified()
        .ok()
        .and_then(Timestamp::from_system_time)
        .unwrap_or_else(Timestamp::now);
    let created = meta
        .created()
        .ok()
        .and_then(Timestamp::from_system_time)
        .unwrap_or(modified);
    (created, modified)
}

/// Decodes Mac OS Roman text.
pub(crate) fn mac_roman(bytes: &[u8]) -> String {
    encoding_rs::MACINTOSH.decode(bytes).0.into_owned()
}

/// Decodes a Pascal string (length byte followed by MacRoman text) stored
/// in a field of `field.len()` bytes.
pub(crate) fn pascal_string(field: &[u8]) -> Option<String> {
    let (&len, rest) = field.split_first()?;
    let len = usize::from(len).min(rest.len());
    if len == 0 {
        return None;
    }
    Some(mac_roman(&rest[..len]))
}

/// Returns the length of a stream.
pub(crate) fn stream_len(stream: &mut dyn ReadSeek) -> io::Result<u64> {
    stream.seek(SeekFrom::End(0))
}

/// Reads exactly `buf.len()` bytes from `stream` at `offset`.
pub(crate) fn read_stream_at(stream: &mut dyn ReadSeek, offset: u64, buf: &mut [u8]) -> io::Result<()> {
    stream.seek(SeekFrom::Start(offset))?;
    stream.read_exact(buf)
}

/// Reads up to `limit` bytes from the start of `path`.
pub(crate) fn read_path_prefix(path: &Path, limit: usize) -> io::Result<Vec<u8>> {
    let file = fs::File::open(path)?;
    let mut buf = Vec::with_capacity(limit);
    file.take(limit as u64).read_to_end(&mut buf)?;
    Ok(buf)
}

/// Returns the opened state or [`Error::NotOpened`].
pub(crate) fn opened<T>(state: &Option<T>) -> Result<&T> {
    state.as_ref().ok_or(Error::NotOpened)
}
