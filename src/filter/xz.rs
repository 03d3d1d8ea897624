//! XZ filter.

use std::path::{Path, PathBuf};

use super::{Compressed, Filter, FilterId, opened, read_stream_at, stream_len};
use crate::codec::xz::{FOOTER_MAGIC, HEADER_MAGIC, XzDecoder, XzIndex, zeros_before};
use crate::codec::{Compression, Decoder};
use crate::config::FilterOptions;
use crate::stream::{ReadSeek, Source};
use crate::timestamp::Timestamp;
use crate::Result;

/// Presents the decompressed content of an xz file as its data fork.
///
/// The decoded length is the sum of the block sizes in the indexes of every
/// stream, read at open time without decompressing. Concatenated streams,
/// stream padding and BCJ or delta filter chains are supported.
#[derive(Debug, Default)]
pub struct Xz {
    options: FilterOptions,
    index: Option<XzIndex>,
    state: Option<Compressed>,
}

impl Xz {
    /// Creates a closed filter with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a closed filter with custom options.
    pub fn with_options(options: FilterOptions) -> Self {
        Self {
            options,
            index: None,
            state: None,
        }
    }

    /// Returns the stream indexes of the opened file.
    pub fn index(&self) -> Option<&XzIndex> {
        self.index.as_ref()
    }

    fn open_source(&mut self, source: Source, base_path: Option<PathBuf>) -> Result<()> {
        let index = XzIndex::read(&source)?;
        let length = index.uncompressed_size();
        self.state = Some(Compressed::with_length(source, base_path, length, &self.options));
        self.index = Some(index);
        Ok(())
    }
}

fn decoder(source: &Source) -> Result<Box<dyn Decoder>> {
    Ok(Box::new(XzDecoder::new(source.open()?)))
}

impl Filter for Xz {
    fn name(&self) -> &'static str {
        "XZ"
    }

    fn id(&self) -> FilterId {
        FilterId::from_u128(0x666A8617_0307_4C91_8D21_9A6E1E1C2B35)
    }

    fn identify_bytes(&self, buffer: &[u8]) -> bool {
        if buffer.len() < 14 || !buffer.starts_with(&HEADER_MAGIC) {
            return false;
        }
        let padding = buffer.iter().rev().take_while(|&&b| b == 0).count();
        padding % 4 == 0 && buffer[..buffer.len() - padding].ends_with(&FOOTER_MAGIC)
    }

    fn identify_stream(&self, stream: &mut dyn ReadSeek) -> bool {
        let Ok(len) = stream_len(stream) else {
            return false;
        };
        if len < 14 {
            return false;
        }
        let mut header = [0u8; 6];
        if read_stream_at(stream, 0, &mut header).is_err() || header != HEADER_MAGIC {
            return false;
        }
        let Ok(padding) = zeros_before(stream, len) else {
            return false;
        };
        let mut footer = [0u8; 2];
        padding % 4 == 0
            && len - padding >= 14
            && read_stream_at(stream, len - padding - 2, &mut footer).is_ok()
            && footer == FOOTER_MAGIC
    }

    fn identify_path(&self, path: &Path) -> bool {
        match std::fs::File::open(path) {
            Ok(mut file) => self.identify_stream(&mut file),
            Err(_) => false,
        }
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
        self.index = None;
    }

    fn is_opened(&self) -> bool {
        self.state.is_some()
    }

    fn data_fork_len(&self) -> u64 {
        self.state.as_ref().map_or(0, |s| s.length)
    }

    fn data_fork_stream(&self) -> Result<Option<Box<dyn ReadSeek>>> {
        opened(&self.state)?.stream(decoder)
    }

    fn resource_fork_len(&self) -> u64 {
        0
    }

    fn resource_fork_stream(&self) -> Result<Option<Box<dyn ReadSeek>>> {
        opened(&self.state)?;
        Ok(None)
    }

    fn creation_time(&self) -> Option<Timestamp> {
        self.state.as_ref().map(|s| s.creation_time)
    }

    fn last_write_time(&self) -> Option<Timestamp> {
        self.state.as_ref().map(|s| s.last_write_time)
    }

    fn base_path(&self) -> Option<&Path> {
        self.state.as_ref()?.base_path.as_deref()
    }

    fn filename(&self) -> Option<String> {
        let name = self.base_path()?.file_name()?.to_string_lossy();
        Some(Compression::Xz.strip_extension(&name).to_owned())
    }
}
