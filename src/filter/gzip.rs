//! Gzip filter.

use std::path::{Path, PathBuf};

use super::{Compressed, Filter, FilterId, opened, read_path_prefix, read_stream_at};
use crate::codec::gzip::{GZIP_MAGIC, GzipDecoder, GzipHeader, HEADER_SIZE, TRAILER_SIZE};
use crate::codec::{Compression, Decoder};
use crate::config::FilterOptions;
use crate::stream::{ReadSeek, Source};
use crate::timestamp::Timestamp;
use crate::{Error, Result};

/// Presents the decompressed content of a gzip file as its data fork.
///
/// A file may hold several members, and the ISIZE trailer only describes
/// the last one modulo 2^32, so opening decodes the file once to measure
/// it. The trailer is kept as a cross-check.
#[derive(Debug, Default)]
pub struct GZip {
    options: FilterOptions,
    state: Option<Compressed>,
}

impl GZip {
    /// Creates a closed filter with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a closed filter with custom options.
    pub fn with_options(options: FilterOptions) -> Self {
        Self {
            options,
            state: None,
        }
    }

    fn open_source(&mut self, source: Source, base_path: Option<PathBuf>) -> Result<()> {
        let len = source.len()?;
        if len < (HEADER_SIZE + TRAILER_SIZE) as u64 {
            return Err(Error::InvalidFormat("file too small for a gzip member".into()));
        }
        let mut header = [0u8; HEADER_SIZE];
        source.read_at(0, &mut header)?;
        let header = GzipHeader::parse(&header)
            .ok_or_else(|| Error::InvalidFormat("missing gzip magic".into()))?;

        let mut isize = [0u8; 4];
        source.read_at(len - 4, &mut isize)?;
        let trailer_size = u32::from_le_bytes(isize);

        let mut state = Compressed::measure(source.clone(), base_path, decoder(&source)?, &self.options)?;
        if state.length as u32 != trailer_size {
            log::debug!(
                "gzip: decoded {} bytes, last ISIZE is {} (multiple members)",
                state.length,
                trailer_size
            );
        }
        if header.mtime != 0 {
            state.last_write_time = Timestamp::from_unix_unsigned(header.mtime);
        }
        log::debug!("gzip: {} decoded bytes, mtime {}", state.length, header.mtime);
        self.state = Some(state);
        Ok(())
    }
}

fn decoder(source: &Source) -> Result<Box<dyn Decoder>> {
    Ok(Box::new(GzipDecoder::new(source.open()?)))
}

impl Filter for GZip {
    fn name(&self) -> &'static str {
        "GZip"
    }

    fn id(&self) -> FilterId {
        FilterId::from_u128(0xF4996661_4F45_4E2D_B1EC_D1F7B11E7C8A)
    }

    fn identify_bytes(&self, buffer: &[u8]) -> bool {
        buffer.starts_with(&GZIP_MAGIC)
    }

    fn identify_stream(&self, stream: &mut dyn ReadSeek) -> bool {
        let mut magic = [0u8; 3];
        read_stream_at(stream, 0, &mut magic).is_ok() && self.identify_bytes(&magic)
    }

    fn identify_path(&self, path: &Path) -> bool {
        read_path_prefix(path, GZIP_MAGIC.len()).is_ok_and(|magic| self.identify_bytes(&magic))
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
        Some(Compression::Gzip.strip_extension(&name).to_owned())
    }
}
