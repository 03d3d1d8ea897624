//! Pass-through filter for plain files.

use std::path::{Path, PathBuf};

use super::{Filter, FilterId, Fork, Forks, opened, source_times};
use crate::stream::{ReadSeek, Source};
use crate::timestamp::Timestamp;
use crate::Result;

/// Presents the input unchanged as its data fork.
///
/// Identifies every input, so the registry only tries it after every other
/// filter has declined.
#[derive(Debug, Default)]
pub struct Identity {
    state: Option<Forks>,
}

impl Identity {
    /// Creates a closed filter.
    pub fn new() -> Self {
        Self::default()
    }

    fn open_source(&mut self, source: Source, base_path: Option<PathBuf>) -> Result<()> {
        let (creation_time, last_write_time) = source_times(base_path.as_deref());
        self.state = Some(Forks {
            base_path,
            creation_time,
            last_write_time,
            data: Some(Fork::whole(source)?),
            resource: None,
        });
        Ok(())
    }
}

impl Filter for Identity {
    fn name(&self) -> &'static str {
        "No filter"
    }

    fn id(&self) -> FilterId {
        FilterId::from_u128(0x12D7C9B8_3E31_4C57_9A5B_7E0A92F0D9C1)
    }

    fn identify_bytes(&self, _buffer: &[u8]) -> bool {
        true
    }

    fn identify_stream(&self, _stream: &mut dyn ReadSeek) -> bool {
        true
    }

    fn identify_path(&self, path: &Path) -> bool {
        path.is_file()
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
        self.state.as_ref().map_or(0, Forks::data_len)
    }

    fn data_fork_stream(&self) -> Result<Option<Box<dyn ReadSeek>>> {
        opened(&self.state)?.data_stream()
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
}
