//! LZip filter.

use std::path::{Path, PathBuf};

use super::{Compressed, Filter, FilterId, opened, read_path_prefix, read_stream_at};
use crate::codec::lzip::{LZIP_MAGIC, LzipDecoder, LzipMember, scan_members, total_data_size};
use crate::codec::{Compression, Decoder};
use crate::config::FilterOptions;
use crate::stream::{ReadSeek, Source};
use crate::timestamp::Timestamp;
use crate::Result;

/// Presents the decompressed content of an lzip file as its data fork.
///
/// The decoded length is the sum of the data sizes recorded in the member
/// trailers, found by walking them backwards from the end of the file.
/// Every member is decoded and its CRC32 checked.
#[derive(Debug, Default)]
pub struct LZip {
    options: FilterOptions,
    members: Vec<LzipMember>,
    state: Option<Compressed>,
}

impl LZip {
    /// Creates a closed filter with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a closed filter with custom options.
    pub fn with_options(options: FilterOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// Returns the members of the opened file.
    pub fn members(&self) -> &[LzipMember] {
        &self.members
    }

    fn open_source(&mut self, source: Source, base_path: Option<PathBuf>) -> Result<()> {
        let members = scan_members(&source)?;
        let length = total_data_size(&members)?;
        self.state = Some(Compressed::with_length(source, base_path, length, &self.options));
        self.members = members;
        Ok(())
    }
}

fn decoder(source: &Source) -> Result<Box<dyn Decoder>> {
    Ok(Box::new(LzipDecoder::new(source.open()?)))
}

impl Filter for LZip {
    fn name(&self) -> &'static str {
        "LZip"
    }

    fn id(&self) -> FilterId {
        FilterId::from_u128(0x09D715E9_20C0_48B1_A8D9_D8897CEC5576)
    }

    fn identify_bytes(&self, buffer: &[u8]) -> bool {
        buffer.starts_with(&LZIP_MAGIC)
    }

    fn identify_stream(&self, stream: &mut dyn ReadSeek) -> bool {
        let mut magic = [0u8; 5];
        read_stream_at(stream, 0, &mut magic).is_ok() && self.identify_bytes(&magic)
    }

    fn identify_path(&self, path: &Path) -> bool {
        read_path_prefix(path, LZIP_MAGIC.len()).is_ok_and(|magic| self.identify_bytes(&magic))
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
        self.members.clear();
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
        Some(Compression::Lzip.strip_extension(&name).to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    fn member_shell(data_size: u64) -> Vec<u8> {
        let mut buffer = vec![0u8; 40];
        buffer[..5].copy_from_slice(&LZIP_MAGIC);
        buffer[5] = 0x14;
        buffer[24..32].copy_from_slice(&data_size.to_le_bytes());
        buffer[32..40].copy_from_slice(&40u64.to_le_bytes());
        buffer
    }

    #[test]
    fn test_identify() {
        let filter = LZip::new();
        assert!(filter.identify_bytes(b"LZIP\x01\x14"));
        assert!(!filter.identify_bytes(b"LZIP\x00\x14"));
        assert!(!filter.identify_bytes(b"LZI"));
    }

    #[test]
    fn test_open_rejects_bad_dictionary() {
        let mut buffer = member_shell(0);
        buffer[5] = 0x05;
        let mut filter = LZip::new();
        assert!(matches!(filter.open_bytes(buffer), Err(Error::InvalidFormat(_))));
    }

    #[test]
    fn test_open_reads_trailer_size() {
        let mut filter = LZip::new();
        filter.open_bytes(member_shell(1234)).unwrap();
        assert_eq!(filter.data_fork_len(), 1234);
        assert_eq!(filter.members().len(), 1);
    }

    #[test]
    fn test_open_sums_member_sizes() {
        let mut buffer = member_shell(1234);
        buffer.extend(member_shell(66));
        let mut filter = LZip::new();
        filter.open_bytes(buffer).unwrap();
        assert_eq!(filter.data_fork_len(), 1300);
        assert_eq!(filter.members()[1].offset, 40);

        filter.close();
        assert!(filter.members().is_empty());
    }

    #[test]
    fn test_open_rejects_trailing_garbage() {
        let mut buffer = member_shell(10);
        buffer.extend_from_slice(b"junk");
        let mut filter = LZip::new();
        assert!(filter.open_bytes(buffer).unwrap_err().is_corruption());
    }
}
