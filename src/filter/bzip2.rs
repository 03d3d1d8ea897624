//! BZip2 filter.

use std::path::{Path, PathBuf};

use super::{Compressed, Filter, FilterId, opened, read_stream_at, stream_len};
use crate::codec::bzip2::{Bzip2Decoder, is_stream_header};
use crate::codec::{Compression, Decoder};
use crate::config::FilterOptions;
use crate::stream::{ReadSeek, Source};
use crate::timestamp::Timestamp;
use crate::{Error, Result};

/// Distance from the end of the file of the UDIF trailer signature.
const KOLY_DISTANCE: u64 = 512;

/// Presents the decompressed content of a bzip2 file as its data fork.
///
/// bzip2 does not record the decoded length, so opening decodes the whole
/// file once into the scratch store. Files carrying a UDIF (`koly`) trailer
/// are disk images whose first chunk happens to be bzip2 and are rejected.
#[derive(Debug, Default)]
pub struct BZip2 {
    options: FilterOptions,
    state: Option<Compressed>,
}

impl BZip2 {
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
        let mut header = [0u8; 4];
        source.read_at(0, &mut header)?;
        if !is_stream_header(&header) {
            return Err(Error::InvalidFormat("missing bzip2 stream header".into()));
        }
        let state = Compressed::measure(source.clone(), base_path, decoder(&source)?, &self.options)?;
        log::debug!("bzip2: {} decoded bytes", state.length);
        self.state = Some(state);
        Ok(())
    }
}

fn decoder(source: &Source) -> Result<Box<dyn Decoder>> {
    Ok(Box::new(Bzip2Decoder::new(source.open()?)))
}

fn has_koly_trailer(stream: &mut dyn ReadSeek) -> bool {
    let Ok(len) = stream_len(stream) else {
        return false;
    };
    if len <= KOLY_DISTANCE {
        return false;
    }
    let mut signature = [0u8; 4];
    read_stream_at(stream, len - KOLY_DISTANCE, &mut signature).is_ok() && &signature == b"koly"
}

impl Filter for BZip2 {
    fn name(&self) -> &'static str {
        "BZip2"
    }

    fn id(&self) -> FilterId {
        FilterId::from_u128(0xFCCFB0C3_3C19_4C2C_9E8D_50A1E2B7C2E1)
    }

    fn identify_bytes(&self, buffer: &[u8]) -> bool {
        if !is_stream_header(buffer) {
            return false;
        }
        let len = buffer.len() as u64;
        if len > KOLY_DISTANCE {
            let at = (len - KOLY_DISTANCE) as usize;
            return &buffer[at..at + 4] != b"koly";
        }
        true
    }

    fn identify_stream(&self, stream: &mut dyn ReadSeek) -> bool {
        let mut header = [0u8; 4];
        read_stream_at(stream, 0, &mut header).is_ok()
            && is_stream_header(&header)
            && !has_koly_trailer(stream)
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
        Some(Compression::Bzip2.strip_extension(&name).to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bzip2::write::BzEncoder;
    use std::io::{Cursor, Read, Seek, SeekFrom, Write};

    fn compress(data: &[u8]) -> Vec<u8> {
        let mut encoder = BzEncoder::new(Vec::new(), bzip2::Compression::new(9));
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_identify_rejects_koly() {
        let filter = BZip2::new();
        let mut buffer = vec![0u8; 2048];
        buffer[..4].copy_from_slice(b"BZh9");
        assert!(filter.identify_bytes(&buffer));
        assert!(filter.identify_stream(&mut Cursor::new(buffer.clone())));

        let at = buffer.len() - 512;
        buffer[at..at + 4].copy_from_slice(b"koly");
        assert!(!filter.identify_bytes(&buffer));
        assert!(!filter.identify_stream(&mut Cursor::new(buffer)));
    }

    #[test]
    fn test_open_measures_length() {
        let data: Vec<u8> = (0..50_000u32).map(|i| (i % 7) as u8).collect();
        let mut filter = BZip2::new();
        filter.open_bytes(compress(&data)).unwrap();
        assert_eq!(filter.data_fork_len(), data.len() as u64);

        // the first stream reuses the decode done at open time
        let mut first = filter.data_fork_stream().unwrap().unwrap();
        let mut out = Vec::new();
        first.read_to_end(&mut out).unwrap();
        assert_eq!(out, data);

        let mut second = filter.data_fork_stream().unwrap().unwrap();
        second.seek(SeekFrom::Start(40_000)).unwrap();
        let mut buf = [0u8; 8];
        second.read_exact(&mut buf).unwrap();
        assert_eq!(&buf[..], &data[40_000..40_008]);
    }

    #[test]
    fn test_filename_strips_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("disk.img.bz2");
        std::fs::write(&path, compress(b"payload")).unwrap();

        let mut filter = BZip2::new();
        assert!(filter.identify_path(&path));
        filter.open_path(&path).unwrap();
        assert_eq!(filter.filename().as_deref(), Some("disk.img"));
        assert_eq!(filter.parent_folder().as_deref(), Some(dir.path()));
    }
}
