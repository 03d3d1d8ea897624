//! Configuration shared by filters and seek adapters.
//!
//! This module provides [`FilterOptions`], which controls how decompressing
//! filters materialize their output in the scratch store backing a
//! [`ForcedSeekStream`](crate::stream::ForcedSeekStream).

use std::path::{Path, PathBuf};

/// Default decode chunk size for the scratch store (1 MiB).
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

/// Smallest accepted chunk size (4 KiB).
const MIN_CHUNK_SIZE: usize = 4 * 1024;

/// Options for decompressing filters.
///
/// # Example
///
/// ```rust
/// use forkfilter::FilterOptions;
///
/// // Default configuration (1 MiB chunks, system temp directory)
/// let options = FilterOptions::default();
///
/// // Keep scratch files next to the images being examined
/// let options = FilterOptions::new()
///     .chunk_size(256 * 1024)
///     .scratch_dir("/var/tmp/forkfilter");
/// assert_eq!(options.chunk_size, 256 * 1024);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterOptions {
    /// Number of bytes decoded per step when filling the scratch store.
    ///
    /// Forward seeks and length calculation pull this many bytes from the
    /// decoder at a time. Default: 1 MiB.
    pub chunk_size: usize,

    /// Directory for scratch files.
    ///
    /// `None` uses the system temporary directory. Scratch files are
    /// anonymous and disappear when the stream is dropped.
    pub scratch_dir: Option<PathBuf>,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            scratch_dir: None,
        }
    }
}

impl FilterOptions {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration that decodes in small steps.
    ///
    /// Reduces the transient buffer used while filling the scratch store at
    /// the cost of more decoder calls.
    pub fn low_memory() -> Self {
        Self {
            chunk_size: 64 * 1024,
            scratch_dir: None,
        }
    }

    /// Sets the decode chunk size (clamped to at least 4 KiB).
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(MIN_CHUNK_SIZE);
        self
    }

    /// Sets the directory used for scratch files.
    pub fn scratch_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.scratch_dir = Some(dir.as_ref().to_path_buf());
        self
    }
}
