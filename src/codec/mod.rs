//! Decompression codecs for single-file compressed containers.
//!
//! Each codec wraps a third-party decoder behind the [`Decoder`] trait so
//! that filters can hand it to a [`ForcedSeekStream`] without knowing the
//! concrete type.
//!
//! [`ForcedSeekStream`]: crate::stream::ForcedSeekStream

#[cfg(feature = "gzip")]
pub mod gzip;

#[cfg(feature = "bzip2")]
pub mod bzip2;

#[cfg(feature = "lzma")]
pub mod lzip;

#[cfg(feature = "lzma")]
pub mod xz;

use std::fmt;
use std::io::Read;

/// A decoder that reads compressed data and produces uncompressed output.
pub trait Decoder: Read + Send {
    /// Returns the container format this decoder handles.
    fn compression(&self) -> Compression;
}

/// Single-file compression formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Compression {
    /// RFC 1952 gzip.
    Gzip,
    /// bzip2 block-sorting compression.
    Bzip2,
    /// XZ (LZMA2 in the .xz container).
    Xz,
    /// LZip (LZMA in the .lz container).
    Lzip,
}

impl Compression {
    /// Returns a human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            Compression::Gzip => "gzip",
            Compression::Bzip2 => "bzip2",
            Compression::Xz => "xz",
            Compression::Lzip => "lzip",
        }
    }

    /// Returns the filename extensions (without dot) used by this format.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Compression::Gzip => &["gz", "gzip"],
            Compression::Bzip2 => &["bz2", "bzip2"],
            Compression::Xz => &["xz", "xzip"],
            Compression::Lzip => &["lz", "lzip"],
        }
    }

    /// Strips a trailing extension of this format from `name`.
    ///
    /// Matching is case-insensitive. Names without such an extension are
    /// returned unchanged.
    ///
    /// ```rust
    /// use forkfilter::codec::Compression;
    ///
    /// assert_eq!(Compression::Gzip.strip_extension("disk.img.GZ"), "disk.img");
    /// assert_eq!(Compression::Xz.strip_extension("disk.img"), "disk.img");
    /// ```
    pub fn strip_extension<'a>(&self, name: &'a str) -> &'a str {
        for ext in self.extensions() {
            let suffix_len = ext.len() + 1;
            if name.len() > suffix_len && name.is_char_boundary(name.len() - suffix_len) {
                let (stem, suffix) = name.split_at(name.len() - suffix_len);
                if suffix.starts_with('.') && suffix[1..].eq_ignore_ascii_case(ext) {
                    return stem;
                }
            }
        }
        name
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
