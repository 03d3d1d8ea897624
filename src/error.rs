//! Error types for filter operations.
//!
//! This module provides the [`Error`] enum which represents all possible
//! failure modes when identifying, opening or reading through a filter,
//! along with a convenient [`Result<T>`] type alias.
//!
//! # Error Handling
//!
//! Fallible operations return `Result<T, Error>`. Identification never fails:
//! `identify_*` methods answer `false` for anything they cannot read.
//!
//! ```rust,no_run
//! use forkfilter::Error;
//! use forkfilter::filter::{Filter, MacBinary};
//!
//! fn open_macbinary(path: &str) -> forkfilter::Result<MacBinary> {
//!     let mut filter = MacBinary::new();
//!     match filter.open_path(path.as_ref()) {
//!         Ok(()) => Ok(filter),
//!         Err(Error::InvalidFormat(msg)) => {
//!             eprintln!("Not a MacBinary file: {}", msg);
//!             Err(Error::InvalidFormat(msg))
//!         }
//!         Err(e) => Err(e),
//!     }
//! }
//! ```
//!
//! Stream types ([`OffsetStream`], [`ForcedSeekStream`]) implement the
//! standard I/O traits and therefore report failures as [`std::io::Error`].
//! When the cause is one of ours, the [`Error`] is carried inside the I/O
//! error and can be recovered with [`std::io::Error::get_ref`].
//!
//! [`OffsetStream`]: crate::stream::OffsetStream
//! [`ForcedSeekStream`]: crate::stream::ForcedSeekStream

use std::io;
use std::path::PathBuf;

/// The main error type for filter operations.
///
/// # Error Categories
///
/// | Category | Variants | Typical Cause |
/// |----------|----------|---------------|
/// | I/O | [`Io`][Self::Io] | File system operations |
/// | Format | [`InvalidFormat`][Self::InvalidFormat], [`CorruptHeader`][Self::CorruptHeader] | Invalid container data |
/// | Range | [`OutOfRange`][Self::OutOfRange] | View outside its base stream |
/// | Compatibility | [`Unsupported`][Self::Unsupported], [`UnsupportedFeature`][Self::UnsupportedFeature] | Operation or format variant not available |
/// | Companions | [`MissingCompanion`][Self::MissingCompanion] | Sidecar or catalog entry not found |
/// | Lifecycle | [`NotOpened`][Self::NotOpened] | Filter used before `open_*` |
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// An I/O error occurred during file operations.
    ///
    /// # Recovery
    ///
    /// Check the underlying [`std::io::ErrorKind`] for specific handling:
    ///
    /// ```rust
    /// use forkfilter::Error;
    /// use std::io::ErrorKind;
    ///
    /// fn handle_io_error(error: &Error) {
    ///     if let Error::Io(e) = error {
    ///         match e.kind() {
    ///             ErrorKind::NotFound => println!("File not found"),
    ///             ErrorKind::PermissionDenied => println!("Access denied"),
    ///             _ => println!("I/O error: {}", e),
    ///         }
    ///     }
    /// }
    /// ```
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The input is not in the format the filter handles.
    ///
    /// The string describes what was expected.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// A header was recognized but its contents are inconsistent.
    #[error("Corrupt header at offset {offset:#x}: {reason}")]
    CorruptHeader {
        /// The byte offset where corruption was detected.
        offset: u64,
        /// A description of the corruption.
        reason: String,
    },

    /// A bounded view was requested outside its base stream.
    ///
    /// `start` and `end` are inclusive byte offsets into a base stream of
    /// `length` bytes.
    #[error("Range [{start}, {end}] does not fit in a stream of {length} bytes")]
    OutOfRange {
        /// First byte of the requested range.
        start: u64,
        /// Last byte of the requested range.
        end: u64,
        /// Length of the base stream.
        length: u64,
    },

    /// The operation is not available on this stream or filter.
    ///
    /// Examples are writing to a decompression view, growing a bounded view,
    /// or opening an AppleDouble file from a memory buffer.
    #[error("Unsupported operation: {0}")]
    Unsupported(&'static str),

    /// The container uses a variant this crate does not decode.
    #[error("Unsupported feature: {feature}")]
    UnsupportedFeature {
        /// The name of the unsupported feature.
        feature: &'static str,
    },

    /// A companion file (sidecar header, catalog entry, fork file) is missing.
    #[error("Companion file not found for {}", .0.display())]
    MissingCompanion(PathBuf),

    /// The filter has not been opened, or has been closed.
    #[error("Filter is not opened")]
    NotOpened,
}

impl Error {
    /// Returns `true` if this error is related to unsupported operations or
    /// format variants.
    pub fn is_unsupported(&self) -> bool {
        matches!(
            self,
            Error::Unsupported(_) | Error::UnsupportedFeature { .. }
        )
    }

    /// Returns `true` if this is a data corruption error.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            Error::CorruptHeader { .. } | Error::OutOfRange { .. }
        )
    }

    /// Creates a CorruptHeader error.
    pub fn corrupt_header(offset: u64, reason: impl Into<String>) -> Self {
        Error::CorruptHeader {
            offset,
            reason: reason.into(),
        }
    }

    /// Converts this error into an [`io::Error`], unwrapping `Io` variants.
    pub(crate) fn into_io(self) -> io::Error {
        match self {
            Error::Io(e) => e,
            Error::Unsupported(_) => io::Error::new(io::ErrorKind::Unsupported, self),
            other => io::Error::other(other),
        }
    }
}

/// A specialized Result type for filter operations.
pub type Result<T> = std::result::Result<T, Error>;
