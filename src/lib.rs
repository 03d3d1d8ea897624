//! # forkfilter
//!
//! Transparent access to Macintosh-style files stored on foreign systems
//! and to compressed disk images.
//!
//! A *filter* takes an input file (or buffer, or stream) and presents the
//! logical file it contains as a data fork and an optional resource fork,
//! each readable through an independent seekable stream. Filters exist for
//! Mac encapsulations (AppleSingle, AppleDouble, MacBinary, PC Exchange)
//! and for single-file compression (gzip, bzip2, xz, lzip).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::io::Read;
//! use std::path::Path;
//! use forkfilter::{Filters, Result};
//!
//! fn main() -> Result<()> {
//!     let Some(filter) = Filters::new().get_filter(Path::new("disk.img.gz")) else {
//!         return Ok(());
//!     };
//!     println!("{} ({})", filter.name(), filter.filename().unwrap_or_default());
//!
//!     if let Some(mut data) = filter.data_fork_stream()? {
//!         let mut sector = [0u8; 512];
//!         data.read_exact(&mut sector)?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Using a Specific Filter
//!
//! ```rust,no_run
//! use forkfilter::filter::{Filter, MacBinary};
//!
//! fn main() -> forkfilter::Result<()> {
//!     let bytes = std::fs::read("Installer.bin")?;
//!     let mut filter = MacBinary::new();
//!     if filter.identify_bytes(&bytes) {
//!         filter.open_bytes(bytes)?;
//!         println!("resource fork: {} bytes", filter.resource_fork_len());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `gzip` | Yes | gzip filter |
//! | `bzip2` | Yes | bzip2 filter |
//! | `lzma` | Yes | xz and lzip filters |
//!
//! ## Minimum Supported Rust Version (MSRV)
//!
//! This crate requires **Rust 1.85** or later.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod codec;
pub mod config;
pub mod error;
pub mod filter;
pub mod registry;
pub mod stream;
pub mod timestamp;

pub use config::FilterOptions;
pub use error::{Error, Result};
pub use filter::{Filter, FilterId, FinderInfo};
pub use registry::{FilterKind, Filters};
pub use stream::{ForcedSeekStream, OffsetStream, ReadSeek, Source};
pub use timestamp::Timestamp;
