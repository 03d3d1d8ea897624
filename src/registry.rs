//! Filter discovery.
//!
//! [`Filters`] tries every known filter against a path and returns the
//! first one that opens it, falling back to the pass-through
//! [`Identity`](crate::filter::Identity) filter for plain files.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use forkfilter::Filters;
//!
//! let filters = Filters::new();
//! if let Some(filter) = filters.get_filter(Path::new("System.bin")) {
//!     println!(
//!         "{}: data {} bytes, resource {} bytes",
//!         filter.name(),
//!         filter.data_fork_len(),
//!         filter.resource_fork_len()
//!     );
//! }
//! ```

use std::fmt;
use std::path::Path;
use std::sync::OnceLock;

use crate::Error;
use crate::config::FilterOptions;
use crate::filter::{AppleDouble, AppleSingle, Filter, Identity, MacBinary, PcExchange};

#[cfg(feature = "bzip2")]
use crate::filter::BZip2;
#[cfg(feature = "gzip")]
use crate::filter::GZip;
#[cfg(feature = "lzma")]
use crate::filter::{LZip, Xz};

/// The filter implementations known to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterKind {
    /// [`AppleDouble`]
    AppleDouble,
    /// [`AppleSingle`]
    AppleSingle,
    /// [`BZip2`]
    #[cfg(feature = "bzip2")]
    BZip2,
    /// [`GZip`]
    #[cfg(feature = "gzip")]
    GZip,
    /// [`LZip`]
    #[cfg(feature = "lzma")]
    LZip,
    /// [`MacBinary`]
    MacBinary,
    /// [`PcExchange`]
    PcExchange,
    /// [`Xz`]
    #[cfg(feature = "lzma")]
    Xz,
    /// [`Identity`]
    Identity,
}

impl FilterKind {
    /// Creates a closed filter of this kind.
    pub fn create(&self, options: &FilterOptions) -> Box<dyn Filter> {
        match (self, options) {
            (FilterKind::AppleDouble, _) => Box::new(AppleDouble::new()),
            (FilterKind::AppleSingle, _) => Box::new(AppleSingle::new()),
            #[cfg(feature = "bzip2")]
            (FilterKind::BZip2, options) => Box::new(BZip2::with_options(options.clone())),
            #[cfg(feature = "gzip")]
            (FilterKind::GZip, options) => Box::new(GZip::with_options(options.clone())),
            #[cfg(feature = "lzma")]
            (FilterKind::LZip, options) => Box::new(LZip::with_options(options.clone())),
            (FilterKind::MacBinary, _) => Box::new(MacBinary::new()),
            (FilterKind::PcExchange, _) => Box::new(PcExchange::new()),
            #[cfg(feature = "lzma")]
            (FilterKind::Xz, options) => Box::new(Xz::with_options(options.clone())),
            (FilterKind::Identity, _) => Box::new(Identity::new()),
        }
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.create(&FilterOptions::default()).name())
    }
}

/// Every kind in detection order; [`FilterKind::Identity`] is last.
fn all_kinds() -> &'static [FilterKind] {
    static KINDS: OnceLock<Vec<FilterKind>> = OnceLock::new();
    KINDS.get_or_init(|| {
        let mut kinds = vec![FilterKind::AppleDouble, FilterKind::AppleSingle];
        #[cfg(feature = "bzip2")]
        kinds.push(FilterKind::BZip2);
        #[cfg(feature = "gzip")]
        kinds.push(FilterKind::GZip);
        #[cfg(feature = "lzma")]
        kinds.push(FilterKind::LZip);
        kinds.push(FilterKind::MacBinary);
        kinds.push(FilterKind::PcExchange);
        #[cfg(feature = "lzma")]
        kinds.push(FilterKind::Xz);
        kinds.push(FilterKind::Identity);
        kinds
    })
}

/// Finds the filter for a file.
#[derive(Debug, Clone, Default)]
pub struct Filters {
    options: FilterOptions,
}

impl Filters {
    /// Creates a registry whose filters use default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry whose decompressing filters use `options`.
    pub fn with_options(options: FilterOptions) -> Self {
        Self { options }
    }

    /// Returns every filter kind in detection order.
    pub fn kinds(&self) -> &'static [FilterKind] {
        all_kinds()
    }

    /// Creates one closed instance of every filter.
    pub fn all(&self) -> Vec<Box<dyn Filter>> {
        all_kinds().iter().map(|kind| kind.create(&self.options)).collect()
    }

    /// Returns an opened filter for `path`.
    ///
    /// Every filter except [`Identity`] is asked to identify the path in
    /// order; the first that does is opened on a fresh instance. A filter
    /// that identifies the path but fails to parse it is skipped. Plain
    /// files get the [`Identity`] filter. I/O errors end the search and
    /// yield `None`, as does a path that is not a readable file.
    pub fn get_filter(&self, path: &Path) -> Option<Box<dyn Filter>> {
        for kind in all_kinds().iter().filter(|kind| **kind != FilterKind::Identity) {
            let candidate = kind.create(&self.options);
            if !candidate.identify_path(path) {
                continue;
            }
            let mut filter = kind.create(&self.options);
            match filter.open_path(path) {
                Ok(()) if filter.is_opened() => {
                    log::debug!("{} opened {}", filter.name(), path.display());
                    return Some(filter);
                }
                Ok(()) => {}
                Err(Error::Io(e)) => {
                    log::warn!("I/O error opening {} as {}: {}", path.display(), filter.name(), e);
                    return None;
                }
                Err(e) => {
                    log::debug!(
                        "{} identified {} but could not open it: {}",
                        filter.name(),
                        path.display(),
                        e
                    );
                }
            }
        }

        let mut identity = FilterKind::Identity.create(&self.options);
        if !identity.identify_path(path) {
            return None;
        }
        match identity.open_path(path) {
            Ok(()) => Some(identity),
            Err(e) => {
                log::warn!("Cannot open {}: {}", path.display(), e);
                None
            }
        }
    }
}
