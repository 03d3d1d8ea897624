//! File timestamps and the platform epochs found in Macintosh containers.
//!
//! This module provides the [`Timestamp`] type. Internally a timestamp is a
//! Windows FILETIME value (100-nanosecond intervals since January 1, 1601,
//! UTC), which covers every epoch the supported containers use:
//!
//! | Source | Encoding | Constructor |
//! |--------|----------|-------------|
//! | Classic Mac OS, ProDOS, MacBinary, PC Exchange | `u32` seconds since 1904-01-01 | [`Timestamp::from_mac_secs`] |
//! | AppleSingle `FileDates`, UNIX `FileInfo`, gzip `MTIME` | `u32` seconds since 1970-01-01 | [`Timestamp::from_unix_unsigned`] |
//! | MS-DOS `FileInfo` | packed FAT date and time words | [`Timestamp::from_dos`] |
//!
//! # Example
//!
//! ```rust
//! use forkfilter::Timestamp;
//!
//! // 1904-01-01 is zero on a Macintosh
//! let mac_epoch = Timestamp::from_mac_secs(0);
//! assert_eq!(mac_epoch.as_unix_secs(), -2_082_844_800);
//!
//! // 1980-01-01 00:00:00 on a FAT volume
//! let dos = Timestamp::from_dos(0x0021, 0x0000).unwrap();
//! assert_eq!(dos.as_unix_secs(), 315_532_800);
//! ```

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Windows FILETIME epoch: January 1, 1601 (UTC)
/// Difference from Unix epoch (January 1, 1970) in 100-nanosecond intervals.
const FILETIME_UNIX_DIFF: u64 = 116444736000000000;

/// Number of 100-nanosecond intervals per second.
const INTERVALS_PER_SECOND: u64 = 10_000_000;

/// Seconds between the Macintosh epoch (1904-01-01) and the Unix epoch.
const MAC_UNIX_DIFF_SECS: i64 = 2_082_844_800;

/// A file timestamp with 100-nanosecond precision.
///
/// # Example
///
/// ```rust
/// use forkfilter::Timestamp;
/// use std::time::SystemTime;
///
/// let ts = Timestamp::from_unix_unsigned(0);
/// assert_eq!(ts.as_system_time(), SystemTime::UNIX_EPOCH);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp {
    /// Raw FILETIME value (100-nanosecond intervals since 1601-01-01)
    filetime: u64,
}

impl Timestamp {
    /// Creates a timestamp from a raw Windows FILETIME value.
    #[inline]
    pub const fn from_filetime(filetime: u64) -> Self {
        Self { filetime }
    }

    /// Returns the current time.
    pub fn now() -> Self {
        Self::from_system_time(SystemTime::now()).unwrap_or_default()
    }

    /// Creates a timestamp from Unix seconds (since January 1, 1970).
    ///
    /// Returns `None` if the timestamp would overflow.
    pub fn from_unix_secs(secs: i64) -> Option<Self> {
        if secs < 0 {
            let neg_intervals = secs.unsigned_abs().checked_mul(INTERVALS_PER_SECOND)?;
            FILETIME_UNIX_DIFF
                .checked_sub(neg_intervals)
                .map(Self::from_filetime)
        } else {
            let intervals = (secs as u64).checked_mul(INTERVALS_PER_SECOND)?;
            FILETIME_UNIX_DIFF
                .checked_add(intervals)
                .map(Self::from_filetime)
        }
    }

    /// Creates a timestamp from an unsigned 32-bit count of Unix seconds.
    ///
    /// This is the encoding of AppleSingle `FileDates` entries, UNIX
    /// `FileInfo` entries and the gzip `MTIME` field. It never overflows.
    pub fn from_unix_unsigned(secs: u32) -> Self {
        Self::from_filetime(FILETIME_UNIX_DIFF + u64::from(secs) * INTERVALS_PER_SECOND)
    }

    /// Creates a timestamp from a Macintosh date (seconds since 1904-01-01).
    ///
    /// Used by classic Mac OS, ProDOS file info, MacBinary and PC Exchange.
    pub fn from_mac_secs(secs: u32) -> Self {
        let unix = i64::from(secs) - MAC_UNIX_DIFF_SECS;
        // 1904 lies well after 1601, the subtraction cannot underflow
        Self::from_filetime(
            (FILETIME_UNIX_DIFF as i64 + unix * INTERVALS_PER_SECOND as i64) as u64,
        )
    }

    /// Creates a timestamp from packed MS-DOS date and time words.
    ///
    /// Date: bits 15-9 years since 1980, 8-5 month, 4-0 day.
    /// Time: bits 15-11 hours, 10-5 minutes, 4-0 seconds / 2.
    ///
    /// Returns `None` for impossible dates (month or day zero, hour > 23 ...).
    pub fn from_dos(date: u16, time: u16) -> Option<Self> {
        let year = i64::from((date >> 9) & 0x7F) + 1980;
        let month = u32::from((date >> 5) & 0x0F);
        let day = u32::from(date & 0x1F);
        let hour = i64::from(time >> 11);
        let minute = i64::from((time >> 5) & 0x3F);
        let second = i64::from(time & 0x1F) * 2;

        if !(1..=12).contains(&month) || day == 0 || day > days_in_month(year, month) {
            return None;
        }
        if hour > 23 || minute > 59 || second > 59 {
            return None;
        }

        let days = days_from_civil(year, month, day);
        Self::from_unix_secs(days * 86_400 + hour * 3_600 + minute * 60 + second)
    }

    /// Creates a timestamp from a `SystemTime`.
    pub fn from_system_time(time: SystemTime) -> Option<Self> {
        match time.duration_since(UNIX_EPOCH) {
            Ok(duration) => {
                let intervals = duration
                    .as_secs()
                    .checked_mul(INTERVALS_PER_SECOND)?
                    .checked_add(u64::from(duration.subsec_nanos()) / 100)?;
                FILETIME_UNIX_DIFF
                    .checked_add(intervals)
                    .map(Self::from_filetime)
            }
            Err(e) => {
                let duration = e.duration();
                let intervals = duration
                    .as_secs()
                    .checked_mul(INTERVALS_PER_SECOND)?
                    .checked_add(u64::from(duration.subsec_nanos()) / 100)?;
                FILETIME_UNIX_DIFF
                    .checked_sub(intervals)
                    .map(Self::from_filetime)
            }
        }
    }

    /// Returns the raw Windows FILETIME value.
    #[inline]
    pub const fn as_filetime(&self) -> u64 {
        self.filetime
    }

    /// Returns the timestamp as Unix seconds.
    ///
    /// Returns negative values for timestamps before January 1, 1970.
    /// Sub-second precision is truncated towards negative infinity.
    pub fn as_unix_secs(&self) -> i64 {
        if self.filetime >= FILETIME_UNIX_DIFF {
            let intervals = self.filetime - FILETIME_UNIX_DIFF;
            (intervals / INTERVALS_PER_SECOND) as i64
        } else {
            let intervals = FILETIME_UNIX_DIFF - self.filetime;
            let secs = intervals / INTERVALS_PER_SECOND;
            let extra = u64::from(intervals % INTERVALS_PER_SECOND > 0);
            -((secs + extra) as i64)
        }
    }

    /// Converts to a `SystemTime`.
    pub fn as_system_time(&self) -> SystemTime {
        if self.filetime >= FILETIME_UNIX_DIFF {
            let intervals = self.filetime - FILETIME_UNIX_DIFF;
            let secs = intervals / INTERVALS_PER_SECOND;
            let nanos = ((intervals % INTERVALS_PER_SECOND) * 100) as u32;
            UNIX_EPOCH + Duration::new(secs, nanos)
        } else {
            let intervals = FILETIME_UNIX_DIFF - self.filetime;
            let secs = intervals / INTERVALS_PER_SECOND;
            let nanos = ((intervals % INTERVALS_PER_SECOND) * 100) as u32;
            UNIX_EPOCH - Duration::new(secs, nanos)
        }
    }
}

impl Default for Timestamp {
    /// Returns the Unix epoch (January 1, 1970).
    fn default() -> Self {
        Self::from_filetime(FILETIME_UNIX_DIFF)
    }
}

impl From<Timestamp> for SystemTime {
    fn from(ts: Timestamp) -> SystemTime {
        ts.as_system_time()
    }
}

fn is_leap_year(year: i64) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn days_in_month(year: i64, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 0,
    }
}

/// Days since 1970-01-01 for a proleptic Gregorian date.
fn days_from_civil(year: i64, month: u32, day: u32) -> i64 {
    let y = if month <= 2 { year - 1 } else { year };
    let era = (if y >= 0 { y } else { y - 399 }) / 400;
    let yoe = y - era * 400;
    let m = i64::from(month);
    let mp = if m > 2 { m - 3 } else { m + 9 };
    let doy = (153 * mp + 2) / 5 + i64::from(day) - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}
