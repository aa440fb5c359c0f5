//! Filename parsing for MSG SEVIRI level 1.5 HDF5 products.
//!
//! Example: `MSG3-SEVI-MSG15-0100-NA-20170101001241.590000000Z-NA.h5.bz2`
//!
//! Captured fields:
//! - `msg_id`: satellite number (`MSG3` → 3)
//! - `year`, `month`, `day`, `hour`, `minute`: nominal capture time
//! - `compression`: optional dotted suffix after `h5`, kept verbatim

use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use regex::{Captures, Regex};

use crate::error::{LoaderError, Result};

/// Default pattern for U-MARF HDF5 product names.
///
/// The two digits after the minute (seconds) are accepted but ignored.
pub const MSG_HDF5_FILENAME_PATTERN: &str = concat!(
    r"^MSG(?P<msg_id>[0-9])-SEVI-MSG[0-9]{1,2}-[0-9]{4}-[A-Z]{2}-",
    r"(?P<year>[0-9]{4})(?P<month>[0-9]{2})(?P<day>[0-9]{2})",
    r"(?P<hour>[0-9]{2})(?P<minute>[0-9]{2})(?:[0-9]{2})?",
    r".*h5(?P<compression>\.[A-Za-z0-9_]+)?$"
);

/// Named groups every filename pattern must declare.
const REQUIRED_GROUPS: [&str; 7] = [
    "msg_id",
    "year",
    "month",
    "day",
    "hour",
    "minute",
    "compression",
];

/// Compression applied to a scene file, derived from its suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Compression {
    None,
    Bzip2,
    Gzip,
    /// A suffix we do not know how to unpack
    Unsupported(String),
}

impl Compression {
    pub fn from_suffix(suffix: Option<&str>) -> Self {
        match suffix {
            None | Some("") => Compression::None,
            Some(s) if s.eq_ignore_ascii_case(".bz2") => Compression::Bzip2,
            Some(s) if s.eq_ignore_ascii_case(".gz") => Compression::Gzip,
            Some(s) => Compression::Unsupported(s.to_string()),
        }
    }

    pub fn is_compressed(&self) -> bool {
        !matches!(self, Compression::None)
    }

    pub fn name(&self) -> &str {
        match self {
            Compression::None => "none",
            Compression::Bzip2 => "bzip2",
            Compression::Gzip => "gzip",
            Compression::Unsupported(suffix) => suffix,
        }
    }
}

/// Fields extracted from a matching filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilenameFields {
    pub msg_id: u8,
    pub capture_time: DateTime<Utc>,
    /// Dotted suffix after `h5`, verbatim (e.g. `.bz2`)
    pub compression: Option<String>,
}

impl FilenameFields {
    pub fn compression_kind(&self) -> Compression {
        Compression::from_suffix(self.compression.as_deref())
    }
}

/// A compiled filename pattern.
#[derive(Debug, Clone)]
pub struct FilenamePattern {
    regex: Regex,
}

impl FilenamePattern {
    /// Compile a custom pattern.
    ///
    /// The regex must declare the named groups `msg_id`, `year`, `month`,
    /// `day`, `hour`, `minute` and `compression`.
    pub fn new(pattern: &str) -> Result<Self> {
        let regex =
            Regex::new(pattern).map_err(|e| LoaderError::InvalidPattern(e.to_string()))?;

        let names: Vec<&str> = regex.capture_names().flatten().collect();
        let missing: Vec<&str> = REQUIRED_GROUPS
            .iter()
            .copied()
            .filter(|group| !names.contains(group))
            .collect();
        if !missing.is_empty() {
            return Err(LoaderError::InvalidPattern(format!(
                "missing named groups: {}",
                missing.join(", ")
            )));
        }

        Ok(Self { regex })
    }

    /// The default U-MARF HDF5 pattern.
    pub fn msg_hdf5() -> Self {
        static PATTERN: OnceLock<Regex> = OnceLock::new();
        let regex = PATTERN.get_or_init(|| {
            Regex::new(MSG_HDF5_FILENAME_PATTERN).expect("MSG filename regex should compile")
        });
        Self {
            regex: regex.clone(),
        }
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// Parse a filename.
    ///
    /// Returns None when the name does not match or its date fields do not
    /// form a valid calendar time.
    pub fn parse(&self, filename: &str) -> Option<FilenameFields> {
        let caps = self.regex.captures(filename)?;

        let msg_id = field::<u8>(&caps, "msg_id")?;
        let date = NaiveDate::from_ymd_opt(
            field(&caps, "year")?,
            field(&caps, "month")?,
            field(&caps, "day")?,
        )?;
        let naive = date.and_hms_opt(field(&caps, "hour")?, field(&caps, "minute")?, 0)?;

        Some(FilenameFields {
            msg_id,
            capture_time: Utc.from_utc_datetime(&naive),
            compression: caps
                .name("compression")
                .map(|m| m.as_str().to_string())
                .filter(|s| !s.is_empty()),
        })
    }
}

impl Default for FilenamePattern {
    fn default() -> Self {
        Self::msg_hdf5()
    }
}

fn field<T: std::str::FromStr>(caps: &Captures<'_>, name: &str) -> Option<T> {
    caps.name(name)?.as_str().parse().ok()
}
