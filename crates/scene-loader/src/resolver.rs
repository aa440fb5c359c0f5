//! Temporal file resolution.
//!
//! Scene files live under `base_path/<prefix>/<filename>`, where the prefix
//! is a strftime template expanded against the requested time (for example
//! `2017/01/01/20170101_0015/`). The resolver picks the first prefix whose
//! directory exists and scans only that directory for a filename whose
//! capture time lies within the tolerance window.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::filename::{Compression, FilenamePattern};

/// Default directory layout: one directory per 15-minute timeslot.
pub const DEFAULT_PREFIX: &str = "%Y/%m/%d/%Y%m%d_%H%M/";

/// Which candidate wins when several files fall inside the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchPolicy {
    /// First matching entry in lexicographic order
    #[default]
    First,
    /// Entry with the smallest distance to the target time
    Closest,
}

impl std::str::FromStr for MatchPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first" => Ok(MatchPolicy::First),
            "closest" => Ok(MatchPolicy::Closest),
            other => Err(format!("unknown match policy '{}'", other)),
        }
    }
}

/// A scene file located by the resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMatch {
    pub filename: String,
    /// Full path of the matched directory entry
    pub path: PathBuf,
    pub msg_id: u8,
    pub capture_time: DateTime<Utc>,
    /// Verbatim compression suffix, e.g. `.bz2`
    pub compression: Option<String>,
}

impl FileMatch {
    pub fn compression_kind(&self) -> Compression {
        Compression::from_suffix(self.compression.as_deref())
    }
}

/// Finds the scene file closest in time to a request.
#[derive(Debug, Clone)]
pub struct FileResolver {
    base_path: PathBuf,
    prefixes: Vec<String>,
    pattern: FilenamePattern,
    policy: MatchPolicy,
}

impl FileResolver {
    /// Resolver over `base_path` using the default filename pattern.
    ///
    /// An empty prefix list falls back to [`DEFAULT_PREFIX`].
    pub fn new(base_path: impl Into<PathBuf>, prefixes: Vec<String>) -> Self {
        let prefixes = if prefixes.is_empty() {
            vec![DEFAULT_PREFIX.to_string()]
        } else {
            prefixes
        };

        Self {
            base_path: base_path.into(),
            prefixes,
            pattern: FilenamePattern::msg_hdf5(),
            policy: MatchPolicy::default(),
        }
    }

    pub fn with_pattern(mut self, pattern: FilenamePattern) -> Self {
        self.pattern = pattern;
        self
    }

    pub fn with_policy(mut self, policy: MatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    pub fn policy(&self) -> MatchPolicy {
        self.policy
    }

    /// First prefix directory that exists for `target`.
    pub fn resolve_directory(&self, target: DateTime<Utc>) -> Option<PathBuf> {
        self.prefixes.iter().find_map(|template| {
            let prefix = match expand_prefix(template, target) {
                Some(prefix) => prefix,
                None => {
                    warn!(template = %template, "Skipping invalid directory prefix template");
                    return None;
                }
            };

            let dir = self.base_path.join(prefix);
            if dir.is_dir() {
                Some(dir)
            } else {
                debug!(dir = %dir.display(), "Prefix directory does not exist");
                None
            }
        })
    }

    /// Locate the file whose capture time lies within
    /// `[target - tolerance, target + tolerance]`.
    ///
    /// Returns None when no prefix directory exists or nothing matches.
    pub fn resolve(&self, target: DateTime<Utc>, tolerance: Duration) -> Option<FileMatch> {
        let dir = self.resolve_directory(target)?;
        let entries = match list_filenames(&dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "Cannot read scene directory");
                return None;
            }
        };

        let start = target
            .checked_sub_signed(tolerance)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let end = target
            .checked_add_signed(tolerance)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        let mut best: Option<(FileMatch, Duration)> = None;
        for filename in entries {
            let Some(fields) = self.pattern.parse(&filename) else {
                debug!(filename = %filename, "Skipping non-matching entry");
                continue;
            };

            if fields.capture_time < start || fields.capture_time > end {
                debug!(
                    filename = %filename,
                    capture_time = %fields.capture_time,
                    "Entry outside time window"
                );
                continue;
            }

            let distance = (fields.capture_time - target).abs();
            let candidate = FileMatch {
                path: dir.join(&filename),
                filename,
                msg_id: fields.msg_id,
                capture_time: fields.capture_time,
                compression: fields.compression,
            };

            match self.policy {
                MatchPolicy::First => {
                    best = Some((candidate, distance));
                    break;
                }
                MatchPolicy::Closest => {
                    if best.as_ref().map_or(true, |(_, d)| distance < *d) {
                        best = Some((candidate, distance));
                    }
                }
            }
        }

        let found = best.map(|(m, _)| m);
        match &found {
            Some(m) => info!(
                path = %m.path.display(),
                capture_time = %m.capture_time,
                msg_id = m.msg_id,
                "Located scene file"
            ),
            None => debug!(dir = %dir.display(), target = %target, "No scene file in time window"),
        }
        found
    }
}

/// Expand a strftime prefix template for `target`.
///
/// Returns None if the template contains an invalid specifier.
pub fn expand_prefix(template: &str, target: DateTime<Utc>) -> Option<String> {
    let items: Vec<Item<'_>> = StrftimeItems::new(template).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return None;
    }
    Some(target.format_with_items(items.iter()).to_string())
}

/// UTF-8 entry names of `dir`, sorted.
fn list_filenames(dir: &Path) -> std::io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        match entry.file_name().into_string() {
            Ok(name) => names.push(name),
            Err(raw) => debug!(name = ?raw, "Skipping non UTF-8 entry"),
        }
    }
    names.sort();
    Ok(names)
}
