//! In-memory scene store with JSON snapshot persistence.

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use ndarray::{s, Array2};
use serde::{Deserialize, Serialize};
use tracing::debug;

use msg_common::{CalibrationParams, PixelWindow};

use crate::error::{StoreError, StoreResult};
use crate::{window_ranges, SceneStore, StoreOpener};

/// One value stored under a key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoreEntry {
    Descriptor { entries: Vec<(String, String)> },
    Calibration { table: Vec<CalibrationParams> },
    Raster { data: Array2<u16> },
}

impl StoreEntry {
    fn kind(&self) -> &'static str {
        match self {
            StoreEntry::Descriptor { .. } => "descriptor",
            StoreEntry::Calibration { .. } => "calibration",
            StoreEntry::Raster { .. } => "raster",
        }
    }
}

/// A scene held entirely in memory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryStore {
    entries: BTreeMap<String, StoreEntry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_descriptor<K, V, I>(&mut self, key: &str, entries: I) -> &mut Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        let entries = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.entries
            .insert(key.to_string(), StoreEntry::Descriptor { entries });
        self
    }

    pub fn insert_calibration(&mut self, key: &str, table: Vec<CalibrationParams>) -> &mut Self {
        self.entries
            .insert(key.to_string(), StoreEntry::Calibration { table });
        self
    }

    pub fn insert_raster(&mut self, key: &str, data: Array2<u16>) -> &mut Self {
        self.entries
            .insert(key.to_string(), StoreEntry::Raster { data });
        self
    }

    pub fn remove(&mut self, key: &str) -> Option<StoreEntry> {
        self.entries.remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize the store as a JSON snapshot.
    pub fn write_snapshot<W: Write>(&self, writer: W) -> StoreResult<()> {
        serde_json::to_writer(writer, self)?;
        Ok(())
    }

    pub fn to_snapshot_bytes(&self) -> StoreResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Write a JSON snapshot to `path`.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> StoreResult<()> {
        let mut writer = BufWriter::new(File::create(path.as_ref())?);
        self.write_snapshot(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Load a JSON snapshot from `path`.
    pub fn load<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);
        let store: MemoryStore = serde_json::from_reader(reader)?;
        debug!(path = %path.display(), keys = store.len(), "Loaded store snapshot");
        Ok(store)
    }

    fn entry(&self, key: &str) -> StoreResult<&StoreEntry> {
        self.entries
            .get(key)
            .ok_or_else(|| StoreError::MissingKey(key.to_string()))
    }

    fn wrong_kind(key: &str, expected: &str, entry: &StoreEntry) -> StoreError {
        StoreError::InvalidFormat(format!(
            "'{}' holds a {}, expected a {}",
            key,
            entry.kind(),
            expected
        ))
    }
}

impl SceneStore for MemoryStore {
    fn read_descriptor(&self, key: &str) -> StoreResult<HashMap<String, String>> {
        match self.entry(key)? {
            StoreEntry::Descriptor { entries } => Ok(entries.iter().cloned().collect()),
            other => Err(Self::wrong_kind(key, "descriptor", other)),
        }
    }

    fn read_calibration(&self, key: &str) -> StoreResult<Vec<CalibrationParams>> {
        match self.entry(key)? {
            StoreEntry::Calibration { table } => Ok(table.clone()),
            other => Err(Self::wrong_kind(key, "calibration", other)),
        }
    }

    fn read_window(&self, key: &str, window: &PixelWindow) -> StoreResult<Array2<u16>> {
        match self.entry(key)? {
            StoreEntry::Raster { data } => {
                let (rows, cols) = window_ranges(key, window, data.dim())?;
                Ok(data.slice(s![rows, cols]).to_owned())
            }
            other => Err(Self::wrong_kind(key, "raster", other)),
        }
    }

    fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }
}

/// Opens JSON snapshot files written by [`MemoryStore::save`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SnapshotOpener;

impl StoreOpener for SnapshotOpener {
    type Store = MemoryStore;

    fn open(&self, path: &Path) -> StoreResult<MemoryStore> {
        MemoryStore::load(path)
    }
}
