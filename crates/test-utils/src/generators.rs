//! Generators for synthetic scene stores and archive trees.
//!
//! Rasters follow a predictable pattern so a test can tell exactly which
//! stored rows and columns ended up in an extracted window.

use std::cell::RefCell;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use bzip2::write::BzEncoder;
use chrono::{DateTime, Utc};
use flate2::write::GzEncoder;
use ndarray::Array2;

use msg_common::CalibrationParams;
use msg_store::{MemoryStore, StoreOpener, StoreResult};

use crate::fixtures::{calibration_table, descriptor};

/// Store keys of the level 1.5 layout.
pub mod keys {
    pub const IMAGE_DESCRIPTION: &str =
        "/U-MARF/MSG/Level1.5/METADATA/HEADER/ImageDescription/ImageDescription_DESCR";
    pub const CALIBRATION: &str =
        "/U-MARF/MSG/Level1.5/METADATA/HEADER/RadiometricProcessing/Level15ImageCalibration_ARRAY";

    pub fn channel(number: u8) -> String {
        format!("/U-MARF/MSG/Level1.5/DATA/Channel {:02}/IMAGE_DATA", number)
    }
}

/// Value stored at `(row, col)` of every synthetic raster.
///
/// Unique within a 64 x 512 tile and never above `i16::MAX`.
pub fn pattern_value(row: usize, col: usize) -> u16 {
    ((row % 64) * 512 + col % 512) as u16
}

/// A `(rows, cols)` raster filled with [`pattern_value`].
pub fn pattern_raster(rows: usize, cols: usize) -> Array2<u16> {
    Array2::from_shape_fn((rows, cols), |(r, c)| pattern_value(r, c))
}

/// Builder for a synthetic level 1.5 scene.
#[derive(Debug, Clone)]
pub struct SyntheticScene {
    channels: Vec<u8>,
    rows: usize,
    cols: usize,
    sub_satellite_lon: String,
    calibration: Vec<CalibrationParams>,
}

impl SyntheticScene {
    /// Scene with rasters of `rows` x `cols` for the given channel numbers.
    pub fn new(channels: &[u8], rows: usize, cols: usize) -> Self {
        Self {
            channels: channels.to_vec(),
            rows,
            cols,
            sub_satellite_lon: descriptor::SUB_SATELLITE_LON.to_string(),
            calibration: calibration_table(),
        }
    }

    pub fn sub_satellite_lon(mut self, lon: &str) -> Self {
        self.sub_satellite_lon = lon.to_string();
        self
    }

    pub fn calibration(mut self, table: Vec<CalibrationParams>) -> Self {
        self.calibration = table;
        self
    }

    pub fn build(&self) -> MemoryStore {
        let mut store = MemoryStore::new();
        store
            .insert_descriptor(
                keys::IMAGE_DESCRIPTION,
                [
                    ("ReferenceGridVIS_IR-LineDirGridStep", descriptor::GRID_STEP_KM),
                    ("ReferenceGridVIS_IR-ColumnDirGridStep", descriptor::GRID_STEP_KM),
                    (
                        "ProjectionDescription-LongitudeOfSSP",
                        self.sub_satellite_lon.as_str(),
                    ),
                ],
            )
            .insert_calibration(keys::CALIBRATION, self.calibration.clone());

        let raster = pattern_raster(self.rows, self.cols);
        for &channel in &self.channels {
            store.insert_raster(&keys::channel(channel), raster.clone());
        }
        store
    }
}

/// Directory of the default `%Y/%m/%d/%Y%m%d_%H%M/` layout for `time`,
/// created under `base`.
pub fn timeslot_dir(base: &Path, time: DateTime<Utc>) -> PathBuf {
    let dir = base.join(time.format("%Y/%m/%d/%Y%m%d_%H%M").to_string());
    fs::create_dir_all(&dir).expect("Failed to create timeslot directory");
    dir
}

/// Write `store` as an uncompressed snapshot named `filename`.
pub fn write_scene(dir: &Path, filename: &str, store: &MemoryStore) -> PathBuf {
    let path = dir.join(filename);
    store.save(&path).expect("Failed to write scene snapshot");
    path
}

/// Write `store` as a bzip2-compressed snapshot named `filename`.
pub fn write_bz2_scene(dir: &Path, filename: &str, store: &MemoryStore) -> PathBuf {
    let bytes = store.to_snapshot_bytes().expect("Failed to serialize scene");
    write_file(dir, filename, &bz2_bytes(&bytes))
}

/// Write `store` as a gzip-compressed snapshot named `filename`.
pub fn write_gz_scene(dir: &Path, filename: &str, store: &MemoryStore) -> PathBuf {
    let bytes = store.to_snapshot_bytes().expect("Failed to serialize scene");
    write_file(dir, filename, &gz_bytes(&bytes))
}

/// Write raw bytes to `dir/filename`.
pub fn write_file(dir: &Path, filename: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(filename);
    fs::write(&path, bytes).expect("Failed to write test file");
    path
}

pub fn bz2_bytes(data: &[u8]) -> Vec<u8> {
    let mut encoder = BzEncoder::new(Vec::new(), bzip2::Compression::default());
    encoder.write_all(data).expect("bzip2 write");
    encoder.finish().expect("bzip2 finish")
}

pub fn gz_bytes(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(data).expect("gzip write");
    encoder.finish().expect("gzip finish")
}

/// Snapshot opener that records every path it opens and whether the file
/// existed at that moment.
#[derive(Debug, Default)]
pub struct RecordingOpener {
    opened: RefCell<Vec<(PathBuf, bool)>>,
}

impl RecordingOpener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Paths opened so far, with their existence at open time.
    pub fn opened(&self) -> Vec<(PathBuf, bool)> {
        self.opened.borrow().clone()
    }

    pub fn last_opened(&self) -> Option<PathBuf> {
        self.opened.borrow().last().map(|(path, _)| path.clone())
    }
}

impl StoreOpener for RecordingOpener {
    type Store = MemoryStore;

    fn open(&self, path: &Path) -> StoreResult<MemoryStore> {
        self.opened
            .borrow_mut()
            .push((path.to_path_buf(), path.exists()));
        MemoryStore::load(path)
    }
}

/// Opener that hands out a copy of one in-memory store for any path.
///
/// Useful for full-disk sized rasters that would be slow to round-trip
/// through a JSON snapshot. Opened paths are recorded.
#[derive(Debug)]
pub struct MemoryOpener {
    store: MemoryStore,
    opened: RefCell<Vec<PathBuf>>,
}

impl MemoryOpener {
    pub fn new(store: MemoryStore) -> Self {
        Self {
            store,
            opened: RefCell::new(Vec::new()),
        }
    }

    pub fn opened(&self) -> Vec<PathBuf> {
        self.opened.borrow().clone()
    }
}

impl StoreOpener for MemoryOpener {
    type Store = MemoryStore;

    fn open(&self, path: &Path) -> StoreResult<MemoryStore> {
        self.opened.borrow_mut().push(path.to_path_buf());
        Ok(self.store.clone())
    }
}
