//! Native HDF5 backend.
//!
//! Reads U-MARF level 1.5 HDF5 products through libhdf5. The descriptor and
//! calibration records are compound datasets; rasters are 2-D unsigned
//! 16-bit datasets read window by window so a small crop never loads the
//! full disk.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Once;

use hdf5::types::FixedAscii;
use hdf5::H5Type;
use ndarray::{s, Array2};
use tracing::debug;

use msg_common::{CalibrationParams, PixelWindow};

use crate::error::{StoreError, StoreResult};
use crate::{window_ranges, SceneStore, StoreOpener};

/// Silence HDF5's automatic error printing to stderr.
///
/// Probing for a missing channel dataset is an expected outcome here, but
/// the C library prints a full error stack for it. Only needs to run once
/// per process; safe to call repeatedly.
pub fn silence_hdf5_errors() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        // SAFETY: H5Eset_auto2 with null handlers is a documented way to
        // disable automatic error printing.
        unsafe {
            hdf5_metno_sys::h5e::H5Eset_auto2(
                hdf5_metno_sys::h5e::H5E_DEFAULT,
                None,
                std::ptr::null_mut(),
            );
        }
    });
}

/// One row of the `*_DESCR` key/value records.
#[derive(H5Type, Clone, Copy, Debug)]
#[repr(C)]
struct DescriptorRow {
    #[hdf5(rename = "EntryName")]
    name: FixedAscii<128>,
    #[hdf5(rename = "Value")]
    value: FixedAscii<256>,
}

/// One row of the level 1.5 calibration array.
#[derive(H5Type, Clone, Copy, Debug)]
#[repr(C)]
struct CalibrationRow {
    #[hdf5(rename = "Cal_Slope")]
    slope: f64,
    #[hdf5(rename = "Cal_Offset")]
    offset: f64,
}

/// An open HDF5 scene file.
pub struct Hdf5Store {
    file: hdf5::File,
    path: PathBuf,
}

impl Hdf5Store {
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        silence_hdf5_errors();

        let path = path.as_ref().to_path_buf();
        let file = hdf5::File::open(&path)?;
        debug!(path = %path.display(), "Opened HDF5 scene file");
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn dataset(&self, key: &str) -> StoreResult<hdf5::Dataset> {
        if !self.file.link_exists(key) {
            return Err(StoreError::MissingKey(key.to_string()));
        }
        Ok(self.file.dataset(key)?)
    }
}

impl SceneStore for Hdf5Store {
    fn read_descriptor(&self, key: &str) -> StoreResult<HashMap<String, String>> {
        let rows: Vec<DescriptorRow> = self.dataset(key)?.read_raw()?;
        Ok(rows
            .iter()
            .map(|row| {
                (
                    row.name.as_str().trim().to_string(),
                    row.value.as_str().trim().to_string(),
                )
            })
            .collect())
    }

    fn read_calibration(&self, key: &str) -> StoreResult<Vec<CalibrationParams>> {
        let rows: Vec<CalibrationRow> = self.dataset(key)?.read_raw()?;
        Ok(rows
            .iter()
            .map(|row| CalibrationParams::new(row.slope, row.offset))
            .collect())
    }

    fn read_window(&self, key: &str, window: &PixelWindow) -> StoreResult<Array2<u16>> {
        let dataset = self.dataset(key)?;
        let shape = dataset.shape();
        if shape.len() != 2 {
            return Err(StoreError::InvalidFormat(format!(
                "'{}' has {} dimensions, expected 2",
                key,
                shape.len()
            )));
        }

        let (rows, cols) = window_ranges(key, window, (shape[0], shape[1]))?;
        Ok(dataset.read_slice_2d::<u16, _>(s![rows, cols])?)
    }

    fn contains(&self, key: &str) -> bool {
        self.file.link_exists(key)
    }
}

/// Opens scene files with the native HDF5 backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct Hdf5Opener;

impl StoreOpener for Hdf5Opener {
    type Store = Hdf5Store;

    fn open(&self, path: &Path) -> StoreResult<Hdf5Store> {
        Hdf5Store::open(path)
    }
}
