//! Key/array access to MSG level 1.5 scene files.
//!
//! The scene loader only needs three kinds of reads from a scene file: a
//! key/value descriptor record, a calibration table and 2-D raster windows.
//! [`SceneStore`] captures exactly that, addressed by hierarchical keys such
//! as `/U-MARF/MSG/Level1.5/DATA/Channel 09/IMAGE_DATA`.
//!
//! # Backends
//!
//! - [`MemoryStore`]: in-memory store, persisted as a JSON snapshot and
//!   opened through [`SnapshotOpener`]. Used for fixtures and tooling.
//! - `Hdf5Store` (feature `hdf5`): native HDF5 files through libhdf5.
//!   System requirements: libhdf5-dev

pub mod error;
#[cfg(feature = "hdf5")]
pub mod hdf5_file;
pub mod memory;

use std::collections::HashMap;
use std::ops::Range;
use std::path::Path;

use ndarray::Array2;

pub use error::{StoreError, StoreResult};
#[cfg(feature = "hdf5")]
pub use hdf5_file::{silence_hdf5_errors, Hdf5Opener, Hdf5Store};
pub use memory::{MemoryStore, SnapshotOpener, StoreEntry};

use msg_common::{CalibrationParams, PixelWindow};

/// Read access to one opened scene file.
///
/// Dropping the store closes the underlying file.
pub trait SceneStore {
    /// Read a key/value descriptor record.
    fn read_descriptor(&self, key: &str) -> StoreResult<HashMap<String, String>>;

    /// Read a calibration table, one entry per channel in channel order.
    fn read_calibration(&self, key: &str) -> StoreResult<Vec<CalibrationParams>>;

    /// Read a window of a 2-D raster of raw counts.
    ///
    /// Rows and columns refer to the raster as stored.
    fn read_window(&self, key: &str, window: &PixelWindow) -> StoreResult<Array2<u16>>;

    /// Check whether a key exists.
    fn contains(&self, key: &str) -> bool;
}

/// Opens scene files into a [`SceneStore`].
pub trait StoreOpener {
    type Store: SceneStore;

    fn open(&self, path: &Path) -> StoreResult<Self::Store>;
}

/// Validate `window` against a raster of shape `(rows, cols)` and turn it
/// into index ranges `(rows, cols)`.
pub(crate) fn window_ranges(
    key: &str,
    window: &PixelWindow,
    shape: (usize, usize),
) -> StoreResult<(Range<usize>, Range<usize>)> {
    let (rows, cols) = shape;
    if !window.fits_within(cols, rows) {
        return Err(StoreError::WindowOutOfBounds {
            key: key.to_string(),
            window: *window,
            rows,
            cols,
        });
    }

    // fits_within guarantees non-negative bounds
    let row_range = window.y_off as usize..window.y_max() as usize;
    let col_range = window.x_off as usize..window.x_max() as usize;
    Ok((row_range, col_range))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_ranges() {
        let (rows, cols) = window_ranges("k", &PixelWindow::new(2, 3, 4, 5), (10, 10)).unwrap();
        assert_eq!(rows, 3..8);
        assert_eq!(cols, 2..6);
    }

    #[test]
    fn test_window_ranges_out_of_bounds() {
        let err = window_ranges("k", &PixelWindow::new(8, 0, 4, 5), (10, 10)).unwrap_err();
        assert!(matches!(err, StoreError::WindowOutOfBounds { rows: 10, cols: 10, .. }));
        assert!(!err.is_missing_key());

        let err = window_ranges("k", &PixelWindow::new(0, -1, 4, 5), (10, 10)).unwrap_err();
        assert!(matches!(err, StoreError::WindowOutOfBounds { .. }));
    }
}
