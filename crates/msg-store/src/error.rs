//! Error types for scene store access.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Error types for store access.
#[derive(Error, Debug)]
pub enum StoreError {
    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Requested key does not exist in the store
    #[error("Missing key: {0}")]
    MissingKey(String),

    /// Requested window does not fit the stored raster
    #[error("Window {window} outside raster '{key}' of shape {rows}x{cols}")]
    WindowOutOfBounds {
        key: String,
        window: msg_common::PixelWindow,
        rows: usize,
        cols: usize,
    },

    /// Key exists but holds something else than expected
    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    /// Snapshot (de)serialization error
    #[error("Snapshot error: {0}")]
    Json(#[from] serde_json::Error),

    /// Native HDF5 library error
    #[cfg(feature = "hdf5")]
    #[error("HDF5 error: {0}")]
    Hdf5(#[from] hdf5::Error),
}

impl StoreError {
    /// True when the failure means "key not present".
    pub fn is_missing_key(&self) -> bool {
        matches!(self, StoreError::MissingKey(_))
    }
}
