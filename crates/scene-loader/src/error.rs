//! Error types for the scene-loader crate.

use std::path::PathBuf;

use msg_common::{GeosArea, PixelArea};
use msg_store::StoreError;
use thiserror::Error;

/// Errors that can occur while loading a scene.
///
/// Only [`LoaderError::Area`] reaches callers of `SceneLoader::load`; the
/// other variants are logged there and degrade to "no scene".
#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Invalid area: pixel_area={pixel_area:?}, geos_area={geos_area:?}")]
    Area {
        pixel_area: Option<PixelArea>,
        geos_area: Option<GeosArea>,
    },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Unknown satellite id: MSG{0}")]
    UnknownSatellite(u8),

    #[error("Invalid metadata: {0}")]
    InvalidMetadata(String),

    #[error("Unsupported compression suffix: {0}")]
    UnsupportedCompression(String),

    #[error("Decompression failed: {}", .0.display())]
    Decompression(PathBuf),

    #[error("Invalid filename pattern: {0}")]
    InvalidPattern(String),
}

impl LoaderError {
    pub fn is_area_error(&self) -> bool {
        matches!(self, LoaderError::Area { .. })
    }
}

/// Result type for scene-loader operations.
pub type Result<T> = std::result::Result<T, LoaderError>;

/// Why a single requested channel was left out of a scene.
#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("Unknown channel name: {0}")]
    UnknownChannel(String),

    #[error("No calibration entry for channel {0}")]
    MissingCalibration(u8),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ChannelError {
    /// True for the "expected key absent" family of failures.
    pub fn is_missing(&self) -> bool {
        match self {
            ChannelError::MissingCalibration(_) => true,
            ChannelError::Store(err) => err.is_missing_key(),
            ChannelError::UnknownChannel(_) => false,
        }
    }
}
