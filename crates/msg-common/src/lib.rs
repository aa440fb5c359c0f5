//! Common types shared across the MSG scene-loading crates.
//!
//! Holds the value types passed between the resolver, the store backends and
//! the scene assembler, plus the small catalogs (channels, satellites) and the
//! coordinate-reference descriptor for the geostationary projection.

pub mod area;
pub mod channel;
pub mod crs;
pub mod geotransform;
pub mod satellite;

pub use area::{AreaParseError, GeosArea, PixelArea, PixelWindow, MAX_PIXEL_BOUND};
pub use channel::{channel_name, channel_number, CalibrationParams, CHANNEL_NAMES};
pub use crs::geos_wkt;
pub use geotransform::GeoTransform;
pub use satellite::{satellite_for_msg_id, Satellite, MSG_SATELLITES};

/// Number of rows and columns of the SEVIRI VIS/IR reference grid.
pub const GRID_SIZE: usize = 3712;
