//! MSG/SEVIRI scene loading.
//!
//! Locates the level 1.5 scene file for a timestamp in a per-timeslot
//! archive tree, decompresses it if needed and extracts a cropped raster
//! per requested channel together with the scene geometry.
//!
//! ```ignore
//! use scene_loader::{LoaderConfig, SceneLoader};
//! use msg_common::PixelArea;
//!
//! let loader = SceneLoader::hdf5(LoaderConfig::from_env()?)?;
//! let scene = loader.load(
//!     timestamp,
//!     &["VIS006", "IR108"],
//!     Some(PixelArea::new(1856.0, 1856.0, 3712.0, 3712.0)),
//!     None,
//! )?;
//! ```

pub mod config;
pub mod decompress;
pub mod error;
pub mod filename;
pub mod layout;
pub mod loader;
pub mod resolver;
pub mod scene;

pub use config::LoaderConfig;
pub use decompress::{Decompressor, TempResource};
pub use error::{ChannelError, LoaderError, Result};
pub use filename::{Compression, FilenameFields, FilenamePattern, MSG_HDF5_FILENAME_PATTERN};
pub use layout::{ImageDescription, RowOrder};
pub use loader::{ResolvedArea, SceneLoader};
pub use resolver::{FileMatch, FileResolver, MatchPolicy, DEFAULT_PREFIX};
pub use scene::{ChannelMetadata, ChannelRecord, Scene, SceneGeometry, NO_DATA_VALUE};
