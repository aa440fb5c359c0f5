//! Scene assembly.
//!
//! [`SceneLoader::load`] turns a timestamp, a list of channel names and a
//! window into a [`Scene`]:
//!
//! 1. resolve the window into both pixel and geos coordinates
//! 2. locate the scene file within the time tolerance
//! 3. decompress it into a temporary file if needed
//! 4. read scene geometry and calibration
//! 5. extract each requested channel, skipping the ones that fail
//!
//! Only an invalid window is reported as an error. Every other failure is
//! logged and the load returns `Ok(None)`; [`SceneLoader::try_load`] exposes
//! the underlying cause instead.

use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, error, info, warn};

use msg_common::{
    channel_number, geos_wkt, satellite_for_msg_id, CalibrationParams, GeoTransform, GeosArea,
    PixelArea, PixelWindow, Satellite, GRID_SIZE,
};
use msg_store::{SceneStore, StoreOpener};
use projection::SeviriGrid;

use crate::config::LoaderConfig;
use crate::decompress::Decompressor;
use crate::error::{ChannelError, LoaderError, Result};
use crate::filename::FilenamePattern;
use crate::layout::{
    calibration_for, channel_data_key, ImageDescription, CALIBRATION_KEY, IMAGE_DESCRIPTION_KEY,
};
use crate::resolver::{FileMatch, FileResolver};
use crate::scene::{ChannelMetadata, ChannelRecord, Scene, SceneGeometry, NO_DATA_VALUE};

/// A requested window in both coordinate systems.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedArea {
    pub pixel_area: PixelArea,
    pub geos_area: GeosArea,
    /// Floored pixel window, inside the full-disk grid
    pub window: PixelWindow,
}

/// Everything a channel extraction needs from the scene-level reads.
struct ChannelContext<'a> {
    calibration: &'a [CalibrationParams],
    storage_window: PixelWindow,
    geotransform: GeoTransform,
    satellite: Satellite,
    timestamp: DateTime<Utc>,
}

/// Loads scenes from an archive tree.
pub struct SceneLoader<O> {
    config: LoaderConfig,
    resolver: FileResolver,
    decompressor: Decompressor,
    grid: SeviriGrid,
    opener: O,
}

impl<O: StoreOpener> SceneLoader<O> {
    /// Build a loader. Fails if the configured filename pattern is invalid.
    pub fn new(config: LoaderConfig, opener: O) -> Result<Self> {
        let pattern = match &config.filename_pattern {
            Some(pattern) => FilenamePattern::new(pattern)?,
            None => FilenamePattern::msg_hdf5(),
        };

        let resolver = FileResolver::new(config.base_path.clone(), config.prefixes.clone())
            .with_pattern(pattern)
            .with_policy(config.match_policy);
        let decompressor = Decompressor::new(config.temp_dir.clone());

        debug!(
            base_path = %config.base_path.display(),
            temp_dir = %decompressor.temp_dir().display(),
            tolerance_minutes = config.tolerance_minutes,
            "Created scene loader"
        );

        Ok(Self {
            config,
            resolver,
            decompressor,
            grid: SeviriGrid::full_disk(),
            opener,
        })
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn resolver(&self) -> &FileResolver {
        &self.resolver
    }

    pub fn opener(&self) -> &O {
        &self.opener
    }

    /// Locate the scene file for `target` with the configured tolerance.
    pub fn find_file(&self, target: DateTime<Utc>) -> Option<FileMatch> {
        self.resolver.resolve(target, self.config.tolerance())
    }

    /// Load a scene with the configured time tolerance.
    ///
    /// `geos_area` takes precedence over `pixel_area` when both are given.
    /// Returns `Err` only for an unusable window; a missing file, unreadable
    /// metadata or zero extracted channels yield `Ok(None)`.
    pub fn load<S: AsRef<str>>(
        &self,
        target: DateTime<Utc>,
        channels: &[S],
        pixel_area: Option<PixelArea>,
        geos_area: Option<GeosArea>,
    ) -> Result<Option<Scene>> {
        self.load_with_tolerance(target, channels, pixel_area, geos_area, self.config.tolerance())
    }

    pub fn load_with_tolerance<S: AsRef<str>>(
        &self,
        target: DateTime<Utc>,
        channels: &[S],
        pixel_area: Option<PixelArea>,
        geos_area: Option<GeosArea>,
        tolerance: Duration,
    ) -> Result<Option<Scene>> {
        match self.load_inner(target, channels, pixel_area, geos_area, tolerance) {
            Ok(scene) => Ok(scene),
            Err(e) if e.is_area_error() => Err(e),
            Err(e @ (LoaderError::Store(_) | LoaderError::Decompression(_))) => {
                error!(target = %target, error = %e, "Scene load failed");
                Ok(None)
            }
            Err(e) => {
                warn!(target = %target, error = %e, "Scene not loaded");
                Ok(None)
            }
        }
    }

    /// Like [`SceneLoader::load`], but returns the cause of a failed load
    /// instead of logging it. Absence of a file or of any channel is still
    /// `Ok(None)`.
    pub fn try_load<S: AsRef<str>>(
        &self,
        target: DateTime<Utc>,
        channels: &[S],
        pixel_area: Option<PixelArea>,
        geos_area: Option<GeosArea>,
    ) -> Result<Option<Scene>> {
        self.load_inner(target, channels, pixel_area, geos_area, self.config.tolerance())
    }

    /// Turn the caller's area inputs into a validated window.
    pub fn resolve_area(
        &self,
        pixel_area: Option<PixelArea>,
        geos_area: Option<GeosArea>,
    ) -> Result<ResolvedArea> {
        let area_error = || LoaderError::Area {
            pixel_area,
            geos_area,
        };

        let (pixel, geos) = match (pixel_area, geos_area) {
            (_, Some(geos)) => {
                if !geos.is_finite() {
                    return Err(area_error());
                }
                if pixel_area.is_some() {
                    debug!("Both areas given, using geos_area");
                }
                (self.grid.pixel_area_from_geos_area(&geos), geos)
            }
            (Some(pixel), None) => {
                if !pixel.is_bounded() {
                    return Err(area_error());
                }
                let geos = self.grid.geos_area_from_pixel_area(&pixel);
                (self.grid.pixel_area_from_geos_area(&geos), geos)
            }
            (None, None) => return Err(area_error()),
        };

        let window = pixel
            .window()
            .filter(|w| w.fits_within(GRID_SIZE, GRID_SIZE))
            .ok_or_else(area_error)?;

        Ok(ResolvedArea {
            pixel_area: pixel,
            geos_area: geos,
            window,
        })
    }

    fn load_inner<S: AsRef<str>>(
        &self,
        target: DateTime<Utc>,
        channels: &[S],
        pixel_area: Option<PixelArea>,
        geos_area: Option<GeosArea>,
        tolerance: Duration,
    ) -> Result<Option<Scene>> {
        let area = self.resolve_area(pixel_area, geos_area)?;

        let Some(file) = self.resolver.resolve(target, tolerance) else {
            info!(
                target = %target,
                directory = ?self.resolver.resolve_directory(target),
                "No scene file found"
            );
            return Ok(None);
        };

        let mut temp = self
            .decompressor
            .try_materialize(&file.path, &file.compression_kind())?;
        let read_path = match &temp {
            Some(resource) => resource.path().to_path_buf(),
            None => file.path.clone(),
        };

        let result = self.assemble(target, &file, &read_path, &area, channels);

        if let Some(resource) = temp.as_mut() {
            resource.release();
        }
        result
    }

    /// Read the opened scene file. The store is closed before returning.
    fn assemble<S: AsRef<str>>(
        &self,
        target: DateTime<Utc>,
        file: &FileMatch,
        read_path: &Path,
        area: &ResolvedArea,
        channels: &[S],
    ) -> Result<Option<Scene>> {
        let store = self.opener.open(read_path).map_err(|e| {
            error!(path = %read_path.display(), error = %e, "Cannot open scene file");
            e
        })?;

        let descriptor = store.read_descriptor(IMAGE_DESCRIPTION_KEY)?;
        let image = ImageDescription::from_descriptor(&descriptor)?;
        let calibration = store.read_calibration(CALIBRATION_KEY)?;
        let satellite =
            satellite_for_msg_id(file.msg_id).ok_or(LoaderError::UnknownSatellite(file.msg_id))?;

        let geometry = SceneGeometry {
            wkt: geos_wkt(image.sub_satellite_lon),
            geotransform: GeoTransform::axis_aligned(
                area.geos_area.top_left_x,
                area.geos_area.top_left_y,
                image.we_pitch,
                image.ns_pitch,
            ),
            pixel_area: area.pixel_area,
            geos_area: area.geos_area,
            window: area.window,
            sub_satellite_lon: image.sub_satellite_lon,
        };

        let ctx = ChannelContext {
            calibration: &calibration,
            storage_window: self.config.row_order.storage_window(&area.window),
            geotransform: geometry.geotransform,
            satellite,
            timestamp: file.capture_time,
        };

        let (extracted, failed): (Vec<_>, Vec<_>) = channels
            .iter()
            .map(|name| {
                let name = name.as_ref();
                self.extract_channel(&store, name, &ctx)
                    .map_err(|e| (name, e))
            })
            .partition(std::result::Result::is_ok);

        drop(store);

        for (name, err) in failed.into_iter().filter_map(std::result::Result::err) {
            warn!(
                channel = name,
                missing = err.is_missing(),
                error = %err,
                "Skipping channel"
            );
        }
        let records: Vec<ChannelRecord> = extracted
            .into_iter()
            .filter_map(std::result::Result::ok)
            .collect();

        let scene = Scene::new(
            file.capture_time,
            target,
            file.path.clone(),
            satellite,
            geometry,
            records,
        );

        match &scene {
            Some(scene) => info!(
                path = %file.path.display(),
                satellite = %satellite,
                channels = ?scene.channel_names(),
                window = %area.window,
                "Assembled scene"
            ),
            None => warn!(
                path = %file.path.display(),
                "None of the requested channels could be extracted"
            ),
        }
        Ok(scene)
    }

    fn extract_channel(
        &self,
        store: &O::Store,
        name: &str,
        ctx: &ChannelContext<'_>,
    ) -> std::result::Result<ChannelRecord, ChannelError> {
        let number =
            channel_number(name).ok_or_else(|| ChannelError::UnknownChannel(name.to_string()))?;
        let key = channel_data_key(number);
        let params =
            calibration_for(ctx.calibration, number).ok_or(ChannelError::MissingCalibration(number))?;

        let counts = store.read_window(&key, &ctx.storage_window)?;
        let raster = self.config.row_order.orient(counts).mapv(|v| v as i16);
        debug!(channel = name, key = %key, shape = ?raster.dim(), "Extracted channel");

        Ok(ChannelRecord {
            channel_name: name.to_string(),
            raster,
            geotransform: ctx.geotransform,
            metadata: ChannelMetadata {
                calibration_slope: params.slope,
                calibration_offset: params.offset,
                channel_number: number,
                timestamp: ctx.timestamp,
            },
            satellite: ctx.satellite,
            no_data_value: NO_DATA_VALUE,
        })
    }
}

#[cfg(feature = "hdf5")]
impl SceneLoader<msg_store::Hdf5Opener> {
    /// Loader reading native HDF5 products.
    pub fn hdf5(config: LoaderConfig) -> Result<Self> {
        Self::new(config, msg_store::Hdf5Opener)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use msg_store::SnapshotOpener;

    fn loader() -> SceneLoader<SnapshotOpener> {
        SceneLoader::new(LoaderConfig::new("/nonexistent"), SnapshotOpener).unwrap()
    }

    #[test]
    fn test_resolve_pixel_area() {
        let area = loader()
            .resolve_area(Some(PixelArea::new(1856.0, 1856.0, 3712.0, 3712.0)), None)
            .unwrap();
        assert_eq!(area.window, PixelWindow::new(1856, 1856, 1856, 1856));
        assert!(area.geos_area.top_left_x.abs() < 1e-6);
        assert!(area.geos_area.top_left_y.abs() < 1e-6);
        assert!(area.geos_area.right_x > 0.0);
        assert!(area.geos_area.bottom_y < 0.0);
    }

    #[test]
    fn test_geos_area_wins() {
        let loader = loader();
        let geos = loader
            .grid
            .geos_area_from_pixel_area(&PixelArea::new(100.0, 200.0, 110.0, 220.0));
        let area = loader
            .resolve_area(Some(PixelArea::new(0.0, 0.0, 5.0, 5.0)), Some(geos))
            .unwrap();
        assert_eq!(area.window, PixelWindow::new(100, 200, 10, 20));
        assert_eq!(area.geos_area, geos);
    }

    #[test]
    fn test_area_errors() {
        let loader = loader();
        let err = loader.resolve_area(None, None).unwrap_err();
        assert!(matches!(
            err,
            LoaderError::Area {
                pixel_area: None,
                geos_area: None
            }
        ));

        let inputs = [
            PixelArea::new(10.0, 10.0, 10.0, 20.0),
            PixelArea::new(-5.0, 0.0, 10.0, 10.0),
            PixelArea::new(3700.0, 0.0, 3720.0, 10.0),
            PixelArea::new(f64::NAN, 0.0, 10.0, 10.0),
        ];
        for pixel in inputs {
            let err = loader.resolve_area(Some(pixel), None).unwrap_err();
            assert!(err.is_area_error(), "{:?} should be rejected", pixel);
        }

        let err = loader
            .resolve_area(None, Some(GeosArea::new(f64::INFINITY, 0.0, 1.0, -1.0)))
            .unwrap_err();
        assert!(err.is_area_error());
    }

    #[test]
    fn test_huge_finite_areas_rejected() {
        let loader = loader();
        let err = loader
            .resolve_area(Some(PixelArea::new(-5e18, 0.0, 5e18, 10.0)), None)
            .unwrap_err();
        assert!(err.is_area_error());

        let geos_inputs = [
            GeosArea::new(-5e18, 1000.0, 5e18, -1000.0),
            GeosArea::new(0.0, f64::MAX, 1000.0, -f64::MAX),
        ];
        for geos in geos_inputs {
            let err = loader.resolve_area(None, Some(geos)).unwrap_err();
            assert!(err.is_area_error(), "{:?} should be rejected", geos);
        }
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let config = LoaderConfig::new("/data").with_filename_pattern("^nope$");
        let err = SceneLoader::new(config, SnapshotOpener).err().unwrap();
        assert!(matches!(err, LoaderError::InvalidPattern(_)));
    }
}
