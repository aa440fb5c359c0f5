//! Assembled scene types.

use std::ops::Index;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use ndarray::Array2;
use serde::Serialize;

use msg_common::{channel_number, GeoTransform, GeosArea, PixelArea, PixelWindow, Satellite};

/// Fill value for pixels without data.
pub const NO_DATA_VALUE: f64 = 0.0;

/// Per-channel metadata carried alongside the raster.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChannelMetadata {
    pub calibration_slope: f64,
    pub calibration_offset: f64,
    pub channel_number: u8,
    /// Capture time parsed from the scene filename, not the requested
    /// time. The requested time is kept on [`Scene::requested_time`].
    pub timestamp: DateTime<Utc>,
}

/// One extracted channel.
#[derive(Debug, Clone, Serialize)]
pub struct ChannelRecord {
    pub channel_name: String,
    /// Raw counts, north-up, shape `(rows, cols)` of the requested window
    pub raster: Array2<i16>,
    pub geotransform: GeoTransform,
    pub metadata: ChannelMetadata,
    pub satellite: Satellite,
    pub no_data_value: f64,
}

impl ChannelRecord {
    pub fn shape(&self) -> (usize, usize) {
        self.raster.dim()
    }
}

/// Geometry shared by every channel of a scene.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneGeometry {
    pub wkt: String,
    pub geotransform: GeoTransform,
    pub pixel_area: PixelArea,
    pub geos_area: GeosArea,
    pub window: PixelWindow,
    pub sub_satellite_lon: f64,
}

/// All channels extracted from one scene file for one window.
///
/// A scene always holds at least one channel.
#[derive(Debug, Clone, Serialize)]
pub struct Scene {
    /// Capture time parsed from the filename
    pub timestamp: DateTime<Utc>,
    /// Time the scene was requested for
    pub requested_time: DateTime<Utc>,
    pub source: PathBuf,
    pub satellite: Satellite,
    pub geometry: SceneGeometry,
    channels: Vec<ChannelRecord>,
}

impl Scene {
    /// Returns None when `channels` is empty.
    pub fn new(
        timestamp: DateTime<Utc>,
        requested_time: DateTime<Utc>,
        source: PathBuf,
        satellite: Satellite,
        geometry: SceneGeometry,
        channels: Vec<ChannelRecord>,
    ) -> Option<Self> {
        if channels.is_empty() {
            return None;
        }
        Some(Self {
            timestamp,
            requested_time,
            source,
            satellite,
            geometry,
            channels,
        })
    }

    /// Look up a channel by name.
    ///
    /// Names are compared by channel number, so `IR_108` finds `IR108`.
    pub fn channel(&self, name: &str) -> Option<&ChannelRecord> {
        match channel_number(name) {
            Some(number) => self
                .channels
                .iter()
                .find(|c| c.metadata.channel_number == number),
            None => self.channels.iter().find(|c| c.channel_name == name),
        }
    }

    /// Channels in request order.
    pub fn channels(&self) -> impl Iterator<Item = &ChannelRecord> {
        self.channels.iter()
    }

    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.channel_name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Raster shape `(rows, cols)` shared by all channels.
    pub fn shape(&self) -> (usize, usize) {
        self.geometry.window.shape()
    }

    pub fn wkt(&self) -> &str {
        &self.geometry.wkt
    }

    pub fn into_channels(self) -> Vec<ChannelRecord> {
        self.channels
    }
}

impl Index<&str> for Scene {
    type Output = ChannelRecord;

    fn index(&self, name: &str) -> &ChannelRecord {
        match self.channel(name) {
            Some(record) => record,
            None => panic!("channel '{}' not in scene", name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use msg_common::{geos_wkt, satellite_for_msg_id};

    fn record(name: &str, number: u8) -> ChannelRecord {
        let t = Utc.with_ymd_and_hms(2017, 1, 1, 0, 12, 0).unwrap();
        ChannelRecord {
            channel_name: name.to_string(),
            raster: Array2::zeros((2, 3)),
            geotransform: GeoTransform::axis_aligned(0.0, 0.0, 3000.0, -3000.0),
            metadata: ChannelMetadata {
                calibration_slope: 0.02,
                calibration_offset: -1.0,
                channel_number: number,
                timestamp: t,
            },
            satellite: satellite_for_msg_id(3).unwrap(),
            no_data_value: NO_DATA_VALUE,
        }
    }

    fn scene(channels: Vec<ChannelRecord>) -> Option<Scene> {
        let t = Utc.with_ymd_and_hms(2017, 1, 1, 0, 12, 0).unwrap();
        let geometry = SceneGeometry {
            wkt: geos_wkt(0.0),
            geotransform: GeoTransform::axis_aligned(0.0, 0.0, 3000.0, -3000.0),
            pixel_area: PixelArea::new(0.0, 0.0, 3.0, 2.0),
            geos_area: GeosArea::new(0.0, 0.0, 9000.0, -6000.0),
            window: PixelWindow::new(0, 0, 3, 2),
            sub_satellite_lon: 0.0,
        };
        Scene::new(
            t,
            t,
            PathBuf::from("scene.h5"),
            satellite_for_msg_id(3).unwrap(),
            geometry,
            channels,
        )
    }

    #[test]
    fn test_empty_scene_is_none() {
        assert!(scene(Vec::new()).is_none());
    }

    #[test]
    fn test_lookup_and_order() {
        let scene = scene(vec![record("IR108", 9), record("VIS006", 1)]).unwrap();
        assert_eq!(scene.len(), 2);
        assert!(!scene.is_empty());
        assert_eq!(scene.channel_names(), vec!["IR108", "VIS006"]);
        assert_eq!(scene.channel("ir_108").unwrap().metadata.channel_number, 9);
        assert_eq!(scene["VIS006"].metadata.channel_number, 1);
        assert!(scene.channel("WV062").is_none());
        assert_eq!(scene.shape(), (2, 3));
        assert!(scene.wkt().contains("Geostationary_Satellite"));
    }

    #[test]
    #[should_panic(expected = "not in scene")]
    fn test_index_missing_channel_panics() {
        let scene = scene(vec![record("IR108", 9)]).unwrap();
        let _ = &scene["HRV"];
    }
}
