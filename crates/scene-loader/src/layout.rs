//! Level 1.5 product layout: where things live inside a scene file and how
//! to interpret them.

use std::collections::HashMap;

use ndarray::{s, Array2};
use serde::{Deserialize, Serialize};

use msg_common::{CalibrationParams, PixelWindow, GRID_SIZE};

use crate::error::{LoaderError, Result};

/// Image description key/value record.
pub const IMAGE_DESCRIPTION_KEY: &str =
    "/U-MARF/MSG/Level1.5/METADATA/HEADER/ImageDescription/ImageDescription_DESCR";

/// Calibration table, one row per channel in channel-number order.
pub const CALIBRATION_KEY: &str =
    "/U-MARF/MSG/Level1.5/METADATA/HEADER/RadiometricProcessing/Level15ImageCalibration_ARRAY";

pub const LINE_DIR_GRID_STEP: &str = "ReferenceGridVIS_IR-LineDirGridStep";
pub const COLUMN_DIR_GRID_STEP: &str = "ReferenceGridVIS_IR-ColumnDirGridStep";
pub const LONGITUDE_OF_SSP: &str = "ProjectionDescription-LongitudeOfSSP";

/// Raster key for a channel number, e.g. `.../Channel 09/IMAGE_DATA`.
pub fn channel_data_key(channel_number: u8) -> String {
    format!(
        "/U-MARF/MSG/Level1.5/DATA/Channel {:02}/IMAGE_DATA",
        channel_number
    )
}

/// Calibration entry for a channel number (1-based).
///
/// The level 1.5 table has one row per channel with channel 1 in row 0, so
/// channel `n` reads row `n - 1`. Indexing by `n` would shift every channel
/// by one and drop HRV off the end of a 12-row table.
pub fn calibration_for(table: &[CalibrationParams], channel_number: u8) -> Option<CalibrationParams> {
    let index = usize::from(channel_number).checked_sub(1)?;
    table.get(index).copied()
}

/// Scene geometry read from the image description record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageDescription {
    /// West-east pixel pitch in metres
    pub we_pitch: f64,
    /// North-south pixel pitch in metres (negative: rows run southwards)
    pub ns_pitch: f64,
    pub sub_satellite_lon: f64,
}

impl ImageDescription {
    /// Grid steps are stored in kilometres.
    pub fn from_descriptor(descriptor: &HashMap<String, String>) -> Result<Self> {
        Ok(Self {
            we_pitch: descriptor_value(descriptor, LINE_DIR_GRID_STEP)? * 1000.0,
            ns_pitch: descriptor_value(descriptor, COLUMN_DIR_GRID_STEP)? * -1000.0,
            sub_satellite_lon: descriptor_value(descriptor, LONGITUDE_OF_SSP)?,
        })
    }
}

fn descriptor_value(descriptor: &HashMap<String, String>, name: &str) -> Result<f64> {
    let raw = descriptor
        .get(name)
        .ok_or_else(|| LoaderError::InvalidMetadata(format!("missing '{}'", name)))?;
    raw.trim().parse().map_err(|_| {
        LoaderError::InvalidMetadata(format!("'{}' is not a number: '{}'", name, raw))
    })
}

/// Row order of the rasters inside the scene file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowOrder {
    /// Row 0 is the southern edge; requested windows are mirrored before
    /// reading and the result is turned north-up.
    #[default]
    SouthUp,
    /// Rows are stored north-up and read as requested.
    NorthUp,
}

impl RowOrder {
    /// Window to read from the stored raster for a north-up request.
    pub fn storage_window(&self, window: &PixelWindow) -> PixelWindow {
        match self {
            RowOrder::SouthUp => window.flipped(GRID_SIZE),
            RowOrder::NorthUp => *window,
        }
    }

    /// Turn a raster read through [`RowOrder::storage_window`] north-up.
    pub fn orient(&self, data: Array2<u16>) -> Array2<u16> {
        match self {
            RowOrder::SouthUp => data.slice(s![..;-1, ..]).to_owned(),
            RowOrder::NorthUp => data,
        }
    }
}

impl std::str::FromStr for RowOrder {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "south_up" => Ok(RowOrder::SouthUp),
            "north_up" => Ok(RowOrder::NorthUp),
            other => Err(format!("unknown row order '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use msg_common::channel_number;

    fn descriptor(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_channel_data_key() {
        assert_eq!(
            channel_data_key(9),
            "/U-MARF/MSG/Level1.5/DATA/Channel 09/IMAGE_DATA"
        );
        assert_eq!(
            channel_data_key(12),
            "/U-MARF/MSG/Level1.5/DATA/Channel 12/IMAGE_DATA"
        );
    }

    #[test]
    fn test_calibration_lookup() {
        let table: Vec<_> = (1..=3)
            .map(|i| CalibrationParams::new(i as f64, -(i as f64)))
            .collect();
        assert_eq!(calibration_for(&table, 1), Some(CalibrationParams::new(1.0, -1.0)));
        assert_eq!(calibration_for(&table, 3), Some(CalibrationParams::new(3.0, -3.0)));
        assert_eq!(calibration_for(&table, 4), None);
        assert_eq!(calibration_for(&table, 0), None);
    }

    #[test]
    fn test_full_table_covers_hrv() {
        let table: Vec<_> = (1..=12)
            .map(|i| CalibrationParams::new(i as f64, 0.0))
            .collect();
        let hrv = channel_number("HRV").unwrap();
        assert_eq!(calibration_for(&table, hrv), Some(CalibrationParams::new(12.0, 0.0)));
        assert_eq!(calibration_for(&table, 13), None);
    }

    #[test]
    fn test_image_description() {
        let desc = descriptor(&[
            (LINE_DIR_GRID_STEP, "3.0004031658172607"),
            (COLUMN_DIR_GRID_STEP, " 3.0004031658172607 "),
            (LONGITUDE_OF_SSP, "9.5"),
        ]);
        let image = ImageDescription::from_descriptor(&desc).unwrap();
        assert!((image.we_pitch - 3000.4031658172607).abs() < 1e-9);
        assert!((image.ns_pitch + 3000.4031658172607).abs() < 1e-9);
        assert_eq!(image.sub_satellite_lon, 9.5);
    }

    #[test]
    fn test_image_description_errors() {
        let desc = descriptor(&[(LINE_DIR_GRID_STEP, "3.0"), (COLUMN_DIR_GRID_STEP, "3.0")]);
        assert!(matches!(
            ImageDescription::from_descriptor(&desc),
            Err(LoaderError::InvalidMetadata(_))
        ));

        let desc = descriptor(&[
            (LINE_DIR_GRID_STEP, "three"),
            (COLUMN_DIR_GRID_STEP, "3.0"),
            (LONGITUDE_OF_SSP, "0.0"),
        ]);
        assert!(matches!(
            ImageDescription::from_descriptor(&desc),
            Err(LoaderError::InvalidMetadata(_))
        ));
    }

    #[test]
    fn test_south_up_reads_mirrored_rows() {
        let window = PixelWindow::new(10, 0, 4, 2);
        let stored = RowOrder::SouthUp.storage_window(&window);
        assert_eq!(stored, PixelWindow::new(10, 3710, 4, 2));

        // Stored rows 3710, 3711 come back as requested rows 1, 0
        let data = Array2::from_shape_fn((2, 4), |(r, c)| (r * 10 + c) as u16);
        let oriented = RowOrder::SouthUp.orient(data);
        assert_eq!(oriented[[0, 0]], 10);
        assert_eq!(oriented[[1, 3]], 3);
    }

    #[test]
    fn test_north_up_is_identity() {
        let window = PixelWindow::new(10, 20, 4, 2);
        assert_eq!(RowOrder::NorthUp.storage_window(&window), window);

        let data = Array2::from_shape_fn((2, 4), |(r, c)| (r * 10 + c) as u16);
        assert_eq!(RowOrder::NorthUp.orient(data.clone()), data);
    }

    #[test]
    fn test_row_order_from_str() {
        assert_eq!("south_up".parse::<RowOrder>(), Ok(RowOrder::SouthUp));
        assert_eq!("North-Up".parse::<RowOrder>(), Ok(RowOrder::NorthUp));
        assert!("sideways".parse::<RowOrder>().is_err());
    }
}
