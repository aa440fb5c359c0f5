//! Affine pixel → projected-coordinate mapping.

use serde::{Deserialize, Serialize};

/// GDAL-style geotransform.
///
/// `x = origin_x + col * pixel_width + row * row_rotation`
/// `y = origin_y + col * column_rotation + row * pixel_height`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub pixel_width: f64,
    pub row_rotation: f64,
    pub origin_y: f64,
    pub column_rotation: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    /// A north-up transform without rotation terms.
    pub fn axis_aligned(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            pixel_width,
            row_rotation: 0.0,
            origin_y,
            column_rotation: 0.0,
            pixel_height,
        }
    }

    /// Coefficients in GDAL order.
    pub fn to_gdal(&self) -> [f64; 6] {
        [
            self.origin_x,
            self.pixel_width,
            self.row_rotation,
            self.origin_y,
            self.column_rotation,
            self.pixel_height,
        ]
    }

    pub fn from_gdal(coefficients: [f64; 6]) -> Self {
        let [origin_x, pixel_width, row_rotation, origin_y, column_rotation, pixel_height] =
            coefficients;
        Self {
            origin_x,
            pixel_width,
            row_rotation,
            origin_y,
            column_rotation,
            pixel_height,
        }
    }

    /// Projected coordinates of the corner of pixel `(col, row)`.
    pub fn pixel_to_geos(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.origin_x + col * self.pixel_width + row * self.row_rotation,
            self.origin_y + col * self.column_rotation + row * self.pixel_height,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_aligned() {
        let gt = GeoTransform::axis_aligned(-100.0, 200.0, 3000.0, -3000.0);
        assert_eq!(gt.to_gdal(), [-100.0, 3000.0, 0.0, 200.0, 0.0, -3000.0]);
        assert_eq!(GeoTransform::from_gdal(gt.to_gdal()), gt);
    }

    #[test]
    fn test_pixel_to_geos() {
        let gt = GeoTransform::axis_aligned(0.0, 0.0, 10.0, -10.0);
        assert_eq!(gt.pixel_to_geos(0.0, 0.0), (0.0, 0.0));
        assert_eq!(gt.pixel_to_geos(2.0, 3.0), (20.0, -30.0));
    }
}
