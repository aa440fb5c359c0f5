//! SEVIRI full-disk grid in the geostationary projection.
//!
//! Meteosat scans with the sweep angle around the y axis, and level 1.5
//! images are resampled onto a fixed 3712x3712 grid whose pixels are
//! 3000.403165817 m wide at the sub-satellite point. Projected coordinates
//! are GDAL `geos` metres: scan angle times the satellite height.
//!
//! Reference: PROJ `geos` projection, ellipsoidal forms.

use msg_common::crs::GeosCrs;
use msg_common::{GeosArea, PixelArea, GRID_SIZE};

/// Pixel pitch of the VIS/IR reference grid at nadir (metres).
pub const PIXEL_SIZE: f64 = 3000.403165817;

/// Grid coordinates closer than this to an integer are snapped to it.
const SNAP_EPSILON: f64 = 1e-6;

/// Fixed SEVIRI grid plus the geostationary projection it lives in.
#[derive(Debug, Clone)]
pub struct SeviriGrid {
    /// Projected x of the left edge of column 0 (metres)
    pub x_origin: f64,
    /// Projected y of the top edge of row 0 (metres)
    pub y_origin: f64,
    /// Column pitch (metres, positive = west to east)
    pub dx: f64,
    /// Row pitch (metres, negative = north to south)
    pub dy: f64,
    pub nx: usize,
    pub ny: usize,
    pub crs: GeosCrs,
}

impl SeviriGrid {
    /// Full-disk grid centred on `sub_satellite_lon`.
    pub fn new(sub_satellite_lon: f64) -> Self {
        let half = (GRID_SIZE / 2) as f64 * PIXEL_SIZE;
        Self {
            x_origin: -half,
            y_origin: half,
            dx: PIXEL_SIZE,
            dy: -PIXEL_SIZE,
            nx: GRID_SIZE,
            ny: GRID_SIZE,
            crs: GeosCrs::new(sub_satellite_lon),
        }
    }

    /// Full-disk grid for the 0° service.
    pub fn full_disk() -> Self {
        Self::new(0.0)
    }

    /// Convert grid indices (col, row) to projected coordinates (metres).
    #[inline]
    pub fn grid_to_geos(&self, i: f64, j: f64) -> (f64, f64) {
        (self.x_origin + i * self.dx, self.y_origin + j * self.dy)
    }

    /// Convert projected coordinates (metres) to grid indices (col, row).
    ///
    /// Results within floating-point noise of an integer are snapped so that
    /// a pixel → geos → pixel round trip floors to the original bounds.
    #[inline]
    pub fn geos_to_grid(&self, x: f64, y: f64) -> (f64, f64) {
        (
            snap((x - self.x_origin) / self.dx),
            snap((y - self.y_origin) / self.dy),
        )
    }

    pub fn geos_area_from_pixel_area(&self, area: &PixelArea) -> GeosArea {
        let (top_left_x, top_left_y) = self.grid_to_geos(area.x_min, area.y_min);
        let (right_x, bottom_y) = self.grid_to_geos(area.x_max, area.y_max);
        GeosArea::new(top_left_x, top_left_y, right_x, bottom_y)
    }

    pub fn pixel_area_from_geos_area(&self, area: &GeosArea) -> PixelArea {
        let (x_min, y_min) = self.geos_to_grid(area.top_left_x, area.top_left_y);
        let (x_max, y_max) = self.geos_to_grid(area.right_x, area.bottom_y);
        PixelArea::new(x_min, y_min, x_max, y_max)
    }

    /// Convert projected coordinates (metres) to (lon, lat) degrees.
    ///
    /// Returns None when the line of sight misses the Earth.
    pub fn geos_to_lonlat(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let k = self.constants();

        let mut vx = -1.0;
        let mut vy = (x / self.crs.satellite_height).tan();
        let mut vz = (y / self.crs.satellite_height).tan() * 1.0_f64.hypot(vy);

        // Quadratic for the distance along the line of sight
        let a = vz / k.radius_p;
        let a = vy * vy + a * a + vx * vx;
        let b = 2.0 * k.radius_g * vx;
        let det = b * b - 4.0 * a * k.c;
        if det < 0.0 {
            return None; // Looking past the limb
        }

        let dist = (-b - det.sqrt()) / (2.0 * a);
        vx = k.radius_g + dist * vx;
        vy *= dist;
        vz *= dist;

        let lam = vy.atan2(vx);
        let phi = (vz * lam.cos() / vx).atan();
        let phi = (k.radius_p_inv2 * phi.tan()).atan();

        Some((lam.to_degrees() + self.crs.sub_satellite_lon, phi.to_degrees()))
    }

    /// Convert (lon, lat) degrees to projected coordinates (metres).
    ///
    /// Returns None if the point is not visible from the satellite.
    pub fn lonlat_to_geos(&self, lon: f64, lat: f64) -> Option<(f64, f64)> {
        let k = self.constants();

        let lam = (lon - self.crs.sub_satellite_lon).to_radians();
        // Geocentric latitude
        let phi = (k.radius_p2 * lat.to_radians().tan()).atan();

        let r = k.radius_p / (k.radius_p * phi.cos()).hypot(phi.sin());
        let vx = r * lam.cos() * phi.cos();
        let vy = r * lam.sin() * phi.cos();
        let vz = r * phi.sin();

        let tmp = k.radius_g - vx;
        if tmp * vx - vy * vy - vz * vz * k.radius_p_inv2 < 0.0 {
            return None; // Behind the limb
        }

        let h = self.crs.satellite_height;
        Some(((vy / tmp).atan() * h, (vz / vy.hypot(tmp)).atan() * h))
    }

    /// Grid indices (col, row) to (lon, lat) degrees.
    pub fn grid_to_lonlat(&self, i: f64, j: f64) -> Option<(f64, f64)> {
        let (x, y) = self.grid_to_geos(i, j);
        self.geos_to_lonlat(x, y)
    }

    /// (lon, lat) degrees to grid indices (col, row).
    pub fn lonlat_to_grid(&self, lon: f64, lat: f64) -> Option<(f64, f64)> {
        let (x, y) = self.lonlat_to_geos(lon, lat)?;
        Some(self.geos_to_grid(x, y))
    }

    /// Check if a geographic point falls on the grid and is visible.
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        match self.lonlat_to_grid(lon, lat) {
            Some((i, j)) => i >= 0.0 && i < self.nx as f64 && j >= 0.0 && j < self.ny as f64,
            None => false,
        }
    }

    /// Grid dimensions as (columns, rows).
    pub fn dimensions(&self) -> (usize, usize) {
        (self.nx, self.ny)
    }

    fn constants(&self) -> EllipsoidConstants {
        let radius_g_1 = self.crs.satellite_height / self.crs.semi_major_axis;
        let radius_g = 1.0 + radius_g_1;
        let radius_p = self.crs.semi_minor_axis / self.crs.semi_major_axis;
        let radius_p2 = radius_p * radius_p;
        EllipsoidConstants {
            radius_g,
            radius_p,
            radius_p2,
            radius_p_inv2: 1.0 / radius_p2,
            c: radius_g * radius_g - 1.0,
        }
    }
}

impl Default for SeviriGrid {
    fn default() -> Self {
        Self::full_disk()
    }
}

/// Ellipsoid terms normalised by the semi-major axis.
struct EllipsoidConstants {
    radius_g: f64,
    radius_p: f64,
    radius_p2: f64,
    radius_p_inv2: f64,
    c: f64,
}

fn snap(value: f64) -> f64 {
    let rounded = value.round();
    if (value - rounded).abs() < SNAP_EPSILON {
        rounded
    } else {
        value
    }
}
