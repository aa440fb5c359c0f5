//! Area types: the two addressing schemes for a scene window.
//!
//! A window on the satellite grid can be expressed either in pixel
//! coordinates ([`PixelArea`]) or in projected geostationary coordinates in
//! metres ([`GeosArea`]). Conversion between the two lives in the
//! `projection` crate.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::GRID_SIZE;

/// Largest bound magnitude a pixel area may carry.
///
/// Every integer up to 2^52 is exact in an `f64`, and differences of such
/// bounds stay well inside `i64`.
pub const MAX_PIXEL_BOUND: f64 = 4_503_599_627_370_496.0;

/// A window expressed in pixel-grid coordinates.
///
/// Bounds are half-open: `x_min..x_max` columns, `y_min..y_max` rows, with
/// row 0 at the northern edge of the full disk.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelArea {
    pub x_min: f64,
    pub y_min: f64,
    pub x_max: f64,
    pub y_max: f64,
}

impl PixelArea {
    pub fn new(x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> Self {
        Self {
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }

    /// The whole 3712x3712 disk.
    pub fn full_disk() -> Self {
        Self::new(0.0, 0.0, GRID_SIZE as f64, GRID_SIZE as f64)
    }

    pub fn is_finite(&self) -> bool {
        self.x_min.is_finite()
            && self.y_min.is_finite()
            && self.x_max.is_finite()
            && self.y_max.is_finite()
    }

    /// Whether every bound is finite and within [`MAX_PIXEL_BOUND`].
    pub fn is_bounded(&self) -> bool {
        [self.x_min, self.y_min, self.x_max, self.y_max]
            .iter()
            .all(|v| v.is_finite() && v.abs() <= MAX_PIXEL_BOUND)
    }

    /// Floor the bounds to an integer window.
    ///
    /// Width and height are `floor(max) - floor(min)`. Returns `None` for
    /// non-finite or out-of-range bounds, or an empty window.
    pub fn window(&self) -> Option<PixelWindow> {
        if !self.is_bounded() {
            return None;
        }

        let x_off = self.x_min.floor() as i64;
        let y_off = self.y_min.floor() as i64;
        let width = self.x_max.floor() as i64 - x_off;
        let height = self.y_max.floor() as i64 - y_off;

        if width <= 0 || height <= 0 {
            return None;
        }

        Some(PixelWindow {
            x_off,
            y_off,
            width,
            height,
        })
    }
}

impl FromStr for PixelArea {
    type Err = AreaParseError;

    /// Parse `"x_min,y_min,x_max,y_max"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let [x_min, y_min, x_max, y_max] = parse_bounds(s)?;
        Ok(Self::new(x_min, y_min, x_max, y_max))
    }
}

impl fmt::Display for PixelArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.x_min, self.y_min, self.x_max, self.y_max)
    }
}

/// A window expressed in projected geostationary coordinates (metres).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeosArea {
    pub top_left_x: f64,
    pub top_left_y: f64,
    pub right_x: f64,
    pub bottom_y: f64,
}

impl GeosArea {
    pub fn new(top_left_x: f64, top_left_y: f64, right_x: f64, bottom_y: f64) -> Self {
        Self {
            top_left_x,
            top_left_y,
            right_x,
            bottom_y,
        }
    }

    /// East-west extent in metres.
    pub fn width(&self) -> f64 {
        self.right_x - self.top_left_x
    }

    /// North-south extent in metres.
    pub fn height(&self) -> f64 {
        self.top_left_y - self.bottom_y
    }

    pub fn is_finite(&self) -> bool {
        self.top_left_x.is_finite()
            && self.top_left_y.is_finite()
            && self.right_x.is_finite()
            && self.bottom_y.is_finite()
    }
}

impl FromStr for GeosArea {
    type Err = AreaParseError;

    /// Parse `"top_left_x,top_left_y,right_x,bottom_y"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let [top_left_x, top_left_y, right_x, bottom_y] = parse_bounds(s)?;
        Ok(Self::new(top_left_x, top_left_y, right_x, bottom_y))
    }
}

/// An integer pixel window with half-open bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelWindow {
    pub x_off: i64,
    pub y_off: i64,
    pub width: i64,
    pub height: i64,
}

impl PixelWindow {
    pub fn new(x_off: i64, y_off: i64, width: i64, height: i64) -> Self {
        Self {
            x_off,
            y_off,
            width,
            height,
        }
    }

    pub fn x_max(&self) -> i64 {
        self.x_off.saturating_add(self.width)
    }

    pub fn y_max(&self) -> i64 {
        self.y_off.saturating_add(self.height)
    }

    /// Shape as `(rows, cols)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.height.max(0) as usize, self.width.max(0) as usize)
    }

    /// Whether the window lies entirely inside a `cols` x `rows` grid.
    pub fn fits_within(&self, cols: usize, rows: usize) -> bool {
        self.x_off >= 0
            && self.y_off >= 0
            && self.width > 0
            && self.height > 0
            && self.x_max() <= cols as i64
            && self.y_max() <= rows as i64
    }

    /// Mirror the rows of the window on a grid of `grid_height` rows.
    ///
    /// Rows `y_off..y_max` become `grid_height - y_max..grid_height - y_off`.
    pub fn flipped(&self, grid_height: usize) -> Self {
        Self {
            x_off: self.x_off,
            y_off: (grid_height as i64).saturating_sub(self.y_max()),
            width: self.width,
            height: self.height,
        }
    }
}

impl fmt::Display for PixelWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}..{}, {}..{}]",
            self.x_off,
            self.x_max(),
            self.y_off,
            self.y_max()
        )
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AreaParseError {
    #[error("Invalid area format (expected 4 comma-separated values): {0}")]
    InvalidFormat(String),

    #[error("Invalid number in area: {0}")]
    InvalidNumber(String),
}

fn parse_bounds(s: &str) -> Result<[f64; 4], AreaParseError> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    if parts.len() != 4 {
        return Err(AreaParseError::InvalidFormat(s.to_string()));
    }

    let mut values = [0.0; 4];
    for (value, part) in values.iter_mut().zip(&parts) {
        *value = part
            .parse()
            .map_err(|_| AreaParseError::InvalidNumber(part.to_string()))?;
    }
    Ok(values)
}
