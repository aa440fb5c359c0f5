//! Geostationary grid geometry for SEVIRI level 1.5 images.
//!
//! Implements the pixel ⇄ projected conversions from scratch without
//! external projection libraries.

pub mod seviri;

pub use seviri::SeviriGrid;
