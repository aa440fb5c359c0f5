//! Coordinate reference descriptor for the MSG geostationary projection.

use serde::{Deserialize, Serialize};

/// Satellite height above the ellipsoid (metres).
pub const SATELLITE_HEIGHT: f64 = 35_785_831.0;
/// Equatorial radius used by the SEVIRI level 1.5 grid (metres).
pub const SEMI_MAJOR_AXIS: f64 = 6_378_169.0;
/// Polar radius used by the SEVIRI level 1.5 grid (metres).
pub const SEMI_MINOR_AXIS: f64 = 6_356_583.8;

/// Geostationary projection centred on a sub-satellite longitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeosCrs {
    /// Sub-satellite point longitude (degrees east)
    pub sub_satellite_lon: f64,
    pub satellite_height: f64,
    pub semi_major_axis: f64,
    pub semi_minor_axis: f64,
}

impl GeosCrs {
    pub fn new(sub_satellite_lon: f64) -> Self {
        Self {
            sub_satellite_lon,
            satellite_height: SATELLITE_HEIGHT,
            semi_major_axis: SEMI_MAJOR_AXIS,
            semi_minor_axis: SEMI_MINOR_AXIS,
        }
    }

    pub fn inverse_flattening(&self) -> f64 {
        self.semi_major_axis / (self.semi_major_axis - self.semi_minor_axis)
    }

    /// OGC WKT (ESRI flavour, as understood by GDAL).
    pub fn to_wkt(&self) -> String {
        format!(
            concat!(
                "PROJCS[\"Geostationary_Satellite\",",
                "GEOGCS[\"GCS_unnamed\",",
                "DATUM[\"D_unnamed\",SPHEROID[\"unnamed\",{a},{rf}]],",
                "PRIMEM[\"Greenwich\",0],",
                "UNIT[\"degree\",0.0174532925199433]],",
                "PROJECTION[\"Geostationary_Satellite\"],",
                "PARAMETER[\"central_meridian\",{lon}],",
                "PARAMETER[\"satellite_height\",{h}],",
                "PARAMETER[\"false_easting\",0],",
                "PARAMETER[\"false_northing\",0],",
                "UNIT[\"Meter\",1.0]]"
            ),
            a = self.semi_major_axis,
            rf = self.inverse_flattening(),
            lon = self.sub_satellite_lon,
            h = self.satellite_height,
        )
    }

    pub fn to_proj4(&self) -> String {
        format!(
            "+proj=geos +lon_0={} +h={} +a={} +b={} +units=m +no_defs",
            self.sub_satellite_lon, self.satellite_height, self.semi_major_axis, self.semi_minor_axis
        )
    }
}

/// Build the WKT descriptor for a sub-satellite longitude.
pub fn geos_wkt(sub_satellite_lon: f64) -> String {
    GeosCrs::new(sub_satellite_lon).to_wkt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wkt_contains_parameters() {
        let wkt = geos_wkt(9.5);
        assert!(wkt.starts_with("PROJCS[\"Geostationary_Satellite\""));
        assert!(wkt.contains("PARAMETER[\"central_meridian\",9.5]"));
        assert!(wkt.contains("PARAMETER[\"satellite_height\",35785831]"));
        assert!(wkt.contains("SPHEROID[\"unnamed\",6378169,295.48"));
    }

    #[test]
    fn test_zero_longitude() {
        assert!(geos_wkt(0.0).contains("PARAMETER[\"central_meridian\",0]"));
    }

    #[test]
    fn test_proj4() {
        let proj = GeosCrs::new(0.0).to_proj4();
        assert_eq!(
            proj,
            "+proj=geos +lon_0=0 +h=35785831 +a=6378169 +b=6356583.8 +units=m +no_defs"
        );
    }
}
