//! Common test fixtures for scene-loading tests.

use chrono::{DateTime, TimeZone, Utc};

use msg_common::CalibrationParams;

/// Common time values for testing.
pub mod time {
    use super::*;

    /// Requested time used throughout the tests (2017-01-01T00:15:00Z).
    pub fn request_time() -> DateTime<Utc> {
        utc(2017, 1, 1, 0, 15)
    }

    /// Shorthand for a UTC timestamp with zero seconds.
    pub fn utc(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, hour, minute, 0)
            .single()
            .expect("valid test timestamp")
    }
}

/// Level 1.5 product filenames.
pub mod filenames {
    use super::*;

    /// A U-MARF style filename for `msg_id` captured at `time`.
    ///
    /// `compression` is appended verbatim, e.g. `Some(".bz2")`.
    pub fn msg_filename(msg_id: u8, time: DateTime<Utc>, compression: Option<&str>) -> String {
        format!(
            "MSG{}-SEVI-MSG15-0100-NA-{}.590000000Z-NA.h5{}",
            msg_id,
            time.format("%Y%m%d%H%M%S"),
            compression.unwrap_or("")
        )
    }

    /// Filename with the seconds digits split off by a dot, as in
    /// `MSG3-SEVI-MSG15-0100-NA-201701010013.37-NA.h5`.
    pub fn short_msg_filename(msg_id: u8, time: DateTime<Utc>) -> String {
        format!(
            "MSG{}-SEVI-MSG15-0100-NA-{}.37-NA.h5",
            msg_id,
            time.format("%Y%m%d%H%M")
        )
    }

    /// A real product name, for tests that use actual data.
    pub const REAL_SCENE: &str = "MSG3-SEVI-MSG15-0100-NA-20170101001241.590000000Z-NA.h5";
}

/// Image description values of the 0° service.
pub mod descriptor {
    /// VIS/IR grid step in kilometres
    pub const GRID_STEP_KM: &str = "3.0004031658172607";

    /// Sub-satellite longitude of the 0° service
    pub const SUB_SATELLITE_LON: &str = "0.0";

    /// Grid step in metres as the loader derives it
    pub const GRID_STEP_M: f64 = 3000.4031658172607;
}

/// A calibration table with one distinct entry per channel (1-12).
///
/// Channel `n` gets slope `n / 100` and offset `-n / 2`.
pub fn calibration_table() -> Vec<CalibrationParams> {
    (1..=12)
        .map(|n| CalibrationParams::new(n as f64 / 100.0, -(n as f64) / 2.0))
        .collect()
}
