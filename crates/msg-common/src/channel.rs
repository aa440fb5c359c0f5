//! SEVIRI channel catalog and calibration coefficients.

use serde::{Deserialize, Serialize};

/// SEVIRI channel names, ordered by channel number (1-12).
pub const CHANNEL_NAMES: [&str; 12] = [
    "VIS006", // 0.6µm visible
    "VIS008", // 0.8µm visible
    "IR016",  // 1.6µm near-infrared
    "IR039",  // 3.9µm shortwave IR
    "WV062",  // 6.2µm upper water vapour
    "WV073",  // 7.3µm lower water vapour
    "IR087",  // 8.7µm
    "IR097",  // 9.7µm ozone
    "IR108",  // 10.8µm window
    "IR120",  // 12.0µm window
    "IR134",  // 13.4µm CO2
    "HRV",    // high-resolution visible
];

/// Look up the channel number (1-12) for a channel name.
///
/// Matching ignores case and underscores, so `IR_108` and `ir108` both
/// resolve to channel 9.
pub fn channel_number(name: &str) -> Option<u8> {
    let normalized: String = name
        .chars()
        .filter(|c| *c != '_')
        .map(|c| c.to_ascii_uppercase())
        .collect();

    CHANNEL_NAMES
        .iter()
        .position(|candidate| *candidate == normalized)
        .map(|index| index as u8 + 1)
}

/// Canonical name for a channel number.
pub fn channel_name(number: u8) -> Option<&'static str> {
    CHANNEL_NAMES.get(usize::from(number).checked_sub(1)?).copied()
}

/// Linear coefficients turning raw counts into radiance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationParams {
    pub slope: f64,
    pub offset: f64,
}

impl CalibrationParams {
    pub fn new(slope: f64, offset: f64) -> Self {
        Self { slope, offset }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_number_lookup() {
        assert_eq!(channel_number("VIS006"), Some(1));
        assert_eq!(channel_number("IR108"), Some(9));
        assert_eq!(channel_number("HRV"), Some(12));
        assert_eq!(channel_number("IR_108"), Some(9));
        assert_eq!(channel_number("wv062"), Some(5));
        assert_eq!(channel_number("IR999"), None);
        assert_eq!(channel_number(""), None);
    }

    #[test]
    fn test_channel_name_lookup() {
        assert_eq!(channel_name(1), Some("VIS006"));
        assert_eq!(channel_name(12), Some("HRV"));
        assert_eq!(channel_name(0), None);
        assert_eq!(channel_name(13), None);
    }

    #[test]
    fn test_catalog_round_trip() {
        for (index, name) in CHANNEL_NAMES.iter().enumerate() {
            let number = channel_number(name).unwrap();
            assert_eq!(usize::from(number), index + 1);
            assert_eq!(channel_name(number), Some(*name));
        }
    }
}
