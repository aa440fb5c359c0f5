//! Meteosat Second Generation platforms.

use serde::Serialize;
use std::fmt;

/// A Meteosat Second Generation satellite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Satellite {
    /// Id used in product filenames (`MSG1`..`MSG4`)
    pub msg_id: u8,
    /// Operational name once in orbit
    pub name: &'static str,
    /// WMO satellite identifier
    pub wmo_id: u16,
}

/// Known MSG platforms, indexed by `msg_id - 1`.
pub const MSG_SATELLITES: [Satellite; 4] = [
    Satellite {
        msg_id: 1,
        name: "Meteosat-8",
        wmo_id: 55,
    },
    Satellite {
        msg_id: 2,
        name: "Meteosat-9",
        wmo_id: 56,
    },
    Satellite {
        msg_id: 3,
        name: "Meteosat-10",
        wmo_id: 57,
    },
    Satellite {
        msg_id: 4,
        name: "Meteosat-11",
        wmo_id: 70,
    },
];

pub fn satellite_for_msg_id(msg_id: u8) -> Option<Satellite> {
    MSG_SATELLITES.iter().find(|s| s.msg_id == msg_id).copied()
}

impl fmt::Display for Satellite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (MSG{})", self.name, self.msg_id)
    }
}
