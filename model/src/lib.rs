use core::fmt;

use serde::{Deserialize, Serialize};

mod closure;
mod permit;
mod sidewalk;

pub use closure::{ConstructionClosure, ParsePointError, TaggedPoint};
pub use permit::{PermitAddressRecord, PermitImpactRecord, PermitKey};
pub use sidewalk::{SidewalkId, SidewalkSegment};

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Srid {
    // WGS 84 longitude/latitude, degrees
    Wgs84,
    // NAD83 / UTM zone 10N, metres
    Utm10N,
}

impl fmt::Display for Srid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl Srid {
    pub fn code(&self) -> u32 {
        match self {
            Self::Wgs84 => 4326,
            Self::Utm10N => 26910,
        }
    }

    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            4326 => Some(Self::Wgs84),
            26910 => Some(Self::Utm10N),
            _ => None,
        }
    }
}
