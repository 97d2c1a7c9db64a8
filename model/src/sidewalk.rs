use std::fmt;

use geo::LineString;
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SidewalkId(pub u64);

impl fmt::Debug for SidewalkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[Sidewalk {}]", self.0)
    }
}

impl fmt::Display for SidewalkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SidewalkSegment {
    pub id: SidewalkId,
    pub geometry: LineString,
}
