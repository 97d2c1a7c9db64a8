use std::fmt;

use chrono::NaiveDateTime;
use geo::{LineString, Point};
use serde::{Deserialize, Serialize};

// Permit number shared by both permit feeds. Not unique within a feed.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermitKey(pub String);

impl PermitKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PermitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[Permit {}]", self.0)
    }
}

impl fmt::Display for PermitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PermitAddressRecord {
    pub key: PermitKey,
    pub address: String,
    // lon/lat
    pub point: Point,
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
    pub closed: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PermitImpactRecord {
    pub key: PermitKey,
    // lon/lat
    pub geometry: LineString,
}
