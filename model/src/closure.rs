use std::{error::Error, fmt, str::FromStr};

use chrono::NaiveDate;
use geo::Point;
use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};

use crate::Srid;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConstructionClosure {
    pub address: String,
    pub closed: bool,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub geom: TaggedPoint,
}

impl ConstructionClosure {
    // Whether `date` falls inside the closure window, both ends inclusive.
    // A window missing either date is never active.
    pub fn is_active(&self, date: NaiveDate) -> bool {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => start <= date && date <= end,
            _ => false,
        }
    }
}

// A point with its reference system, serialized as EWKT
// (`SRID=4326;POINT(-122.33 47.6)`).
#[derive(Copy, Clone, Debug, PartialEq, SerializeDisplay, DeserializeFromStr)]
pub struct TaggedPoint {
    pub srid: Srid,
    pub point: Point,
}

impl TaggedPoint {
    pub fn new(srid: Srid, point: Point) -> Self {
        Self { srid, point }
    }
}

impl fmt::Display for TaggedPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (x, y) = self.point.x_y();
        write!(f, "SRID={};POINT({x} {y})", self.srid.code())
    }
}

impl FromStr for TaggedPoint {
    type Err = ParsePointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (srid, wkt) = s
            .split_once(';')
            .ok_or_else(|| ParsePointError::new(s, "missing SRID prefix"))?;
        let code = srid
            .trim()
            .strip_prefix("SRID=")
            .and_then(|x| x.parse().ok())
            .ok_or_else(|| ParsePointError::new(s, "invalid SRID"))?;
        let srid = Srid::from_code(code).ok_or_else(|| ParsePointError::new(s, "unknown SRID"))?;

        let coords = wkt
            .trim()
            .strip_prefix("POINT")
            .map(|x| x.trim())
            .and_then(|x| x.strip_prefix('('))
            .and_then(|x| x.strip_suffix(')'))
            .ok_or_else(|| ParsePointError::new(s, "expected POINT(x y)"))?;
        let mut parts = coords.split_whitespace();
        let (x, y) = match (parts.next(), parts.next(), parts.next()) {
            (Some(x), Some(y), None) => (x, y),
            _ => return Err(ParsePointError::new(s, "expected two coordinates")),
        };
        let x: f64 = x
            .parse()
            .map_err(|_| ParsePointError::new(s, "invalid x coordinate"))?;
        let y: f64 = y
            .parse()
            .map_err(|_| ParsePointError::new(s, "invalid y coordinate"))?;

        Ok(Self::new(srid, Point::new(x, y)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsePointError {
    input: String,
    reason: &'static str,
}

impl ParsePointError {
    fn new(input: &str, reason: &'static str) -> Self {
        Self {
            input: input.to_string(),
            reason,
        }
    }
}

impl fmt::Display for ParsePointError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} in {:?}", self.reason, self.input)
    }
}

impl Error for ParsePointError {}
