use _model::{PermitAddressRecord, PermitImpactRecord, PermitKey};
use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDateTime};
use geo::{LineString, Point};
use serde::Deserialize;
use serde_with::{serde_as, DisplayFromStr};

use crate::error::{ConflationError, GeometryError};

use super::ZONE;

// only the columns we read
#[derive(Deserialize)]
pub struct RawUse {
    permit_no_num: String,
    #[serde(default)]
    permit_address_text: Option<String>,
    #[serde(default)]
    sdwlk_closed_flag: Option<String>,
    #[serde(default)]
    sdwlk_close_start_dt: Option<RawTimestamp>,
    #[serde(default)]
    sdwlk_close_end_dt: Option<RawTimestamp>,
    #[serde(default)]
    shape: Option<RawLocation>,
}

// socrata reports coordinates as strings
#[serde_as]
#[derive(Deserialize)]
pub struct RawLocation {
    #[serde_as(as = "DisplayFromStr")]
    latitude: f64,
    #[serde_as(as = "DisplayFromStr")]
    longitude: f64,
}

#[derive(Deserialize)]
pub struct RawImpact {
    permit_no_num: String,
    #[serde(default)]
    shape: Option<RawShape>,
}

#[derive(Deserialize)]
pub struct RawShape {
    geometry: RawPaths,
}

#[derive(Deserialize)]
pub struct RawPaths {
    paths: Vec<Vec<[f64; 2]>>,
}

// socrata has returned both unix seconds and floating timestamps for the
// same column
#[derive(Deserialize)]
#[serde(untagged)]
pub enum RawTimestamp {
    Seconds(i64),
    Text(String),
}

impl RawTimestamp {
    pub fn refine(&self) -> Result<NaiveDateTime> {
        match self {
            Self::Seconds(x) => from_unix(*x),
            Self::Text(x) => {
                let x = x.trim();
                match x.parse::<i64>() {
                    Ok(seconds) => from_unix(seconds),
                    Err(_) => NaiveDateTime::parse_from_str(x, "%Y-%m-%dT%H:%M:%S%.f")
                        .with_context(|| format!("invalid timestamp {x:?}")),
                }
            }
        }
    }
}

// wall clock in Seattle, same as the text form
fn from_unix(seconds: i64) -> Result<NaiveDateTime> {
    DateTime::from_timestamp(seconds, 0)
        .map(|x| x.with_timezone(&ZONE).naive_local())
        .with_context(|| format!("timestamp {seconds} is out of range"))
}

fn closed_flag(flag: Option<&str>) -> Result<bool> {
    match flag.map(|x| x.trim().to_ascii_lowercase()).as_deref() {
        None | Some("") => Ok(false),
        Some("y" | "yes" | "true") => Ok(true),
        Some("n" | "no" | "false") => Ok(false),
        Some(x) => bail!("invalid closed flag {x:?}"),
    }
}

impl RawUse {
    pub fn refine(self) -> Result<PermitAddressRecord> {
        let key = PermitKey::new(self.permit_no_num);
        let shape = self
            .shape
            .ok_or_else(|| ConflationError::malformed(format!("{key:?}"), GeometryError::Missing))?;

        Ok(PermitAddressRecord {
            address: self.permit_address_text.unwrap_or_default(),
            point: Point::new(shape.longitude, shape.latitude),
            start: self
                .sdwlk_close_start_dt
                .map(|x| x.refine())
                .transpose()
                .with_context(|| format!("{key:?} has a bad start date"))?,
            end: self
                .sdwlk_close_end_dt
                .map(|x| x.refine())
                .transpose()
                .with_context(|| format!("{key:?} has a bad end date"))?,
            closed: closed_flag(self.sdwlk_closed_flag.as_deref())
                .with_context(|| format!("{key:?} has a bad closed flag"))?,
            key,
        })
    }
}

impl RawImpact {
    pub fn refine(self) -> Result<PermitImpactRecord, ConflationError> {
        let key = PermitKey::new(self.permit_no_num);
        let path = self
            .shape
            .and_then(|x| x.geometry.paths.into_iter().next())
            .ok_or_else(|| ConflationError::malformed(format!("{key:?}"), GeometryError::Missing))?;

        Ok(PermitImpactRecord {
            key,
            geometry: LineString::from(path),
        })
    }
}
