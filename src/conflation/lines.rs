use std::collections::BTreeMap;

use _model::{PermitAddressRecord, PermitImpactRecord, PermitKey, Srid};
use geo::{Line, LineInterpolatePoint, LineLocatePoint};
use itertools::Itertools;

use crate::{
    error::{ConflationError, GeometryError},
    projection,
};

use super::index::check_linestring;

// Straight segment from a permit's address point to the nearest point of its
// impact geometry, in metric coordinates.
#[derive(Debug, Clone)]
pub struct AddressToStreetLine<'a> {
    pub address: &'a PermitAddressRecord,
    pub line: Line,
}

#[derive(Debug, Default)]
pub struct Lines<'a> {
    pub lines: Vec<AddressToStreetLine<'a>>,
    // impact records after removing repeated (permit, geometry) pairs
    pub unique: usize,
    // permits with an impact record but no address record
    pub unpaired: Vec<&'a PermitKey>,
}

pub fn build<'a>(
    addresses: &'a [PermitAddressRecord],
    impacts: &'a [PermitImpactRecord],
) -> Result<Lines<'a>, ConflationError> {
    let mut by_key: BTreeMap<&PermitKey, &PermitAddressRecord> = BTreeMap::new();
    for x in addresses {
        by_key.entry(&x.key).or_insert(x);
    }

    let mut output = Lines::default();
    for impact in impacts.iter().unique_by(|x| (x.key.clone(), geometry_key(x))) {
        output.unique += 1;

        let Some(address) = by_key.get(&impact.key).copied() else {
            output.unpaired.push(&impact.key);
            continue;
        };

        let line = line_between(address, impact)?;
        output.lines.push(AddressToStreetLine { address, line });
    }

    Ok(output)
}

fn line_between(
    address: &PermitAddressRecord,
    impact: &PermitImpactRecord,
) -> Result<Line, ConflationError> {
    let start = projection::to_metric(&address.point, Srid::Wgs84).map_err(|e| {
        ConflationError::malformed(format!("address point of {:?}", address.key), e)
    })?;
    let street = projection::to_metric(&impact.geometry, Srid::Wgs84)
        .and_then(check_linestring)
        .map_err(|e| ConflationError::malformed(format!("impact geometry of {:?}", impact.key), e))?;

    let end = street
        .line_locate_point(&start)
        .and_then(|fraction| street.line_interpolate_point(fraction))
        .ok_or_else(|| {
            ConflationError::malformed(
                format!("impact geometry of {:?}", impact.key),
                GeometryError::Unlocatable,
            )
        })?;

    Ok(Line::new(start.0, end.0))
}

// exact coordinates, so only byte-identical geometries collapse
fn geometry_key(impact: &PermitImpactRecord) -> Vec<(u64, u64)> {
    impact
        .geometry
        .coords()
        .map(|c| (c.x.to_bits(), c.y.to_bits()))
        .collect()
}

#[cfg(test)]
mod tests {
    use geo::{line_string, EuclideanLength, Point};

    use super::*;

    fn address(key: &str, lon: f64, lat: f64) -> PermitAddressRecord {
        PermitAddressRecord {
            key: PermitKey::new(key),
            address: format!("{key} MAIN ST"),
            point: Point::new(lon, lat),
            start: None,
            end: None,
            closed: true,
        }
    }

    fn impact(key: &str) -> PermitImpactRecord {
        PermitImpactRecord {
            key: PermitKey::new(key),
            geometry: line_string![(x: -122.331, y: 47.601), (x: -122.329, y: 47.601)],
        }
    }

    #[test]
    fn builds_perpendicular_line() {
        let addresses = vec![address("P100", -122.33, 47.6)];
        let impacts = vec![impact("P100")];
        let lines = build(&addresses, &impacts).unwrap();

        assert_eq!(lines.unique, 1);
        assert!(lines.unpaired.is_empty());
        assert_eq!(lines.lines.len(), 1);

        let line = &lines.lines[0];
        assert_eq!(line.address.key, PermitKey::new("P100"));
        let length = line.line.euclidean_length();
        assert!((length - 111.142).abs() < 1e-2, "{length}");

        // starts on the address point
        let start = projection::to_metric(&addresses[0].point, Srid::Wgs84).unwrap();
        assert_eq!(line.line.start, start.0);
    }

    #[test]
    fn duplicate_impacts_collapse() {
        let addresses = vec![address("P100", -122.33, 47.6)];
        let mut other = impact("P100");
        other.geometry = line_string![(x: -122.331, y: 47.5995), (x: -122.329, y: 47.5995)];
        let impacts = vec![impact("P100"), impact("P100"), other, impact("P100")];

        let lines = build(&addresses, &impacts).unwrap();
        assert_eq!(lines.unique, 2);
        assert_eq!(lines.lines.len(), 2);
    }

    #[test]
    fn line_iff_pairing_exists() {
        let addresses = vec![address("P100", -122.33, 47.6), address("P300", -122.33, 47.6)];
        let impacts = vec![impact("P100"), impact("P200")];

        let lines = build(&addresses, &impacts).unwrap();
        let built: Vec<_> = lines.lines.iter().map(|x| x.address.key.as_str()).collect();
        assert_eq!(built, vec!["P100"]);
        assert_eq!(lines.unpaired, vec![&PermitKey::new("P200")]);
    }

    #[test]
    fn first_address_wins() {
        let mut second = address("P100", -122.33, 47.6002);
        second.address = "SECOND".to_string();
        let addresses = vec![address("P100", -122.33, 47.6), second];
        let impacts = vec![impact("P100")];

        let lines = build(&addresses, &impacts).unwrap();
        assert_eq!(lines.lines.len(), 1);
        assert_eq!(lines.lines[0].address.address, "P100 MAIN ST");
    }

    #[test]
    fn malformed_impact_is_an_error() {
        let addresses = vec![address("P100", -122.33, 47.6)];
        let mut bad = impact("P100");
        bad.geometry = line_string![(x: -122.331, y: 47.601)];

        let err = build(&addresses, &[bad]).unwrap_err();
        assert!(matches!(
            err,
            ConflationError::MalformedGeometry {
                source: GeometryError::TooFewVertices(1),
                ..
            }
        ));
    }

    #[test]
    fn unpaired_impact_is_not_projected() {
        let mut bad = impact("P999");
        bad.geometry = line_string![(x: f64::NAN, y: 47.601)];
        let impacts = vec![bad];
        let lines = build(&[], &impacts).unwrap();
        assert!(lines.lines.is_empty());
        assert_eq!(lines.unpaired.len(), 1);
    }
}
