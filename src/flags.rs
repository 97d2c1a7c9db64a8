use std::collections::BTreeSet;

use _model::{ConstructionClosure, SidewalkId, SidewalkSegment, Srid};
use anyhow::Result;
use chrono::{NaiveDate, Utc};
use geo::{BoundingRect, EuclideanDistance};
use rstar::{
    primitives::{GeomWithData, Rectangle},
    RTree,
};
use tracing::{info, warn};

use crate::{closures, config::Config, permits, sidewalks};

type Entry = GeomWithData<Rectangle<[f64; 2]>, usize>;

pub fn main(config: &Config, date: Option<NaiveDate>) -> Result<()> {
    let date = date.unwrap_or_else(|| Utc::now().with_timezone(&permits::ZONE).date_naive());
    let segments = sidewalks::load(&config.sidewalks)?;
    let closures = closures::read(&config.output)?;

    let flagged = flagged(&segments, &closures, date, config.proximity.get());
    info!(%date, flagged = flagged.len(), "flagged sidewalks");
    println!("{}", serde_json::to_string(&flagged)?);
    Ok(())
}

// Sidewalks within `proximity` degrees of a closure active on `date`.
// Distances are measured directly in longitude/latitude.
pub fn flagged(
    segments: &[SidewalkSegment],
    closures: &[ConstructionClosure],
    date: NaiveDate,
    proximity: f64,
) -> BTreeSet<SidewalkId> {
    let entries: Vec<Entry> = segments
        .iter()
        .enumerate()
        .filter_map(|(i, x)| {
            let rect = x.geometry.bounding_rect()?;
            Some(GeomWithData::new(
                Rectangle::from_corners(
                    [rect.min().x - proximity, rect.min().y - proximity],
                    [rect.max().x + proximity, rect.max().y + proximity],
                ),
                i,
            ))
        })
        .collect();
    let tree: RTree<Entry> = RTree::bulk_load(entries);

    let mut output = BTreeSet::new();
    for closure in closures.iter().filter(|x| x.is_active(date)) {
        if closure.geom.srid != Srid::Wgs84 {
            warn!(address = %closure.address, srid = %closure.geom.srid, "skipping closure");
            continue;
        }
        let point = closure.geom.point;
        for entry in tree.locate_all_at_point(&[point.x(), point.y()]) {
            let segment = &segments[entry.data];
            if point.euclidean_distance(&segment.geometry) <= proximity {
                output.insert(segment.id);
            }
        }
    }
    output
}
