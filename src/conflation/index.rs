use _model::{SidewalkSegment, Srid};
use geo::{BoundingRect, LineString};
use rayon::prelude::*;
use rstar::{
    primitives::{GeomWithData, Rectangle},
    RTree, AABB,
};

use crate::{error::ConflationError, error::GeometryError, projection};

type Entry = GeomWithData<Rectangle<[f64; 2]>, usize>;

// R-tree over sidewalk segment envelopes, in metric coordinates.
// Read-only once built.
pub struct SidewalkIndex {
    segments: Vec<SidewalkSegment>,
    tree: RTree<Entry>,
}

impl SidewalkIndex {
    pub fn build(segments: Vec<SidewalkSegment>, srid: Srid) -> Result<Self, ConflationError> {
        let segments: Vec<SidewalkSegment> = segments
            .into_par_iter()
            .map(|x| {
                let geometry = projection::to_metric(&x.geometry, srid)
                    .and_then(check_linestring)
                    .map_err(|e| ConflationError::malformed(format!("sidewalk {}", x.id), e))?;
                Ok(SidewalkSegment { id: x.id, geometry })
            })
            .collect::<Result<_, ConflationError>>()?;

        let mut entries = Vec::with_capacity(segments.len());
        for (i, segment) in segments.iter().enumerate() {
            if let Some(rect) = segment.geometry.bounding_rect() {
                let (min, max) = (rect.min(), rect.max());
                entries.push(GeomWithData::new(
                    Rectangle::from_corners([min.x, min.y], [max.x, max.y]),
                    i,
                ));
            }
        }

        Ok(Self {
            segments,
            tree: RTree::bulk_load(entries),
        })
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn candidates<'a>(
        &'a self,
        envelope: &'a AABB<[f64; 2]>,
    ) -> impl Iterator<Item = &'a SidewalkSegment> + 'a {
        self.tree
            .locate_in_envelope_intersecting(envelope)
            .map(|x| &self.segments[x.data])
    }
}

pub fn check_linestring(geometry: LineString) -> Result<LineString, GeometryError> {
    if geometry.0.len() < 2 {
        return Err(GeometryError::TooFewVertices(geometry.0.len()));
    }
    Ok(geometry)
}
