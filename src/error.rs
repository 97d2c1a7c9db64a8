use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConflationError {
    #[error("malformed geometry in {what}")]
    MalformedGeometry {
        what: String,
        #[source]
        source: GeometryError,
    },
}

impl ConflationError {
    pub fn malformed(what: impl Into<String>, source: GeometryError) -> Self {
        Self::MalformedGeometry {
            what: what.into(),
            source,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    #[error("coordinate ({x}, {y}) is not finite")]
    NotFinite { x: f64, y: f64 },
    #[error("coordinate ({x}, {y}) is outside the longitude/latitude range")]
    OutOfRange { x: f64, y: f64 },
    #[error("linestring has {0} vertices, expected at least 2")]
    TooFewVertices(usize),
    #[error("geometry is missing")]
    Missing,
    #[error("cannot locate a point along the linestring")]
    Unlocatable,
}
