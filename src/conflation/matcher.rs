use clap::ValueEnum;
use geo::{
    algorithm::line_intersection::{line_intersection, LineIntersection},
    BoundingRect, Coord, EuclideanLength, Line, Point,
};
use rstar::AABB;
use serde::{Deserialize, Serialize};

use super::index::SidewalkIndex;

// metres
pub const DEFAULT_MAX_LINE_LENGTH: f64 = 200.0;
pub const DEFAULT_MAX_CANDIDATES: usize = 256;

// intersections closer than this are the same point
const SAME_POINT: f64 = 1e-9;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Ambiguity {
    #[default]
    Drop,
    Nearest,
}

#[derive(Copy, Clone, Debug)]
pub struct MatchConfig {
    pub max_line_length: f64,
    pub max_candidates: usize,
    pub ambiguity: Ambiguity,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            max_candidates: DEFAULT_MAX_CANDIDATES,
            ambiguity: Ambiguity::Drop,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Match {
    Matched(Point),
    TooLong { length: f64 },
    TooManyCandidates { candidates: usize },
    NoIntersection,
    Ambiguous { points: usize },
}

impl Match {
    pub fn point(&self) -> Option<Point> {
        match self {
            Self::Matched(x) => Some(*x),
            _ => None,
        }
    }
}

pub fn match_line(index: &SidewalkIndex, line: &Line, config: &MatchConfig) -> Match {
    let length = line.euclidean_length();
    if !(length <= config.max_line_length) {
        return Match::TooLong { length };
    }

    let rect = line.bounding_rect();
    let envelope = AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]);

    let mut candidates = 0;
    let mut points: Vec<Coord> = Vec::new();
    for segment in index.candidates(&envelope) {
        candidates += 1;
        if candidates > config.max_candidates {
            return Match::TooManyCandidates { candidates };
        }
        points.extend(crossings(line, segment.geometry.lines()));
    }

    match points.len() {
        0 => Match::NoIntersection,
        1 => Match::Matched(points[0].into()),
        n => match config.ambiguity {
            Ambiguity::Drop => Match::Ambiguous { points: n },
            Ambiguity::Nearest => {
                points.sort_by(|a, b| {
                    distance(line.start, *a).total_cmp(&distance(line.start, *b))
                });
                Match::Matched(points[0].into())
            }
        },
    }
}

// Distinct points where `line` meets one sidewalk. Consecutive parts of a
// sidewalk share a vertex, so a crossing through that vertex is counted once.
fn crossings(line: &Line, parts: impl Iterator<Item = Line>) -> Vec<Coord> {
    let mut points: Vec<Coord> = Vec::new();
    for part in parts {
        let found = match line_intersection(*line, part) {
            None => continue,
            Some(LineIntersection::SinglePoint { intersection, .. }) => vec![intersection],
            Some(LineIntersection::Collinear { intersection }) => {
                vec![intersection.start, intersection.end]
            }
        };
        for p in found {
            if !points.iter().any(|x| distance(*x, p) < SAME_POINT) {
                points.push(p);
            }
        }
    }
    points
}

fn distance(a: Coord, b: Coord) -> f64 {
    (a.x - b.x).hypot(a.y - b.y)
}
