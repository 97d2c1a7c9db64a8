use std::fmt::{self, Write};

use super::{Conflation, DropReason};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Statistics {
    pub impacts: usize,
    pub unique: usize,
    pub unpaired: usize,
    pub too_long: usize,
    pub too_many_candidates: usize,
    pub no_intersection: usize,
    pub ambiguous: usize,
    pub matched: usize,
}

impl Statistics {
    pub fn record(&mut self, reason: &DropReason) {
        let counter = match reason {
            DropReason::Unpaired => &mut self.unpaired,
            DropReason::TooLong { .. } => &mut self.too_long,
            DropReason::TooManyCandidates { .. } => &mut self.too_many_candidates,
            DropReason::NoIntersection => &mut self.no_intersection,
            DropReason::Ambiguous { .. } => &mut self.ambiguous,
        };
        *counter += 1;
    }
}

impl Conflation {
    pub fn report(&self) -> Result<String, fmt::Error> {
        let s = &self.statistics;

        let mut todo = String::new();
        for (key, reason) in &self.dropped {
            match reason {
                DropReason::Unpaired => writeln!(todo, "- {key:?} has no address record")?,
                DropReason::TooLong { length } => {
                    writeln!(todo, "- {key:?} is {length:.00}m from its street")?
                }
                DropReason::TooManyCandidates { candidates } => {
                    writeln!(todo, "- {key:?} has over {} nearby sidewalks", candidates - 1)?
                }
                DropReason::NoIntersection => writeln!(todo, "- {key:?} crosses no sidewalk")?,
                DropReason::Ambiguous { points } => {
                    writeln!(todo, "- {key:?} crosses sidewalks {points} times")?
                }
            }
        }

        let mut md = String::new();
        writeln!(md, "## Statistics\n")?;
        writeln!(md, "- {} impacts, {} unique", s.impacts, s.unique)?;
        writeln!(md, "- {} without an address", s.unpaired)?;
        writeln!(md, "- {} too far from the street", s.too_long)?;
        writeln!(md, "- {} in crowded areas", s.too_many_candidates)?;
        writeln!(md, "- {} without a crossing", s.no_intersection)?;
        writeln!(md, "- {} ambiguous", s.ambiguous)?;
        writeln!(md, "- {} matched", s.matched)?;
        if s.unique > 0 {
            writeln!(
                md,
                "- {:.01}% conflated",
                s.matched as f64 / s.unique as f64 * 100.0
            )?;
        }
        writeln!(md)?;
        if !todo.is_empty() {
            writeln!(md, "## Todo\n")?;
            writeln!(md, "{todo}")?;
        }
        Ok(md)
    }
}
