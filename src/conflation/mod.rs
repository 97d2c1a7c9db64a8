use _model::{
    ConstructionClosure, PermitAddressRecord, PermitImpactRecord, PermitKey, SidewalkSegment,
    Srid, TaggedPoint,
};
use anyhow::{Context as _, Result};
use geo::Point;
use indicatif::ProgressBar;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::{
    closures::{ClosureSink, JsonFileSink},
    config::Config,
    error::ConflationError,
    permits::{self, Feeds},
    projection, sidewalks,
    utils::progress_bar,
};

mod index;
mod lines;
mod matcher;
mod report;

pub use index::SidewalkIndex;
pub use matcher::{match_line, Ambiguity, Match, MatchConfig};
pub use report::Statistics;

pub struct Context {
    pub index: SidewalkIndex,
    pub config: MatchConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DropReason {
    Unpaired,
    TooLong { length: f64 },
    TooManyCandidates { candidates: usize },
    NoIntersection,
    Ambiguous { points: usize },
}

#[derive(Debug, Default)]
pub struct Conflation {
    pub closures: Vec<ConstructionClosure>,
    pub statistics: Statistics,
    pub dropped: Vec<(PermitKey, DropReason)>,
}

pub fn main(config: &Config, refresh: bool) -> Result<()> {
    let feeds = permits::load(&config.feeds, refresh)?;
    let segments = sidewalks::load(&config.sidewalks)?;

    let mut sink = JsonFileSink::new(&config.output);
    let conflation = replace(config, &feeds, segments, &mut sink)?;

    let report_path = config.output.with_extension("md");
    std::fs::write(&report_path, conflation.report()?)
        .with_context(|| format!("failed to write {}", report_path.display()))?;
    info!(report = %report_path.display(), "wrote report");

    Ok(())
}

pub fn replace(
    config: &Config,
    feeds: &Feeds,
    segments: Vec<SidewalkSegment>,
    sink: &mut dyn ClosureSink,
) -> Result<Conflation> {
    let context = Context {
        index: SidewalkIndex::build(segments, Srid::Wgs84)
            .context("failed to build sidewalk index")?,
        config: config.match_config(),
    };
    info!(sidewalks = context.index.len(), "built sidewalk index");

    let pb = progress_bar(0);
    let conflation = run(&context, &feeds.addresses, &feeds.impacts, &pb)?;
    pb.finish_and_clear();
    sink.replace(&conflation.closures)
        .context("failed to replace construction table")?;

    let s = &conflation.statistics;
    info!(
        impacts = s.impacts,
        unique = s.unique,
        matched = s.matched,
        dropped = conflation.dropped.len(),
        "conflated permits"
    );
    Ok(conflation)
}

// One conflation pass over immutable inputs. Matching runs in parallel; the
// output keeps the order of the impact records.
pub fn run(
    context: &Context,
    addresses: &[PermitAddressRecord],
    impacts: &[PermitImpactRecord],
    progress: &ProgressBar,
) -> Result<Conflation, ConflationError> {
    let lines = lines::build(addresses, impacts)?;

    progress.set_length(lines.lines.len() as u64);
    let outcomes: Vec<(&PermitAddressRecord, Result<ConstructionClosure, DropReason>)> = lines
        .lines
        .par_iter()
        .map(|x| -> Result<_, ConflationError> {
            let outcome = match match_line(&context.index, &x.line, &context.config) {
                Match::Matched(point) => Ok(closure(x.address, point)?),
                Match::TooLong { length } => Err(DropReason::TooLong { length }),
                Match::TooManyCandidates { candidates } => {
                    Err(DropReason::TooManyCandidates { candidates })
                }
                Match::NoIntersection => Err(DropReason::NoIntersection),
                Match::Ambiguous { points } => Err(DropReason::Ambiguous { points }),
            };
            progress.inc(1);
            Ok((x.address, outcome))
        })
        .collect::<Result<_, ConflationError>>()?;

    let mut output = Conflation::default();
    output.statistics.impacts = impacts.len();
    output.statistics.unique = lines.unique;

    for key in &lines.unpaired {
        debug!(permit = %key, "no address record");
        output.statistics.record(&DropReason::Unpaired);
        output.dropped.push(((*key).clone(), DropReason::Unpaired));
    }

    for (address, outcome) in outcomes {
        match outcome {
            Ok(closure) => {
                output.statistics.matched += 1;
                output.closures.push(closure);
            }
            Err(reason) => {
                debug!(permit = %address.key, ?reason, "dropped");
                output.statistics.record(&reason);
                output.dropped.push((address.key.clone(), reason));
            }
        }
    }

    Ok(output)
}

fn closure(
    address: &PermitAddressRecord,
    point: Point,
) -> Result<ConstructionClosure, ConflationError> {
    let point = projection::to_geographic(&point, Srid::Utm10N).map_err(|e| {
        ConflationError::malformed(format!("sidewalk intersection of {:?}", address.key), e)
    })?;

    Ok(ConstructionClosure {
        address: address.address.clone(),
        closed: address.closed,
        start_date: address.start.map(|x| x.date()),
        end_date: address.end.map(|x| x.date()),
        geom: TaggedPoint::new(Srid::Wgs84, point),
    })
}

#[cfg(test)]
mod tests {
    use _model::SidewalkId;
    use chrono::NaiveDate;
    use geo::{line_string, EuclideanLength, Point};
    use pretty_assertions::assert_eq;

    use crate::closures::MemorySink;

    use super::*;

    fn address(key: &str) -> PermitAddressRecord {
        PermitAddressRecord {
            key: PermitKey::new(key),
            address: "400 PINE ST".to_string(),
            point: Point::new(-122.33, 47.6),
            start: NaiveDate::from_ymd_opt(2024, 3, 1).and_then(|x| x.and_hms_opt(8, 0, 0)),
            end: NaiveDate::from_ymd_opt(2024, 3, 31).and_then(|x| x.and_hms_opt(17, 0, 0)),
            closed: true,
        }
    }

    fn impact(key: &str) -> PermitImpactRecord {
        PermitImpactRecord {
            key: PermitKey::new(key),
            geometry: line_string![(x: -122.331, y: 47.601), (x: -122.329, y: 47.601)],
        }
    }

    fn sidewalk(id: u64, lat: f64) -> SidewalkSegment {
        SidewalkSegment {
            id: SidewalkId(id),
            geometry: line_string![(x: -122.3305, y: lat), (x: -122.3295, y: lat)],
        }
    }

    fn context(sidewalks: Vec<SidewalkSegment>) -> Context {
        Context {
            index: SidewalkIndex::build(sidewalks, Srid::Wgs84).unwrap(),
            config: MatchConfig::default(),
        }
    }

    #[test]
    fn single_permit_end_to_end() {
        let context = context(vec![sidewalk(1, 47.6005)]);
        let output = run(
            &context,
            &[address("P100")],
            &[impact("P100")],
            &ProgressBar::hidden(),
        )
        .unwrap();

        assert_eq!(output.dropped, vec![]);
        assert_eq!(output.closures.len(), 1);

        let closure = &output.closures[0];
        assert_eq!(closure.address, "400 PINE ST");
        assert!(closure.closed);
        assert_eq!(closure.start_date, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(closure.end_date, NaiveDate::from_ymd_opt(2024, 3, 31));
        assert_eq!(closure.geom.srid, Srid::Wgs84);
        let (x, y) = closure.geom.point.x_y();
        assert!((x - -122.33).abs() < 1e-6, "{x}");
        assert!((y - 47.6005).abs() < 1e-6, "{y}");

        assert_eq!(output.statistics.matched, 1);
    }

    #[test]
    fn drops_are_counted_not_errors() {
        let context = context(vec![sidewalk(1, 47.6005), sidewalk(2, 47.6008)]);
        // east of both sidewalks, so its line misses them
        let mut east = address("P300");
        east.point = Point::new(-122.3285, 47.6);
        let mut far = address("P400");
        far.point = Point::new(-122.33, 47.598);
        let addresses = vec![address("P100"), east, far];
        let impacts = vec![impact("P100"), impact("P200"), impact("P300"), impact("P400")];

        let output = run(&context, &addresses, &impacts, &ProgressBar::hidden()).unwrap();
        assert!(output.closures.is_empty());

        let reasons: Vec<_> = output
            .dropped
            .iter()
            .map(|(key, reason)| (key.as_str(), std::mem::discriminant(reason)))
            .collect();
        assert_eq!(
            reasons,
            vec![
                ("P200", std::mem::discriminant(&DropReason::Unpaired)),
                ("P100", std::mem::discriminant(&DropReason::Ambiguous { points: 0 })),
                ("P300", std::mem::discriminant(&DropReason::NoIntersection)),
                ("P400", std::mem::discriminant(&DropReason::TooLong { length: 0.0 })),
            ]
        );

        let s = &output.statistics;
        assert_eq!(
            (s.impacts, s.unique, s.unpaired, s.ambiguous, s.no_intersection, s.too_long, s.matched),
            (4, 4, 1, 1, 1, 1, 0)
        );
    }

    #[test]
    fn closures_respect_the_cap() {
        let context = context(vec![sidewalk(1, 47.6005)]);
        let addresses: Vec<_> = [47.6, 47.5995, 47.599, 47.5985, 47.5]
            .iter()
            .enumerate()
            .map(|(i, lat)| {
                let mut x = address(&format!("P{i}"));
                x.point = Point::new(-122.33, *lat);
                x
            })
            .collect();
        let impacts: Vec<_> = (0..addresses.len()).map(|i| impact(&format!("P{i}"))).collect();

        let output = run(&context, &addresses, &impacts, &ProgressBar::hidden()).unwrap();
        assert!(!output.closures.is_empty());

        let built = lines::build(&addresses, &impacts).unwrap();
        let matched: Vec<_> = built
            .lines
            .iter()
            .filter(|x| match_line(&context.index, &x.line, &context.config).point().is_some())
            .collect();
        assert_eq!(matched.len(), output.closures.len());
        for x in matched {
            assert!(x.line.euclidean_length() <= context.config.max_line_length);
        }
    }

    #[test]
    fn progress_counts_lines() {
        let context = context(vec![sidewalk(1, 47.6005)]);
        let addresses = vec![address("P100"), address("P200")];
        let impacts = vec![impact("P100"), impact("P200"), impact("P300")];

        let pb = ProgressBar::hidden();
        run(&context, &addresses, &impacts, &pb).unwrap();
        // the unpaired P300 never becomes a line
        assert_eq!(pb.length(), Some(2));
        assert_eq!(pb.position(), 2);
    }

    #[test]
    fn idempotent() {
        let context = context(vec![sidewalk(1, 47.6005), sidewalk(2, 47.6015)]);
        let addresses = vec![address("P100"), address("P200")];
        let impacts = vec![impact("P100"), impact("P200"), impact("P100")];

        let first = run(&context, &addresses, &impacts, &ProgressBar::hidden()).unwrap();
        let second = run(&context, &addresses, &impacts, &ProgressBar::hidden()).unwrap();
        assert_eq!(first.closures.len(), 2);
        assert_eq!(
            serde_json::to_string(&first.closures).unwrap(),
            serde_json::to_string(&second.closures).unwrap()
        );
    }

    #[test]
    fn replace_writes_to_sink() {
        let config = Config::default();
        let feeds = Feeds {
            addresses: vec![address("P100")],
            impacts: vec![impact("P100")],
        };
        let mut sink = MemorySink::default();

        let output = replace(&config, &feeds, vec![sidewalk(1, 47.6005)], &mut sink).unwrap();
        assert_eq!(sink.rows, output.closures);
        assert_eq!(sink.replaced, 1);

        // a second run replaces rather than appends
        replace(&config, &feeds, vec![sidewalk(1, 47.6005)], &mut sink).unwrap();
        assert_eq!(sink.rows.len(), 1);
        assert_eq!(sink.replaced, 2);
    }

    #[test]
    fn malformed_sidewalk_is_fatal() {
        let config = Config::default();
        let feeds = Feeds::default();
        let bad = SidewalkSegment {
            id: SidewalkId(9),
            geometry: line_string![(x: f64::NAN, y: 47.6)],
        };
        let mut sink = MemorySink::default();
        assert!(replace(&config, &feeds, vec![bad], &mut sink).is_err());
        assert_eq!(sink.replaced, 0);
    }
}
