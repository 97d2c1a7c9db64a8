use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use _model::{SidewalkId, SidewalkSegment};
use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;

#[derive(Deserialize)]
struct RawSidewalk {
    id: u64,
    // lon/lat
    coordinates: Vec<[f64; 2]>,
}

pub fn load(path: &Path) -> Result<Vec<SidewalkSegment>> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let reader: Box<dyn BufRead> = if path.extension().is_some_and(|x| x == "zst") {
        Box::new(BufReader::new(zstd::Decoder::new(file)?))
    } else {
        Box::new(BufReader::new(file))
    };

    let mut segments = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let raw: RawSidewalk = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}", path.display(), i + 1))?;
        segments.push(SidewalkSegment {
            id: SidewalkId(raw.id),
            geometry: raw.coordinates.into(),
        });
    }

    info!(count = segments.len(), path = %path.display(), "loaded sidewalks");
    Ok(segments)
}
