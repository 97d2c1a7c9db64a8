use std::{
    fs::read_to_string,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use typed_floats::tf64::StrictlyPositiveFinite;

use crate::conflation::{Ambiguity, MatchConfig};

// degrees, roughly a centimetre
const DEFAULT_PROXIMITY: f64 = 1e-7;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    // metres
    pub max_line_length: StrictlyPositiveFinite,
    pub max_candidates: usize,
    pub ambiguity: Ambiguity,
    // degrees
    pub proximity: StrictlyPositiveFinite,
    pub sidewalks: PathBuf,
    pub output: PathBuf,
    pub feeds: FeedConfig,
}

impl Default for Config {
    fn default() -> Self {
        let defaults = MatchConfig::default();
        Self {
            max_line_length: StrictlyPositiveFinite::new(defaults.max_line_length)
                .expect("hardcoded"),
            max_candidates: defaults.max_candidates,
            ambiguity: defaults.ambiguity,
            proximity: StrictlyPositiveFinite::new(DEFAULT_PROXIMITY).expect("hardcoded"),
            sidewalks: PathBuf::from("data/sidewalks.jsonl"),
            output: PathBuf::from("data/construction.jsonl"),
            feeds: FeedConfig::default(),
        }
    }
}

impl Config {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let contents = read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        serde_yaml::from_str(&contents)
            .with_context(|| format!("failed to parse config {}", path.display()))
    }

    pub fn match_config(&self) -> MatchConfig {
        MatchConfig {
            max_line_length: self.max_line_length.get(),
            max_candidates: self.max_candidates,
            ambiguity: self.ambiguity,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct FeedConfig {
    pub use_url: String,
    pub impact_url: String,
    pub limit: u32,
    pub cache: PathBuf,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            use_url: "https://data.seattle.gov/resource/hyub-wfuv.json".to_string(),
            impact_url: "https://data.seattle.gov/resource/brf3-mqwc.json".to_string(),
            limit: 10_000,
            cache: PathBuf::from("data/permits"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs::write;

    use super::*;

    #[test]
    fn defaults() {
        let config = Config::load(None).unwrap();
        let m = config.match_config();
        assert_eq!(m.max_line_length, 200.0);
        assert_eq!(m.max_candidates, 256);
        assert_eq!(m.ambiguity, Ambiguity::Drop);
        assert_eq!(config.proximity.get(), 1e-7);
        assert_eq!(config.feeds.limit, 10_000);
    }

    #[test]
    fn partial_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        write(
            &path,
            "max-line-length: 150.5\nambiguity: nearest\nfeeds:\n  limit: 50\n",
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.max_line_length.get(), 150.5);
        assert_eq!(config.ambiguity, Ambiguity::Nearest);
        assert_eq!(config.feeds.limit, 50);
        // untouched fields keep their defaults
        assert_eq!(config.max_candidates, 256);
        assert_eq!(config.feeds.cache, PathBuf::from("data/permits"));
    }

    #[test]
    fn rejects_non_positive_length() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        write(&path, "max-line-length: -3.0\n").unwrap();
        assert!(Config::load(Some(&path)).is_err());
    }

    #[test]
    fn missing_file() {
        assert!(Config::load(Some(Path::new("/nonexistent/config.yaml"))).is_err());
    }
}
