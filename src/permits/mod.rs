use std::{
    fs::{self, create_dir_all, read_to_string, File},
    io::{Read, Write},
    path::{Path, PathBuf},
};

use _model::{PermitAddressRecord, PermitImpactRecord};
use anyhow::{Context, Result};
use chrono::Utc;
use chrono_tz::Tz;
use rayon::prelude::*;
use serde::de::DeserializeOwned;
use tracing::info;
use ureq::Agent;

use crate::{config::FeedConfig, utils::agent};

mod raw;

use raw::{RawImpact, RawUse};

// socrata floating timestamps are Seattle wall clock
pub const ZONE: Tz = chrono_tz::America::Los_Angeles;

#[derive(Debug, Default)]
pub struct Feeds {
    pub addresses: Vec<PermitAddressRecord>,
    pub impacts: Vec<PermitImpactRecord>,
}

pub fn main(config: &FeedConfig) -> Result<()> {
    let feeds = load(config, true)?;
    info!(
        addresses = feeds.addresses.len(),
        impacts = feeds.impacts.len(),
        cache = %config.cache.display(),
        "fetched permits"
    );
    Ok(())
}

// Reads both datasets from the cache, downloading whichever is missing (or
// both, with `refresh`). The cache only changes once both bodies parse, so it
// always holds one snapshot.
pub fn load(config: &FeedConfig, refresh: bool) -> Result<Feeds> {
    let agent = agent();
    let mut downloaded = Vec::new();

    let uses: Vec<RawUse> = snapshot(
        &agent,
        config,
        &config.use_url,
        &config.cache.join("use.json"),
        refresh,
        &mut downloaded,
    )
    .context("failed to download \"by use\" permits")?;
    let impacts: Vec<RawImpact> = snapshot(
        &agent,
        config,
        &config.impact_url,
        &config.cache.join("impact.json"),
        refresh,
        &mut downloaded,
    )
    .context("failed to download \"by impact\" permits")?;

    for (path, body) in downloaded {
        store(&path, &body).with_context(|| format!("failed to write {}", path.display()))?;
    }

    let addresses = uses
        .into_par_iter()
        .map(|x| x.refine())
        .collect::<Result<Vec<_>>>()?;
    let impacts = impacts
        .into_par_iter()
        .map(|x| x.refine())
        .collect::<Result<Vec<_>, _>>()?;

    info!(
        addresses = addresses.len(),
        impacts = impacts.len(),
        "loaded permits"
    );
    Ok(Feeds {
        addresses,
        impacts,
    })
}

fn snapshot<T: DeserializeOwned>(
    agent: &Agent,
    config: &FeedConfig,
    url: &str,
    path: &Path,
    refresh: bool,
    downloaded: &mut Vec<(PathBuf, String)>,
) -> Result<T> {
    if refresh || !path.exists() {
        info!(url, "fetching");
        let body = fetch(agent, config, url)?;
        let parsed: T =
            serde_json::from_str(&body).with_context(|| format!("failed to parse {url}"))?;
        downloaded.push((path.to_path_buf(), body));
        return Ok(parsed);
    }

    let contents =
        read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("failed to parse {}", path.display()))
}

fn store(path: &Path, body: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }
    let tmp = path.with_extension("json.tmp");
    let result = File::create(&tmp)
        .and_then(|mut file| {
            file.write_all(body.as_bytes())?;
            file.sync_all()
        })
        .and_then(|()| fs::rename(&tmp, path));
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    Ok(result?)
}

// only closures in effect right now, with both ends of the window set
fn fetch(agent: &Agent, config: &FeedConfig, url: &str) -> Result<String> {
    let now = Utc::now()
        .with_timezone(&ZONE)
        .naive_local()
        .format("%Y-%m-%dT%H:%M:%S%.3f");
    let filter = format!("sdwlk_close_start_dt <= '{now}' AND sdwlk_close_end_dt >= '{now}'");
    let having = "sdwlk_close_start_dt IS NOT NULL AND sdwlk_close_end_dt IS NOT NULL";

    let mut body = String::new();
    agent
        .get(url)
        .query("$where", &filter)
        .query("$having", having)
        .query("$limit", &config.limit.to_string())
        .call()?
        .into_reader()
        .read_to_string(&mut body)?;
    Ok(body)
}
