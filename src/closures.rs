use std::{
    fs::{self, File},
    io::{BufRead, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use _model::ConstructionClosure;
use anyhow::{Context, Result};
use tracing::info;

// Destination for the construction table. Every call replaces the whole
// table; readers see either the previous rows or the new ones.
pub trait ClosureSink {
    fn replace(&mut self, closures: &[ConstructionClosure]) -> Result<()>;
}

pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn write_rows(&self, path: &Path, closures: &[ConstructionClosure]) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        for x in closures {
            serde_json::to_writer(&mut writer, x)?;
            writer.write_all(b"\n")?;
        }
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        Ok(())
    }
}

impl ClosureSink for JsonFileSink {
    fn replace(&mut self, closures: &[ConstructionClosure]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|x| !x.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let tmp = self.tmp_path();
        let result = self
            .write_rows(&tmp, closures)
            .and_then(|()| Ok(fs::rename(&tmp, &self.path)?));
        if result.is_err() {
            let _ = fs::remove_file(&tmp);
        }
        result.with_context(|| format!("failed to write {}", self.path.display()))?;

        info!(rows = closures.len(), path = %self.path.display(), "replaced construction table");
        Ok(())
    }
}

pub fn read(path: &Path) -> Result<Vec<ConstructionClosure>> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mut closures = Vec::new();
    for (i, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        closures.push(
            serde_json::from_str(&line)
                .with_context(|| format!("{}:{}", path.display(), i + 1))?,
        );
    }
    Ok(closures)
}

#[cfg(test)]
#[derive(Default)]
pub struct MemorySink {
    pub rows: Vec<ConstructionClosure>,
    pub replaced: usize,
}

#[cfg(test)]
impl ClosureSink for MemorySink {
    fn replace(&mut self, closures: &[ConstructionClosure]) -> Result<()> {
        self.rows = closures.to_vec();
        self.replaced += 1;
        Ok(())
    }
}
