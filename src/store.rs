use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::categorize::Partition;
use crate::model::{IpoDataset, IpoRecord};

/// Load a JSON file, treating a missing or malformed file as the empty
/// value. Malformed content is logged; the run continues.
pub fn load_or_default<T: DeserializeOwned + Default>(path: &Path) -> T {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => {
            if e.kind() != ErrorKind::NotFound {
                warn!("could not read {}: {}", path.display(), e);
            }
            return T::default();
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(e) => {
            warn!("malformed JSON in {}: {}", path.display(), e);
            T::default()
        }
    }
}

/// Pretty-printed UTF-8 JSON, whole-file overwrite. The parent directory
/// is created on first write.
pub fn write_pretty<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

/// Accumulates the partitioned IPO dataset during a scrape and checkpoints
/// it to disk every `interval` completed listings, so an aborted run loses
/// at most `interval` listings of progress. Counts completions, not source
/// positions, which keeps the guarantee under out-of-order completion.
pub struct IncrementalStore {
    path: PathBuf,
    interval: usize,
    completed: usize,
    dataset: IpoDataset,
}

impl IncrementalStore {
    pub fn new(path: PathBuf, interval: usize) -> Self {
        Self {
            path,
            interval: interval.max(1),
            completed: 0,
            dataset: IpoDataset::default(),
        }
    }

    pub fn push(&mut self, partition: Partition, record: IpoRecord) -> Result<()> {
        match partition {
            Partition::Active => self.dataset.active_ipos.push(record),
            Partition::Draft => self.dataset.draft_ipos.push(record),
        }
        self.completed += 1;
        if self.completed % self.interval == 0 {
            self.flush()?;
        }
        Ok(())
    }

    pub fn flush(&self) -> Result<()> {
        write_pretty(&self.path, &self.dataset)
    }

    pub fn dataset(&self) -> &IpoDataset {
        &self.dataset
    }
}
