//! Persistence layer.
//!
//! Snapshots, hourly captures and daily summaries are JSON files spread
//! over three directories. Every write goes to a temporary sibling first
//! and is renamed into place, so a reader never observes a half-written
//! file.

use chrono::{NaiveDate, Timelike};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::StorageConfig;
use crate::error::{FlipperError, Result};
use crate::types::{DailySummary, PriceListing, SnapshotTag};

/// Handle over the on-disk layout.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    snapshot_dir: PathBuf,
    hourly_dir: PathBuf,
    export_dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(
        snapshot_dir: impl Into<PathBuf>,
        hourly_dir: impl Into<PathBuf>,
        export_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            snapshot_dir: snapshot_dir.into(),
            hourly_dir: hourly_dir.into(),
            export_dir: export_dir.into(),
        }
    }

    pub fn from_config(cfg: &StorageConfig) -> Self {
        Self::new(&cfg.snapshot_dir, &cfg.hourly_dir, &cfg.export_dir)
    }

    /// All three directories under a common root. Used by tests and demos.
    pub fn under(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self::new(root.join("snapshots"), root.join("hourly"), root.join("exports"))
    }

    /// Create the storage directories if they are missing.
    pub fn ensure_layout(&self) -> Result<()> {
        for dir in [&self.snapshot_dir, &self.hourly_dir, &self.export_dir] {
            fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    pub fn snapshot_dir(&self) -> &Path {
        &self.snapshot_dir
    }

    pub fn export_dir(&self) -> &Path {
        &self.export_dir
    }

    pub fn snapshot_path(&self, tag: SnapshotTag) -> PathBuf {
        self.snapshot_dir.join(format!("bazaar_{tag}.json"))
    }

    // -- Tagged slots -----------------------------------------------------

    /// Replace the snapshot held under `tag`.
    pub fn save(&self, tag: SnapshotTag, listing: &PriceListing) -> Result<PathBuf> {
        let path = self.snapshot_path(tag);
        write_json_atomic(&path, listing)?;
        info!(
            tag = %tag,
            products = listing.len(),
            path = %path.display(),
            "Snapshot saved"
        );
        Ok(path)
    }

    /// Load the snapshot held under `tag`.
    pub fn load(&self, tag: SnapshotTag) -> Result<PriceListing> {
        let path = self.snapshot_path(tag);
        if !path.exists() {
            return Err(FlipperError::NotFound(format!(
                "no {tag} snapshot saved yet ({})",
                path.display()
            )));
        }
        let listing: PriceListing = read_json(&path)?;
        debug!(tag = %tag, products = listing.len(), "Snapshot loaded");
        Ok(listing)
    }

    pub fn exists(&self, tag: SnapshotTag) -> bool {
        self.snapshot_path(tag).exists()
    }

    // -- Hourly log -------------------------------------------------------

    /// Write `listing` into the slot for its capture hour (`bazaar_HH.json`).
    /// The same hour of the previous day is overwritten.
    pub fn record_hourly(&self, listing: &PriceListing) -> Result<PathBuf> {
        let path = self
            .hourly_dir
            .join(format!("bazaar_{:02}.json", listing.captured_at.hour()));
        write_json_atomic(&path, listing)?;
        debug!(path = %path.display(), "Hourly capture recorded");
        Ok(path)
    }

    /// Every readable hourly capture. Unreadable files are skipped with a warning.
    pub fn load_hourly(&self) -> Result<Vec<PriceListing>> {
        if !self.hourly_dir.exists() {
            return Ok(Vec::new());
        }

        let mut paths: Vec<PathBuf> = fs::read_dir(&self.hourly_dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("bazaar_") && n.ends_with(".json"))
            })
            .collect();
        paths.sort();

        let mut listings = Vec::with_capacity(paths.len());
        for path in paths {
            match read_json::<PriceListing>(&path) {
                Ok(listing) => listings.push(listing),
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable hourly capture"),
            }
        }
        Ok(listings)
    }

    // -- Daily summaries --------------------------------------------------

    pub fn daily_path(&self, date: NaiveDate) -> PathBuf {
        self.export_dir.join(format!("daily_{}.json", date.format("%Y-%m-%d")))
    }

    pub fn save_daily(&self, summary: &DailySummary) -> Result<PathBuf> {
        let path = self.daily_path(summary.date);
        write_json_atomic(&path, summary)?;
        info!(
            date = %summary.date,
            items = summary.items.len(),
            samples = summary.samples,
            "Daily summary saved"
        );
        Ok(path)
    }

    pub fn load_daily(&self, date: NaiveDate) -> Result<DailySummary> {
        let path = self.daily_path(date);
        if !path.exists() {
            return Err(FlipperError::NotFound(format!("no daily summary for {date}")));
        }
        read_json(&path)
    }
}

// ---------------------------------------------------------------------------
// File helpers
// ---------------------------------------------------------------------------

/// Serialise `value` as pretty JSON and atomically replace `path`.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_vec_pretty(value)?;
    write_atomic(path, &json)
}

/// Write to `<path>.tmp`, fsync, then rename over `path`.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp = PathBuf::from(tmp_name);

    let result = (|| -> Result<()> {
        let mut file = File::create(&tmp)?;
        file.write_all(contents)?;
        file.sync_all()?;
        fs::rename(&tmp, path)?;
        Ok(())
    })();

    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
