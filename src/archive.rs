use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate, SecondsFormat, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::Settings;
use crate::model::DividendRecord;
use crate::store;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ArchiveIndex {
    last_updated: String,
    years: Vec<String>,
    total_archived: usize,
    total_active: usize,
}

pub struct ArchiveSummary {
    pub archived: usize,
    pub active: usize,
    pub years: Vec<String>,
}

/// One archival run over the live dividend dataset:
/// past-by-payment-date records move into year buckets, the live file
/// keeps only active records, and a dated snapshot of the full input is
/// written before pruning snapshots past the retention window.
pub fn run(settings: &Settings, today: NaiveDate) -> Result<ArchiveSummary> {
    let live_path = settings.dividends_path();
    let records: Vec<DividendRecord> = store::load_or_default(&live_path);
    if records.is_empty() {
        info!("No dividend data found at {}; nothing to archive", live_path.display());
        return Ok(ArchiveSummary { archived: 0, active: 0, years: Vec::new() });
    }

    let archive_dir = settings.archive_dir();
    let versions_dir = settings.versions_dir();
    fs::create_dir_all(&archive_dir)
        .with_context(|| format!("creating {}", archive_dir.display()))?;
    fs::create_dir_all(&versions_dir)
        .with_context(|| format!("creating {}", versions_dir.display()))?;

    // A record with no parseable payment date stays active.
    let mut past: Vec<(NaiveDate, DividendRecord)> = Vec::new();
    let mut active: Vec<DividendRecord> = Vec::new();
    for rec in &records {
        match rec.payment_date() {
            Some(date) if date < today => past.push((date, rec.clone())),
            _ => active.push(rec.clone()),
        }
    }
    info!("Found {} past dividends, {} active dividends", past.len(), active.len());

    let total_archived = past.len();
    let mut buckets: BTreeMap<String, Vec<DividendRecord>> = BTreeMap::new();
    for (date, rec) in past {
        buckets.entry(date.year().to_string()).or_default().push(rec);
    }

    for (year, bucket) in &buckets {
        match write_year_bucket(&archive_dir, year, bucket, settings.archive_overwrite) {
            Ok(()) => info!("Archived {} dividends for year {}", bucket.len(), year),
            Err(e) => error!("Failed to archive year {}: {}", year, e),
        }
    }

    store::write_pretty(&live_path, &active)?;
    info!("Updated {} with {} active dividends", live_path.display(), active.len());

    let years: Vec<String> = buckets.keys().rev().cloned().collect();
    let index = ArchiveIndex {
        last_updated: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        years: years.clone(),
        total_archived,
        total_active: active.len(),
    };
    store::write_pretty(&archive_dir.join("index.json"), &index)?;

    let snapshot = versions_dir.join(format!("temettu_{}.json", today.format("%Y-%m-%d")));
    store::write_pretty(&snapshot, &records)?;
    info!("Created version snapshot {}", snapshot.display());

    prune_versions(&versions_dir, today, settings.retention_days);

    Ok(ArchiveSummary { archived: total_archived, active: active.len(), years })
}

/// Default policy merges this run's records into the existing year bucket,
/// keyed by stock code + payment date with existing rows winning, so a
/// shrunken source feed cannot erase earlier archives. `overwrite` restores
/// the plain replace.
fn write_year_bucket(
    dir: &Path,
    year: &str,
    bucket: &[DividendRecord],
    overwrite: bool,
) -> Result<()> {
    let path = dir.join(format!("temettu_{year}.json"));
    if overwrite {
        return store::write_pretty(&path, &bucket);
    }

    let existing: Vec<DividendRecord> = store::load_or_default(&path);
    let mut seen: HashSet<(String, String)> = existing.iter().map(bucket_key).collect();
    let mut merged = existing;
    for rec in bucket {
        if seen.insert(bucket_key(rec)) {
            merged.push(rec.clone());
        }
    }
    store::write_pretty(&path, &merged)
}

fn bucket_key(rec: &DividendRecord) -> (String, String) {
    (
        rec.t_bistkod.clone(),
        rec.t_odemetarihi.clone().unwrap_or_default(),
    )
}

/// Delete snapshots dated more than `retention_days` before `today`.
/// Unrecognized filenames are left alone; per-file failures are logged
/// and the pass continues.
pub fn prune_versions(dir: &Path, today: NaiveDate, retention_days: i64) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Could not scan {}: {}", dir.display(), e);
            return;
        }
    };

    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().to_string();
        let Some(date) = snapshot_date(&name) else {
            continue;
        };
        if (today - date).num_days() > retention_days {
            match fs::remove_file(entry.path()) {
                Ok(()) => info!("Deleted old version: {}", name),
                Err(e) => warn!("Could not delete {}: {}", name, e),
            }
        }
    }
}

fn snapshot_date(name: &str) -> Option<NaiveDate> {
    let stem = name.strip_prefix("temettu_")?.strip_suffix(".json")?;
    NaiveDate::parse_from_str(stem, "%Y-%m-%d").ok()
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn test_settings(dir: &Path) -> Settings {
        Settings {
            source_url: String::new(),
            dividend_feed_url: String::new(),
            dividend_referer: String::new(),
            base_url: "https://yatirimx.com".into(),
            output_dir: dir.to_path_buf(),
            retention_days: 30,
            checkpoint_interval: 5,
            archive_overwrite: false,
        }
    }

    fn dividend(code: &str, payment_date: Option<&str>) -> DividendRecord {
        serde_json::from_value(serde_json::json!({
            "t_bistkod": code,
            "t_sirket": format!("{code} A.Ş."),
            "t_odemetarihi": payment_date,
        }))
        .unwrap()
    }

    fn load_vec(path: &PathBuf) -> Vec<DividendRecord> {
        store::load_or_default(path)
    }

    #[test]
    fn partitions_buckets_and_snapshots() {
        let dir = tempfile::tempdir().unwrap();
        let settings = test_settings(dir.path());
        let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();

        let input = vec![
            dividend("THYAO", Some("2024-12-02")),
            dividend("ASELS", Some("2025-03-10")),
            dividend("GARAN", Some("2025-09-01")),
            dividend("SISE", None),
        ];
        store::write_pretty(&settings.dividends_path(), &input).unwrap();

        let summary = run(&settings, today).unwrap();
        assert_eq!(summary.archived, 2);
        assert_eq!(summary.active, 2);
        assert_eq!(summary.years, vec!["2025", "2024"], "years sorted descending");

        let y2024 = load_vec(&settings.archive_dir().join("temettu_2024.json"));
        assert_eq!(y2024.len(), 1);
        assert_eq!(y2024[0].t_bistkod, "THYAO");

        let live = load_vec(&settings.dividends_path());
        let codes: Vec<&str> = live.iter().map(|r| r.t_bistkod.as_str()).collect();
        assert_eq!(codes, vec!["GARAN", "SISE"], "future-dated and dateless stay active");

        // Snapshot holds the full pre-split input
        let snapshot = load_vec(&settings.versions_dir().join("temettu_2025-06-01.json"));
        assert_eq!(snapshot.len(), 4);

        let index: serde_json::Value =
            store::load_or_default(&settings.archive_dir().join("index.json"));
        assert_eq!(index["totalArchived"], 2);
        assert_eq!(index["totalActive"], 2);
        assert_eq!(index["years"][0], "2025");
    }

    #[test]
    fn merge_keeps_previously_archived_records() {
        let dir = tempfile::tempdir().unwrap();
        let settings = test_settings(dir.path());
        let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();

        fs::create_dir_all(settings.archive_dir()).unwrap();
        let earlier = vec![dividend("EREGL", Some("2024-05-01"))];
        store::write_pretty(&settings.archive_dir().join("temettu_2024.json"), &earlier).unwrap();

        // Current feed no longer contains EREGL, but has THYAO twice over
        let input = vec![
            dividend("THYAO", Some("2024-12-02")),
            dividend("THYAO", Some("2024-12-02")),
        ];
        store::write_pretty(&settings.dividends_path(), &input).unwrap();

        run(&settings, today).unwrap();

        let y2024 = load_vec(&settings.archive_dir().join("temettu_2024.json"));
        let codes: Vec<&str> = y2024.iter().map(|r| r.t_bistkod.as_str()).collect();
        assert_eq!(codes, vec!["EREGL", "THYAO"], "existing rows kept, duplicates dropped");
    }

    #[test]
    fn overwrite_flag_replaces_year_bucket() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = test_settings(dir.path());
        settings.archive_overwrite = true;
        let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();

        fs::create_dir_all(settings.archive_dir()).unwrap();
        let earlier = vec![dividend("EREGL", Some("2024-05-01"))];
        store::write_pretty(&settings.archive_dir().join("temettu_2024.json"), &earlier).unwrap();

        let input = vec![dividend("THYAO", Some("2024-12-02"))];
        store::write_pretty(&settings.dividends_path(), &input).unwrap();

        run(&settings, today).unwrap();

        let y2024 = load_vec(&settings.archive_dir().join("temettu_2024.json"));
        let codes: Vec<&str> = y2024.iter().map(|r| r.t_bistkod.as_str()).collect();
        assert_eq!(codes, vec!["THYAO"]);
    }

    #[test]
    fn empty_live_dataset_skips_archival() {
        let dir = tempfile::tempdir().unwrap();
        let settings = test_settings(dir.path());
        let summary = run(&settings, NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()).unwrap();
        assert_eq!(summary.archived, 0);
        assert!(!settings.archive_dir().exists(), "no directories created for an empty run");
    }

    #[test]
    fn prune_respects_retention_window() {
        let dir = tempfile::tempdir().unwrap();
        let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();

        let old = dir.path().join("temettu_2025-04-01.json");
        let recent = dir.path().join("temettu_2025-05-15.json");
        let unrelated = dir.path().join("notes.txt");
        fs::write(&old, "[]").unwrap();
        fs::write(&recent, "[]").unwrap();
        fs::write(&unrelated, "keep").unwrap();

        prune_versions(dir.path(), today, 30);

        assert!(!old.exists(), "61 days old, past retention");
        assert!(recent.exists(), "17 days old, kept");
        assert!(unrelated.exists(), "non-snapshot files untouched");
    }
}
