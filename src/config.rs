use std::path::PathBuf;

use anyhow::Result;
use config::Config;
use serde::Deserialize;

const DEFAULT_SOURCE_URL: &str = "https://halkarz.com/";
const DEFAULT_DIVIDEND_FEED_URL: &str =
    "https://halkarz.com/wp-content/themes/halkarz/json/temettu.json";
const DEFAULT_DIVIDEND_REFERER: &str = "https://halkarz.com/temettu-takvimi/";
const DEFAULT_BASE_URL: &str = "https://yatirimx.com";

/// Runtime settings. Defaults cover the production layout; any key can be
/// overridden from the environment with a `BORSA_` prefix
/// (e.g. `BORSA_RETENTION_DAYS=45`).
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub source_url: String,
    pub dividend_feed_url: String,
    pub dividend_referer: String,
    pub base_url: String,
    pub output_dir: PathBuf,
    pub retention_days: i64,
    pub checkpoint_interval: usize,
    /// Restore the literal replace-per-year archive behavior instead of
    /// merging into existing year buckets.
    pub archive_overwrite: bool,
}

impl Settings {
    pub fn load() -> Result<Self> {
        let cfg = Config::builder()
            .set_default("source_url", DEFAULT_SOURCE_URL)?
            .set_default("dividend_feed_url", DEFAULT_DIVIDEND_FEED_URL)?
            .set_default("dividend_referer", DEFAULT_DIVIDEND_REFERER)?
            .set_default("base_url", DEFAULT_BASE_URL)?
            .set_default("output_dir", "public")?
            .set_default("retention_days", 30)?
            .set_default("checkpoint_interval", 5)?
            .set_default("archive_overwrite", false)?
            .add_source(config::Environment::with_prefix("BORSA"))
            .build()?;
        Ok(cfg.try_deserialize()?)
    }

    pub fn ipos_path(&self) -> PathBuf {
        self.output_dir.join("halkarz_ipos.json")
    }

    pub fn dividends_path(&self) -> PathBuf {
        self.output_dir.join("temettu.json")
    }

    pub fn archive_dir(&self) -> PathBuf {
        self.output_dir.join("dividend_archives")
    }

    pub fn versions_dir(&self) -> PathBuf {
        self.output_dir.join("dividend_versions")
    }

    pub fn sitemap_path(&self) -> PathBuf {
        self.output_dir.join("sitemap.xml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_load() {
        let s = Settings::load().unwrap();
        assert_eq!(s.retention_days, 30);
        assert_eq!(s.checkpoint_interval, 5);
        assert!(!s.archive_overwrite);
        assert_eq!(s.output_dir, PathBuf::from("public"));
        assert!(s.source_url.starts_with("https://"));
    }

    #[test]
    fn derived_paths() {
        let s = Settings::load().unwrap();
        assert!(s.ipos_path().ends_with("halkarz_ipos.json"));
        assert!(s.archive_dir().ends_with("dividend_archives"));
        assert!(s.sitemap_path().ends_with("sitemap.xml"));
    }
}
