mod archive;
mod categorize;
mod config;
mod fetch;
mod model;
mod parser;
mod scraper;
mod sitemap;
mod slug;
mod store;

use std::time::Instant;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use tracing::info;

use crate::config::Settings;
use crate::fetch::Fetcher;
use crate::model::{DividendRecord, IpoDataset};

#[derive(Parser)]
#[command(
    name = "borsa_pipeline",
    about = "BIST content pipeline: IPO scraper, dividend archiver, sitemap builder"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape the IPO index and detail pages into the live dataset
    Scrape {
        /// Max listings to process (default: all)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Refresh the dividend dataset from the upstream feed
    FetchDividends,
    /// Move past-dated dividends into year archives, snapshot, prune
    Archive,
    /// Regenerate sitemap.xml from every dataset on disk
    Sitemap,
    /// Scrape + archive + sitemap in one pass
    Run {
        /// Max listings to scrape
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Show dataset counts
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load()?;
    let today = Local::now().date_naive();

    let result = match cli.command {
        Commands::Scrape { limit } => {
            let stats = scraper::scrape_ipos(&settings, limit).await?;
            print_scrape(&stats);
            Ok(())
        }
        Commands::FetchDividends => {
            let count = fetch_dividends(&settings).await?;
            println!(
                "Saved {} dividend records to {}",
                count,
                settings.dividends_path().display()
            );
            Ok(())
        }
        Commands::Archive => {
            let summary = archive::run(&settings, today)?;
            print_archive(&summary);
            Ok(())
        }
        Commands::Sitemap => {
            let urls = sitemap::build(&settings, today)?;
            println!("Sitemap rebuilt with {} URLs", urls);
            Ok(())
        }
        Commands::Run { limit } => {
            let stats = scraper::scrape_ipos(&settings, limit).await?;
            print_scrape(&stats);

            let summary = archive::run(&settings, today)?;
            print_archive(&summary);

            let urls = sitemap::build(&settings, today)?;
            println!("Sitemap rebuilt with {} URLs", urls);
            Ok(())
        }
        Commands::Stats => {
            let ipos: IpoDataset = store::load_or_default(&settings.ipos_path());
            let dividends: Vec<DividendRecord> = store::load_or_default(&settings.dividends_path());
            let index: serde_json::Value =
                store::load_or_default(&settings.archive_dir().join("index.json"));

            println!("Active IPOs: {}", ipos.active_ipos.len());
            println!("Draft IPOs:  {}", ipos.draft_ipos.len());
            println!("Dividends:   {}", dividends.len());
            if let Some(years) = index.get("years").and_then(|y| y.as_array()) {
                let years: Vec<&str> = years.iter().filter_map(|y| y.as_str()).collect();
                println!("Archived:    {} ({})", index["totalArchived"], years.join(", "));
            }
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

/// Pull the upstream dividend feed (Referer required) and overwrite the
/// live dividend file. A feed that is not valid JSON aborts the task.
async fn fetch_dividends(settings: &Settings) -> Result<usize> {
    let fetcher = Fetcher::new()?;
    info!("Fetching dividend feed: {}", settings.dividend_feed_url);

    let body = fetcher
        .get_text_with_referer(&settings.dividend_feed_url, &settings.dividend_referer)
        .await?;
    let data: serde_json::Value =
        serde_json::from_str(&body).context("dividend feed is not valid JSON")?;

    let count = data.as_array().map(|a| a.len()).unwrap_or(0);
    store::write_pretty(&settings.dividends_path(), &data)?;
    Ok(count)
}

fn print_scrape(stats: &scraper::ScrapeStats) {
    println!(
        "Scraped {} listings ({} ok, {} errors): {} active, {} draft",
        stats.total, stats.ok, stats.errors, stats.active, stats.draft
    );
}

fn print_archive(summary: &archive::ArchiveSummary) {
    println!(
        "Archived {} dividends across {} year(s); {} remain active",
        summary.archived,
        summary.years.len(),
        summary.active
    );
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
