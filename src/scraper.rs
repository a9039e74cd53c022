use std::sync::{Arc, LazyLock};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use scraper::{ElementRef, Html, Selector};
use tokio::sync::{mpsc, Semaphore};
use tracing::{info, warn};

use crate::categorize::{self, Partition};
use crate::config::Settings;
use crate::fetch::Fetcher;
use crate::model::{IpoDetail, IpoListing, IpoRecord};
use crate::parser;
use crate::store::IncrementalStore;

const CONCURRENCY: usize = 4;

static TAB_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse(".tab_item").unwrap());
static ARTICLE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("article.index-list").unwrap());
static COMPANY_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h3.il-halka-arz-sirket a").unwrap());
static CODE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span.il-bist-kod").unwrap());
static DATES_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span.il-halka-arz-tarihi").unwrap());
static BADGE_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div.il-badge").unwrap());
static LOGO_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("img.slogo").unwrap());
static BODY_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("body").unwrap());

pub struct ScrapeStats {
    pub total: usize,
    pub ok: usize,
    pub errors: usize,
    pub active: usize,
    pub draft: usize,
}

/// Full scrape run: index page → listings → per-listing detail pages →
/// checkpointed live dataset. An unreachable index page aborts the run;
/// a failed detail fetch only degrades that listing to defaults.
pub async fn scrape_ipos(settings: &Settings, limit: Option<usize>) -> Result<ScrapeStats> {
    let fetcher = Arc::new(Fetcher::new()?);

    info!("Fetching IPO index: {}", settings.source_url);
    let html = fetcher
        .get_text(&settings.source_url)
        .await
        .with_context(|| format!("fetching index page {}", settings.source_url))?;

    let mut listings = parse_index(&html);
    if let Some(limit) = limit {
        listings.truncate(limit);
    }
    if listings.is_empty() {
        warn!("Index page yielded no listings; nothing written");
        return Ok(ScrapeStats { total: 0, ok: 0, errors: 0, active: 0, draft: 0 });
    }

    let total = listings.len();
    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")?
            .progress_chars("=> "),
    );

    let semaphore = Arc::new(Semaphore::new(CONCURRENCY));
    let (tx, mut rx) = mpsc::channel::<(IpoListing, IpoDetail, bool)>(CONCURRENCY * 2);

    for listing in listings {
        let fetcher = Arc::clone(&fetcher);
        let sem = Arc::clone(&semaphore);
        let tx = tx.clone();

        tokio::spawn(async move {
            let _permit = sem.acquire().await.unwrap();
            let (detail, fetched) = match fetcher.get_text_retry(&listing.url).await {
                Ok(body) => (parser::parse_detail(&listing.url, &flatten_text(&body)), true),
                Err(e) => {
                    warn!("Detail fetch failed for {}: {}", listing.url, e);
                    (parser::parse_detail(&listing.url, ""), false)
                }
            };
            let _ = tx.send((listing, detail, fetched)).await;
        });
    }

    // Drop our copy of tx so rx closes when all spawned tasks finish
    drop(tx);

    // Single writer: records land in completion order, checkpointing every
    // Nth completion plus a final flush.
    let mut store = IncrementalStore::new(settings.ipos_path(), settings.checkpoint_interval);
    let mut ok = 0usize;
    let mut errors = 0usize;

    while let Some((listing, detail, fetched)) = rx.recv().await {
        if fetched {
            ok += 1;
        } else {
            errors += 1;
        }
        let (partition, record) = assemble(listing, detail);
        store.push(partition, record)?;
        pb.inc(1);
    }

    pb.finish_and_clear();
    store.flush()?;

    let active = store.dataset().active_ipos.len();
    let draft = store.dataset().draft_ipos.len();
    info!(
        "Scraped {} listings ({} ok, {} errors): {} active, {} draft",
        total, ok, errors, active, draft
    );

    Ok(ScrapeStats { total, ok, errors, active, draft })
}

/// Listings from the index page's first two tabs. The second tab holds
/// drafts, which carry no code, dates or status badge.
pub fn parse_index(html: &str) -> Vec<IpoListing> {
    let doc = Html::parse_document(html);
    let mut listings = Vec::new();

    for (tab_idx, tab) in doc.select(&TAB_SEL).take(2).enumerate() {
        let draft_tab = tab_idx == 1;

        for article in tab.select(&ARTICLE_SEL) {
            let Some(anchor) = article.select(&COMPANY_SEL).next() else {
                continue;
            };
            let Some(url) = anchor.value().attr("href").map(str::to_string) else {
                continue;
            };
            let company = element_text(anchor);
            let logo = article
                .select(&LOGO_SEL)
                .next()
                .and_then(|img| img.value().attr("src"))
                .map(str::to_string);

            if draft_tab {
                listings.push(IpoListing {
                    company,
                    url,
                    status: None,
                    code: None,
                    dates: None,
                    logo,
                });
            } else {
                let code = article
                    .select(&CODE_SEL)
                    .next()
                    .map(element_text)
                    .filter(|c| !c.is_empty())
                    .unwrap_or_else(|| "KOD_YOK".into());
                let dates = article.select(&DATES_SEL).next().map(element_text).unwrap_or_default();
                let status = article.select(&BADGE_SEL).next().map(element_text).unwrap_or_default();

                listings.push(IpoListing {
                    company,
                    url,
                    status: Some(status),
                    code: Some(code),
                    dates: Some(dates),
                    logo,
                });
            }
        }
    }

    listings
}

/// Combine an index listing with its extracted detail and classify it.
pub fn assemble(listing: IpoListing, detail: IpoDetail) -> (Partition, IpoRecord) {
    let partition = categorize::classify(listing.status.as_deref().unwrap_or(""));
    let record = IpoRecord {
        code: listing.code,
        company: listing.company,
        dates: listing.dates,
        status: listing.status,
        logo: listing.logo,
        url: listing.url,
        detail,
    };
    (partition, record)
}

/// Whole-body text with one line per text node, the shape the section
/// scanner expects.
pub fn flatten_text(html: &str) -> String {
    let doc = Html::parse_document(html);
    match doc.select(&BODY_SEL).next() {
        Some(body) => body.text().collect::<Vec<_>>().join("\n"),
        None => String::new(),
    }
}

fn element_text(el: ElementRef) -> String {
    el.text().collect::<String>().trim().to_string()
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Market;

    const INDEX_HTML: &str = r#"
    <html><body>
      <div class="tab_item">
        <article class="index-list">
          <img class="slogo" src="/logo/ornek.png">
          <h3 class="il-halka-arz-sirket"><a href="https://halkarz.com/ornek-gida/">Örnek Gıda Sanayi A.Ş.</a></h3>
          <span class="il-bist-kod">ORNEK</span>
          <span class="il-halka-arz-tarihi">12-13 Haziran 2025</span>
          <div class="il-badge">Yeni</div>
        </article>
        <article class="index-list">
          <h3 class="il-halka-arz-sirket"><a href="https://halkarz.com/eski-enerji/">Eski Enerji A.Ş.</a></h3>
          <span class="il-halka-arz-tarihi">1-2 Ocak 2025</span>
          <div class="il-badge">Tamamlandı</div>
        </article>
      </div>
      <div class="tab_item">
        <article class="index-list">
          <img class="slogo" src="/logo/taslak.png">
          <h3 class="il-halka-arz-sirket"><a href="https://halkarz.com/taslak-tekstil/">Taslak Tekstil A.Ş.</a></h3>
        </article>
        <article class="index-list">
          <p>duyuru, bağlantı yok</p>
        </article>
      </div>
    </body></html>
    "#;

    #[test]
    fn index_parses_both_tabs() {
        let listings = parse_index(INDEX_HTML);
        assert_eq!(listings.len(), 3, "article without a link is skipped");

        let first = &listings[0];
        assert_eq!(first.company, "Örnek Gıda Sanayi A.Ş.");
        assert_eq!(first.code.as_deref(), Some("ORNEK"));
        assert_eq!(first.status.as_deref(), Some("Yeni"));
        assert_eq!(first.logo.as_deref(), Some("/logo/ornek.png"));

        let second = &listings[1];
        assert_eq!(second.code.as_deref(), Some("KOD_YOK"), "missing code falls back");
        assert_eq!(second.status.as_deref(), Some("Tamamlandı"));

        let draft = &listings[2];
        assert_eq!(draft.company, "Taslak Tekstil A.Ş.");
        assert!(draft.status.is_none());
        assert!(draft.code.is_none());
    }

    #[test]
    fn completed_badge_classifies_as_draft() {
        let listings = parse_index(INDEX_HTML);
        let (partition, _) = assemble(listings[1].clone(), IpoDetail::default());
        assert_eq!(partition, Partition::Draft);
        let (partition, _) = assemble(listings[2].clone(), IpoDetail::default());
        assert_eq!(partition, Partition::Draft);
    }

    #[test]
    fn end_to_end_listing_through_parser() {
        let listings = parse_index(INDEX_HTML);
        let text = std::fs::read_to_string("tests/fixtures/detail_page.txt").unwrap();
        let detail = parser::parse_detail(&listings[0].url, &text);
        let (partition, record) = assemble(listings[0].clone(), detail);

        assert_eq!(partition, Partition::Active);
        assert_eq!(record.detail.price, 19.50);
        assert_eq!(record.detail.lot_count, "56.7 Milyon");
        assert_eq!(record.detail.market, Market::Yildiz);
        assert_eq!(record.detail.slug, "ornek-gida");

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["market"], "Yıldız Pazar");
        assert_eq!(json["code"], "ORNEK");
    }

    #[test]
    fn flatten_keeps_line_structure() {
        let text = flatten_text("<html><body><div>Satır bir</div><p>Satır iki</p></body></html>");
        let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
        assert_eq!(lines, vec!["Satır bir", "Satır iki"]);
    }
}
