use std::collections::HashSet;
use std::fs;

use anyhow::Result;
use chrono::NaiveDate;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use serde_json::Value;
use tracing::info;

use crate::config::Settings;
use crate::model::{DividendRecord, IpoDataset, IpoRecord};
use crate::slug::slugify;
use crate::store;

#[derive(Debug)]
pub struct CatalogEntry {
    pub loc: String,
    pub lastmod: String,
    pub changefreq: &'static str,
    pub priority: &'static str,
}

struct StaticPage {
    path: &'static str,
    priority: &'static str,
    changefreq: &'static str,
}

const STATIC_PAGES: &[StaticPage] = &[
    StaticPage { path: "/", priority: "1.0", changefreq: "hourly" },
    StaticPage { path: "/piyasa", priority: "0.9", changefreq: "hourly" },
    StaticPage { path: "/hedef-fiyat", priority: "0.9", changefreq: "daily" },
    StaticPage { path: "/temettu-takvimi-2026", priority: "0.9", changefreq: "daily" },
    StaticPage { path: "/halka-arz", priority: "0.9", changefreq: "weekly" },
    StaticPage { path: "/sermaye-artirimi", priority: "0.8", changefreq: "weekly" },
    StaticPage { path: "/araci-kurumlar", priority: "0.8", changefreq: "weekly" },
    StaticPage { path: "/blog", priority: "0.8", changefreq: "daily" },
    StaticPage { path: "/hakkimizda", priority: "0.6", changefreq: "monthly" },
    StaticPage { path: "/iletisim", priority: "0.6", changefreq: "monthly" },
    StaticPage { path: "/gizlilik-politikasi", priority: "0.5", changefreq: "monthly" },
    StaticPage { path: "/kullanim-kosullari", priority: "0.5", changefreq: "monthly" },
];

const BLOG_SLUGS: &[&str] = &[
    "2026-bedelsiz-verecek-hisseler",
    "2026-temettu-verecek-hisseler",
    "lot-sayisi-az-olan-hisseler-2026",
    "halka-arz-furyasi-devam-edecek-mi",
];

/// Build and write sitemap.xml from the static page table plus every
/// dynamic dataset present on disk. Missing or malformed source files
/// simply contribute nothing.
pub fn build(settings: &Settings, today: NaiveDate) -> Result<usize> {
    let entries = collect_entries(settings, today);
    let xml = render(&entries)?;

    let path = settings.sitemap_path();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, xml)?;
    info!("Sitemap written to {} ({} URLs)", path.display(), entries.len());
    Ok(entries.len())
}

fn collect_entries(settings: &Settings, today: NaiveDate) -> Vec<CatalogEntry> {
    let lastmod = today.format("%Y-%m-%d").to_string();
    let base = settings.base_url.trim_end_matches('/').to_string();
    let mut entries = Vec::new();

    for page in STATIC_PAGES {
        entries.push(url_entry(&base, page.path, &lastmod, page.changefreq, page.priority));
    }

    // Stocks
    let bist: Value = store::load_or_default(&settings.output_dir.join("bist_live_data.json"));
    if let Some(stocks) = bist.get("stocks").and_then(Value::as_array) {
        info!("Processing {} stocks", stocks.len());
        let mut seen = HashSet::new();
        for stock in stocks {
            let Some(code) = resolve_key(stock, &["code", "bistkodu"]) else {
                continue;
            };
            if !seen.insert(code.clone()) {
                continue;
            }
            let slug =
                keyword_slug(&code, &format!("Hisse Senedi Fiyatı Grafiği {code} Yorumu 2026"));
            entries.push(url_entry(&base, &format!("/hisse/{slug}"), &lastmod, "hourly", "0.9"));
        }
    }

    // IPOs, active then draft, one URL per offering
    let ipos: IpoDataset = store::load_or_default(&settings.ipos_path());
    if !ipos.is_empty() {
        info!("Processing {} IPOs", ipos.len());
        let mut seen = HashSet::new();
        for rec in ipos.active_ipos.iter().chain(ipos.draft_ipos.iter()) {
            let Some(key) = ipo_key(rec) else {
                continue;
            };
            if !seen.insert(key) {
                continue;
            }
            let slug = if rec.detail.slug.is_empty() {
                slugify(&rec.company)
            } else {
                rec.detail.slug.clone()
            };
            if slug.is_empty() {
                continue;
            }
            entries.push(url_entry(&base, &format!("/halka-arz/{slug}"), &lastmod, "weekly", "0.8"));
        }
    }

    // Capital increases
    let capital: Vec<Value> =
        store::load_or_default(&settings.output_dir.join("sermaye_artirimi.json"));
    if !capital.is_empty() {
        info!("Processing {} capital increases", capital.len());
        let mut seen = HashSet::new();
        for item in &capital {
            let Some(code) = resolve_key(item, &["code", "company"]) else {
                continue;
            };
            if !seen.insert(code.clone()) {
                continue;
            }
            entries.push(url_entry(
                &base,
                &format!("/sermaye-artirimi/{}", slugify(&code)),
                &lastmod,
                "weekly",
                "0.8",
            ));
        }
    }

    // Dividends
    let dividends: Vec<DividendRecord> = store::load_or_default(&settings.dividends_path());
    if !dividends.is_empty() {
        info!("Processing {} dividends", dividends.len());
        let mut seen = HashSet::new();
        for rec in &dividends {
            let code = rec.t_bistkod.trim();
            if code.is_empty() || !seen.insert(code.to_string()) {
                continue;
            }
            let slug = keyword_slug(code, "Temettü Tarihi 2026 Ne Kadar Verecek");
            entries.push(url_entry(&base, &format!("/temettu/{slug}"), &lastmod, "weekly", "0.8"));
        }
    }

    // Target prices: one URL per stock, however many analyst rows it has
    let targets: Vec<Value> =
        store::load_or_default(&settings.output_dir.join("halkarz_target_prices.json"));
    if !targets.is_empty() {
        info!("Processing {} target prices", targets.len());
        let mut seen = HashSet::new();
        for item in &targets {
            let Some(code) = resolve_key(item, &["bistkodu", "code"]) else {
                continue;
            };
            if !seen.insert(code.clone()) {
                continue;
            }
            let slug = keyword_slug(&code, "Hedef Fiyat 2026");
            entries.push(url_entry(&base, &format!("/hedef-fiyat/{slug}"), &lastmod, "daily", "0.8"));
        }
    }

    // Brokers
    let brokers: Vec<Value> = store::load_or_default(&settings.output_dir.join("brokers_tefas.json"));
    if !brokers.is_empty() {
        info!("Processing {} brokers", brokers.len());
        let mut seen = HashSet::new();
        for item in &brokers {
            let Some(name) = resolve_key(item, &["name"]) else {
                continue;
            };
            if !seen.insert(name.clone()) {
                continue;
            }
            let slug = slugify(&name);
            if slug.is_empty() {
                continue;
            }
            entries.push(url_entry(&base, &format!("/araci-kurumlar/{slug}"), &lastmod, "weekly", "0.7"));
        }
    }

    // Blog posts
    for slug in BLOG_SLUGS {
        entries.push(url_entry(&base, &format!("/blog/{slug}"), &lastmod, "weekly", "0.8"));
    }

    // Commodities
    let commodities: Vec<Value> = store::load_or_default(&settings.output_dir.join("emtia.json"));
    if !commodities.is_empty() {
        info!("Processing {} commodities", commodities.len());
        let mut seen = HashSet::new();
        for item in &commodities {
            let Some(name) = resolve_key(item, &["name"]) else {
                continue;
            };
            if !seen.insert(name.clone()) {
                continue;
            }
            let slug = slugify(&name);
            if slug.is_empty() {
                continue;
            }
            entries.push(url_entry(&base, &format!("/emtia/{slug}"), &lastmod, "daily", "0.7"));
        }
    }

    entries
}

/// First non-empty string among the candidate fields, in priority order.
fn resolve_key(item: &Value, candidates: &[&str]) -> Option<String> {
    for field in candidates {
        if let Some(v) = item.get(field).and_then(Value::as_str) {
            let v = v.trim();
            if !v.is_empty() {
                return Some(v.to_string());
            }
        }
    }
    None
}

/// IPO business key: code, then the detail slug, then the company name.
/// The code placeholder for listings without one never identifies anything.
fn ipo_key(rec: &IpoRecord) -> Option<String> {
    rec.code
        .clone()
        .filter(|c| !c.is_empty() && c != "KOD_YOK")
        .or_else(|| (!rec.detail.slug.is_empty()).then(|| rec.detail.slug.clone()))
        .or_else(|| (!rec.company.is_empty()).then(|| rec.company.clone()))
}

/// Business key plus the category's marketing phrase, unless the key
/// already carries it.
fn keyword_slug(key: &str, phrase: &str) -> String {
    let head = slugify(key);
    let tail = slugify(phrase);
    if tail.is_empty() || head.ends_with(&tail) {
        return head;
    }
    if head.is_empty() {
        return tail;
    }
    format!("{head}-{tail}")
}

fn url_entry(
    base: &str,
    path: &str,
    lastmod: &str,
    changefreq: &'static str,
    priority: &'static str,
) -> CatalogEntry {
    let clean = format!("/{}", path.trim_start_matches('/')).replace("//", "/");
    let mut loc = format!("{base}{clean}");

    // A final segment with a dot is a file, everything else gets a slash
    let is_file = clean.rsplit('/').next().is_some_and(|seg| seg.contains('.'));
    if !loc.ends_with('/') && !is_file {
        loc.push('/');
    }

    CatalogEntry {
        loc,
        lastmod: lastmod.to_string(),
        changefreq,
        priority,
    }
}

fn render(entries: &[CatalogEntry]) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut urlset = BytesStart::new("urlset");
    urlset.push_attribute(("xmlns", "http://www.sitemaps.org/schemas/sitemap/0.9"));
    writer.write_event(Event::Start(urlset))?;

    for entry in entries {
        writer.write_event(Event::Start(BytesStart::new("url")))?;
        write_leaf(&mut writer, "loc", &entry.loc)?;
        write_leaf(&mut writer, "lastmod", &entry.lastmod)?;
        write_leaf(&mut writer, "changefreq", entry.changefreq)?;
        write_leaf(&mut writer, "priority", entry.priority)?;
        writer.write_event(Event::End(BytesEnd::new("url")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("urlset")))?;
    Ok(String::from_utf8(writer.into_inner())?)
}

fn write_leaf(writer: &mut Writer<Vec<u8>>, tag: &str, text: &str) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new(tag)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(tag)))?;
    Ok(())
}

// ── Tests ──
