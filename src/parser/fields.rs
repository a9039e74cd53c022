use std::sync::LazyLock;

use regex::Regex;

use crate::model::{DistributionType, IpoDetail, Market};

static PRICE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Halka\s*Arz\s*Fiyatı.*?(\d+[,.]\d{2})").unwrap());
static HOURS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{2}:\d{2}-\d{2}:\d{2})").unwrap());
static FLOATING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Halka\s*Açıklık\s*[:\-]\s*(%?[\d,.]+)").unwrap());
static DISCOUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)İskonto\s*[:\-]\s*(%?[\d,.]+)").unwrap());
static SIZE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Büyüklüğü\s*[:\-～~]\s*([\d,.]+ (?:Milyar|Milyon) TL)").unwrap()
});
static BROKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)Aracı\s*Kurum.*?:(.*?)(?:Bist Kodu|$)").unwrap());
static SERMAYE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Sermaye\s*Artırımı\s*:\s*([\d.]+)\s*Lot").unwrap());
static ORTAK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Ortak\s*Satışı\s*:\s*([\d.]+)\s*Lot").unwrap());

/// Labelled single-capture fields; adding a source field means adding a
/// row, not a code path.
static LABELLED_FIELDS: &[(&LazyLock<Regex>, fn(&mut IpoDetail, String))] = &[
    (&HOURS_RE, |d, v| d.application_hours = v),
    (&FLOATING_RE, |d, v| d.floating_rate = v),
    (&DISCOUNT_RE, |d, v| d.discount = v),
    (&SIZE_RE, |d, v| d.total_size = v),
];

/// Whole-text pass: first regex match wins, a miss keeps the default.
pub fn apply(detail: &mut IpoDetail, text: &str) {
    if let Some(caps) = PRICE_RE.captures(text) {
        if let Ok(price) = caps[1].replace(',', ".").parse::<f64>() {
            detail.price = price;
        }
    }

    for (re, assign) in LABELLED_FIELDS {
        if let Some(caps) = re.captures(text) {
            assign(detail, caps[1].trim().to_string());
        }
    }

    if text.contains("Ana Pazar") {
        detail.market = Market::Ana;
    }

    if text.contains("Eşit Dağıtım") {
        detail.distribution_type = DistributionType::Esit;
    } else if text.contains("Oransal Dağıtım") {
        detail.distribution_type = DistributionType::Oransal;
    }

    if let Some(broker) = extract_broker(text) {
        detail.broker = broker;
    }

    let lots = total_lots(text);
    if lots > 0 {
        detail.lot_count = format_lots(lots);
    }
}

/// Lead manager names sit between "Aracı Kurum" and "Bist Kodu". Keep
/// lines naming an A.Ş under 100 chars; two at most, comma-joined.
fn extract_broker(text: &str) -> Option<String> {
    let caps = BROKER_RE.captures(text)?;
    let brokers: Vec<&str> = caps[1]
        .lines()
        .map(str::trim)
        .filter(|l| l.contains("A.Ş") && l.chars().count() < 100)
        .collect();

    match brokers.len() {
        0 => None,
        1 => Some(brokers[0].to_string()),
        _ => Some(brokers[..2].join(", ")),
    }
}

/// Sum of capital-increase and shareholder-sale lots, thousands
/// separators stripped. Either line may be absent.
fn total_lots(text: &str) -> u64 {
    let mut total = 0;
    for re in [&SERMAYE_RE, &ORTAK_RE] {
        if let Some(caps) = re.captures(text) {
            if let Ok(n) = caps[1].replace('.', "").parse::<u64>() {
                total += n;
            }
        }
    }
    total
}

fn format_lots(total: u64) -> String {
    if total > 1_000_000 {
        format!("{:.1} Milyon", total as f64 / 1_000_000.0)
    } else {
        group_thousands(total)
    }
}

/// Turkish-locale grouping: 54700 → "54.700".
fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(c);
    }
    out
}

// ── Tests ──
