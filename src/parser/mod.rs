pub mod fields;
pub mod sections;

use crate::model::IpoDetail;

/// Two-pass extraction: whole-text regex fields, then the line-mode
/// section scanner. Never fails; unmatched fields keep their defaults.
pub fn parse_detail(url: &str, text: &str) -> IpoDetail {
    let mut detail = IpoDetail {
        slug: slug_from_url(url),
        ..IpoDetail::default()
    };

    fields::apply(&mut detail, text);

    let scanned = sections::scan(text);
    detail.fund_usage = scanned.fund_usage;
    detail.lockup = scanned.lockup;
    detail.allocation_groups = scanned.allocation_groups;
    detail.estimated_distribution = scanned.estimated_distribution;
    detail.financial_data.raw = scanned.financial_raw;
    detail.price_stability = scanned.price_stability;

    detail
}

/// Last path segment of the detail URL, trailing slash ignored.
pub fn slug_from_url(url: &str) -> String {
    url.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string()
}

// ── Tests ──
