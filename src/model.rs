use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Trading segment the offering lists on. Detail pages that name no segment
/// are treated as Yıldız Pazar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Market {
    #[serde(rename = "Ana Pazar")]
    Ana,
    #[default]
    #[serde(rename = "Yıldız Pazar")]
    Yildiz,
}

/// Allocation method for oversubscribed offerings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DistributionType {
    #[serde(rename = "Eşit Dağıtım")]
    Esit,
    #[serde(rename = "Oransal Dağıtım")]
    Oransal,
    #[default]
    #[serde(rename = "Bilinmiyor")]
    Bilinmiyor,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinancialData {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub raw: String,
}

/// Structured fields recovered from a detail page's flattened text.
/// Every field has a documented fallback; a page that matches nothing
/// produces an all-default value rather than an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IpoDetail {
    pub price: f64,
    pub lot_count: String,
    pub distribution_type: DistributionType,
    pub market: Market,
    pub floating_rate: String,
    pub discount: String,
    pub total_size: String,
    pub lockup: Vec<String>,
    pub fund_usage: Vec<String>,
    pub broker: String,
    pub allocation_groups: Vec<String>,
    pub estimated_distribution: Vec<String>,
    pub financial_data: FinancialData,
    pub application_hours: String,
    pub price_stability: String,
    pub slug: String,
}

impl Default for IpoDetail {
    fn default() -> Self {
        Self {
            price: 0.0,
            lot_count: "Bilinmiyor".into(),
            distribution_type: DistributionType::default(),
            market: Market::default(),
            floating_rate: String::new(),
            discount: String::new(),
            total_size: String::new(),
            lockup: Vec::new(),
            fund_usage: Vec::new(),
            broker: "Bilinmiyor".into(),
            allocation_groups: Vec::new(),
            estimated_distribution: Vec::new(),
            financial_data: FinancialData::default(),
            application_hours: String::new(),
            price_stability: String::new(),
            slug: String::new(),
        }
    }
}

/// One row from the IPO index page. Draft-tab listings carry no code,
/// dates or status badge.
#[derive(Debug, Clone)]
pub struct IpoListing {
    pub company: String,
    pub url: String,
    pub status: Option<String>,
    pub code: Option<String>,
    pub dates: Option<String>,
    pub logo: Option<String>,
}

/// A fully assembled listing: index-page fields plus extracted detail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpoRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub company: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dates: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    pub url: String,
    #[serde(flatten)]
    pub detail: IpoDetail,
}

/// Live IPO dataset file shape. Regenerated wholesale every scrape run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IpoDataset {
    pub active_ipos: Vec<IpoRecord>,
    pub draft_ipos: Vec<IpoRecord>,
}

impl IpoDataset {
    pub fn len(&self) -> usize {
        self.active_ipos.len() + self.draft_ipos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One row of the upstream dividend feed. The feed's shape drifts, so only
/// the fields the pipeline reads are named; everything else rides along in
/// `extra` and is written back out untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DividendRecord {
    #[serde(default)]
    pub t_bistkod: String,
    #[serde(default)]
    pub t_sirket: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t_temt_net: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t_yuzde: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t_tarih: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t_odemetarihi: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t_ok: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl DividendRecord {
    /// Parsed payment date. The feed has shipped both ISO and dotted
    /// day-first dates; anything else counts as no date.
    pub fn payment_date(&self) -> Option<NaiveDate> {
        let raw = self.t_odemetarihi.as_deref()?;
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .or_else(|_| NaiveDate::parse_from_str(raw, "%d.%m.%Y"))
            .ok()
    }
}
