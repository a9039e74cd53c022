use std::sync::LazyLock;

use regex::Regex;

static BULLET_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[-•]\s*").unwrap());

/// Scanner state. Detail pages announce each free-text section with a
/// header line; the mode decides which list the following lines feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Mode {
    #[default]
    None,
    FundUsage,
    Lockup,
    Allocation,
    Distribution,
    Financial,
}

/// Section headers and the mode they switch the scanner into.
const HEADERS: &[(&str, Mode)] = &[
    ("Fonun Kullanım Yeri", Mode::FundUsage),
    ("Satmama Taahhüdü", Mode::Lockup),
    ("Tahsisat Grupları", Mode::Allocation),
    ("Dağıtılacak Pay Miktarı", Mode::Distribution),
    ("Finansal Tablo", Mode::Financial),
];

/// Any line naming one of these closes the current section.
const TERMINATORS: &[&str] = &["Bist", "Endeks", "Başvuru Yerleri", "Şirket Hakkında", "Ekler"];

const FINANCIAL_KEYWORDS: &[&str] = &["Hasılat", "Brüt Kâr", "Milyon TL"];

#[derive(Debug, Default, PartialEq)]
pub struct Sections {
    pub fund_usage: Vec<String>,
    pub lockup: Vec<String>,
    pub allocation_groups: Vec<String>,
    pub estimated_distribution: Vec<String>,
    pub financial_raw: String,
    pub price_stability: String,
}

/// Line-mode scan over the flattened page text. Header transitions are
/// checked before accumulation, in a fixed order; "Fiyat İstikrarı" is the
/// one lookahead case and captures only its immediately following bullet.
pub fn scan(text: &str) -> Sections {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    let mut out = Sections::default();
    let mut financial: Vec<String> = Vec::new();
    let mut mode = Mode::None;

    for (i, line) in lines.iter().enumerate() {
        if let Some(next_mode) = header_mode(line) {
            mode = next_mode;
        } else if line.contains("Fiyat İstikrarı") {
            if let Some(next) = lines.get(i + 1) {
                if next.starts_with('-') {
                    out.price_stability = strip_bullet(next);
                }
            }
            mode = Mode::None;
        } else if TERMINATORS.iter().any(|t| line.contains(t)) {
            mode = Mode::None;
        } else {
            match mode {
                Mode::FundUsage
                    if line.starts_with('-') || line.starts_with('•') || line.starts_with('%') =>
                {
                    out.fund_usage.push(strip_bullet(line));
                }
                Mode::Lockup
                    if (line.starts_with('-') || line.starts_with('•'))
                        && !line.contains("Bist") =>
                {
                    out.lockup.push(strip_bullet(line));
                }
                Mode::Allocation
                    if (line.starts_with('-') || line.contains("Lot")) && !line.contains("Bist") =>
                {
                    out.allocation_groups.push(strip_bullet(line));
                }
                Mode::Distribution
                    if line.starts_with('-') || line.to_lowercase().contains("katılım") =>
                {
                    out.estimated_distribution.push(strip_bullet(line));
                }
                Mode::Financial
                    if !line.starts_with('*')
                        && FINANCIAL_KEYWORDS.iter().any(|k| line.contains(k)) =>
                {
                    financial.push(line.to_string());
                }
                _ => {}
            }
        }
    }

    out.financial_raw = financial.join(" ");
    out
}

fn header_mode(line: &str) -> Option<Mode> {
    HEADERS
        .iter()
        .find(|(header, _)| line.contains(header))
        .map(|(_, mode)| *mode)
}

fn strip_bullet(line: &str) -> String {
    BULLET_RE.replace(line, "").to_string()
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fund_usage_accepts_bullets_and_percent_lines() {
        let s = scan(
            "Fonun Kullanım Yeri\n- Yatırım harcamaları\n• Ar-Ge\n%30 borç ödemesi\ndüz metin atlanır",
        );
        assert_eq!(s.fund_usage, vec!["Yatırım harcamaları", "Ar-Ge", "%30 borç ödemesi"]);
    }

    #[test]
    fn lockup_collects_until_terminator() {
        let s = scan(
            "Satmama Taahhüdü\n- 1 yıl satış yasağı\n- 180 gün ek taahhüt\nŞirket Hakkında\n- bu artık sayılmaz",
        );
        assert_eq!(s.lockup, vec!["1 yıl satış yasağı", "180 gün ek taahhüt"]);
    }

    #[test]
    fn line_naming_bist_closes_the_section() {
        let s = scan("Satmama Taahhüdü\n- ilk taahhüt\nBist Kodu : ABC\n- ikinci taahhüt");
        assert_eq!(s.lockup, vec!["ilk taahhüt"]);
    }

    #[test]
    fn price_stability_lookahead_single_bullet() {
        let s = scan("Fiyat İstikrarı\n- 90 gün istikrar işlemi planlanmaktadır.\n- ikinci satır alınmaz");
        assert_eq!(s.price_stability, "90 gün istikrar işlemi planlanmaktadır.");
        assert!(s.fund_usage.is_empty());
    }

    #[test]
    fn price_stability_requires_bullet() {
        let s = scan("Fiyat İstikrarı\nistikrar öngörülmemektedir");
        assert_eq!(s.price_stability, "");
    }

    #[test]
    fn allocation_accepts_lot_lines_without_bullet() {
        let s = scan("Tahsisat Grupları\nYurt İçi Bireysel : 10.000.000 Lot\n- Kurumsal %20\naçıklama satırı");
        assert_eq!(
            s.allocation_groups,
            vec!["Yurt İçi Bireysel : 10.000.000 Lot", "Kurumsal %20"]
        );
    }

    #[test]
    fn distribution_matches_katilim_lines() {
        let s = scan(
            "Dağıtılacak Pay Miktarı\n1 lot katılım ile 15 lot beklenir\nKatılım oranına göre değişir\nbaşka satır",
        );
        assert_eq!(
            s.estimated_distribution,
            vec!["1 lot katılım ile 15 lot beklenir", "Katılım oranına göre değişir"]
        );
    }

    #[test]
    fn financial_concatenates_keyword_lines() {
        let s = scan(
            "Finansal Tablo\nHasılat 2024: 900 Milyon TL\n* dipnot satırı\nBrüt Kâr: 120 Milyon TL\nilgisiz satır",
        );
        assert_eq!(s.financial_raw, "Hasılat 2024: 900 Milyon TL Brüt Kâr: 120 Milyon TL");
    }

    #[test]
    fn no_mode_no_capture() {
        let s = scan("- başıboş madde\n% yüzde satırı\nkatılım içeren satır");
        assert_eq!(s, Sections::default());
    }

    #[test]
    fn sections_reset_between_headers() {
        let s = scan("Fonun Kullanım Yeri\n- fon kalemi\nTahsisat Grupları\n- tahsisat kalemi");
        assert_eq!(s.fund_usage, vec!["fon kalemi"]);
        assert_eq!(s.allocation_groups, vec!["tahsisat kalemi"]);
    }
}
