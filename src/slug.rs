/// URL-safe slug: Turkish letters transliterated, lowercased, everything
/// outside `[a-z0-9 -]` dropped, whitespace runs collapsed to single
/// hyphens, hyphen runs collapsed, no leading or trailing hyphen.
///
/// Idempotent: slugify(slugify(x)) == slugify(x).
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_hyphen = false;

    for c in text.chars() {
        let c = transliterate(c);
        for c in c.to_lowercase() {
            if c.is_whitespace() || c == '-' {
                pending_hyphen = !slug.is_empty();
            } else if c.is_ascii_lowercase() || c.is_ascii_digit() {
                if pending_hyphen {
                    slug.push('-');
                    pending_hyphen = false;
                }
                slug.push(c);
            }
            // anything else is dropped
        }
    }

    slug
}

fn transliterate(c: char) -> char {
    match c {
        'ç' | 'Ç' => 'c',
        'ğ' | 'Ğ' => 'g',
        'ş' | 'Ş' => 's',
        'ü' | 'Ü' => 'u',
        'İ' | 'ı' => 'i',
        'ö' | 'Ö' => 'o',
        _ => c,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turkish_transliteration() {
        assert_eq!(slugify("Şişe Cam Çağrı"), "sise-cam-cagri");
        assert_eq!(slugify("GÜBRE FABRİKALARI"), "gubre-fabrikalari");
        assert_eq!(slugify("Işık Öğretim"), "isik-ogretim");
    }

    #[test]
    fn punctuation_dropped() {
        assert_eq!(slugify("Koç Holding A.Ş."), "koc-holding-as");
        assert_eq!(slugify("%50 İskonto!"), "50-iskonto");
    }

    #[test]
    fn hyphen_and_space_runs_collapse() {
        assert_eq!(slugify("a - b"), "a-b");
        assert_eq!(slugify("a   b--c"), "a-b-c");
        assert_eq!(slugify("--kenar--"), "kenar");
    }

    #[test]
    fn empty_and_symbol_only() {
        assert_eq!(slugify(""), "");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn idempotent() {
        for input in [
            "THYAO Temettü Tarihi 2026 Ne Kadar Verecek",
            "Şeker  --  Piliç",
            "already-a-slug",
            "",
        ] {
            let once = slugify(input);
            assert_eq!(slugify(&once), once);
        }
    }

    #[test]
    fn output_alphabet() {
        for input in ["Çok Güzel Bir Şirket", "a!b@c#d", "  1920  ", "İİİ"] {
            let s = slugify(input);
            assert!(
                s.is_empty()
                    || (s.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
                        && !s.starts_with('-')
                        && !s.ends_with('-')
                        && !s.contains("--")),
                "bad slug {s:?} for {input:?}"
            );
        }
    }
}
