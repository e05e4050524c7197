// src/normalize.rs
//! Text and company-name normalization: article-text cleanup shared by all
//! connectors, plus the slug / suffix-stripping primitives the identity
//! resolution engine is built on.

use once_cell::sync::OnceCell;
use regex::Regex;

/// Legal-form suffixes stripped when slugging a company name. Mix of French
/// (SAS, SARL) and international forms — funding sources spell the same
/// company with and without them.
const LEGAL_SUFFIXES: &[&str] = &[
    "sas", "sasu", "sarl", "sa", "inc", "incorporated", "ltd", "limited", "llc", "gmbh", "ag",
    "bv", "ab", "oy", "plc", "srl", "spa", "corp", "corporation", "co",
];

/// Additional generic tokens stripped only by the aggressive normalizer used
/// for the exact-match similarity bonus.
const GENERIC_SUFFIXES: &[&str] = &[
    "company", "group", "groupe", "ventures", "capital", "labs", "lab", "technologies",
    "technology", "tech", "studio", "studios", "partners", "holdings", "app", "ai", "io", "hq",
];

/// Normalize article text: decode HTML entities, strip tags, normalize
/// quotes, collapse whitespace, drop trailing sentence punctuation, cap
/// length. Every connector routes item text through this before emitting
/// records.
pub fn normalize_text(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, " ").to_string();

    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").trim().to_string();

    while let Some(last) = out.chars().last() {
        if matches!(last, '!' | '?' | '.' | ',') {
            out.pop();
        } else {
            break;
        }
    }

    if out.chars().count() > 2000 {
        out = out.chars().take(2000).collect();
    }

    out
}

/// Fold the accented characters that show up in French/European company
/// names down to ASCII. Anything outside the table passes through.
pub fn fold_diacritics(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            'à' | 'â' | 'ä' | 'á' | 'ã' | 'å' => 'a',
            'ç' => 'c',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'î' | 'ï' | 'í' | 'ì' => 'i',
            'ô' | 'ö' | 'ó' | 'ò' | 'õ' => 'o',
            'û' | 'ü' | 'ù' | 'ú' => 'u',
            'ÿ' => 'y',
            'ñ' => 'n',
            'À' | 'Â' | 'Ä' | 'Á' | 'Ã' | 'Å' => 'A',
            'Ç' => 'C',
            'É' | 'È' | 'Ê' | 'Ë' => 'E',
            'Î' | 'Ï' | 'Í' | 'Ì' => 'I',
            'Ô' | 'Ö' | 'Ó' | 'Ò' | 'Õ' => 'O',
            'Û' | 'Ü' | 'Ù' | 'Ú' => 'U',
            'Ñ' => 'N',
            other => other,
        })
        .collect()
}

fn tokens_of(name: &str) -> Vec<String> {
    fold_diacritics(name)
        .to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn strip_trailing(mut tokens: Vec<String>, stop: &[&[&str]]) -> Vec<String> {
    // Strip repeatedly: "Acme Labs SAS" loses both trailing tokens.
    while tokens.len() > 1 {
        let last = tokens[tokens.len() - 1].as_str();
        if stop.iter().any(|list| list.contains(&last)) {
            tokens.pop();
        } else {
            break;
        }
    }
    tokens
}

/// Tokens of a name with legal suffixes removed, lowercase ASCII.
pub fn strip_legal_suffixes(name: &str) -> Vec<String> {
    strip_trailing(tokens_of(name), &[LEGAL_SUFFIXES])
}

/// Normalized, URL-safe identifier for a company name. Not globally unique;
/// the store resolves collisions with a numeric suffix.
pub fn slugify(name: &str) -> String {
    strip_legal_suffixes(name).join("-")
}

/// Comparable form used by the string-similarity metrics: suffix-stripped
/// lowercase tokens joined with single spaces.
pub fn comparable_name(name: &str) -> String {
    strip_legal_suffixes(name).join(" ")
}

/// Aggressive reduction for the exact-match bonus: legal *and* generic
/// suffixes stripped, bare alphanumeric tokens.
pub fn aggressive_normalize(name: &str) -> String {
    strip_trailing(tokens_of(name), &[LEGAL_SUFFIXES, GENERIC_SUFFIXES]).join(" ")
}

/// Identity key for cross-source aggregation dedup: lowercased, trimmed,
/// whitespace-collapsed company name.
pub fn identity_key(name: &str) -> String {
    name.trim().to_lowercase().split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_text_collapses_ws_and_punct() {
        let s = "  Acme&nbsp;&nbsp;raises <b>$5M</b>!!!  ";
        assert_eq!(normalize_text(s), "Acme raises $5M");
    }

    #[test]
    fn slug_strips_legal_suffix_and_diacritics() {
        assert_eq!(slugify("Acmé SAS"), "acme");
        assert_eq!(slugify("Foo Inc."), "foo");
        assert_eq!(slugify("Blue Océan SARL"), "blue-ocean");
        assert_eq!(slugify("Datawise GmbH"), "datawise");
    }

    #[test]
    fn slug_keeps_single_token_even_if_suffix_like() {
        // A company literally named "Capital" must not slug to "".
        assert_eq!(aggressive_normalize("Capital"), "capital");
        assert_eq!(slugify("SAS"), "sas");
    }

    #[test]
    fn aggressive_normalize_strips_generic_tail() {
        assert_eq!(aggressive_normalize("Acme Ventures SAS"), "acme");
        assert_eq!(aggressive_normalize("Acme Labs"), "acme");
        assert_eq!(aggressive_normalize("ACME"), "acme");
    }

    #[test]
    fn identity_key_is_case_and_space_insensitive() {
        assert_eq!(identity_key("  Foo   Bar "), identity_key("foo bar"));
    }
}
