//! Canonicalization pipeline for retail product names.
//!
//! Raw names arrive from dozens of retailers with mixed Hebrew/English,
//! marketing noise, packaging details, and inconsistent spelling. The
//! pipeline reduces them to a stable comparison form through sequential
//! stages. Output is the empty string for empty input.
//!
//! The pipeline is pure and idempotent: running it on its own output is a
//! no-op. Every substitution target is a fixed point of the earlier stages.

use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// Apply the full canonicalization pipeline.
///
/// Stages applied in order:
/// 1. Trim + Unicode NFKC + case folding
/// 2. Quantity/price fragment removal
/// 3. Character-set reduction (Hebrew block, ASCII alphanumerics,
///    whitespace, basic punctuation)
/// 4. Noise word removal
/// 5. Letter corrections and Hebrew/English synonym substitution
/// 6. Whitespace collapse
pub fn canonicalize(s: &str) -> String {
    let s = s.trim();
    if s.is_empty() {
        return String::new();
    }
    let s = unicode_fold(s);
    let s = strip_quantities(&s);
    let s = reduce_charset(&s);
    let s = remove_noise_words(&s);
    let s = apply_corrections(&s);
    collapse_whitespace(&s)
}

// ── Stage 1: Unicode NFKC + case folding ──────────────────────────────

/// Apply NFKC normalization (fullwidth → ASCII, compose diacritics) and lowercase.
fn unicode_fold(s: &str) -> String {
    s.nfkc().collect::<String>().to_lowercase()
}

// ── Stage 2: Quantity/price fragments ─────────────────────────────────

/// Ordered removal rules for weight and price fragments.
///
/// Run before charset reduction so currency signs are still visible and
/// the whole fragment ("15.90 ₪") dies together instead of leaving a bare
/// number behind. Gershayim (U+05F4) and ASCII double quote both appear in
/// the wild for ק"ג and ש"ח.
static QUANTITY_RULES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // "ל-100 גרם" per-unit suffixes; must precede the generic weight
        // rule or the bare "ל-" prefix gets stranded
        r#"\bל-?\s*(?:100|1)\s*(?:גרם|גר|קילו)"#,
        // "500 גרם", "1.5 ק"ג", "2kg", "300g"
        r#"\d+(?:[.,]\d+)?\s*(?:ק["״]ג|קג|קילו|גרם|גר|kg|gr|g)\b"#,
        // "15.90 ₪", "89 ש"ח", "12 שח"
        r#"\d+(?:[.,]\d+)?\s*(?:₪|ש["״]ח|שח|nis)"#,
        // "₪ 15.90" (currency-first form)
        r#"(?:₪|ש["״]ח)\s*\d+(?:[.,]\d+)?"#,
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

fn strip_quantities(s: &str) -> String {
    let mut out = s.to_string();
    for re in QUANTITY_RULES.iter() {
        out = re.replace_all(&out, " ").into_owned();
    }
    out
}

// ── Stage 3: Character-set reduction ──────────────────────────────────

/// Replace every character outside the allowed set with a space.
///
/// Allowed: the Hebrew block (U+0590–U+05FF, which covers geresh and
/// gershayim), ASCII letters and digits, whitespace, and basic punctuation
/// used inside product words (geresh-as-apostrophe in loanwords such as
/// צ'וריסוס, hyphens, quotes, periods). Replacing rather than deleting
/// keeps adjacent words from gluing together.
fn reduce_charset(s: &str) -> String {
    s.chars()
        .map(|c| {
            let keep = ('\u{0590}'..='\u{05FF}').contains(&c)
                || c.is_ascii_alphanumeric()
                || c.is_whitespace()
                || matches!(c, '\'' | '"' | '-' | '.');
            if keep {
                c
            } else {
                ' '
            }
        })
        .collect()
}

// ── Stage 4: Noise words ──────────────────────────────────────────────

/// Marketing and packaging words carrying no cut identity.
static NOISE_WORDS: phf::Set<&'static str> = phf::phf_set! {
    // Freshness / storage state
    "טרי", "טריה", "טריים", "קפוא", "קפואה", "קפואים", "מצונן", "מצוננת",
    "fresh", "frozen",
    // Packaging
    "ארוז", "ארוזה", "מארז", "ואקום", "בואקום", "יחידה", "ליחידה",
    "pack", "vacuum",
    // Price / promotion
    "מבצע", "במבצע", "מחיר", "לקילו", "לקג", "שקית",
    "sale", "special", "premium",
    // Certification
    "כשר", "מהדרין", "למהדרין", "מוכשר", "חלק",
    "kosher",
};

/// Drop noise words at the word level.
///
/// A word matches after shedding surrounding punctuation, so "טרי," still
/// goes. Tokens that are nothing but punctuation go with it.
fn remove_noise_words(s: &str) -> String {
    s.split_whitespace()
        .filter(|word| {
            let bare = word.trim_matches(|c: char| matches!(c, '\'' | '"' | '-' | '.'));
            !bare.is_empty() && !NOISE_WORDS.contains(bare)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// ── Stage 5: Letter corrections and synonyms ──────────────────────────

/// Ordered substitution pairs: common misspellings first, then
/// English→Hebrew synonyms so both languages land on one spelling.
///
/// Every replacement is itself canonical: no entry's output matches any
/// other entry, which is what keeps the pipeline idempotent.
const CORRECTIONS: &[(&str, &str)] = &[
    // Misspellings seen across retailer feeds
    ("אנטרקוט", "אנטריקוט"),
    ("אנטריקט", "אנטריקוט"),
    ("אנטרקט", "אנטריקוט"),
    ("סטק", "סטייק"),
    ("סטיק", "סטייק"),
    ("שניצלים", "שניצל"),
    ("פילט", "פילה"),
    // English → Hebrew synonyms
    ("entrecote", "אנטריקוט"),
    ("ribeye", "אנטריקוט"),
    ("sirloin", "סינטה"),
    ("fillet", "פילה"),
    ("filet", "פילה"),
    ("steak", "סטייק"),
    ("schnitzel", "שניצל"),
    ("beef", "בקר"),
    ("veal", "עגל"),
    ("chicken", "עוף"),
    ("turkey", "הודו"),
    ("lamb", "כבש"),
    ("mutton", "כבש"),
    ("pork", "חזיר"),
    ("salmon", "סלמון"),
    ("tuna", "טונה"),
    ("fish", "דג"),
];

static CORRECTION_RULES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    CORRECTIONS
        .iter()
        .map(|&(pattern, replacement)| {
            (
                Regex::new(&format!(r"\b{pattern}\b")).unwrap(),
                replacement,
            )
        })
        .collect()
});

fn apply_corrections(s: &str) -> String {
    let mut out = s.to_string();
    for (re, replacement) in CORRECTION_RULES.iter() {
        out = re.replace_all(&out, *replacement).into_owned();
    }
    out
}

// ── Stage 6: Whitespace collapse ──────────────────────────────────────

/// Trim and collapse whitespace runs to a single space.
fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
