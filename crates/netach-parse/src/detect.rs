//! Keyword-based category and attribute detection.
//!
//! Detection never infers beyond the keyword evidence: no keyword, no
//! label. Scanning is deterministic: tables are walked in declaration
//! order and the first hit wins.

use crate::keyword::{
    Category, CutType, CATEGORY_KEYWORDS, CUT_TYPE_KEYWORDS, PREMIUM_KEYWORDS,
};

/// Detect the species-level category of a canonicalized product name.
pub fn detect_category(text: &str) -> Option<Category> {
    for (category, keywords) in CATEGORY_KEYWORDS {
        if keywords.iter().any(|kw| contains_word(text, kw)) {
            tracing::trace!(category = %category, "category keyword hit");
            return Some(*category);
        }
    }
    None
}

/// Detect the cut-level type of a canonicalized product name.
pub fn detect_cut_type(text: &str) -> Option<CutType> {
    for (cut_type, keywords) in CUT_TYPE_KEYWORDS {
        if keywords.iter().any(|kw| contains_word(text, kw)) {
            tracing::trace!(cut_type = %cut_type, "cut-type keyword hit");
            return Some(*cut_type);
        }
    }
    None
}

/// Whether the text carries a premium marker.
///
/// Plain substring matching: premium markers are brand terms that also
/// show up glued to other words in retailer feeds.
pub fn is_premium(text: &str) -> bool {
    PREMIUM_KEYWORDS.iter().any(|kw| text.contains(kw))
}

/// Whole-word substring check: `kw` must appear as a complete
/// whitespace-delimited word (or word sequence) of `text`.
fn contains_word(text: &str, kw: &str) -> bool {
    let padded = format!(" {text} ");
    let needle = format!(" {kw} ");
    padded.contains(&needle)
}
