//! Static keyword tables for category and cut-type classification.
//!
//! Tables are ordered: the first label whose keyword hits wins, so
//! declaration order is the tie-break. Keys are post-canonicalization
//! forms (lowercase, Hebrew-preferred), with a few raw English spellings
//! kept for callers that classify uncanonicalized text.

use serde::{Deserialize, Serialize};

/// Species-level product category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "בקר")]
    Beef,
    #[serde(rename = "עוף")]
    Chicken,
    #[serde(rename = "הודו")]
    Turkey,
    #[serde(rename = "כבש")]
    Lamb,
    #[serde(rename = "חזיר")]
    Pork,
    #[serde(rename = "דגים")]
    Fish,
}

impl Category {
    /// Stable database/display string (Hebrew label).
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Beef => "בקר",
            Category::Chicken => "עוף",
            Category::Turkey => "הודו",
            Category::Lamb => "כבש",
            Category::Pork => "חזיר",
            Category::Fish => "דגים",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "בקר" => Some(Category::Beef),
            "עוף" => Some(Category::Chicken),
            "הודו" => Some(Category::Turkey),
            "כבש" => Some(Category::Lamb),
            "חזיר" => Some(Category::Pork),
            "דגים" => Some(Category::Fish),
            _ => None,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cut-level product type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CutType {
    #[serde(rename = "סטייק")]
    Steak,
    #[serde(rename = "צלעות")]
    Ribs,
    #[serde(rename = "פילה")]
    Fillet,
    #[serde(rename = "טחון")]
    Ground,
    #[serde(rename = "צלי")]
    Roast,
    #[serde(rename = "שניצל")]
    Schnitzel,
    #[serde(rename = "חזה")]
    Breast,
    #[serde(rename = "כתף")]
    Shoulder,
    #[serde(rename = "שוק")]
    Drumstick,
    #[serde(rename = "כנפיים")]
    Wings,
    #[serde(rename = "קוביות")]
    Cubes,
    #[serde(rename = "רצועות")]
    Strips,
    #[serde(rename = "נקניקיות")]
    Sausage,
    #[serde(rename = "כבד")]
    Liver,
}

impl CutType {
    /// Stable database/display string (Hebrew label).
    pub fn as_str(&self) -> &'static str {
        match self {
            CutType::Steak => "סטייק",
            CutType::Ribs => "צלעות",
            CutType::Fillet => "פילה",
            CutType::Ground => "טחון",
            CutType::Roast => "צלי",
            CutType::Schnitzel => "שניצל",
            CutType::Breast => "חזה",
            CutType::Shoulder => "כתף",
            CutType::Drumstick => "שוק",
            CutType::Wings => "כנפיים",
            CutType::Cubes => "קוביות",
            CutType::Strips => "רצועות",
            CutType::Sausage => "נקניקיות",
            CutType::Liver => "כבד",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "סטייק" => Some(CutType::Steak),
            "צלעות" => Some(CutType::Ribs),
            "פילה" => Some(CutType::Fillet),
            "טחון" => Some(CutType::Ground),
            "צלי" => Some(CutType::Roast),
            "שניצל" => Some(CutType::Schnitzel),
            "חזה" => Some(CutType::Breast),
            "כתף" => Some(CutType::Shoulder),
            "שוק" => Some(CutType::Drumstick),
            "כנפיים" => Some(CutType::Wings),
            "קוביות" => Some(CutType::Cubes),
            "רצועות" => Some(CutType::Strips),
            "נקניקיות" => Some(CutType::Sausage),
            "כבד" => Some(CutType::Liver),
            _ => None,
        }
    }
}

impl std::fmt::Display for CutType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category keyword table, ordered by priority.
///
/// Brand markers that imply a species (אנגוס, וואגיו) sit under beef so
/// "בלק אנגוס" classifies even without the word בקר.
pub const CATEGORY_KEYWORDS: &[(Category, &[&str])] = &[
    (
        Category::Beef,
        &[
            "בקר", "עגל", "אנגוס", "וואגיו", "ואגיו", "שור", "beef", "veal", "angus", "wagyu",
        ],
    ),
    (
        Category::Chicken,
        &["עוף", "פרגית", "פרגיות", "תרנגולת", "chicken"],
    ),
    (Category::Turkey, &["הודו", "turkey"]),
    (Category::Lamb, &["כבש", "טלה", "כבשה", "lamb", "mutton"]),
    (Category::Pork, &["חזיר", "pork"]),
    (
        Category::Fish,
        &[
            "דג", "דגים", "סלמון", "טונה", "דניס", "לברק", "בורי", "אמנון", "fish", "salmon",
            "tuna",
        ],
    ),
];

/// Cut-type keyword table, ordered by priority.
pub const CUT_TYPE_KEYWORDS: &[(CutType, &[&str])] = &[
    (CutType::Steak, &["סטייק", "steak"]),
    (CutType::Ribs, &["צלעות", "צלע", "אסאדו", "ribs", "asado"]),
    (CutType::Fillet, &["פילה", "fillet", "filet"]),
    (CutType::Ground, &["טחון", "טחונה", "ground"]),
    (CutType::Schnitzel, &["שניצל", "schnitzel"]),
    (CutType::Roast, &["צלי", "roast"]),
    (CutType::Breast, &["חזה", "breast"]),
    (CutType::Shoulder, &["כתף", "shoulder"]),
    (CutType::Drumstick, &["שוק", "שוקיים", "drumstick"]),
    (CutType::Wings, &["כנפיים", "כנף", "wings"]),
    (CutType::Cubes, &["קוביות", "גולש", "cubes"]),
    (CutType::Strips, &["רצועות", "strips"]),
    (CutType::Sausage, &["נקניקיות", "נקניק", "מרגז", "מרגזים", "sausage"]),
    (CutType::Liver, &["כבד", "כבדים", "liver"]),
];

/// Premium markers, matched as plain substrings (no word boundary).
pub const PREMIUM_KEYWORDS: &[&str] = &[
    "אנגוס", "angus", "וואגיו", "ואגיו", "wagyu", "פרימיום", "מיושן", "משויש", "prime",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_db_round_trip() {
        for (category, _) in CATEGORY_KEYWORDS {
            assert_eq!(Category::from_db_str(category.as_str()), Some(*category));
        }
    }

    #[test]
    fn cut_type_db_round_trip() {
        for (cut_type, _) in CUT_TYPE_KEYWORDS {
            assert_eq!(CutType::from_db_str(cut_type.as_str()), Some(*cut_type));
        }
    }

    #[test]
    fn serde_uses_hebrew_labels() {
        assert_eq!(serde_json::to_string(&Category::Beef).unwrap(), "\"בקר\"");
        assert_eq!(
            serde_json::to_string(&CutType::Fillet).unwrap(),
            "\"פילה\""
        );
        let parsed: Category = serde_json::from_str("\"דגים\"").unwrap();
        assert_eq!(parsed, Category::Fish);
    }
}
