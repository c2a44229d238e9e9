use chrono::{DateTime, Utc};
use netach_parse::{Category, CutType};
use serde::{Deserialize, Serialize};

/// Typical retail weight range for a cut, in grams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightRange {
    pub min_g: u32,
    pub max_g: u32,
}

/// The single authoritative record for one real-world cut that many raw
/// retailer names map onto. Name uniqueness is case-insensitive and
/// enforced by the store at creation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalEntity {
    pub id: i64,
    pub name: String,
    pub category: Option<Category>,
    pub cut_type: Option<CutType>,
    pub subcategory: Option<String>,
    pub is_premium: bool,
    pub typical_weight_range: Option<WeightRange>,
    pub cooking_methods: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Creation fields for a canonical entity. The store assigns id and
/// timestamps.
#[derive(Debug, Clone, Default)]
pub struct NewCanonicalEntity {
    pub name: String,
    pub category: Option<Category>,
    pub cut_type: Option<CutType>,
    pub subcategory: Option<String>,
    pub is_premium: bool,
    pub typical_weight_range: Option<WeightRange>,
    pub cooking_methods: Vec<String>,
}

/// Per-category aggregate over the store. Entities without a detected
/// category land in the `None` bucket.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryStats {
    pub category: Option<Category>,
    pub canonical_count: u64,
    pub variation_count: u64,
    pub avg_confidence: f64,
    pub verified_count: u64,
}
