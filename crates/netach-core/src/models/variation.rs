use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How a variation link was established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariationSource {
    /// Entered or confirmed by a person.
    Manual,
    /// Exact hit in the curated mapping dictionary.
    Mapping,
    /// Fuzzy hit against the mapping dictionary.
    MappingFuzzy,
    /// Fuzzy hit against entities already in the store.
    Database,
    /// Established by an automated batch process.
    Auto,
    /// First observation that minted the canonical entity.
    Original,
}

impl VariationSource {
    /// Stable database string.
    pub fn as_db_str(&self) -> &'static str {
        match self {
            VariationSource::Manual => "manual",
            VariationSource::Mapping => "mapping",
            VariationSource::MappingFuzzy => "mapping_fuzzy",
            VariationSource::Database => "database",
            VariationSource::Auto => "auto",
            VariationSource::Original => "original",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "manual" => Some(VariationSource::Manual),
            "mapping" => Some(VariationSource::Mapping),
            "mapping_fuzzy" => Some(VariationSource::MappingFuzzy),
            "database" => Some(VariationSource::Database),
            "auto" => Some(VariationSource::Auto),
            "original" => Some(VariationSource::Original),
            _ => None,
        }
    }
}

/// A raw, as-observed retailer name linked to a canonical entity.
///
/// `(original_name, canonical_entity_id)` is unique; repeated resolutions
/// of the same text refresh the existing record instead of inserting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariationRecord {
    pub id: i64,
    pub original_name: String,
    pub canonical_entity_id: i64,
    pub confidence: f64,
    pub source: VariationSource,
    pub verified: bool,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
