//! Persistence contract the match resolver depends on.
//!
//! The resolver owns no durable state; everything lives behind this trait
//! so the engine ports across storage backends. Any engine works as long
//! as it offers exact lookup, transactional creation, idempotent upsert,
//! and some fuzzy-text primitive for `fuzzy_search`.

use crate::error::NetachError;
use crate::models::{
    CanonicalEntity, CategoryStats, NewCanonicalEntity, VariationRecord, VariationSource,
};

pub trait NormalizationStore: Send + Sync {
    /// Case-insensitive exact lookup of a canonical entity by name.
    fn find_by_exact_name(&self, name: &str) -> Result<Option<CanonicalEntity>, NetachError>;

    /// Fuzzy matches of canonicalized `text` against canonical names and
    /// stored variation original_names. Ranked descending by confidence,
    /// at most `limit` entities, none below `min_confidence`.
    fn fuzzy_search(
        &self,
        text: &str,
        min_confidence: f64,
        limit: usize,
    ) -> Result<Vec<(CanonicalEntity, f64)>, NetachError>;

    /// Create a canonical entity. Fails with
    /// [`NetachError::DuplicateName`] on a case-insensitive name
    /// collision; the uniqueness constraint is what arbitrates concurrent
    /// creation of the same name.
    fn create_canonical(&self, fields: NewCanonicalEntity)
        -> Result<CanonicalEntity, NetachError>;

    /// Create an entity together with its first variation as one atomic
    /// unit: either both commit or neither does.
    fn create_with_variation(
        &self,
        fields: NewCanonicalEntity,
        original_name: &str,
        confidence: f64,
        source: VariationSource,
        created_by: Option<&str>,
    ) -> Result<(CanonicalEntity, VariationRecord), NetachError>;

    /// Insert or refresh the variation for `(original_name, canonical_id)`.
    /// Idempotent on that key: repeated calls update confidence, source,
    /// and `updated_at` on the one existing row.
    fn upsert_variation(
        &self,
        original_name: &str,
        canonical_id: i64,
        confidence: f64,
        source: VariationSource,
        created_by: Option<&str>,
    ) -> Result<VariationRecord, NetachError>;

    /// Per-category aggregates over entities and their variations.
    fn get_stats(&self) -> Result<Vec<CategoryStats>, NetachError>;
}
