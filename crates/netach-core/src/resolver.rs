//! Match resolution: canonicalize → mapping lookup → mapping fuzzy scan →
//! store-backed fuzzy search → decision policy → persistence.
//!
//! The resolver holds no mutable state of its own: the mapping table is an
//! immutable shared value and all durable state lives behind the
//! [`NormalizationStore`] trait, so resolutions run fully in parallel. The
//! only serialization point is entity creation, where the store's
//! uniqueness constraint arbitrates and the loser retries as
//! lookup-then-upsert.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use netach_parse::{
    canonicalize, detect_category, detect_cut_type, is_premium, Category, CutType,
};
use serde::Serialize;

use crate::config::MatchingConfig;
use crate::error::NetachError;
use crate::mapping::MappingTable;
use crate::models::{CanonicalEntity, CategoryStats, NewCanonicalEntity, VariationRecord, VariationSource};
use crate::similarity::similarity;
use crate::store::NormalizationStore;

/// Caller context for a resolution.
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Mint a new entity even when a confident match exists.
    pub force_create: bool,
    pub category_hint: Option<Category>,
    pub cut_type_hint: Option<CutType>,
    /// Store-search floor; defaults are mode-dependent.
    pub min_confidence: Option<f64>,
    /// Provenance only; never used for matching.
    pub user_id: Option<String>,
    /// Override for the first variation's source on the creation path.
    pub source: Option<VariationSource>,
}

/// Query parameters for [`Resolver::find_best_matches`].
#[derive(Debug, Clone, Default)]
pub struct MatchQuery {
    pub min_confidence: Option<f64>,
    pub category: Option<Category>,
    pub limit: Option<usize>,
}

/// One ranked resolution candidate.
#[derive(Debug, Clone, Serialize)]
pub struct MatchCandidate {
    pub canonical_name: String,
    pub confidence: f64,
    pub source: VariationSource,
    /// Set for candidates that came from the store.
    pub canonical_entity_id: Option<i64>,
    pub category: Option<Category>,
    /// The variation or name the score was computed against.
    pub matched_text: String,
}

/// Result envelope of a persisting resolution.
#[derive(Debug, Clone, Serialize)]
pub struct Resolution {
    pub entity: CanonicalEntity,
    pub variation: VariationRecord,
    pub is_new_entity: bool,
    pub confidence: f64,
    pub source: VariationSource,
    /// Runner-up candidates, best first, excluding the winner.
    pub alternatives: Vec<MatchCandidate>,
}

/// Read-only preview of what a resolution would see.
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub cleaned_name: String,
    pub category: Option<Category>,
    pub cut_type: Option<CutType>,
    pub is_premium: bool,
    /// Top candidate confidence, 0 when nothing matched.
    pub confidence: f64,
    pub candidates: Vec<MatchCandidate>,
}

pub struct Resolver<S> {
    mapping: Arc<MappingTable>,
    store: S,
    config: MatchingConfig,
}

impl<S: NormalizationStore> Resolver<S> {
    pub fn new(mapping: Arc<MappingTable>, store: S, config: MatchingConfig) -> Self {
        Self {
            mapping,
            store,
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Read-only analysis: cleanup, detection, and ranked candidates.
    /// Persists nothing.
    #[tracing::instrument(skip(self), fields(text = %text))]
    pub fn analyze(&self, text: &str) -> Result<Analysis, NetachError> {
        let raw = text.trim();
        if raw.is_empty() {
            return Err(NetachError::InvalidInput("empty product name".into()));
        }
        let cleaned = canonicalize(raw);
        if cleaned.is_empty() {
            return Ok(Analysis {
                cleaned_name: cleaned,
                category: None,
                cut_type: None,
                is_premium: false,
                confidence: 0.0,
                candidates: Vec::new(),
            });
        }

        let (candidates, _) = self.gather(&cleaned, self.config.analyze_min_confidence)?;
        Ok(Analysis {
            category: detect_category(&cleaned),
            cut_type: detect_cut_type(&cleaned),
            is_premium: is_premium(&cleaned),
            confidence: candidates.first().map(|c| c.confidence).unwrap_or(0.0),
            cleaned_name: cleaned,
            candidates,
        })
    }

    /// Resolve raw text to a canonical entity, persisting the variation
    /// link (and the entity itself when confidence calls for a new one).
    #[tracing::instrument(skip(self, options), fields(text = %text))]
    pub fn normalize(
        &self,
        text: &str,
        options: &ResolveOptions,
    ) -> Result<Resolution, NetachError> {
        let raw = text.trim();
        if raw.is_empty() {
            return Err(NetachError::InvalidInput("empty product name".into()));
        }
        let cleaned = canonicalize(raw);
        if cleaned.is_empty() {
            return Err(NetachError::InvalidInput(format!(
                "nothing left of {raw:?} after cleanup"
            )));
        }

        let min_confidence = options
            .min_confidence
            .unwrap_or(self.config.normalize_min_confidence);
        let (candidates, mut entities) = self.gather(&cleaned, min_confidence)?;

        if let Some(top) = candidates.first() {
            if top.confidence > self.config.accept_threshold && !options.force_create {
                tracing::debug!(
                    canonical = %top.canonical_name,
                    confidence = top.confidence,
                    source = top.source.as_db_str(),
                    "reusing canonical entity"
                );
                let (entity, variation, created) =
                    self.adopt_candidate(raw, top, options, &mut entities)?;
                return Ok(Resolution {
                    confidence: top.confidence,
                    source: top.source,
                    alternatives: runner_ups(&candidates, 1, self.config.max_alternatives),
                    entity,
                    variation,
                    is_new_entity: created,
                });
            }
        }

        // Nothing confident enough (or creation forced): mint a new entity.
        let alternatives = runner_ups(&candidates, 0, self.config.max_alternatives);
        self.create_entity(raw, &cleaned, options, alternatives)
    }

    /// Ranked candidates across the mapping dictionary and the store,
    /// deduplicated by canonical name. Read-only.
    #[tracing::instrument(skip(self, query), fields(text = %text))]
    pub fn find_best_matches(
        &self,
        text: &str,
        query: &MatchQuery,
    ) -> Result<Vec<MatchCandidate>, NetachError> {
        let raw = text.trim();
        if raw.is_empty() {
            return Err(NetachError::InvalidInput("empty product name".into()));
        }
        let cleaned = canonicalize(raw);
        if cleaned.is_empty() {
            return Ok(Vec::new());
        }

        let min_confidence = query
            .min_confidence
            .unwrap_or(self.config.analyze_min_confidence);
        let limit = query.limit.unwrap_or(self.config.fuzzy_limit);

        let mut candidates = Vec::new();
        if let Some(canonical) = self.mapping.lookup_exact(&cleaned) {
            candidates.push(mapping_candidate(
                canonical,
                1.0,
                VariationSource::Mapping,
                &cleaned,
            ));
        }
        for (variation, canonical) in self.mapping.iter() {
            let score = similarity(&cleaned, variation);
            if score >= min_confidence {
                candidates.push(mapping_candidate(
                    canonical,
                    score,
                    VariationSource::MappingFuzzy,
                    variation,
                ));
            }
        }
        for (entity, confidence) in self.store.fuzzy_search(&cleaned, min_confidence, limit)? {
            candidates.push(database_candidate(entity, confidence));
        }

        if let Some(category) = query.category {
            candidates.retain(|c| c.category == Some(category));
        }
        dedupe_best(&mut candidates);
        candidates.sort_by(candidate_order);
        candidates.truncate(limit);
        Ok(candidates)
    }

    /// Per-category aggregates from the store.
    pub fn stats(&self) -> Result<Vec<CategoryStats>, NetachError> {
        self.store.get_stats()
    }

    // ── Candidate gathering (decision steps 3–5) ──────────────────

    /// Mapping exact hit, else mapping fuzzy scan, else store search.
    /// Returns candidates sorted best-first, plus the store entities
    /// already fetched along the way.
    fn gather(
        &self,
        cleaned: &str,
        min_confidence: f64,
    ) -> Result<(Vec<MatchCandidate>, HashMap<i64, CanonicalEntity>), NetachError> {
        let mut candidates = self.mapping_candidates(cleaned);
        let mut entities = HashMap::new();

        // The curated dictionary always wins; the store is only consulted
        // when the dictionary had nothing to say.
        if candidates.is_empty() {
            for (entity, confidence) in
                self.store
                    .fuzzy_search(cleaned, min_confidence, self.config.fuzzy_limit)?
            {
                candidates.push(database_candidate_ref(&entity, confidence));
                entities.insert(entity.id, entity);
            }
        }

        dedupe_best(&mut candidates);
        candidates.sort_by(candidate_order);
        Ok((candidates, entities))
    }

    fn mapping_candidates(&self, cleaned: &str) -> Vec<MatchCandidate> {
        if let Some(canonical) = self.mapping.lookup_exact(cleaned) {
            tracing::debug!(canonical = %canonical, "exact mapping hit");
            return vec![mapping_candidate(
                canonical,
                1.0,
                VariationSource::Mapping,
                cleaned,
            )];
        }

        let mut out = Vec::new();
        for (variation, canonical) in self.mapping.iter() {
            let score = similarity(cleaned, variation);
            if score > self.config.mapping_fuzzy_threshold {
                out.push(mapping_candidate(
                    canonical,
                    score,
                    VariationSource::MappingFuzzy,
                    variation,
                ));
            }
        }
        if !out.is_empty() {
            tracing::debug!(count = out.len(), "mapping fuzzy hits");
        }
        out
    }

    // ── Persistence paths (decision step 7) ───────────────────────

    /// Link `raw` to the candidate's entity, creating the entity when the
    /// mapping names a canonical the store has never seen. Creation commits
    /// entity and variation as one transaction. Returns the entity, the
    /// variation, and whether the entity was created now.
    fn adopt_candidate(
        &self,
        raw: &str,
        candidate: &MatchCandidate,
        options: &ResolveOptions,
        entities: &mut HashMap<i64, CanonicalEntity>,
    ) -> Result<(CanonicalEntity, VariationRecord, bool), NetachError> {
        let existing = match candidate
            .canonical_entity_id
            .and_then(|id| entities.remove(&id))
        {
            Some(entity) => Some(entity),
            None => self.store.find_by_exact_name(&candidate.canonical_name)?,
        };
        if let Some(entity) = existing {
            let variation = self.store.upsert_variation(
                raw,
                entity.id,
                candidate.confidence,
                candidate.source,
                options.user_id.as_deref(),
            )?;
            return Ok((entity, variation, false));
        }

        let fields = self.entity_fields(&candidate.canonical_name, options);
        match self.store.create_with_variation(
            fields,
            raw,
            candidate.confidence,
            candidate.source,
            options.user_id.as_deref(),
        ) {
            Ok((entity, variation)) => Ok((entity, variation, true)),
            Err(NetachError::DuplicateName(name)) => {
                // Lost the creation race; the winner's row exists now.
                let entity = self
                    .store
                    .find_by_exact_name(&candidate.canonical_name)?
                    .ok_or(NetachError::DuplicateName(name))?;
                let variation = self.store.upsert_variation(
                    raw,
                    entity.id,
                    candidate.confidence,
                    candidate.source,
                    options.user_id.as_deref(),
                )?;
                Ok((entity, variation, false))
            }
            Err(e) => Err(e),
        }
    }

    /// Mint a new entity named from hints/detection, with its first
    /// variation at confidence 1.0, as one atomic unit. A concurrent mint
    /// of the same name folds into the winner's entity.
    fn create_entity(
        &self,
        raw: &str,
        cleaned: &str,
        options: &ResolveOptions,
        alternatives: Vec<MatchCandidate>,
    ) -> Result<Resolution, NetachError> {
        let category = options.category_hint.or_else(|| detect_category(cleaned));
        let cut_type = options.cut_type_hint.or_else(|| detect_cut_type(cleaned));
        let name = match (cut_type, category) {
            (Some(cut), Some(cat)) => format!("{} {}", cut.as_str(), cat.as_str()),
            _ => cleaned.to_string(),
        };
        let fields = NewCanonicalEntity {
            name: name.clone(),
            category,
            cut_type,
            subcategory: None,
            is_premium: is_premium(cleaned),
            typical_weight_range: None,
            cooking_methods: Vec::new(),
        };
        let source = options.source.unwrap_or(if options.user_id.is_some() {
            VariationSource::Manual
        } else {
            VariationSource::Original
        });

        match self.store.create_with_variation(
            fields,
            raw,
            1.0,
            source,
            options.user_id.as_deref(),
        ) {
            Ok((entity, variation)) => {
                tracing::debug!(canonical = %entity.name, "minted new canonical entity");
                Ok(Resolution {
                    entity,
                    variation,
                    is_new_entity: true,
                    confidence: 1.0,
                    source,
                    alternatives,
                })
            }
            Err(NetachError::DuplicateName(_)) => {
                let entity = match self.store.find_by_exact_name(&name)? {
                    Some(entity) => entity,
                    None => return Err(NetachError::DuplicateName(name)),
                };
                tracing::debug!(canonical = %entity.name, "creation raced, folding into existing entity");
                let variation = self.store.upsert_variation(
                    raw,
                    entity.id,
                    1.0,
                    source,
                    options.user_id.as_deref(),
                )?;
                Ok(Resolution {
                    entity,
                    variation,
                    is_new_entity: false,
                    confidence: 1.0,
                    source,
                    alternatives,
                })
            }
            Err(e) => Err(e),
        }
    }

    fn entity_fields(&self, name: &str, options: &ResolveOptions) -> NewCanonicalEntity {
        let basis = canonicalize(name);
        NewCanonicalEntity {
            name: name.to_string(),
            category: options.category_hint.or_else(|| detect_category(&basis)),
            cut_type: options.cut_type_hint.or_else(|| detect_cut_type(&basis)),
            subcategory: None,
            is_premium: is_premium(&basis),
            typical_weight_range: None,
            cooking_methods: Vec::new(),
        }
    }
}

// ── Candidate construction and ordering ───────────────────────────

fn mapping_candidate(
    canonical: &str,
    confidence: f64,
    source: VariationSource,
    matched_text: &str,
) -> MatchCandidate {
    MatchCandidate {
        canonical_name: canonical.to_string(),
        confidence,
        source,
        canonical_entity_id: None,
        category: detect_category(&canonicalize(canonical)),
        matched_text: matched_text.to_string(),
    }
}

fn database_candidate(entity: CanonicalEntity, confidence: f64) -> MatchCandidate {
    let mut candidate = database_candidate_ref(&entity, confidence);
    candidate.category = entity
        .category
        .or_else(|| detect_category(&canonicalize(&entity.name)));
    candidate
}

fn database_candidate_ref(entity: &CanonicalEntity, confidence: f64) -> MatchCandidate {
    MatchCandidate {
        canonical_name: entity.name.clone(),
        confidence,
        source: VariationSource::Database,
        canonical_entity_id: Some(entity.id),
        category: entity.category,
        matched_text: entity.name.clone(),
    }
}

/// Total order over candidates: confidence descending, then source
/// priority (mapping > mapping_fuzzy > database), then shorter matched
/// text, then name. Fully deterministic.
fn candidate_order(a: &MatchCandidate, b: &MatchCandidate) -> Ordering {
    b.confidence
        .partial_cmp(&a.confidence)
        .unwrap_or(Ordering::Equal)
        .then_with(|| source_rank(a.source).cmp(&source_rank(b.source)))
        .then_with(|| {
            a.matched_text
                .chars()
                .count()
                .cmp(&b.matched_text.chars().count())
        })
        .then_with(|| a.canonical_name.cmp(&b.canonical_name))
}

fn source_rank(source: VariationSource) -> u8 {
    match source {
        VariationSource::Mapping => 0,
        VariationSource::MappingFuzzy => 1,
        VariationSource::Database => 2,
        _ => 3,
    }
}

/// Keep the best candidate per canonical name.
fn dedupe_best(candidates: &mut Vec<MatchCandidate>) {
    let mut best: HashMap<String, MatchCandidate> = HashMap::new();
    for candidate in candidates.drain(..) {
        let key = candidate.canonical_name.to_lowercase();
        let replace = match best.get(&key) {
            Some(current) => candidate_order(&candidate, current) == Ordering::Less,
            None => true,
        };
        if replace {
            best.insert(key, candidate);
        }
    }
    candidates.extend(best.into_values());
}

fn runner_ups(candidates: &[MatchCandidate], skip: usize, take: usize) -> Vec<MatchCandidate> {
    candidates.iter().skip(skip).take(take).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteStore;
    use std::collections::BTreeMap;

    fn mapping_fixture() -> Arc<MappingTable> {
        let mut forward = BTreeMap::new();
        forward.insert(
            "אנטריקוט".to_string(),
            vec![
                "אנטרקוט".to_string(),
                "אנטריקוט בלק אנגוס".to_string(),
                "אנטרקוט בלק אנגוס".to_string(),
                "סטייק אנטריקוט".to_string(),
            ],
        );
        forward.insert("פילה בקר".to_string(), vec!["פילה עגל".to_string()]);
        forward.insert("פילה סלמון".to_string(), vec!["סלמון פילה".to_string()]);
        forward.insert("חזה עוף".to_string(), vec!["חזה עוף טרי".to_string()]);
        Arc::new(MappingTable::from_entries(forward))
    }

    fn resolver() -> Resolver<SqliteStore> {
        Resolver::new(
            mapping_fixture(),
            SqliteStore::open_memory().unwrap(),
            MatchingConfig::default(),
        )
    }

    // ── Input validation ──────────────────────────────────────────

    #[test]
    fn empty_input_rejected() {
        let r = resolver();
        assert!(matches!(
            r.normalize("", &ResolveOptions::default()),
            Err(NetachError::InvalidInput(_))
        ));
        assert!(matches!(
            r.normalize("   ", &ResolveOptions::default()),
            Err(NetachError::InvalidInput(_))
        ));
        assert!(matches!(
            r.analyze(""),
            Err(NetachError::InvalidInput(_))
        ));
    }

    // ── Mapping path ──────────────────────────────────────────────

    #[test]
    fn exact_mapping_hit_resolves_at_full_confidence() {
        let r = resolver();
        let res = r
            .normalize("אנטרקוט בלק אנגוס", &ResolveOptions::default())
            .unwrap();
        assert_eq!(res.confidence, 1.0);
        assert_eq!(res.source, VariationSource::Mapping);
        assert_eq!(res.entity.name, "אנטריקוט");
        assert_eq!(res.variation.original_name, "אנטרקוט בלק אנגוס");
        assert_eq!(res.variation.confidence, 1.0);
    }

    #[test]
    fn mapping_hit_reuses_entity_on_second_call() {
        let r = resolver();
        let first = r
            .normalize("אנטרקוט בלק אנגוס", &ResolveOptions::default())
            .unwrap();
        assert!(first.is_new_entity);

        let second = r
            .normalize("סטייק אנטריקוט", &ResolveOptions::default())
            .unwrap();
        assert!(!second.is_new_entity);
        assert_eq!(second.entity.id, first.entity.id);
    }

    #[test]
    fn upsert_is_idempotent_across_calls() {
        let r = resolver();
        let first = r
            .normalize("אנטרקוט בלק אנגוס", &ResolveOptions::default())
            .unwrap();
        let second = r
            .normalize("אנטרקוט בלק אנגוס", &ResolveOptions::default())
            .unwrap();

        assert_eq!(first.entity.id, second.entity.id);
        assert_eq!(first.variation.id, second.variation.id);
        assert!(second.variation.updated_at >= first.variation.updated_at);
        let variations = r.store().variations_for_entity(first.entity.id).unwrap();
        assert_eq!(variations.len(), 1);
    }

    // ── Creation path ─────────────────────────────────────────────

    #[test]
    fn gibberish_mints_entity_from_cleaned_text() {
        let r = resolver();
        let res = r
            .normalize("XYZ לא קיים כלל", &ResolveOptions::default())
            .unwrap();
        assert!(res.is_new_entity);
        assert_eq!(res.entity.name, "xyz לא קיים כלל");
        assert_eq!(res.confidence, 1.0);
        assert_eq!(res.source, VariationSource::Original);
        assert_eq!(res.variation.confidence, 1.0);
    }

    #[test]
    fn detected_attributes_shape_new_entity() {
        let r = resolver();
        let res = r
            .normalize("צלעות בקר טרי", &ResolveOptions::default())
            .unwrap();
        assert!(res.is_new_entity);
        // Both cut and category detected → synthesized name.
        assert_eq!(res.entity.name, "צלעות בקר");
        assert_eq!(res.entity.category, Some(Category::Beef));
        assert_eq!(res.entity.cut_type, Some(CutType::Ribs));
        assert!(!res.entity.is_premium);
    }

    #[test]
    fn force_create_overrides_confident_match() {
        let r = resolver();
        let res = r
            .normalize(
                "אנטרקוט בלק אנגוס",
                &ResolveOptions {
                    force_create: true,
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(res.is_new_entity);
        // No cut keyword in the cleaned text → name stays the cleaned text.
        assert_eq!(res.entity.name, "אנטריקוט בלק אנגוס");
        assert_eq!(res.entity.category, Some(Category::Beef));
        assert!(res.entity.is_premium);
    }

    #[test]
    fn hints_override_detection() {
        let r = resolver();
        let res = r
            .normalize(
                "XYZ לא קיים כלל",
                &ResolveOptions {
                    category_hint: Some(Category::Lamb),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(res.entity.category, Some(Category::Lamb));
    }

    #[test]
    fn user_provenance_marks_manual_source() {
        let r = resolver();
        let res = r
            .normalize(
                "XYZ לא קיים כלל",
                &ResolveOptions {
                    user_id: Some("curator-7".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(res.source, VariationSource::Manual);
        assert_eq!(res.variation.created_by.as_deref(), Some("curator-7"));
    }

    #[test]
    fn mid_band_confidence_mints_new_entity() {
        let r = resolver();
        r.store()
            .create_canonical(NewCanonicalEntity {
                name: "צלי כתף בקר".into(),
                category: Some(Category::Beef),
                ..Default::default()
            })
            .unwrap();

        let res = r.normalize("צלי כתף", &ResolveOptions::default()).unwrap();
        // The store candidate sits in the suggestion band, below accept.
        assert!(res.is_new_entity);
        assert_eq!(res.entity.name, "צלי כתף");
        assert!(res
            .alternatives
            .iter()
            .any(|c| c.canonical_name == "צלי כתף בקר"));
    }

    #[test]
    fn colliding_synthesized_name_folds_into_existing() {
        let r = resolver();
        let first = r
            .normalize("חזה עוף גדול", &ResolveOptions::default())
            .unwrap();
        // "חזה עוף גדול" synthesizes to "חזה עוף", which the mapping
        // dictionary also names; both land on one entity.
        let second = r.normalize("חזה עוף טרי", &ResolveOptions::default()).unwrap();
        assert_eq!(first.entity.name, "חזה עוף");
        assert_eq!(second.entity.id, first.entity.id);
    }

    // ── Concurrency ───────────────────────────────────────────────

    #[test]
    fn concurrent_mints_yield_one_entity() {
        let r = Arc::new(resolver());
        let mut handles = Vec::new();
        for _ in 0..2 {
            let r = Arc::clone(&r);
            handles.push(std::thread::spawn(move || {
                r.normalize("נתח חדש לגמרי", &ResolveOptions::default())
                    .unwrap()
            }));
        }
        let results: Vec<Resolution> = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .collect();

        assert_eq!(results[0].entity.id, results[1].entity.id);
        let matching = r
            .store()
            .all_entities()
            .unwrap()
            .into_iter()
            .filter(|e| e.name == "נתח חדש לגמרי")
            .count();
        assert_eq!(matching, 1);
    }

    // ── Analysis ──────────────────────────────────────────────────

    #[test]
    fn analyze_detects_without_persisting() {
        let r = resolver();
        let report = r.analyze("צלעות בקר טרי").unwrap();
        assert_eq!(report.cleaned_name, "צלעות בקר");
        assert_eq!(report.category, Some(Category::Beef));
        assert_eq!(report.cut_type, Some(CutType::Ribs));
        assert!(!report.is_premium);
        assert!(r.store().all_entities().unwrap().is_empty());
        assert!(r.stats().unwrap().is_empty());
    }

    #[test]
    fn analyze_reports_suggestion_band_candidates() {
        let r = resolver();
        r.store()
            .create_canonical(NewCanonicalEntity {
                name: "צלי כתף בקר".into(),
                category: Some(Category::Beef),
                ..Default::default()
            })
            .unwrap();

        let report = r.analyze("צלי כתף").unwrap();
        assert!(!report.candidates.is_empty());
        assert!(report.confidence > 0.6 && report.confidence <= 0.8);
        // Still nothing written.
        assert_eq!(r.store().all_entities().unwrap().len(), 1);
    }

    #[test]
    fn analyze_of_pure_noise_is_empty_report() {
        let r = resolver();
        let report = r.analyze("טרי במבצע").unwrap();
        assert_eq!(report.cleaned_name, "");
        assert_eq!(report.confidence, 0.0);
        assert!(report.candidates.is_empty());
    }

    // ── find_best_matches ─────────────────────────────────────────

    #[test]
    fn best_matches_span_categories() {
        let r = resolver();
        let matches = r
            .find_best_matches(
                "פילה",
                &MatchQuery {
                    min_confidence: Some(0.3),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(!matches.is_empty());
        for pair in matches.windows(2) {
            assert!(pair[0].confidence >= pair[1].confidence);
        }
        assert!(matches.iter().any(|c| c.category == Some(Category::Beef)));
        assert!(matches.iter().any(|c| c.category == Some(Category::Fish)));
    }

    #[test]
    fn best_matches_category_filter() {
        let r = resolver();
        let matches = r
            .find_best_matches(
                "פילה",
                &MatchQuery {
                    min_confidence: Some(0.3),
                    category: Some(Category::Fish),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(!matches.is_empty());
        assert!(matches.iter().all(|c| c.category == Some(Category::Fish)));
    }

    #[test]
    fn best_matches_respects_limit() {
        let r = resolver();
        let matches = r
            .find_best_matches(
                "פילה",
                &MatchQuery {
                    min_confidence: Some(0.1),
                    limit: Some(1),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(matches.len(), 1);
    }

    // ── Ordering ──────────────────────────────────────────────────

    #[test]
    fn tie_break_prefers_mapping_sources() {
        let mapping = mapping_candidate("א", 0.9, VariationSource::Mapping, "א");
        let fuzzy = mapping_candidate("ב", 0.9, VariationSource::MappingFuzzy, "ב");
        let db = MatchCandidate {
            canonical_name: "ג".into(),
            confidence: 0.9,
            source: VariationSource::Database,
            canonical_entity_id: Some(1),
            category: None,
            matched_text: "ג".into(),
        };
        let mut candidates = vec![db.clone(), fuzzy.clone(), mapping.clone()];
        candidates.sort_by(candidate_order);
        assert_eq!(candidates[0].source, VariationSource::Mapping);
        assert_eq!(candidates[1].source, VariationSource::MappingFuzzy);
        assert_eq!(candidates[2].source, VariationSource::Database);
    }

    #[test]
    fn tie_break_prefers_shorter_matched_text() {
        let long = mapping_candidate("א", 0.9, VariationSource::MappingFuzzy, "אבגדהו");
        let short = mapping_candidate("ב", 0.9, VariationSource::MappingFuzzy, "אב");
        let mut candidates = vec![long, short];
        candidates.sort_by(candidate_order);
        assert_eq!(candidates[0].matched_text, "אב");
    }

    // ── Stats ─────────────────────────────────────────────────────

    #[test]
    fn stats_counts_sum_to_seeded_variations() {
        let r = resolver();
        r.normalize("צלעות בקר טרי", &ResolveOptions::default())
            .unwrap();
        r.normalize("חזה עוף טרי", &ResolveOptions::default())
            .unwrap();
        r.normalize("פילה סלמון", &ResolveOptions::default())
            .unwrap();

        let stats = r.stats().unwrap();
        let total: u64 = stats.iter().map(|s| s.variation_count).sum();
        assert_eq!(total, 3);
        assert!(stats.len() >= 2);
    }
}
