use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use netach_parse::{canonicalize, Category, CutType};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::NetachError;
use crate::models::{
    CanonicalEntity, CategoryStats, NewCanonicalEntity, VariationRecord, VariationSource,
    WeightRange,
};
use crate::similarity::similarity;
use crate::store::NormalizationStore;

const SCHEMA_V1: &str = include_str!("../../../migrations/001_initial.sql");

/// SQLite-backed normalization store.
///
/// The connection sits behind a mutex so one store serves concurrent
/// resolver calls; SQLite's unique indexes provide the transactional
/// arbitration the resolution contract needs.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at the given path and run migrations.
    pub fn open(path: &Path) -> Result<Self, NetachError> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for tests and previews).
    pub fn open_memory() -> Result<Self, NetachError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // A poisoned lock only means another thread panicked mid-call;
        // the connection itself is still usable.
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// All canonical entities, ordered by name.
    pub fn all_entities(&self) -> Result<Vec<CanonicalEntity>, NetachError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, name, category, cut_type, subcategory, is_premium,
                    weight_min_g, weight_max_g, cooking_methods, created_at, updated_at
             FROM canonical_entity ORDER BY name",
        )?;
        let rows = stmt
            .query_map([], |row| Ok(row_to_entity(row)))?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }

    /// All variations linked to one entity.
    pub fn variations_for_entity(
        &self,
        canonical_id: i64,
    ) -> Result<Vec<VariationRecord>, NetachError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, original_name, canonical_entity_id, confidence, source,
                    verified, created_by, created_at, updated_at
             FROM variation WHERE canonical_entity_id = ?1 ORDER BY id",
        )?;
        let rows = stmt
            .query_map(params![canonical_id], |row| Ok(row_to_variation(row)))?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }

    /// Mark a variation as human-reviewed.
    pub fn verify_variation(&self, variation_id: i64) -> Result<(), NetachError> {
        self.conn().execute(
            "UPDATE variation SET verified = 1, updated_at = ?1 WHERE id = ?2",
            params![Utc::now().to_rfc3339(), variation_id],
        )?;
        Ok(())
    }

    fn all_variation_names(&self) -> Result<Vec<(i64, String)>, NetachError> {
        let conn = self.conn();
        let mut stmt =
            conn.prepare("SELECT canonical_entity_id, original_name FROM variation")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }
}

impl NormalizationStore for SqliteStore {
    fn find_by_exact_name(&self, name: &str) -> Result<Option<CanonicalEntity>, NetachError> {
        // The name column is COLLATE NOCASE, so = is case-insensitive.
        self.conn()
            .query_row(
                "SELECT id, name, category, cut_type, subcategory, is_premium,
                        weight_min_g, weight_max_g, cooking_methods, created_at, updated_at
                 FROM canonical_entity WHERE name = ?1",
                params![name.trim()],
                |row| Ok(row_to_entity(row)),
            )
            .optional()
            .map_err(Into::into)
    }

    fn fuzzy_search(
        &self,
        text: &str,
        min_confidence: f64,
        limit: usize,
    ) -> Result<Vec<(CanonicalEntity, f64)>, NetachError> {
        if text.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let entities = self.all_entities()?;
        let variation_names = self.all_variation_names()?;

        // Best score per entity over its canonical name and every linked
        // variation, all canonicalized before scoring.
        let mut best: HashMap<i64, f64> = HashMap::new();
        for entity in &entities {
            let score = similarity(text, &canonicalize(&entity.name));
            best.insert(entity.id, score);
        }
        for (entity_id, original_name) in &variation_names {
            let score = similarity(text, &canonicalize(original_name));
            let slot = best.entry(*entity_id).or_insert(0.0);
            if score > *slot {
                *slot = score;
            }
        }

        let mut ranked: Vec<(CanonicalEntity, f64)> = entities
            .into_iter()
            .filter_map(|e| {
                let score = best.get(&e.id).copied().unwrap_or(0.0);
                (score >= min_confidence).then_some((e, score))
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.id.cmp(&b.0.id))
        });
        ranked.truncate(limit);
        Ok(ranked)
    }

    fn create_canonical(
        &self,
        fields: NewCanonicalEntity,
    ) -> Result<CanonicalEntity, NetachError> {
        let conn = self.conn();
        insert_entity(&conn, &fields)
    }

    fn create_with_variation(
        &self,
        fields: NewCanonicalEntity,
        original_name: &str,
        confidence: f64,
        source: VariationSource,
        created_by: Option<&str>,
    ) -> Result<(CanonicalEntity, VariationRecord), NetachError> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let entity = insert_entity(&tx, &fields)?;
        let variation = write_variation(&tx, original_name, entity.id, confidence, source, created_by)?;
        tx.commit()?;
        Ok((entity, variation))
    }

    fn upsert_variation(
        &self,
        original_name: &str,
        canonical_id: i64,
        confidence: f64,
        source: VariationSource,
        created_by: Option<&str>,
    ) -> Result<VariationRecord, NetachError> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let record = write_variation(&tx, original_name, canonical_id, confidence, source, created_by)?;
        tx.commit()?;
        Ok(record)
    }

    fn get_stats(&self) -> Result<Vec<CategoryStats>, NetachError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT e.category,
                    COUNT(DISTINCT e.id),
                    COUNT(v.id),
                    AVG(v.confidence),
                    COALESCE(SUM(v.verified), 0)
             FROM canonical_entity e
             LEFT JOIN variation v ON v.canonical_entity_id = e.id
             GROUP BY e.category
             ORDER BY e.category",
        )?;
        let rows = stmt
            .query_map([], |row| {
                let category: Option<String> = row.get(0)?;
                Ok(CategoryStats {
                    category: category.as_deref().and_then(Category::from_db_str),
                    canonical_count: row.get::<_, i64>(1)? as u64,
                    variation_count: row.get::<_, i64>(2)? as u64,
                    avg_confidence: row.get::<_, Option<f64>>(3)?.unwrap_or(0.0),
                    verified_count: row.get::<_, i64>(4)? as u64,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }
}

// ── Migrations ──────────────────────────────────────────────────

/// Run schema migrations using `PRAGMA user_version` for version tracking.
fn run_migrations(conn: &Connection) -> Result<(), NetachError> {
    let version: i32 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .unwrap_or(0);

    if version < 1 {
        conn.execute_batch(SCHEMA_V1)?;
        conn.pragma_update(None, "user_version", 1)?;
    }
    Ok(())
}

// ── Write helpers ───────────────────────────────────────────────

/// Insert a canonical entity, mapping the name-uniqueness violation to
/// [`NetachError::DuplicateName`].
fn insert_entity(
    conn: &Connection,
    fields: &NewCanonicalEntity,
) -> Result<CanonicalEntity, NetachError> {
    let now = Utc::now();
    let now_str = now.to_rfc3339();
    let cooking_methods = serde_json::to_string(&fields.cooking_methods).unwrap_or_default();
    let result = conn.execute(
        "INSERT INTO canonical_entity
             (name, category, cut_type, subcategory, is_premium,
              weight_min_g, weight_max_g, cooking_methods, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            fields.name.trim(),
            fields.category.map(|c| c.as_str()),
            fields.cut_type.map(|c| c.as_str()),
            fields.subcategory,
            fields.is_premium as i32,
            fields.typical_weight_range.map(|w| w.min_g),
            fields.typical_weight_range.map(|w| w.max_g),
            cooking_methods,
            now_str,
            now_str,
        ],
    );
    match result {
        Ok(_) => Ok(CanonicalEntity {
            id: conn.last_insert_rowid(),
            name: fields.name.trim().to_string(),
            category: fields.category,
            cut_type: fields.cut_type,
            subcategory: fields.subcategory.clone(),
            is_premium: fields.is_premium,
            typical_weight_range: fields.typical_weight_range,
            cooking_methods: fields.cooking_methods.clone(),
            created_at: now,
            updated_at: now,
        }),
        Err(e) if is_unique_violation(&e, "canonical_entity.name") => {
            Err(NetachError::DuplicateName(fields.name.trim().to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

/// Insert or refresh the variation row for `(original_name, canonical_id)`.
///
/// Explicit two-step rather than `ON CONFLICT DO UPDATE` so the contract
/// stays portable to engines without native upsert; the caller's
/// transaction makes the pair atomic.
fn write_variation(
    conn: &Connection,
    original_name: &str,
    canonical_id: i64,
    confidence: f64,
    source: VariationSource,
    created_by: Option<&str>,
) -> Result<VariationRecord, NetachError> {
    let now = Utc::now().to_rfc3339();
    let existing: Option<i64> = conn
        .query_row(
            "SELECT id FROM variation
             WHERE original_name = ?1 AND canonical_entity_id = ?2",
            params![original_name, canonical_id],
            |row| row.get(0),
        )
        .optional()?;

    let id = match existing {
        Some(id) => {
            conn.execute(
                "UPDATE variation
                 SET confidence = ?1, source = ?2,
                     created_by = COALESCE(?3, created_by), updated_at = ?4
                 WHERE id = ?5",
                params![confidence, source.as_db_str(), created_by, now, id],
            )?;
            id
        }
        None => {
            conn.execute(
                "INSERT INTO variation
                     (original_name, canonical_entity_id, confidence, source,
                      verified, created_by, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, 0, ?5, ?6, ?6)",
                params![
                    original_name,
                    canonical_id,
                    confidence,
                    source.as_db_str(),
                    created_by,
                    now,
                ],
            )?;
            conn.last_insert_rowid()
        }
    };

    conn.query_row(
        "SELECT id, original_name, canonical_entity_id, confidence, source,
                verified, created_by, created_at, updated_at
         FROM variation WHERE id = ?1",
        params![id],
        |row| Ok(row_to_variation(row)),
    )
    .map_err(Into::into)
}

fn is_unique_violation(err: &rusqlite::Error, needle: &str) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, Some(message)) => {
            e.code == rusqlite::ErrorCode::ConstraintViolation && message.contains(needle)
        }
        _ => false,
    }
}

// ── Row mapping helpers ─────────────────────────────────────────

/// Parse a datetime string written via `.to_rfc3339()`.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_default()
}

fn row_to_entity(row: &rusqlite::Row<'_>) -> CanonicalEntity {
    let category: Option<String> = row.get(2).unwrap_or(None);
    let cut_type: Option<String> = row.get(3).unwrap_or(None);
    let weight_min: Option<u32> = row.get(6).unwrap_or(None);
    let weight_max: Option<u32> = row.get(7).unwrap_or(None);
    let cooking_methods: String = row.get(8).unwrap_or_default();
    let created_at: String = row.get(9).unwrap_or_default();
    let updated_at: String = row.get(10).unwrap_or_default();

    CanonicalEntity {
        id: row.get(0).unwrap_or(0),
        name: row.get(1).unwrap_or_default(),
        category: category.as_deref().and_then(Category::from_db_str),
        cut_type: cut_type.as_deref().and_then(CutType::from_db_str),
        subcategory: row.get(4).unwrap_or(None),
        is_premium: row.get::<_, i32>(5).unwrap_or(0) != 0,
        typical_weight_range: weight_min
            .zip(weight_max)
            .map(|(min_g, max_g)| WeightRange { min_g, max_g }),
        cooking_methods: serde_json::from_str(&cooking_methods).unwrap_or_default(),
        created_at: parse_datetime(&created_at),
        updated_at: parse_datetime(&updated_at),
    }
}

fn row_to_variation(row: &rusqlite::Row<'_>) -> VariationRecord {
    let source: String = row.get(4).unwrap_or_default();
    let created_at: String = row.get(7).unwrap_or_default();
    let updated_at: String = row.get(8).unwrap_or_default();

    VariationRecord {
        id: row.get(0).unwrap_or(0),
        original_name: row.get(1).unwrap_or_default(),
        canonical_entity_id: row.get(2).unwrap_or(0),
        confidence: row.get(3).unwrap_or(0.0),
        source: VariationSource::from_db_str(&source).unwrap_or(VariationSource::Auto),
        verified: row.get::<_, i32>(5).unwrap_or(0) != 0,
        created_by: row.get(6).unwrap_or(None),
        created_at: parse_datetime(&created_at),
        updated_at: parse_datetime(&updated_at),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(name: &str, category: Option<Category>) -> NewCanonicalEntity {
        NewCanonicalEntity {
            name: name.to_string(),
            category,
            ..Default::default()
        }
    }

    #[test]
    fn create_and_find_by_name() {
        let store = SqliteStore::open_memory().unwrap();
        let created = store
            .create_canonical(NewCanonicalEntity {
                name: "אנטריקוט".into(),
                category: Some(Category::Beef),
                cut_type: Some(CutType::Steak),
                is_premium: true,
                typical_weight_range: Some(WeightRange {
                    min_g: 200,
                    max_g: 400,
                }),
                cooking_methods: vec!["גריל".into(), "מחבת".into()],
                ..Default::default()
            })
            .unwrap();
        assert!(created.id > 0);

        let found = store.find_by_exact_name("אנטריקוט").unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert_eq!(found.category, Some(Category::Beef));
        assert_eq!(found.cut_type, Some(CutType::Steak));
        assert!(found.is_premium);
        assert_eq!(
            found.typical_weight_range,
            Some(WeightRange {
                min_g: 200,
                max_g: 400
            })
        );
        assert_eq!(found.cooking_methods, vec!["גריל", "מחבת"]);
    }

    #[test]
    fn find_is_case_insensitive() {
        let store = SqliteStore::open_memory().unwrap();
        store
            .create_canonical(entity("Beef Fillet", Some(Category::Beef)))
            .unwrap();
        assert!(store.find_by_exact_name("beef fillet").unwrap().is_some());
        assert!(store.find_by_exact_name("BEEF FILLET").unwrap().is_some());
    }

    #[test]
    fn duplicate_name_rejected() {
        let store = SqliteStore::open_memory().unwrap();
        store
            .create_canonical(entity("Beef Fillet", Some(Category::Beef)))
            .unwrap();
        let err = store
            .create_canonical(entity("beef fillet", None))
            .unwrap_err();
        assert!(matches!(err, NetachError::DuplicateName(_)));
    }

    #[test]
    fn upsert_variation_is_idempotent() {
        let store = SqliteStore::open_memory().unwrap();
        let e = store.create_canonical(entity("אנטריקוט", None)).unwrap();

        let first = store
            .upsert_variation("אנטרקוט טרי", e.id, 0.9, VariationSource::Database, None)
            .unwrap();
        let second = store
            .upsert_variation(
                "אנטרקוט טרי",
                e.id,
                0.95,
                VariationSource::Database,
                Some("admin"),
            )
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.confidence, 0.95);
        assert_eq!(second.created_by.as_deref(), Some("admin"));
        assert!(second.updated_at >= first.updated_at);
        assert_eq!(store.variations_for_entity(e.id).unwrap().len(), 1);
    }

    #[test]
    fn create_with_variation_is_atomic() {
        let store = SqliteStore::open_memory().unwrap();
        let (e, v) = store
            .create_with_variation(
                entity("פילה בקר", Some(Category::Beef)),
                "פילה בקר טרי",
                1.0,
                VariationSource::Original,
                None,
            )
            .unwrap();
        assert_eq!(v.canonical_entity_id, e.id);
        assert_eq!(v.confidence, 1.0);

        // A colliding creation leaves no orphan variation behind.
        let before: usize = store.variations_for_entity(e.id).unwrap().len();
        let err = store
            .create_with_variation(
                entity("פילה בקר", None),
                "פילה בקר אחר",
                1.0,
                VariationSource::Original,
                None,
            )
            .unwrap_err();
        assert!(matches!(err, NetachError::DuplicateName(_)));
        assert_eq!(store.variations_for_entity(e.id).unwrap().len(), before);
    }

    #[test]
    fn fuzzy_search_ranks_and_filters() {
        let store = SqliteStore::open_memory().unwrap();
        let rib = store.create_canonical(entity("אנטריקוט", None)).unwrap();
        store.create_canonical(entity("כנפיים עוף", None)).unwrap();
        store
            .upsert_variation(
                "אנטרקוט בלק אנגוס",
                rib.id,
                1.0,
                VariationSource::Original,
                None,
            )
            .unwrap();

        let hits = store.fuzzy_search("אנטרקוט", 0.4, 10).unwrap();
        assert!(!hits.is_empty());
        assert_eq!(hits[0].0.id, rib.id);
        // Descending order.
        for pair in hits.windows(2) {
            assert!(pair[0].1 >= pair[1].1);
        }
        // The unrelated entity does not pass the floor.
        assert!(hits.iter().all(|(e, _)| e.id == rib.id));
    }

    #[test]
    fn fuzzy_search_respects_limit() {
        let store = SqliteStore::open_memory().unwrap();
        for n in ["פילה בקר", "פילה סלמון", "פילה עוף"] {
            store.create_canonical(entity(n, None)).unwrap();
        }
        let hits = store.fuzzy_search("פילה", 0.1, 2).unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn stats_aggregate_per_category() {
        let store = SqliteStore::open_memory().unwrap();
        let beef = store
            .create_canonical(entity("אנטריקוט", Some(Category::Beef)))
            .unwrap();
        let chicken = store
            .create_canonical(entity("חזה עוף", Some(Category::Chicken)))
            .unwrap();

        store
            .upsert_variation("אנטרקוט", beef.id, 0.9, VariationSource::Database, None)
            .unwrap();
        let v = store
            .upsert_variation("סטייק אנטריקוט", beef.id, 0.7, VariationSource::Auto, None)
            .unwrap();
        store
            .upsert_variation("חזה עוף טרי", chicken.id, 1.0, VariationSource::Original, None)
            .unwrap();
        store.verify_variation(v.id).unwrap();

        let stats = store.get_stats().unwrap();
        let total: u64 = stats.iter().map(|s| s.variation_count).sum();
        assert_eq!(total, 3);

        let beef_stats = stats
            .iter()
            .find(|s| s.category == Some(Category::Beef))
            .unwrap();
        assert_eq!(beef_stats.canonical_count, 1);
        assert_eq!(beef_stats.variation_count, 2);
        assert_eq!(beef_stats.verified_count, 1);
        assert!((beef_stats.avg_confidence - 0.8).abs() < 1e-9);
    }

    #[test]
    fn open_on_disk_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("netach.db");
        {
            let store = SqliteStore::open(&path).unwrap();
            store.create_canonical(entity("סינטה", None)).unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        assert!(store.find_by_exact_name("סינטה").unwrap().is_some());
    }
}
