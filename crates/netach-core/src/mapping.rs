//! Curated canonical→variations dictionary.
//!
//! Loaded once at process start from a JSON file and immutable for the
//! process lifetime: build the table, wrap it in an `Arc`, hand it to
//! every component that needs it. The curated dictionary always takes
//! priority over statistical fuzzy matching, so exact lookups here are
//! the first stop of every resolution.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use crate::error::NetachError;

/// Immutable mapping dictionary with a derived reverse index.
#[derive(Debug, Default)]
pub struct MappingTable {
    /// canonical name → known variation strings, in deterministic order.
    forward: BTreeMap<String, Vec<String>>,
    /// lowercased/trimmed variation → canonical name, O(1) exact lookup.
    reverse: HashMap<String, String>,
    /// (variation, canonical) pairs in insertion order, for the fuzzy scan.
    entries: Vec<(String, String)>,
}

impl MappingTable {
    /// The empty table: every lookup misses, the fuzzy scan sees nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load and validate the dictionary file.
    ///
    /// The value must be a non-empty JSON object of string → array of
    /// strings. A malformed shape yields the empty table (with warnings),
    /// not an error; only unreadable/unparseable files error.
    pub fn load(path: &Path) -> Result<Self, NetachError> {
        let raw = std::fs::read_to_string(path)?;
        let value: serde_json::Value =
            serde_json::from_str(&raw).map_err(|e| NetachError::MappingLoad(e.to_string()))?;
        Ok(Self::from_json(&value))
    }

    /// Load, degrading to the empty table on any failure.
    ///
    /// Mapping-load failure is non-fatal: the engine still resolves via
    /// the store-backed fuzzy path, just without curated hits.
    pub fn load_or_empty(path: &Path) -> Self {
        match Self::load(path) {
            Ok(table) => table,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "mapping dictionary unavailable, continuing with empty table");
                Self::empty()
            }
        }
    }

    /// Build from a parsed JSON value, validating the expected shape.
    fn from_json(value: &serde_json::Value) -> Self {
        let Some(object) = value.as_object() else {
            tracing::warn!("mapping dictionary is not a JSON object, using empty table");
            return Self::empty();
        };
        if object.is_empty() {
            tracing::warn!("mapping dictionary is empty, using empty table");
            return Self::empty();
        }

        let mut forward: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (canonical, variations) in object {
            let Some(items) = variations.as_array() else {
                tracing::warn!(canonical = %canonical, "mapping value is not an array, using empty table");
                return Self::empty();
            };
            let mut parsed = Vec::with_capacity(items.len());
            for item in items {
                let Some(s) = item.as_str() else {
                    tracing::warn!(canonical = %canonical, "mapping variation is not a string, using empty table");
                    return Self::empty();
                };
                parsed.push(s.to_string());
            }
            forward.insert(canonical.clone(), parsed);
        }
        Self::from_entries(forward)
    }

    /// Build the reverse index from a validated forward map.
    ///
    /// Every canonical name also maps to itself. Collisions keep the
    /// first-inserted mapping; `BTreeMap` iteration makes "first"
    /// deterministic across runs.
    pub fn from_entries(forward: BTreeMap<String, Vec<String>>) -> Self {
        let mut reverse: HashMap<String, String> = HashMap::new();
        let mut entries: Vec<(String, String)> = Vec::new();

        for (canonical, variations) in &forward {
            let self_key = canonical.trim().to_lowercase();
            Self::index(&mut reverse, &mut entries, self_key, canonical);
            for variation in variations {
                let key = variation.trim().to_lowercase();
                if key.is_empty() {
                    continue;
                }
                Self::index(&mut reverse, &mut entries, key, canonical);
            }
        }

        tracing::debug!(
            canonical_names = forward.len(),
            variations = entries.len(),
            "mapping table built"
        );
        Self {
            forward,
            reverse,
            entries,
        }
    }

    fn index(
        reverse: &mut HashMap<String, String>,
        entries: &mut Vec<(String, String)>,
        key: String,
        canonical: &str,
    ) {
        match reverse.get(&key) {
            Some(existing) if existing != canonical => {
                tracing::warn!(
                    variation = %key,
                    kept = %existing,
                    dropped = %canonical,
                    "mapping conflict, keeping first-inserted canonical"
                );
            }
            Some(_) => {}
            None => {
                reverse.insert(key.clone(), canonical.to_string());
                entries.push((key, canonical.to_string()));
            }
        }
    }

    /// O(1) exact lookup of a lowercased/trimmed variation.
    pub fn lookup_exact(&self, text: &str) -> Option<&str> {
        self.reverse
            .get(&text.trim().to_lowercase())
            .map(String::as_str)
    }

    /// All (variation, canonical) pairs, for the fuzzy fallback scan.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(v, c)| (v.as_str(), c.as_str()))
    }

    /// Number of indexed variation strings (canonical self-entries included).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of canonical names in the dictionary.
    pub fn canonical_count(&self) -> usize {
        self.forward.len()
    }
}
