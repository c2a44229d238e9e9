use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::NetachError;

const DEFAULT_CONFIG: &str = include_str!("../../../config/default.toml");

/// Top-level configuration: built-in defaults, optionally overridden by a
/// user-supplied TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub matching: MatchingConfig,
    pub mapping: MappingConfig,
    pub storage: StorageConfig,
}

/// Matching thresholds and limits.
///
/// The threshold values are fixed empirical constants; they are named
/// configuration rather than tuned at runtime.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// Above this, the top candidate's entity is reused outright.
    pub accept_threshold: f64,
    /// Below this, resolution mints a new canonical entity.
    pub create_threshold: f64,
    /// Minimum similarity for a fuzzy hit against the mapping dictionary.
    pub mapping_fuzzy_threshold: f64,
    /// Default store-search floor for normalize().
    pub normalize_min_confidence: f64,
    /// Default store-search floor for analyze() previews.
    pub analyze_min_confidence: f64,
    /// How many runner-up candidates a resolution reports.
    pub max_alternatives: usize,
    /// Row cap for store-backed fuzzy search.
    pub fuzzy_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingConfig {
    /// Path to the canonical→variations dictionary file.
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub db_path: PathBuf,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            accept_threshold: 0.8,
            create_threshold: 0.6,
            mapping_fuzzy_threshold: 0.85,
            normalize_min_confidence: 0.6,
            analyze_min_confidence: 0.4,
            max_alternatives: 5,
            fuzzy_limit: 10,
        }
    }
}

impl AppConfig {
    /// Built-in defaults.
    pub fn defaults() -> Result<Self, NetachError> {
        toml::from_str(DEFAULT_CONFIG).map_err(|e| NetachError::Config(e.to_string()))
    }

    /// Load from a user config file, falling back to defaults when the
    /// file does not exist.
    pub fn load(path: &Path) -> Result<Self, NetachError> {
        if !path.exists() {
            return Self::defaults();
        }
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw).map_err(|e| NetachError::Config(e.to_string()))
    }
}
