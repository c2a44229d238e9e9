use thiserror::Error;

#[derive(Debug, Error)]
pub enum NetachError {
    /// Empty or unusable input text; rejected before any matching.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Case-insensitive canonical-name collision at creation time.
    /// Resolved internally by the resolver (retry as lookup + upsert);
    /// never crosses the resolver boundary.
    #[error("duplicate canonical name: {0}")]
    DuplicateName(String),

    /// Mapping dictionary failed to load or validate. Non-fatal at call
    /// sites that use `MappingTable::load_or_empty`.
    #[error("mapping load failed: {0}")]
    MappingLoad(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
