mod entity;
mod variation;

pub use entity::{CanonicalEntity, CategoryStats, NewCanonicalEntity, WeightRange};
pub use variation::{VariationRecord, VariationSource};
