//! Property indexing
//!
//! Provides B-Tree indexes backing the schema's composite (exact-match) and
//! mixed (range) index definitions.

pub mod manager;
pub mod property_index;

pub use manager::{IndexManager, UniqueViolation};
pub use property_index::PropertyIndex;
