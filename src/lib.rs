//! GraphApp
//!
//! An embedded property graph with a Gremlin-style traversal API, and the
//! example programs that exercise it.
//!
//! # Layout
//!
//! - [`config`]: properties-file configuration
//! - [`graph`]: vertices, edges, property values and the in-memory store
//! - [`schema`]: property keys, labels, multiplicities and index definitions
//! - [`index`]: composite and mixed property indexes
//! - [`persistence`]: snapshot files for the `local` storage backend
//! - [`traversal`]: graph handles, traversal sources, steps and transactions
//! - [`app`]: the example framework and its three datasets
//!
//! ## Example Usage
//!
//! ```rust
//! use graphapp::{GraphConfig, GraphFactory, PropertyValue, P};
//!
//! let graph = GraphFactory::open(&GraphConfig::in_memory()).unwrap();
//! let mut g = graph.traversal();
//!
//! let saturn = g.add_v("titan").property("name", "saturn").property("age", 10000i64)
//!     .next_vertex().unwrap();
//! let jupiter = g.add_v("god").property("name", "jupiter").property("age", 5000i64)
//!     .next_vertex().unwrap();
//! g.add_e("father", jupiter.id, saturn.id).iterate().unwrap();
//! g.tx().commit().unwrap();
//!
//! let fathers = g.v().has("name", "jupiter").out(&["father"]).values(&["name"])
//!     .to_values().unwrap();
//! assert_eq!(fathers, vec![PropertyValue::from("saturn")]);
//! assert_eq!(g.v().has_pred("age", P::gte(5000)).count().unwrap(), 2);
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod app;
pub mod config;
pub mod graph;
pub mod index;
pub mod persistence;
pub mod schema;
pub mod traversal;

// Re-export main types for convenience
pub use app::{AppRunner, FollowApp, GodsApp, GraphApp, SocialApp, StepOutcome};

pub use config::{ConfigError, ConfigResult, GraphConfig, StorageBackend};

pub use graph::{
    Direction, Edge, EdgeId, ElementId, GeoPoint, GraphError, GraphResult, GraphStore, Label,
    PropertyMap, PropertyValue, Vertex, VertexId,
};

pub use persistence::{PersistenceError, PersistenceResult, SnapshotStore};

pub use schema::{
    DataType, ElementKind, IndexType, Management, Multiplicity, Schema, SchemaDefault,
    SchemaElement, SchemaError, SchemaResult,
};

pub use traversal::{
    Features, Graph, GraphFactory, GraphTraversalSource, Traversal, Traverser, Tx, P,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        let ver = version();
        assert!(!ver.is_empty());
        assert_eq!(ver, "0.3.0");
    }
}
