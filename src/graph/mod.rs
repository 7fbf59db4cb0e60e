//! Property graph data model
//!
//! This module implements the property graph used by the example programs:
//! - Vertices with one label and properties
//! - Directed, labeled edges with properties
//! - Multiple edges between the same vertices (subject to multiplicity)
//! - In-memory storage with label, adjacency and property indexes

pub mod edge;
pub mod property;
pub mod store;
pub mod types;
pub mod vertex;

// Re-export main types
pub use edge::Edge;
pub use property::{GeoPoint, PropertyMap, PropertyValue};
pub use store::{GraphError, GraphResult, GraphStore};
pub use types::{Direction, EdgeId, ElementId, Label, VertexId};
pub use vertex::Vertex;
