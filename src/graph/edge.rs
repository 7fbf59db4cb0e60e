//! Edge implementation for the property graph

use super::property::{PropertyMap, PropertyValue};
use super::types::{EdgeId, Label, VertexId};
use serde::{Deserialize, Serialize};

/// A directed edge in the property graph
///
/// An edge leaves its out-vertex and arrives at its in-vertex. Several edges
/// with the same label may connect the same pair of vertices unless the
/// label's multiplicity forbids it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    /// Unique identifier for this edge
    pub id: EdgeId,

    /// Edge label (e.g., "following", "father")
    pub label: Label,

    /// Vertex the edge leaves
    pub out_v: VertexId,

    /// Vertex the edge arrives at
    pub in_v: VertexId,

    /// Properties associated with this edge
    pub properties: PropertyMap,

    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,
}

impl Edge {
    /// Create a new directed edge
    pub fn new(id: EdgeId, label: impl Into<Label>, out_v: VertexId, in_v: VertexId) -> Self {
        Self::new_with_properties(id, label, out_v, in_v, PropertyMap::new())
    }

    /// Create a new edge with properties
    pub fn new_with_properties(
        id: EdgeId,
        label: impl Into<Label>,
        out_v: VertexId,
        in_v: VertexId,
        properties: PropertyMap,
    ) -> Self {
        Edge {
            id,
            label: label.into(),
            out_v,
            in_v,
            properties,
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn set_property(
        &mut self,
        key: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> Option<PropertyValue> {
        self.properties.insert(key.into(), value.into())
    }

    pub fn property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    pub fn remove_property(&mut self, key: &str) -> Option<PropertyValue> {
        self.properties.shift_remove(key)
    }

    /// The vertex at the other end, seen from `vertex`
    pub fn other_vertex(&self, vertex: VertexId) -> VertexId {
        if self.out_v == vertex {
            self.in_v
        } else {
            self.out_v
        }
    }

    /// Check if this is a self-loop
    pub fn is_self_loop(&self) -> bool {
        self.out_v == self.in_v
    }
}

impl PartialEq for Edge {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Edge {}

impl std::hash::Hash for Edge {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
