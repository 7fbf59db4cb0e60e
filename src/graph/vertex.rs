//! Vertex implementation for the property graph

use super::property::{PropertyMap, PropertyValue};
use super::types::{Label, VertexId};
use serde::{Deserialize, Serialize};

/// A vertex in the property graph
///
/// Vertices have:
/// - A unique ID
/// - Exactly one label
/// - Properties (key-value pairs, insertion ordered)
/// - Creation and update timestamps
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vertex {
    /// Unique identifier for this vertex
    pub id: VertexId,

    /// Vertex label
    pub label: Label,

    /// Properties associated with this vertex
    pub properties: PropertyMap,

    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,

    /// Last update timestamp (Unix milliseconds)
    pub updated_at: i64,
}

impl Vertex {
    /// Create a new vertex without properties
    pub fn new(id: VertexId, label: impl Into<Label>) -> Self {
        Self::new_with_properties(id, label, PropertyMap::new())
    }

    /// Create a new vertex with properties
    pub fn new_with_properties(
        id: VertexId,
        label: impl Into<Label>,
        properties: PropertyMap,
    ) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Vertex {
            id,
            label: label.into(),
            properties,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set a property value, returning the previous one
    pub fn set_property(
        &mut self,
        key: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> Option<PropertyValue> {
        let old = self.properties.insert(key.into(), value.into());
        self.touch();
        old
    }

    /// Get a property value
    pub fn property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    /// Get a string property, if present and a string
    pub fn str_value(&self, key: &str) -> Option<&str> {
        self.property(key).and_then(|v| v.as_string())
    }

    /// Remove a property
    pub fn remove_property(&mut self, key: &str) -> Option<PropertyValue> {
        let removed = self.properties.shift_remove(key);
        if removed.is_some() {
            self.touch();
        }
        removed
    }

    pub fn has_property(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    /// Property values in insertion order
    pub fn values(&self) -> Vec<&PropertyValue> {
        self.properties.values().collect()
    }

    fn touch(&mut self) {
        self.updated_at = chrono::Utc::now().timestamp_millis();
    }
}

impl PartialEq for Vertex {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Vertex {}

impl std::hash::Hash for Vertex {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_vertex() {
        let vertex = Vertex::new(VertexId::new(1), "person");
        assert_eq!(vertex.id, VertexId::new(1));
        assert_eq!(vertex.label.as_str(), "person");
        assert!(vertex.properties.is_empty());
        assert_eq!(vertex.created_at, vertex.updated_at);
    }

    #[test]
    fn test_vertex_properties() {
        let mut vertex = Vertex::new(VertexId::new(1), "god");
        assert!(vertex.set_property("name", "jupiter").is_none());
        vertex.set_property("age", 5000i64);

        assert_eq!(vertex.str_value("name"), Some("jupiter"));
        assert_eq!(vertex.property("age").and_then(|v| v.as_integer()), Some(5000));

        let old = vertex.set_property("age", 5001i64);
        assert_eq!(old, Some(PropertyValue::Integer(5000)));

        assert_eq!(vertex.remove_property("name"), Some(PropertyValue::from("jupiter")));
        assert!(!vertex.has_property("name"));
        assert_eq!(vertex.values(), vec![&PropertyValue::Integer(5001)]);
    }

    #[test]
    fn test_vertex_equality_by_id() {
        let a = Vertex::new(VertexId::new(3), "person");
        let b = Vertex::new(VertexId::new(3), "location");
        assert_eq!(a, b);
    }
}
