//! Schema definitions: property keys, vertex labels, edge labels and indexes
//!
//! A [`Schema`] is installed in every graph store. Writes are checked
//! against it; under [`SchemaDefault::Default`] unknown keys and labels are
//! declared on first use, under [`SchemaDefault::None`] they are rejected.
//! Schema changes are made through a [`Management`] transaction.

pub mod management;

pub use management::{EdgeLabelMaker, IndexBuilder, Management, PropertyKeyMaker, VertexLabelMaker};

use crate::graph::PropertyValue;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors raised by schema declaration and validation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("Property key '{0}' is not defined and automatic schema creation is disabled")]
    UndeclaredPropertyKey(String),

    #[error("Vertex label '{0}' is not defined and automatic schema creation is disabled")]
    UndeclaredVertexLabel(String),

    #[error("Edge label '{0}' is not defined and automatic schema creation is disabled")]
    UndeclaredEdgeLabel(String),

    #[error("Property '{key}' expects {expected} but got {found}")]
    DataTypeMismatch {
        key: String,
        expected: DataType,
        found: &'static str,
    },

    #[error("{kind} '{name}' is already defined")]
    AlreadyDefined { kind: SchemaElement, name: String },

    #[error("Property key '{0}' must be defined before it can be referenced")]
    UnknownPropertyKey(String),

    #[error("Index '{0}' needs at least one key")]
    EmptyIndex(String),

    #[error("Schema management transaction is already closed")]
    ManagementClosed,
}

pub type SchemaResult<T> = Result<T, SchemaError>;

/// Kinds of schema declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaElement {
    PropertyKey,
    VertexLabel,
    EdgeLabel,
    Index,
}

impl fmt::Display for SchemaElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SchemaElement::PropertyKey => "Property key",
            SchemaElement::VertexLabel => "Vertex label",
            SchemaElement::EdgeLabel => "Edge label",
            SchemaElement::Index => "Index",
        };
        write!(f, "{}", name)
    }
}

/// Data type of a property key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    String,
    Integer,
    Float,
    Boolean,
    DateTime,
    Geoshape,
}

impl DataType {
    /// Infer the data type of a value; `None` for null
    pub fn of(value: &PropertyValue) -> Option<DataType> {
        match value {
            PropertyValue::String(_) => Some(DataType::String),
            PropertyValue::Integer(_) => Some(DataType::Integer),
            PropertyValue::Float(_) => Some(DataType::Float),
            PropertyValue::Boolean(_) => Some(DataType::Boolean),
            PropertyValue::DateTime(_) => Some(DataType::DateTime),
            PropertyValue::Geo(_) => Some(DataType::Geoshape),
            PropertyValue::Null => None,
        }
    }

    pub fn accepts(&self, value: &PropertyValue) -> bool {
        DataType::of(value).map_or(true, |t| t == *self)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::String => "String",
            DataType::Integer => "Integer",
            DataType::Float => "Float",
            DataType::Boolean => "Boolean",
            DataType::DateTime => "DateTime",
            DataType::Geoshape => "Geoshape",
        };
        write!(f, "{}", name)
    }
}

/// How many edges of a label a vertex may take part in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Multiplicity {
    /// No constraint
    #[default]
    Multi,
    /// At most one edge of this label between any ordered vertex pair
    Simple,
    /// At most one outgoing edge per vertex
    Many2One,
    /// At most one incoming edge per vertex
    One2Many,
    /// At most one outgoing and one incoming edge per vertex
    One2One,
}

impl Multiplicity {
    pub fn unique_out(&self) -> bool {
        matches!(self, Multiplicity::Many2One | Multiplicity::One2One)
    }

    pub fn unique_in(&self) -> bool {
        matches!(self, Multiplicity::One2Many | Multiplicity::One2One)
    }
}

impl fmt::Display for Multiplicity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Multiplicity::Multi => "MULTI",
            Multiplicity::Simple => "SIMPLE",
            Multiplicity::Many2One => "MANY2ONE",
            Multiplicity::One2Many => "ONE2MANY",
            Multiplicity::One2One => "ONE2ONE",
        };
        write!(f, "{}", name)
    }
}

/// Whether writes may declare schema elements implicitly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SchemaDefault {
    #[default]
    Default,
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyKey {
    pub name: String,
    pub data_type: DataType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VertexLabel {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeLabel {
    pub name: String,
    pub multiplicity: Multiplicity,
    /// Property keys stored inline with the edge
    pub signature: Vec<String>,
}

/// Which element kind an index covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementKind {
    Vertex,
    Edge,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IndexType {
    /// Exact-match lookups over all keys together
    Composite { unique: bool },
    /// Range-capable lookups per key, tied to a search backend name
    Mixed { backend: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDefinition {
    pub name: String,
    pub element: ElementKind,
    pub keys: Vec<String>,
    pub index_type: IndexType,
}

impl IndexDefinition {
    pub fn is_unique(&self) -> bool {
        matches!(self.index_type, IndexType::Composite { unique: true })
    }
}

/// The full set of schema declarations for one graph
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub property_keys: IndexMap<String, PropertyKey>,
    pub vertex_labels: IndexMap<String, VertexLabel>,
    pub edge_labels: IndexMap<String, EdgeLabel>,
    pub indexes: IndexMap<String, IndexDefinition>,
    /// Not persisted with the schema; comes from configuration on open
    #[serde(skip)]
    pub default: SchemaDefault,
}

impl Schema {
    pub fn new(default: SchemaDefault) -> Self {
        Schema {
            default,
            ..Default::default()
        }
    }

    pub fn property_key(&self, name: &str) -> Option<&PropertyKey> {
        self.property_keys.get(name)
    }

    pub fn edge_label(&self, name: &str) -> Option<&EdgeLabel> {
        self.edge_labels.get(name)
    }

    /// Whether any relation type (property key or edge label) exists
    pub fn has_relation_types(&self) -> bool {
        !self.property_keys.is_empty() || !self.edge_labels.is_empty()
    }

    /// Names of all relation types, property keys first
    pub fn relation_types(&self) -> Vec<&str> {
        self.property_keys
            .keys()
            .chain(self.edge_labels.keys())
            .map(|k| k.as_str())
            .collect()
    }

    /// Indexes that cover the given element kind
    pub fn indexes_for(&self, element: ElementKind) -> impl Iterator<Item = &IndexDefinition> {
        self.indexes.values().filter(move |idx| idx.element == element)
    }

    /// Check a property write, declaring the key when allowed
    pub fn resolve_property(&mut self, key: &str, value: &PropertyValue) -> SchemaResult<()> {
        let Some(found) = DataType::of(value) else {
            return Ok(());
        };
        match self.property_keys.get(key) {
            Some(pk) if pk.data_type == found => Ok(()),
            Some(pk) => Err(SchemaError::DataTypeMismatch {
                key: key.to_string(),
                expected: pk.data_type,
                found: value.type_name(),
            }),
            None if self.default == SchemaDefault::Default => {
                self.property_keys.insert(
                    key.to_string(),
                    PropertyKey {
                        name: key.to_string(),
                        data_type: found,
                    },
                );
                Ok(())
            }
            None => Err(SchemaError::UndeclaredPropertyKey(key.to_string())),
        }
    }

    pub fn resolve_vertex_label(&mut self, label: &str) -> SchemaResult<()> {
        if self.vertex_labels.contains_key(label) {
            return Ok(());
        }
        if self.default == SchemaDefault::None {
            return Err(SchemaError::UndeclaredVertexLabel(label.to_string()));
        }
        self.vertex_labels.insert(
            label.to_string(),
            VertexLabel {
                name: label.to_string(),
            },
        );
        Ok(())
    }

    pub fn resolve_edge_label(&mut self, label: &str) -> SchemaResult<&EdgeLabel> {
        if !self.edge_labels.contains_key(label) {
            if self.default == SchemaDefault::None {
                return Err(SchemaError::UndeclaredEdgeLabel(label.to_string()));
            }
            self.edge_labels.insert(
                label.to_string(),
                EdgeLabel {
                    name: label.to_string(),
                    multiplicity: Multiplicity::Multi,
                    signature: Vec::new(),
                },
            );
        }
        self.edge_labels
            .get(label)
            .ok_or_else(|| SchemaError::UndeclaredEdgeLabel(label.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schema_declares_on_first_use() {
        let mut schema = Schema::new(SchemaDefault::Default);
        assert!(!schema.has_relation_types());

        schema.resolve_property("age", &PropertyValue::Integer(30)).unwrap();
        assert_eq!(schema.property_key("age").unwrap().data_type, DataType::Integer);
        assert!(schema.has_relation_types());

        let err = schema.resolve_property("age", &"thirty".into()).unwrap_err();
        assert!(matches!(err, SchemaError::DataTypeMismatch { .. }));
    }

    #[test]
    fn test_none_schema_rejects_unknown_elements() {
        let mut schema = Schema::new(SchemaDefault::None);
        assert_eq!(
            schema.resolve_property("name", &"x".into()),
            Err(SchemaError::UndeclaredPropertyKey("name".to_string()))
        );
        assert_eq!(
            schema.resolve_vertex_label("person"),
            Err(SchemaError::UndeclaredVertexLabel("person".to_string()))
        );
        assert!(schema.resolve_edge_label("knows").is_err());
    }

    #[test]
    fn test_null_values_are_not_typed() {
        let mut schema = Schema::new(SchemaDefault::None);
        assert!(schema.resolve_property("anything", &PropertyValue::Null).is_ok());
        assert!(!schema.has_relation_types());
    }

    #[test]
    fn test_relation_types_lists_keys_then_edge_labels() {
        let mut schema = Schema::new(SchemaDefault::Default);
        schema.resolve_edge_label("father").unwrap();
        schema.resolve_property("name", &"saturn".into()).unwrap();
        assert_eq!(schema.relation_types(), vec!["name", "father"]);
    }

    #[test]
    fn test_multiplicity_flags() {
        assert!(Multiplicity::Many2One.unique_out());
        assert!(!Multiplicity::Many2One.unique_in());
        assert!(Multiplicity::One2One.unique_in());
        assert!(!Multiplicity::Simple.unique_out());
        assert_eq!(Multiplicity::Many2One.to_string(), "MANY2ONE");
    }
}
