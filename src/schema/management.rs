//! Schema management transactions
//!
//! A [`Management`] holds a private copy of the graph's schema. Builders
//! declare new elements against that copy; `commit` installs it into the
//! graph in one step, `rollback` throws it away.

use super::{
    DataType, EdgeLabel, ElementKind, IndexDefinition, IndexType, Multiplicity, PropertyKey, Schema,
    SchemaElement, SchemaError, SchemaResult, VertexLabel,
};
use crate::config::GraphConfig;
use crate::graph::GraphResult;
use crate::traversal::Graph;
use tracing::debug;

/// A schema management transaction opened with [`Graph::open_management`]
pub struct Management {
    graph: Graph,
    schema: Schema,
    base_version: u64,
    open: bool,
}

impl Management {
    pub(crate) fn new(graph: Graph, schema: Schema, base_version: u64) -> Self {
        Management {
            graph,
            schema,
            base_version,
            open: true,
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Configuration the graph was opened with
    pub fn config(&self) -> &GraphConfig {
        self.graph.config()
    }

    /// Search backend name when mixed indexes are available
    pub fn search_backend(&self) -> Option<&str> {
        self.graph.config().search_backend()
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn contains_property_key(&self, name: &str) -> bool {
        self.schema.property_keys.contains_key(name)
    }

    pub fn contains_vertex_label(&self, name: &str) -> bool {
        self.schema.vertex_labels.contains_key(name)
    }

    pub fn contains_edge_label(&self, name: &str) -> bool {
        self.schema.edge_labels.contains_key(name)
    }

    pub fn contains_graph_index(&self, name: &str) -> bool {
        self.schema.indexes.contains_key(name)
    }

    pub fn property_key(&self, name: &str) -> Option<&PropertyKey> {
        self.schema.property_key(name)
    }

    /// Whether any property key or edge label has been declared
    pub fn has_relation_types(&self) -> bool {
        self.schema.has_relation_types()
    }

    pub fn relation_types(&self) -> Vec<&str> {
        self.schema.relation_types()
    }

    pub fn make_property_key(&mut self, name: &str) -> PropertyKeyMaker<'_> {
        PropertyKeyMaker {
            mgmt: self,
            name: name.to_string(),
            data_type: DataType::String,
        }
    }

    pub fn make_vertex_label(&mut self, name: &str) -> VertexLabelMaker<'_> {
        VertexLabelMaker {
            mgmt: self,
            name: name.to_string(),
        }
    }

    pub fn make_edge_label(&mut self, name: &str) -> EdgeLabelMaker<'_> {
        EdgeLabelMaker {
            mgmt: self,
            name: name.to_string(),
            multiplicity: Multiplicity::Multi,
            signature: Vec::new(),
        }
    }

    pub fn build_index(&mut self, name: &str, element: ElementKind) -> IndexBuilder<'_> {
        IndexBuilder {
            mgmt: self,
            name: name.to_string(),
            element,
            keys: Vec::new(),
            unique: false,
        }
    }

    /// Install the declared schema into the graph
    ///
    /// Indexes are back-filled from existing data. Fails with a conflict if
    /// the graph committed anything since this management was opened.
    pub fn commit(&mut self) -> GraphResult<()> {
        self.ensure_open()?;
        self.open = false;
        let schema = std::mem::take(&mut self.schema);
        self.graph.install_schema(self.base_version, schema)?;
        debug!("Schema management committed");
        Ok(())
    }

    /// Discard all declarations; a no-op once closed
    pub fn rollback(&mut self) {
        if self.open {
            self.open = false;
            debug!("Schema management rolled back");
        }
    }

    fn ensure_open(&self) -> SchemaResult<()> {
        if self.open {
            Ok(())
        } else {
            Err(SchemaError::ManagementClosed)
        }
    }

    fn ensure_undefined(&self, kind: SchemaElement, name: &str) -> SchemaResult<()> {
        let taken = match kind {
            SchemaElement::VertexLabel => self.contains_vertex_label(name),
            SchemaElement::Index => self.contains_graph_index(name),
            // property keys and edge labels share one relation type namespace
            SchemaElement::PropertyKey | SchemaElement::EdgeLabel => {
                self.contains_property_key(name) || self.contains_edge_label(name)
            }
        };
        if taken {
            return Err(SchemaError::AlreadyDefined {
                kind,
                name: name.to_string(),
            });
        }
        Ok(())
    }

    fn ensure_keys_defined(&self, keys: &[String]) -> SchemaResult<()> {
        for key in keys {
            if !self.contains_property_key(key) {
                return Err(SchemaError::UnknownPropertyKey(key.clone()));
            }
        }
        Ok(())
    }
}

pub struct PropertyKeyMaker<'a> {
    mgmt: &'a mut Management,
    name: String,
    data_type: DataType,
}

impl PropertyKeyMaker<'_> {
    pub fn data_type(mut self, data_type: DataType) -> Self {
        self.data_type = data_type;
        self
    }

    pub fn make(self) -> SchemaResult<PropertyKey> {
        self.mgmt.ensure_open()?;
        self.mgmt.ensure_undefined(SchemaElement::PropertyKey, &self.name)?;
        let key = PropertyKey {
            name: self.name.clone(),
            data_type: self.data_type,
        };
        self.mgmt.schema.property_keys.insert(self.name, key.clone());
        Ok(key)
    }
}

pub struct VertexLabelMaker<'a> {
    mgmt: &'a mut Management,
    name: String,
}

impl VertexLabelMaker<'_> {
    pub fn make(self) -> SchemaResult<VertexLabel> {
        self.mgmt.ensure_open()?;
        self.mgmt.ensure_undefined(SchemaElement::VertexLabel, &self.name)?;
        let label = VertexLabel {
            name: self.name.clone(),
        };
        self.mgmt.schema.vertex_labels.insert(self.name, label.clone());
        Ok(label)
    }
}

pub struct EdgeLabelMaker<'a> {
    mgmt: &'a mut Management,
    name: String,
    multiplicity: Multiplicity,
    signature: Vec<String>,
}

impl EdgeLabelMaker<'_> {
    pub fn multiplicity(mut self, multiplicity: Multiplicity) -> Self {
        self.multiplicity = multiplicity;
        self
    }

    pub fn signature(mut self, keys: &[&str]) -> Self {
        self.signature = keys.iter().map(|k| k.to_string()).collect();
        self
    }

    pub fn make(self) -> SchemaResult<EdgeLabel> {
        self.mgmt.ensure_open()?;
        self.mgmt.ensure_undefined(SchemaElement::EdgeLabel, &self.name)?;
        self.mgmt.ensure_keys_defined(&self.signature)?;
        let label = EdgeLabel {
            name: self.name.clone(),
            multiplicity: self.multiplicity,
            signature: self.signature,
        };
        self.mgmt.schema.edge_labels.insert(self.name, label.clone());
        Ok(label)
    }
}

pub struct IndexBuilder<'a> {
    mgmt: &'a mut Management,
    name: String,
    element: ElementKind,
    keys: Vec<String>,
    unique: bool,
}

impl IndexBuilder<'_> {
    pub fn add_key(mut self, key: &str) -> Self {
        self.keys.push(key.to_string());
        self
    }

    /// Reject two elements sharing the same indexed values (composite only)
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn build_composite_index(self) -> SchemaResult<IndexDefinition> {
        let unique = self.unique;
        self.build(IndexType::Composite { unique })
    }

    pub fn build_mixed_index(self, backend: &str) -> SchemaResult<IndexDefinition> {
        self.build(IndexType::Mixed {
            backend: backend.to_string(),
        })
    }

    fn build(self, index_type: IndexType) -> SchemaResult<IndexDefinition> {
        self.mgmt.ensure_open()?;
        self.mgmt.ensure_undefined(SchemaElement::Index, &self.name)?;
        if self.keys.is_empty() {
            return Err(SchemaError::EmptyIndex(self.name));
        }
        self.mgmt.ensure_keys_defined(&self.keys)?;
        let index = IndexDefinition {
            name: self.name.clone(),
            element: self.element,
            keys: self.keys,
            index_type,
        };
        self.mgmt.schema.indexes.insert(self.name, index.clone());
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphError;
    use crate::traversal::GraphFactory;

    fn open() -> Graph {
        GraphFactory::open(&GraphConfig::in_memory()).unwrap()
    }

    #[test]
    fn test_declare_and_commit() {
        let graph = open();
        let mut mgmt = graph.open_management().unwrap();
        mgmt.make_property_key("name").data_type(DataType::String).make().unwrap();
        mgmt.make_property_key("reason").make().unwrap();
        mgmt.make_vertex_label("god").make().unwrap();
        mgmt.make_edge_label("lives").signature(&["reason"]).make().unwrap();
        mgmt.build_index("nameIndex", ElementKind::Vertex)
            .add_key("name")
            .unique()
            .build_composite_index()
            .unwrap();
        mgmt.commit().unwrap();

        let mgmt = graph.open_management().unwrap();
        assert!(mgmt.contains_property_key("name"));
        assert!(mgmt.contains_vertex_label("god"));
        assert!(mgmt.contains_graph_index("nameIndex"));
        assert_eq!(mgmt.schema().edge_label("lives").unwrap().signature, vec!["reason"]);
    }

    #[test]
    fn test_rollback_discards_declarations() {
        let graph = open();
        let mut mgmt = graph.open_management().unwrap();
        mgmt.make_property_key("name").make().unwrap();
        mgmt.rollback();
        assert!(!mgmt.is_open());

        let mgmt = graph.open_management().unwrap();
        assert!(!mgmt.has_relation_types());
    }

    #[test]
    fn test_duplicate_relation_type_is_rejected() {
        let graph = open();
        let mut mgmt = graph.open_management().unwrap();
        mgmt.make_property_key("father").make().unwrap();
        let err = mgmt.make_edge_label("father").make().unwrap_err();
        assert!(matches!(
            err,
            SchemaError::AlreadyDefined {
                kind: SchemaElement::EdgeLabel,
                ..
            }
        ));
        assert_eq!(err.to_string(), "Edge label 'father' is already defined");

        // vertex labels and indexes have namespaces of their own
        mgmt.make_vertex_label("father").make().unwrap();
        let err = mgmt.make_vertex_label("father").make().unwrap_err();
        assert_eq!(err.to_string(), "Vertex label 'father' is already defined");
        mgmt.build_index("father", ElementKind::Vertex)
            .add_key("father")
            .build_composite_index()
            .unwrap();
        let err = mgmt
            .build_index("father", ElementKind::Edge)
            .add_key("father")
            .build_composite_index()
            .unwrap_err();
        assert!(matches!(
            err,
            SchemaError::AlreadyDefined {
                kind: SchemaElement::Index,
                ..
            }
        ));
    }

    #[test]
    fn test_signature_and_index_keys_must_exist() {
        let graph = open();
        let mut mgmt = graph.open_management().unwrap();
        let err = mgmt.make_edge_label("following").signature(&["timestamp"]).make().unwrap_err();
        assert_eq!(err, SchemaError::UnknownPropertyKey("timestamp".to_string()));

        let err = mgmt
            .build_index("byName", ElementKind::Vertex)
            .build_composite_index()
            .unwrap_err();
        assert_eq!(err, SchemaError::EmptyIndex("byName".to_string()));
    }

    #[test]
    fn test_closed_management_rejects_changes() {
        let graph = open();
        let mut mgmt = graph.open_management().unwrap();
        mgmt.commit().unwrap();
        assert_eq!(mgmt.make_vertex_label("x").make().unwrap_err(), SchemaError::ManagementClosed);
        assert!(matches!(
            mgmt.commit(),
            Err(GraphError::Schema(SchemaError::ManagementClosed))
        ));
    }
}
