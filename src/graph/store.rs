//! In-memory graph storage
//!
//! `GraphStore` is the unit that transactions copy, commit and persist.
//! Every write is validated against the installed [`Schema`] and keeps the
//! label index, adjacency lists and property indexes in step.

use super::edge::Edge;
use super::property::{PropertyMap, PropertyValue};
use super::types::{Direction, EdgeId, ElementId, Label, VertexId};
use super::vertex::Vertex;
use crate::config::ConfigError;
use crate::index::{IndexManager, UniqueViolation};
use crate::persistence::PersistenceError;
use crate::schema::{ElementKind, Multiplicity, Schema, SchemaError};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::Bound;
use thiserror::Error;

/// Errors that can occur during graph operations
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Vertex {0} not found")]
    VertexNotFound(VertexId),

    #[error("Edge {0} not found")]
    EdgeNotFound(EdgeId),

    #[error("Invalid edge: out-vertex {0} does not exist")]
    InvalidEdgeOut(VertexId),

    #[error("Invalid edge: in-vertex {0} does not exist")]
    InvalidEdgeIn(VertexId),

    #[error("Schema violation: {0}")]
    Schema(#[from] SchemaError),

    #[error("Constraint violation: {0}")]
    UniqueConstraint(#[from] UniqueViolation),

    #[error("Multiplicity {multiplicity} of edge label '{label}' violated at vertex {vertex}")]
    Multiplicity {
        label: String,
        multiplicity: Multiplicity,
        vertex: VertexId,
    },

    #[error("Transaction conflict: the graph changed since the transaction began")]
    Conflict,

    #[error("Graph is closed")]
    Closed,

    #[error("Traversal produced no element")]
    NoSuchElement,

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Graph lock poisoned")]
    Poisoned,

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),
}

pub type GraphResult<T> = Result<T, GraphError>;

/// In-memory graph storage
///
/// Ordered maps keep iteration deterministic (by id):
/// - vertices: VertexId -> Vertex
/// - edges: EdgeId -> Edge
/// - outgoing / incoming: VertexId -> Vec<EdgeId> adjacency lists
/// - label_index: Label -> set of VertexId
#[derive(Debug, Clone)]
pub struct GraphStore {
    vertices: BTreeMap<VertexId, Vertex>,
    edges: BTreeMap<EdgeId, Edge>,
    outgoing: HashMap<VertexId, Vec<EdgeId>>,
    incoming: HashMap<VertexId, Vec<EdgeId>>,
    label_index: HashMap<Label, BTreeSet<VertexId>>,
    schema: Schema,
    indexes: IndexManager,
    next_vertex_id: u64,
    next_edge_id: u64,
    /// Bumped by every committed change
    version: u64,
}

impl GraphStore {
    /// Create a new empty graph store
    pub fn new(schema: Schema) -> Self {
        let indexes = IndexManager::from_schema(&schema);
        GraphStore {
            vertices: BTreeMap::new(),
            edges: BTreeMap::new(),
            outgoing: HashMap::new(),
            incoming: HashMap::new(),
            label_index: HashMap::new(),
            schema,
            indexes,
            next_vertex_id: 1,
            next_edge_id: 1,
            version: 1,
        }
    }

    /// Rebuild a store from recovered parts
    pub fn from_parts(
        schema: Schema,
        vertices: Vec<Vertex>,
        edges: Vec<Edge>,
        next_vertex_id: u64,
        next_edge_id: u64,
        version: u64,
    ) -> GraphResult<Self> {
        let mut store = GraphStore::new(Schema::new(schema.default));
        store.schema = schema;
        store.next_vertex_id = next_vertex_id;
        store.next_edge_id = next_edge_id;
        store.version = version;
        for vertex in vertices {
            store.label_index.entry(vertex.label.clone()).or_default().insert(vertex.id);
            store.next_vertex_id = store.next_vertex_id.max(vertex.id.as_u64() + 1);
            store.vertices.insert(vertex.id, vertex);
        }
        for edge in edges {
            if !store.vertices.contains_key(&edge.out_v) {
                return Err(GraphError::InvalidEdgeOut(edge.out_v));
            }
            if !store.vertices.contains_key(&edge.in_v) {
                return Err(GraphError::InvalidEdgeIn(edge.in_v));
            }
            store.outgoing.entry(edge.out_v).or_default().push(edge.id);
            store.incoming.entry(edge.in_v).or_default().push(edge.id);
            store.next_edge_id = store.next_edge_id.max(edge.id.as_u64() + 1);
            store.edges.insert(edge.id, edge);
        }
        store.rebuild_indexes()?;
        Ok(store)
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn indexes(&self) -> &IndexManager {
        &self.indexes
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub(crate) fn set_version(&mut self, version: u64) {
        self.version = version;
    }

    pub(crate) fn next_ids(&self) -> (u64, u64) {
        (self.next_vertex_id, self.next_edge_id)
    }

    /// Replace the schema, back-filling indexes and re-checking stored data
    pub fn install_schema(&mut self, mut schema: Schema) -> GraphResult<()> {
        schema.default = self.schema.default;
        for vertex in self.vertices.values() {
            for (key, value) in &vertex.properties {
                schema.resolve_property(key, value)?;
            }
        }
        for edge in self.edges.values() {
            for (key, value) in &edge.properties {
                schema.resolve_property(key, value)?;
            }
        }
        self.schema = schema;
        self.rebuild_indexes()
    }

    fn rebuild_indexes(&mut self) -> GraphResult<()> {
        let mut indexes = IndexManager::from_schema(&self.schema);
        for vertex in self.vertices.values() {
            indexes.update(ElementKind::Vertex, vertex.id.into(), None, Some(&vertex.properties))?;
        }
        for edge in self.edges.values() {
            indexes.update(ElementKind::Edge, edge.id.into(), None, Some(&edge.properties))?;
        }
        self.indexes = indexes;
        Ok(())
    }

    /// Create a vertex with a label and properties
    pub fn add_vertex(
        &mut self,
        label: impl Into<Label>,
        properties: PropertyMap,
    ) -> GraphResult<VertexId> {
        let label = label.into();
        self.schema.resolve_vertex_label(label.as_str())?;
        let properties = self.resolve_properties(properties)?;

        let id = VertexId::new(self.next_vertex_id);
        self.indexes
            .update(ElementKind::Vertex, id.into(), None, Some(&properties))?;
        self.next_vertex_id += 1;

        self.label_index.entry(label.clone()).or_default().insert(id);
        self.vertices.insert(id, Vertex::new_with_properties(id, label, properties));
        Ok(id)
    }

    /// Create a directed edge from `out_v` to `in_v`
    pub fn add_edge(
        &mut self,
        label: impl Into<Label>,
        out_v: VertexId,
        in_v: VertexId,
        properties: PropertyMap,
    ) -> GraphResult<EdgeId> {
        if !self.vertices.contains_key(&out_v) {
            return Err(GraphError::InvalidEdgeOut(out_v));
        }
        if !self.vertices.contains_key(&in_v) {
            return Err(GraphError::InvalidEdgeIn(in_v));
        }
        let label = label.into();
        let multiplicity = self.schema.resolve_edge_label(label.as_str())?.multiplicity;
        self.check_multiplicity(&label, multiplicity, out_v, in_v)?;
        let properties = self.resolve_properties(properties)?;

        let id = EdgeId::new(self.next_edge_id);
        self.indexes
            .update(ElementKind::Edge, id.into(), None, Some(&properties))?;
        self.next_edge_id += 1;

        self.outgoing.entry(out_v).or_default().push(id);
        self.incoming.entry(in_v).or_default().push(id);
        self.edges
            .insert(id, Edge::new_with_properties(id, label, out_v, in_v, properties));
        Ok(id)
    }

    fn check_multiplicity(
        &self,
        label: &Label,
        multiplicity: Multiplicity,
        out_v: VertexId,
        in_v: VertexId,
    ) -> GraphResult<()> {
        let violation = |vertex| GraphError::Multiplicity {
            label: label.to_string(),
            multiplicity,
            vertex,
        };
        let labels = [label.as_str()];
        if multiplicity.unique_out()
            && !self.incident_edges(out_v, Direction::Out, &labels).is_empty()
        {
            return Err(violation(out_v));
        }
        if multiplicity.unique_in()
            && !self.incident_edges(in_v, Direction::In, &labels).is_empty()
        {
            return Err(violation(in_v));
        }
        if multiplicity == Multiplicity::Simple
            && self
                .incident_edges(out_v, Direction::Out, &labels)
                .iter()
                .any(|e| e.in_v == in_v)
        {
            return Err(violation(out_v));
        }
        Ok(())
    }

    fn resolve_properties(&mut self, properties: PropertyMap) -> GraphResult<PropertyMap> {
        let mut resolved = PropertyMap::with_capacity(properties.len());
        for (key, value) in properties {
            if value.is_null() {
                continue;
            }
            self.schema.resolve_property(&key, &value)?;
            resolved.insert(key, value);
        }
        Ok(resolved)
    }

    /// Set (or with `Null`, remove) a vertex property
    pub fn set_vertex_property(
        &mut self,
        id: VertexId,
        key: &str,
        value: impl Into<PropertyValue>,
    ) -> GraphResult<Option<PropertyValue>> {
        let value = value.into();
        let vertex = self.vertices.get(&id).ok_or(GraphError::VertexNotFound(id))?;
        let mut updated = vertex.properties.clone();
        if value.is_null() {
            updated.shift_remove(key);
        } else {
            self.schema.resolve_property(key, &value)?;
            updated.insert(key.to_string(), value.clone());
        }
        self.indexes
            .update(ElementKind::Vertex, id.into(), Some(&vertex.properties), Some(&updated))?;

        let vertex = self.vertices.get_mut(&id).ok_or(GraphError::VertexNotFound(id))?;
        Ok(if value.is_null() {
            vertex.remove_property(key)
        } else {
            vertex.set_property(key, value)
        })
    }

    /// Set (or with `Null`, remove) an edge property
    pub fn set_edge_property(
        &mut self,
        id: EdgeId,
        key: &str,
        value: impl Into<PropertyValue>,
    ) -> GraphResult<Option<PropertyValue>> {
        let value = value.into();
        let edge = self.edges.get(&id).ok_or(GraphError::EdgeNotFound(id))?;
        let mut updated = edge.properties.clone();
        if value.is_null() {
            updated.shift_remove(key);
        } else {
            self.schema.resolve_property(key, &value)?;
            updated.insert(key.to_string(), value.clone());
        }
        self.indexes
            .update(ElementKind::Edge, id.into(), Some(&edge.properties), Some(&updated))?;

        let edge = self.edges.get_mut(&id).ok_or(GraphError::EdgeNotFound(id))?;
        Ok(if value.is_null() {
            edge.remove_property(key)
        } else {
            edge.set_property(key, value)
        })
    }

    /// Delete a vertex and all its incident edges
    pub fn remove_vertex(&mut self, id: VertexId) -> GraphResult<Vertex> {
        if !self.vertices.contains_key(&id) {
            return Err(GraphError::VertexNotFound(id));
        }
        let incident: BTreeSet<EdgeId> = self
            .outgoing
            .get(&id)
            .into_iter()
            .chain(self.incoming.get(&id))
            .flatten()
            .copied()
            .collect();
        for edge_id in incident {
            self.remove_edge(edge_id)?;
        }

        let vertex = self.vertices.remove(&id).ok_or(GraphError::VertexNotFound(id))?;
        self.indexes
            .update(ElementKind::Vertex, id.into(), Some(&vertex.properties), None)?;
        if let Some(set) = self.label_index.get_mut(&vertex.label) {
            set.remove(&id);
            if set.is_empty() {
                self.label_index.remove(&vertex.label);
            }
        }
        self.outgoing.remove(&id);
        self.incoming.remove(&id);
        Ok(vertex)
    }

    /// Delete an edge
    pub fn remove_edge(&mut self, id: EdgeId) -> GraphResult<Edge> {
        let edge = self.edges.remove(&id).ok_or(GraphError::EdgeNotFound(id))?;
        self.indexes
            .update(ElementKind::Edge, id.into(), Some(&edge.properties), None)?;
        if let Some(list) = self.outgoing.get_mut(&edge.out_v) {
            list.retain(|e| *e != id);
        }
        if let Some(list) = self.incoming.get_mut(&edge.in_v) {
            list.retain(|e| *e != id);
        }
        Ok(edge)
    }

    pub fn vertex(&self, id: VertexId) -> Option<&Vertex> {
        self.vertices.get(&id)
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(&id)
    }

    pub fn has_vertex(&self, id: VertexId) -> bool {
        self.vertices.contains_key(&id)
    }

    pub fn has_edge(&self, id: EdgeId) -> bool {
        self.edges.contains_key(&id)
    }

    /// All vertices in id order
    pub fn vertices(&self) -> impl Iterator<Item = &Vertex> {
        self.vertices.values()
    }

    /// All edges in id order
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    pub fn vertex_ids(&self) -> Vec<VertexId> {
        self.vertices.keys().copied().collect()
    }

    pub fn edge_ids(&self) -> Vec<EdgeId> {
        self.edges.keys().copied().collect()
    }

    pub fn vertices_by_label(&self, label: &Label) -> Vec<&Vertex> {
        self.label_index
            .get(label)
            .map(|ids| ids.iter().filter_map(|id| self.vertices.get(id)).collect())
            .unwrap_or_default()
    }

    /// Edges touching `vertex` in `direction`, restricted to `labels` unless empty
    pub fn incident_edges(
        &self,
        vertex: VertexId,
        direction: Direction,
        labels: &[&str],
    ) -> Vec<&Edge> {
        let mut ids: Vec<EdgeId> = Vec::new();
        if direction.includes_out() {
            ids.extend(self.outgoing.get(&vertex).into_iter().flatten());
        }
        if direction.includes_in() {
            ids.extend(self.incoming.get(&vertex).into_iter().flatten());
        }
        if direction == Direction::Both {
            // self-loops sit in both lists
            ids.sort();
            ids.dedup();
        }
        ids.iter()
            .filter_map(|id| self.edges.get(id))
            .filter(|e| labels.is_empty() || labels.iter().any(|l| e.label == *l))
            .collect()
    }

    /// Vertices whose `key` equals `value`, via an index when one exists
    pub fn lookup(&self, key: &str, value: &PropertyValue) -> Vec<VertexId> {
        match self.indexes.lookup(ElementKind::Vertex, key, value) {
            Some(ids) => vertex_ids(ids),
            None => self
                .vertices
                .values()
                .filter(|v| v.property(key) == Some(value))
                .map(|v| v.id)
                .collect(),
        }
    }

    /// Edges whose `key` equals `value`, via an index when one exists
    pub fn lookup_edges(&self, key: &str, value: &PropertyValue) -> Vec<EdgeId> {
        match self.indexes.lookup(ElementKind::Edge, key, value) {
            Some(ids) => edge_ids(ids),
            None => self
                .edges
                .values()
                .filter(|e| e.property(key) == Some(value))
                .map(|e| e.id)
                .collect(),
        }
    }

    /// Candidate vertices for a range on `key`; `None` without a mixed index
    pub fn lookup_range(
        &self,
        key: &str,
        lower: Bound<&PropertyValue>,
        upper: Bound<&PropertyValue>,
    ) -> Option<Vec<VertexId>> {
        self.indexes
            .lookup_range(ElementKind::Vertex, key, lower, upper)
            .map(vertex_ids)
    }

    /// Candidate edges for a range on `key`; `None` without a mixed index
    pub fn lookup_edge_range(
        &self,
        key: &str,
        lower: Bound<&PropertyValue>,
        upper: Bound<&PropertyValue>,
    ) -> Option<Vec<EdgeId>> {
        self.indexes
            .lookup_range(ElementKind::Edge, key, lower, upper)
            .map(edge_ids)
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Remove all data and schema; the schema default mode is kept
    pub fn clear(&mut self) {
        let default = self.schema.default;
        *self = GraphStore::new(Schema::new(default));
    }
}

fn vertex_ids(ids: Vec<ElementId>) -> Vec<VertexId> {
    ids.into_iter()
        .filter_map(|id| match id {
            ElementId::Vertex(v) => Some(v),
            ElementId::Edge(_) => None,
        })
        .collect()
}

fn edge_ids(ids: Vec<ElementId>) -> Vec<EdgeId> {
    ids.into_iter()
        .filter_map(|id| match id {
            ElementId::Edge(e) => Some(e),
            ElementId::Vertex(_) => None,
        })
        .collect()
}

impl Default for GraphStore {
    fn default() -> Self {
        Self::new(Schema::default())
    }
}
