//! Traversal steps
//!
//! A [`Traversal`] is evaluated eagerly: every step runs against the source's
//! open transaction as soon as it is chained, and the traversers it produced
//! are handed to the next step. A `g.v()` or `g.e()` start is kept pending
//! until the first step, so that a leading `has`/`has_label` can be answered
//! from an index instead of a scan.
//!
//! A failing step stops evaluation; the error surfaces from the terminal step.

use super::predicate::P;
use super::source::{GraphTraversalSource, Transaction};
use crate::graph::{
    Direction, Edge, EdgeId, ElementId, GraphError, GraphResult, GraphStore, Label, PropertyMap,
    PropertyValue, Vertex, VertexId,
};
use rand::seq::index;
use std::ops::Bound;

/// Where an unmaterialized traversal starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Start {
    Vertices,
    Edges,
}

impl Start {
    fn traversers(self, store: &GraphStore) -> Vec<Traverser> {
        match self {
            Start::Vertices => store.vertex_ids().into_iter().map(Traverser::Vertex).collect(),
            Start::Edges => store.edge_ids().into_iter().map(Traverser::Edge).collect(),
        }
    }

    /// Elements whose `key` satisfies `predicate`, using an index when one applies
    fn lookup(self, store: &GraphStore, key: &str, predicate: &P) -> Vec<Traverser> {
        let indexable = indexable(store, key, predicate);
        match self {
            Start::Vertices => {
                let candidates: Option<Vec<VertexId>> = if !indexable {
                    None
                } else if let Some(values) = predicate.exact_values() {
                    Some(values.iter().flat_map(|v| store.lookup(key, v)).collect())
                } else {
                    predicate.bounds().and_then(|(lo, hi)| store.lookup_range(key, lo, hi))
                };
                let mut ids = candidates.unwrap_or_else(|| store.vertex_ids());
                ids.sort();
                ids.dedup();
                ids.into_iter()
                    .filter(|id| {
                        matches(store.vertex(*id).and_then(|v| v.property(key)), predicate)
                    })
                    .map(Traverser::Vertex)
                    .collect()
            }
            Start::Edges => {
                let candidates: Option<Vec<EdgeId>> = if !indexable {
                    None
                } else if let Some(values) = predicate.exact_values() {
                    Some(values.iter().flat_map(|v| store.lookup_edges(key, v)).collect())
                } else {
                    predicate.bounds().and_then(|(lo, hi)| store.lookup_edge_range(key, lo, hi))
                };
                let mut ids = candidates.unwrap_or_else(|| store.edge_ids());
                ids.sort();
                ids.dedup();
                ids.into_iter()
                    .filter(|id| {
                        matches(store.edge(*id).and_then(|e| e.property(key)), predicate)
                    })
                    .map(Traverser::Edge)
                    .collect()
            }
        }
    }
}

/// Whether index keys agree with `predicate` on `key`
///
/// Indexes order values by type before value, so an integer operand never
/// finds a float entry. Only operands of the key's declared type are looked
/// up; everything else is scanned and tested numerically. Float zeros and
/// NaN are scanned too, since the index tells `-0.0` from `0.0`.
fn indexable(store: &GraphStore, key: &str, predicate: &P) -> bool {
    let declared = match store.schema().property_key(key) {
        Some(declared) => declared,
        None => return false,
    };
    let operands: Vec<&PropertyValue> = match (predicate.exact_values(), predicate.bounds()) {
        (Some(values), _) => values.iter().collect(),
        (None, Some((lo, hi))) => [lo, hi]
            .into_iter()
            .filter_map(|bound| match bound {
                Bound::Included(v) | Bound::Excluded(v) => Some(v),
                Bound::Unbounded => None,
            })
            .collect(),
        (None, None) => return false,
    };
    operands.into_iter().all(|v| match v {
        PropertyValue::Null => false,
        PropertyValue::Float(f) if *f == 0.0 || f.is_nan() => false,
        _ => declared.data_type.accepts(v),
    })
}

fn matches(value: Option<&PropertyValue>, predicate: &P) -> bool {
    value.map_or(false, |v| predicate.test(v))
}

/// One element or value flowing through a traversal
#[derive(Debug, Clone, PartialEq)]
pub enum Traverser {
    Vertex(VertexId),
    Edge(EdgeId),
    Value(PropertyValue),
    Map(PropertyMap),
}

impl Traverser {
    pub fn as_vertex(&self) -> Option<VertexId> {
        match self {
            Traverser::Vertex(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_edge(&self) -> Option<EdgeId> {
        match self {
            Traverser::Edge(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_value(&self) -> Option<&PropertyValue> {
        match self {
            Traverser::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&PropertyMap> {
        match self {
            Traverser::Map(m) => Some(m),
            _ => None,
        }
    }

    fn element_id(&self) -> Option<ElementId> {
        match self {
            Traverser::Vertex(id) => Some((*id).into()),
            Traverser::Edge(id) => Some((*id).into()),
            _ => None,
        }
    }

    fn label<'s>(&self, store: &'s GraphStore) -> Option<&'s Label> {
        match self {
            Traverser::Vertex(id) => store.vertex(*id).map(|v| &v.label),
            Traverser::Edge(id) => store.edge(*id).map(|e| &e.label),
            _ => None,
        }
    }

    fn properties<'s>(&self, store: &'s GraphStore) -> Option<&'s PropertyMap> {
        match self {
            Traverser::Vertex(id) => store.vertex(*id).map(|v| &v.properties),
            Traverser::Edge(id) => store.edge(*id).map(|e| &e.properties),
            _ => None,
        }
    }

    fn property<'s>(&self, store: &'s GraphStore, key: &str) -> Option<&'s PropertyValue> {
        self.properties(store).and_then(|props| props.get(key))
    }
}

/// A chain of steps started from a [`GraphTraversalSource`]
pub struct Traversal<'a> {
    source: &'a mut GraphTraversalSource,
    traversers: Vec<Traverser>,
    pending: Option<Start>,
    error: Option<GraphError>,
}

impl<'a> Traversal<'a> {
    pub(crate) fn new(source: &'a mut GraphTraversalSource) -> Self {
        Traversal {
            source,
            traversers: Vec::new(),
            pending: None,
            error: None,
        }
    }

    pub(crate) fn start(source: &'a mut GraphTraversalSource, start: Start) -> Self {
        let mut traversal = Traversal::new(source);
        traversal.pending = Some(start);
        traversal
    }

    /// Run one step over the current traversers
    pub(crate) fn step<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&mut Transaction, Vec<Traverser>) -> GraphResult<Vec<Traverser>>,
    {
        if self.error.is_some() {
            return self;
        }
        let result = match self.source.transaction() {
            Ok(tx) => {
                let traversers = match self.pending.take() {
                    Some(start) => start.traversers(tx.read()),
                    None => std::mem::take(&mut self.traversers),
                };
                f(tx, traversers)
            }
            Err(e) => Err(e),
        };
        match result {
            Ok(traversers) => self.traversers = traversers,
            Err(e) => self.error = Some(e),
        }
        self
    }

    fn filter<F>(self, keep: F) -> Self
    where
        F: Fn(&GraphStore, &Traverser) -> bool,
    {
        self.step(move |tx, traversers| {
            let store = tx.read();
            Ok(traversers.into_iter().filter(|t| keep(store, t)).collect())
        })
    }

    fn flat_map<F>(self, f: F) -> Self
    where
        F: Fn(&GraphStore, Traverser) -> Vec<Traverser>,
    {
        self.step(move |tx, traversers| {
            let store = tx.read();
            Ok(traversers.into_iter().flat_map(|t| f(store, t)).collect())
        })
    }

    // ---- filters ----

    /// Keep elements whose label is one of `labels`
    pub fn has_label(mut self, labels: &[&str]) -> Self {
        let labels = owned(labels);
        if self.error.is_none() && self.pending == Some(Start::Vertices) {
            self.pending = None;
            return self.step(move |tx, _| {
                let store = tx.read();
                let mut ids: Vec<VertexId> = labels
                    .iter()
                    .flat_map(|l| store.vertices_by_label(&Label::new(l.as_str())))
                    .map(|v| v.id)
                    .collect();
                ids.sort();
                ids.dedup();
                Ok(ids.into_iter().map(Traverser::Vertex).collect())
            });
        }
        self.filter(move |store, t| {
            t.label(store)
                .map_or(false, |l| labels.iter().any(|x| l.as_str() == x.as_str()))
        })
    }

    /// Keep elements whose `key` equals `value`
    pub fn has(self, key: &str, value: impl Into<PropertyValue>) -> Self {
        self.has_pred(key, P::eq(value))
    }

    /// Keep elements whose `key` satisfies `predicate`
    pub fn has_pred(mut self, key: &str, predicate: P) -> Self {
        let key = key.to_string();
        match self.pending.take() {
            Some(start) if self.error.is_none() => {
                self.step(move |tx, _| Ok(start.lookup(tx.read(), &key, &predicate)))
            }
            _ => self.filter(move |store, t| matches(t.property(store, &key), &predicate)),
        }
    }

    /// Keep elements that carry `key`
    pub fn has_key(self, key: &str) -> Self {
        let key = key.to_string();
        self.filter(move |store, t| t.property(store, &key).is_some())
    }

    /// Keep elements that lack `key`
    pub fn has_not(self, key: &str) -> Self {
        let key = key.to_string();
        self.filter(move |store, t| {
            t.properties(store).is_some() && t.property(store, &key).is_none()
        })
    }

    pub fn has_id<I: Into<ElementId>>(self, ids: impl IntoIterator<Item = I>) -> Self {
        let ids: Vec<ElementId> = ids.into_iter().map(Into::into).collect();
        self.filter(move |_, t| t.element_id().map_or(false, |id| ids.contains(&id)))
    }

    pub fn has_not_id<I: Into<ElementId>>(self, ids: impl IntoIterator<Item = I>) -> Self {
        let ids: Vec<ElementId> = ids.into_iter().map(Into::into).collect();
        self.filter(move |_, t| t.element_id().map_or(true, |id| !ids.contains(&id)))
    }

    /// Drop repeated traversers, keeping the first occurrence
    pub fn dedup(self) -> Self {
        self.step(|_, traversers| {
            let mut unique: Vec<Traverser> = Vec::with_capacity(traversers.len());
            for t in traversers {
                if !unique.contains(&t) {
                    unique.push(t);
                }
            }
            Ok(unique)
        })
    }

    pub fn limit(self, n: usize) -> Self {
        self.step(move |_, mut traversers| {
            traversers.truncate(n);
            Ok(traversers)
        })
    }

    /// Keep `n` traversers chosen at random, in their original order
    pub fn sample(self, n: usize) -> Self {
        self.step(move |_, traversers| {
            let amount = n.min(traversers.len());
            let mut picked =
                index::sample(&mut rand::thread_rng(), traversers.len(), amount).into_vec();
            picked.sort_unstable();
            Ok(picked.into_iter().map(|i| traversers[i].clone()).collect())
        })
    }

    // ---- navigation ----

    /// Adjacent vertices along outgoing edges
    pub fn out(self, labels: &[&str]) -> Self {
        self.adjacent(Direction::Out, labels)
    }

    /// Adjacent vertices along incoming edges
    pub fn in_(self, labels: &[&str]) -> Self {
        self.adjacent(Direction::In, labels)
    }

    pub fn both(self, labels: &[&str]) -> Self {
        self.adjacent(Direction::Both, labels)
    }

    pub fn out_e(self, labels: &[&str]) -> Self {
        self.incident(Direction::Out, labels)
    }

    pub fn in_e(self, labels: &[&str]) -> Self {
        self.incident(Direction::In, labels)
    }

    pub fn both_e(self, labels: &[&str]) -> Self {
        self.incident(Direction::Both, labels)
    }

    /// Tail vertex of each edge
    pub fn out_v(self) -> Self {
        self.flat_map(|store, t| match t {
            Traverser::Edge(id) => {
                store.edge(id).map(|e| Traverser::Vertex(e.out_v)).into_iter().collect()
            }
            _ => Vec::new(),
        })
    }

    /// Head vertex of each edge
    pub fn in_v(self) -> Self {
        self.flat_map(|store, t| match t {
            Traverser::Edge(id) => {
                store.edge(id).map(|e| Traverser::Vertex(e.in_v)).into_iter().collect()
            }
            _ => Vec::new(),
        })
    }

    fn adjacent(self, direction: Direction, labels: &[&str]) -> Self {
        let labels = owned(labels);
        self.flat_map(move |store, t| match t {
            Traverser::Vertex(v) => store
                .incident_edges(v, direction, &borrowed(&labels))
                .into_iter()
                .map(|e| Traverser::Vertex(e.other_vertex(v)))
                .collect(),
            _ => Vec::new(),
        })
    }

    fn incident(self, direction: Direction, labels: &[&str]) -> Self {
        let labels = owned(labels);
        self.flat_map(move |store, t| match t {
            Traverser::Vertex(v) => store
                .incident_edges(v, direction, &borrowed(&labels))
                .into_iter()
                .map(|e| Traverser::Edge(e.id))
                .collect(),
            _ => Vec::new(),
        })
    }

    // ---- projection ----

    /// Property values of each element, all keys when `keys` is empty
    pub fn values(self, keys: &[&str]) -> Self {
        let keys = owned(keys);
        self.flat_map(move |store, t| match t.properties(store) {
            Some(props) => props
                .iter()
                .filter(|(k, _)| keys.is_empty() || keys.contains(k))
                .map(|(_, v)| Traverser::Value(v.clone()))
                .collect(),
            None => Vec::new(),
        })
    }

    /// Property map of each element, all keys when `keys` is empty
    pub fn value_map(self, keys: &[&str]) -> Self {
        let keys = owned(keys);
        self.flat_map(move |store, t| match t.properties(store) {
            Some(props) => vec![Traverser::Map(
                props
                    .iter()
                    .filter(|(k, _)| keys.is_empty() || keys.contains(k))
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
            )],
            None => Vec::new(),
        })
    }

    /// Numeric id of each element
    pub fn id(self) -> Self {
        self.flat_map(|_, t| {
            let id = match t {
                Traverser::Vertex(v) => v.as_u64(),
                Traverser::Edge(e) => e.as_u64(),
                _ => return Vec::new(),
            };
            vec![Traverser::Value(PropertyValue::Integer(id as i64))]
        })
    }

    pub fn label(self) -> Self {
        self.flat_map(|store, t| {
            t.label(store)
                .map(|l| Traverser::Value(PropertyValue::String(l.to_string())))
                .into_iter()
                .collect()
        })
    }

    // ---- mutation ----

    /// Set a property on every element; `Null` removes it
    pub fn property(self, key: &str, value: impl Into<PropertyValue>) -> Self {
        let key = key.to_string();
        let value = value.into();
        self.step(move |tx, traversers| {
            for t in &traversers {
                match t {
                    Traverser::Vertex(id) => {
                        tx.write().set_vertex_property(*id, &key, value.clone())?;
                    }
                    Traverser::Edge(id) => {
                        tx.write().set_edge_property(*id, &key, value.clone())?;
                    }
                    _ => {}
                }
            }
            Ok(traversers)
        })
    }

    /// Remove every element; removing a vertex removes its edges
    pub fn drop(self) -> GraphResult<()> {
        self.step(|tx, traversers| {
            for t in traversers {
                match t {
                    Traverser::Vertex(id) if tx.read().has_vertex(id) => {
                        tx.write().remove_vertex(id)?;
                    }
                    Traverser::Edge(id) if tx.read().has_edge(id) => {
                        tx.write().remove_edge(id)?;
                    }
                    _ => {}
                }
            }
            Ok(Vec::new())
        })
        .iterate()
    }

    // ---- terminals ----

    fn terminate<R, F>(mut self, f: F) -> GraphResult<R>
    where
        F: FnOnce(&GraphStore, Vec<Traverser>) -> R,
    {
        let result = match self.error.take() {
            Some(e) => Err(e),
            None => match self.source.transaction() {
                Ok(tx) => {
                    let traversers = match self.pending.take() {
                        Some(start) => start.traversers(tx.read()),
                        None => std::mem::take(&mut self.traversers),
                    };
                    Ok(f(tx.read(), traversers))
                }
                Err(e) => Err(e),
            },
        };
        match result {
            Ok(out) => {
                self.source.end_step()?;
                Ok(out)
            }
            Err(e) => {
                self.source.abort_step();
                Err(e)
            }
        }
    }

    pub fn to_list(self) -> GraphResult<Vec<Traverser>> {
        self.terminate(|_, traversers| traversers)
    }

    pub fn to_vertices(self) -> GraphResult<Vec<Vertex>> {
        self.terminate(|store, traversers| {
            traversers
                .iter()
                .filter_map(Traverser::as_vertex)
                .filter_map(|id| store.vertex(id).cloned())
                .collect()
        })
    }

    pub fn to_edges(self) -> GraphResult<Vec<Edge>> {
        self.terminate(|store, traversers| {
            traversers
                .iter()
                .filter_map(Traverser::as_edge)
                .filter_map(|id| store.edge(id).cloned())
                .collect()
        })
    }

    pub fn to_values(self) -> GraphResult<Vec<PropertyValue>> {
        self.terminate(|_, traversers| {
            traversers
                .into_iter()
                .filter_map(|t| match t {
                    Traverser::Value(v) => Some(v),
                    _ => None,
                })
                .collect()
        })
    }

    pub fn to_value_maps(self) -> GraphResult<Vec<PropertyMap>> {
        self.terminate(|_, traversers| {
            traversers
                .into_iter()
                .filter_map(|t| match t {
                    Traverser::Map(m) => Some(m),
                    _ => None,
                })
                .collect()
        })
    }

    /// First vertex, or [`GraphError::NoSuchElement`]
    pub fn next_vertex(self) -> GraphResult<Vertex> {
        self.terminate(|store, traversers| {
            traversers
                .iter()
                .filter_map(Traverser::as_vertex)
                .find_map(|id| store.vertex(id).cloned())
        })?
        .ok_or(GraphError::NoSuchElement)
    }

    /// First edge, or [`GraphError::NoSuchElement`]
    pub fn next_edge(self) -> GraphResult<Edge> {
        self.terminate(|store, traversers| {
            traversers
                .iter()
                .filter_map(Traverser::as_edge)
                .find_map(|id| store.edge(id).cloned())
        })?
        .ok_or(GraphError::NoSuchElement)
    }

    /// First value, or [`GraphError::NoSuchElement`]
    pub fn next_value(self) -> GraphResult<PropertyValue> {
        self.to_values()?.into_iter().next().ok_or(GraphError::NoSuchElement)
    }

    pub fn try_next(self) -> GraphResult<Option<Traverser>> {
        self.terminate(|_, traversers| traversers.into_iter().next())
    }

    pub fn has_next(self) -> GraphResult<bool> {
        self.terminate(|_, traversers| !traversers.is_empty())
    }

    pub fn count(self) -> GraphResult<usize> {
        self.terminate(|_, traversers| traversers.len())
    }

    /// Run the traversal for its side effects
    pub fn iterate(self) -> GraphResult<()> {
        self.terminate(|_, _| ())
    }
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn borrowed(items: &[String]) -> Vec<&str> {
    items.iter().map(String::as_str).collect()
}
