//! Traversal sources and their transactions

use super::graph::Graph;
use super::step::{Start, Traversal, Traverser};
use crate::graph::{GraphError, GraphResult, GraphStore, Label, PropertyMap, VertexId};
use tracing::debug;

/// Working copy of the committed store
pub(crate) struct Transaction {
    base_version: u64,
    store: GraphStore,
    dirty: bool,
}

impl Transaction {
    pub(crate) fn read(&self) -> &GraphStore {
        &self.store
    }

    pub(crate) fn write(&mut self) -> &mut GraphStore {
        self.dirty = true;
        &mut self.store
    }
}

/// Entry point for traversals, the `g` of a graph
///
/// The first step run through a source opens a transaction on a private copy
/// of the committed graph. It stays open until [`Tx::commit`] or
/// [`Tx::rollback`]; without transaction support every terminal step commits.
pub struct GraphTraversalSource {
    graph: Graph,
    tx: Option<Transaction>,
    closed: bool,
}

impl GraphTraversalSource {
    pub(crate) fn new(graph: Graph) -> Self {
        GraphTraversalSource {
            graph,
            tx: None,
            closed: false,
        }
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// All vertices
    pub fn v(&mut self) -> Traversal<'_> {
        Traversal::start(self, Start::Vertices)
    }

    /// The given vertices, skipping ids that do not exist
    pub fn v_ids(&mut self, ids: impl IntoIterator<Item = VertexId>) -> Traversal<'_> {
        let ids: Vec<VertexId> = ids.into_iter().collect();
        Traversal::new(self).step(move |tx, _| {
            Ok(ids
                .into_iter()
                .filter(|id| tx.read().has_vertex(*id))
                .map(Traverser::Vertex)
                .collect())
        })
    }

    /// All edges
    pub fn e(&mut self) -> Traversal<'_> {
        Traversal::start(self, Start::Edges)
    }

    /// Create a vertex; chain `property` to fill it in
    pub fn add_v(&mut self, label: &str) -> Traversal<'_> {
        let label = Label::new(label);
        Traversal::new(self).step(move |tx, _| {
            let id = tx.write().add_vertex(label, PropertyMap::new())?;
            Ok(vec![Traverser::Vertex(id)])
        })
    }

    /// Create an edge `from -> to`; chain `property` to fill it in
    pub fn add_e(&mut self, label: &str, from: VertexId, to: VertexId) -> Traversal<'_> {
        let label = Label::new(label);
        Traversal::new(self).step(move |tx, _| {
            let id = tx.write().add_edge(label, from, to, PropertyMap::new())?;
            Ok(vec![Traverser::Edge(id)])
        })
    }

    /// Transaction control
    pub fn tx(&mut self) -> Tx<'_> {
        Tx { source: self }
    }

    /// Roll back any open transaction and refuse further traversals
    pub fn close(&mut self) -> GraphResult<()> {
        self.rollback();
        self.closed = true;
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// The open transaction, beginning one if needed
    pub(crate) fn transaction(&mut self) -> GraphResult<&mut Transaction> {
        if self.closed || self.graph.is_closed() {
            self.tx = None;
            return Err(GraphError::Closed);
        }
        let tx = match self.tx.take() {
            Some(tx) => tx,
            None => {
                let (base_version, store) = self.graph.begin()?;
                debug!(base_version, "Transaction opened");
                Transaction {
                    base_version,
                    store,
                    dirty: false,
                }
            }
        };
        Ok(self.tx.insert(tx))
    }

    /// Called by every terminal step that succeeded
    pub(crate) fn end_step(&mut self) -> GraphResult<()> {
        if self.graph.features().supports_transactions {
            Ok(())
        } else {
            self.commit()
        }
    }

    /// Called by every terminal step that failed
    pub(crate) fn abort_step(&mut self) {
        if !self.graph.features().supports_transactions {
            self.rollback();
        }
    }

    fn commit(&mut self) -> GraphResult<()> {
        let Some(tx) = self.tx.take() else {
            return Ok(());
        };
        if !tx.dirty {
            return Ok(());
        }
        self.graph.commit(tx.base_version, tx.store)
    }

    fn rollback(&mut self) {
        if let Some(tx) = self.tx.take() {
            debug!(base_version = tx.base_version, dirty = tx.dirty, "Transaction rolled back");
        }
    }
}

/// Handle returned by [`GraphTraversalSource::tx`]
pub struct Tx<'a> {
    source: &'a mut GraphTraversalSource,
}

impl Tx<'_> {
    /// Publish the transaction's changes
    ///
    /// Fails with [`GraphError::Conflict`] when another commit landed since
    /// the transaction began; the changes are discarded either way.
    pub fn commit(self) -> GraphResult<()> {
        self.source.commit()
    }

    /// Discard the transaction's changes
    pub fn rollback(self) {
        self.source.rollback()
    }

    /// Whether a transaction is currently open
    pub fn is_open(&self) -> bool {
        self.source.tx.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GraphConfig, STORAGE_TRANSACTIONS};
    use crate::traversal::GraphFactory;

    fn open(config: GraphConfig) -> Graph {
        GraphFactory::open(&config).unwrap()
    }

    #[test]
    fn test_transaction_opens_lazily() {
        let graph = open(GraphConfig::in_memory());
        let mut g = graph.traversal();
        assert!(!g.tx().is_open());
        assert_eq!(g.v().count().unwrap(), 0);
        assert!(g.tx().is_open());
        g.tx().rollback();
        assert!(!g.tx().is_open());
    }

    #[test]
    fn test_rollback_discards_writes() {
        let graph = open(GraphConfig::in_memory());
        let mut g = graph.traversal();
        g.add_v("god").property("name", "jupiter").iterate().unwrap();
        assert_eq!(g.v().count().unwrap(), 1);
        g.tx().rollback();
        assert_eq!(g.v().count().unwrap(), 0);
    }

    #[test]
    fn test_commit_is_visible_to_other_sources() {
        let graph = open(GraphConfig::in_memory());
        let mut g1 = graph.traversal();
        let mut g2 = graph.traversal();
        g1.add_v("god").property("name", "jupiter").iterate().unwrap();
        assert_eq!(g2.v().count().unwrap(), 0);
        g2.tx().rollback();

        g1.tx().commit().unwrap();
        assert_eq!(g2.v().count().unwrap(), 1);
    }

    #[test]
    fn test_conflicting_commit_is_rejected() {
        let graph = open(GraphConfig::in_memory());
        let mut g1 = graph.traversal();
        let mut g2 = graph.traversal();
        g1.add_v("god").iterate().unwrap();
        g2.add_v("titan").iterate().unwrap();

        g1.tx().commit().unwrap();
        assert!(matches!(g2.tx().commit(), Err(GraphError::Conflict)));
        assert!(!g2.tx().is_open());
        assert_eq!(g2.v().has_label(&["titan"]).count().unwrap(), 0);
    }

    #[test]
    fn test_read_only_commit_never_conflicts() {
        let graph = open(GraphConfig::in_memory());
        let mut reader = graph.traversal();
        let mut writer = graph.traversal();
        assert_eq!(reader.v().count().unwrap(), 0);
        writer.add_v("god").iterate().unwrap();
        writer.tx().commit().unwrap();
        reader.tx().commit().unwrap();
    }

    #[test]
    fn test_auto_commit_without_transactions() {
        let graph = open(GraphConfig::in_memory().with(STORAGE_TRANSACTIONS, "false"));
        assert!(!graph.features().supports_transactions);
        let mut g = graph.traversal();
        g.add_v("god").property("name", "jupiter").iterate().unwrap();
        g.tx().rollback();
        assert_eq!(g.v().count().unwrap(), 1);
    }

    #[test]
    fn test_closed_source_and_graph() {
        let graph = open(GraphConfig::in_memory());
        let mut g = graph.traversal();
        g.close().unwrap();
        assert!(matches!(g.v().count(), Err(GraphError::Closed)));

        let mut g = graph.traversal();
        graph.close().unwrap();
        assert!(matches!(g.v().to_list(), Err(GraphError::Closed)));
    }
}
