//! Graph handle and factory
//!
//! A [`Graph`] is a cheap, cloneable handle on one committed [`GraphStore`].
//! Traversal sources copy the committed store when their transaction begins
//! and hand the working copy back on commit.

use super::source::GraphTraversalSource;
use crate::config::{GraphConfig, StorageBackend};
use crate::graph::{Edge, GraphError, GraphResult, GraphStore, Vertex};
use crate::persistence::{SnapshotStore, StoreSnapshot};
use crate::schema::{Management, Schema, SchemaDefault};
use std::path::Path;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

/// Capabilities of an open graph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Features {
    /// `false` means every terminal step commits on its own
    pub supports_transactions: bool,
    pub supports_schema: bool,
    pub supports_persistence: bool,
}

struct GraphInner {
    store: GraphStore,
    snapshot: Option<SnapshotStore>,
    closed: bool,
}

impl GraphInner {
    fn ensure_open(&self) -> GraphResult<()> {
        if self.closed {
            Err(GraphError::Closed)
        } else {
            Ok(())
        }
    }

    fn ensure_version(&self, base_version: u64) -> GraphResult<()> {
        if self.store.version() != base_version {
            return Err(GraphError::Conflict);
        }
        Ok(())
    }

    /// Publish `store` as the next committed version
    fn publish(&mut self, mut store: GraphStore) -> GraphResult<()> {
        store.set_version(self.store.version() + 1);
        if let Some(snapshot) = &self.snapshot {
            snapshot.save(&snapshot_of(&store))?;
        }
        self.store = store;
        Ok(())
    }
}

struct Shared {
    config: GraphConfig,
    features: Features,
}

/// Handle on an open graph
#[derive(Clone)]
pub struct Graph {
    inner: Arc<RwLock<GraphInner>>,
    shared: Arc<Shared>,
}

impl Graph {
    fn new(
        config: GraphConfig,
        features: Features,
        store: GraphStore,
        snapshot: Option<SnapshotStore>,
    ) -> Self {
        Graph {
            inner: Arc::new(RwLock::new(GraphInner {
                store,
                snapshot,
                closed: false,
            })),
            shared: Arc::new(Shared { config, features }),
        }
    }

    /// Configuration the graph was opened with
    pub fn config(&self) -> &GraphConfig {
        &self.shared.config
    }

    pub fn features(&self) -> Features {
        self.shared.features
    }

    pub fn name(&self) -> &str {
        self.shared.config.graph_name()
    }

    /// A new traversal source with its own transaction
    pub fn traversal(&self) -> GraphTraversalSource {
        GraphTraversalSource::new(self.clone())
    }

    /// Start a schema management transaction
    pub fn open_management(&self) -> GraphResult<Management> {
        let inner = self.read()?;
        inner.ensure_open()?;
        Ok(Management::new(
            self.clone(),
            inner.store.schema().clone(),
            inner.store.version(),
        ))
    }

    /// Version of the committed store
    pub fn version(&self) -> GraphResult<u64> {
        let inner = self.read()?;
        inner.ensure_open()?;
        Ok(inner.store.version())
    }

    /// Close the graph; open traversal sources fail from now on
    pub fn close(&self) -> GraphResult<()> {
        let mut inner = self.write()?;
        if !inner.closed {
            inner.closed = true;
            info!("Closed graph '{}'", self.name());
        }
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.read().map_or(true, |inner| inner.closed)
    }

    /// Copy of the committed store for a new transaction
    pub(crate) fn begin(&self) -> GraphResult<(u64, GraphStore)> {
        let inner = self.read()?;
        inner.ensure_open()?;
        Ok((inner.store.version(), inner.store.clone()))
    }

    /// Publish a transaction's working copy
    pub(crate) fn commit(&self, base_version: u64, store: GraphStore) -> GraphResult<()> {
        let mut inner = self.write()?;
        inner.ensure_open()?;
        inner.ensure_version(base_version)?;
        inner.publish(store)?;
        debug!(version = inner.store.version(), "Transaction committed");
        Ok(())
    }

    /// Install a schema built by a management transaction
    pub(crate) fn install_schema(&self, base_version: u64, schema: Schema) -> GraphResult<()> {
        let mut inner = self.write()?;
        inner.ensure_open()?;
        inner.ensure_version(base_version)?;
        let mut store = inner.store.clone();
        store.install_schema(schema)?;
        inner.publish(store)?;
        info!(
            property_keys = inner.store.schema().property_keys.len(),
            vertex_labels = inner.store.schema().vertex_labels.len(),
            edge_labels = inner.store.schema().edge_labels.len(),
            indexes = inner.store.schema().indexes.len(),
            "Schema installed"
        );
        Ok(())
    }

    fn read(&self) -> GraphResult<RwLockReadGuard<'_, GraphInner>> {
        self.inner.read().map_err(|_| GraphError::Poisoned)
    }

    fn write(&self) -> GraphResult<RwLockWriteGuard<'_, GraphInner>> {
        self.inner.write().map_err(|_| GraphError::Poisoned)
    }
}

impl std::fmt::Debug for Graph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Graph")
            .field("name", &self.name())
            .field("features", &self.shared.features)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Opens and drops graphs
pub struct GraphFactory;

impl GraphFactory {
    /// Open a graph, loading the `local` backend's snapshot when one exists
    pub fn open(config: &GraphConfig) -> GraphResult<Graph> {
        let backend = config.storage_backend()?;
        let default = config.schema_default()?;
        let features = Features {
            supports_transactions: config.transactions_enabled()?,
            supports_schema: true,
            supports_persistence: matches!(backend, StorageBackend::Local(_)),
        };

        let (store, snapshot) = match backend {
            StorageBackend::InMemory => (GraphStore::new(Schema::new(default)), None),
            StorageBackend::Local(dir) => {
                let snapshot = SnapshotStore::open(&dir)?;
                let store = match snapshot.load()? {
                    Some(saved) => store_from_snapshot(saved, default)?,
                    None => GraphStore::new(Schema::new(default)),
                };
                (store, Some(snapshot))
            }
        };

        info!(
            "Opened graph '{}' ({} vertices, {} edges, transactions: {})",
            config.graph_name(),
            store.vertex_count(),
            store.edge_count(),
            features.supports_transactions
        );
        Ok(Graph::new(config.clone(), features, store, snapshot))
    }

    /// Read a properties file and open the graph it describes
    pub fn open_file(path: impl AsRef<Path>) -> GraphResult<Graph> {
        let path = path.as_ref();
        debug!("Reading graph configuration from {}", path.display());
        let config = GraphConfig::from_file(path)?;
        Self::open(&config)
    }

    /// Remove all data and schema, delete on-disk storage and close the graph
    pub fn drop(graph: &Graph) -> GraphResult<()> {
        let mut inner = graph.write()?;
        inner.store.clear();
        if let Some(snapshot) = inner.snapshot.take() {
            snapshot.destroy()?;
        }
        if inner.closed {
            warn!("Dropping graph '{}' that was already closed", graph.name());
        }
        inner.closed = true;
        info!("Dropped graph '{}'", graph.name());
        Ok(())
    }
}

fn snapshot_of(store: &GraphStore) -> StoreSnapshot {
    StoreSnapshot::new(
        store.version(),
        store.next_ids(),
        store.schema().clone(),
        store.vertices().cloned().collect::<Vec<Vertex>>(),
        store.edges().cloned().collect::<Vec<Edge>>(),
    )
}

fn store_from_snapshot(snapshot: StoreSnapshot, default: SchemaDefault) -> GraphResult<GraphStore> {
    let mut schema = snapshot.schema;
    schema.default = default;
    GraphStore::from_parts(
        schema,
        snapshot.vertices,
        snapshot.edges,
        snapshot.next_vertex_id,
        snapshot.next_edge_id,
        snapshot.version,
    )
}
