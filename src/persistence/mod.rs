//! Persistence for the `local` storage backend
//!
//! The whole committed store is written as one snapshot file on every
//! commit: bincode-encoded, gzip-compressed, written to a temporary file and
//! renamed into place so a crash never leaves a half-written snapshot.

use crate::graph::{Edge, Vertex};
use crate::schema::Schema;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

pub const SNAPSHOT_FILE: &str = "graph.snapshot";
const SNAPSHOT_FORMAT: u32 = 1;

/// Persistence errors
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("Unsupported snapshot format {0}")]
    UnsupportedFormat(u32),
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Serialized form of a committed graph store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub format: u32,
    pub version: u64,
    pub next_vertex_id: u64,
    pub next_edge_id: u64,
    pub schema: Schema,
    pub vertices: Vec<Vertex>,
    pub edges: Vec<Edge>,
}

impl StoreSnapshot {
    pub fn new(
        version: u64,
        next_ids: (u64, u64),
        schema: Schema,
        vertices: Vec<Vertex>,
        edges: Vec<Edge>,
    ) -> Self {
        StoreSnapshot {
            format: SNAPSHOT_FORMAT,
            version,
            next_vertex_id: next_ids.0,
            next_edge_id: next_ids.1,
            schema,
            vertices,
            edges,
        }
    }
}

/// Snapshot file inside a storage directory
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    /// Open (creating if needed) the storage directory
    pub fn open(dir: impl AsRef<Path>) -> PersistenceResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        info!("Opening snapshot storage at: {}", dir.display());
        Ok(SnapshotStore { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.dir.join(SNAPSHOT_FILE)
    }

    /// Load the latest snapshot, if one was ever written
    pub fn load(&self) -> PersistenceResult<Option<StoreSnapshot>> {
        let path = self.snapshot_path();
        if !path.exists() {
            debug!("No snapshot at {}", path.display());
            return Ok(None);
        }
        let decoder = GzDecoder::new(BufReader::new(File::open(&path)?));
        let snapshot: StoreSnapshot = bincode::deserialize_from(decoder)?;
        if snapshot.format != SNAPSHOT_FORMAT {
            return Err(PersistenceError::UnsupportedFormat(snapshot.format));
        }
        info!(
            vertices = snapshot.vertices.len(),
            edges = snapshot.edges.len(),
            version = snapshot.version,
            "Loaded graph snapshot"
        );
        Ok(Some(snapshot))
    }

    /// Atomically replace the snapshot
    pub fn save(&self, snapshot: &StoreSnapshot) -> PersistenceResult<()> {
        fs::create_dir_all(&self.dir)?;
        let tmp = self.dir.join(format!("{}.tmp", SNAPSHOT_FILE));
        {
            let file = BufWriter::new(File::create(&tmp)?);
            let mut encoder = GzEncoder::new(file, Compression::default());
            bincode::serialize_into(&mut encoder, snapshot)?;
            let mut writer = encoder.finish()?;
            writer.flush()?;
        }
        fs::rename(&tmp, self.snapshot_path())?;
        debug!(version = snapshot.version, "Snapshot written");
        Ok(())
    }

    /// Remove the storage directory and everything in it
    pub fn destroy(&self) -> PersistenceResult<()> {
        if self.dir.exists() {
            fs::remove_dir_all(&self.dir)?;
            info!("Removed snapshot storage at: {}", self.dir.display());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{PropertyValue, VertexId, EdgeId};
    use crate::schema::SchemaDefault;

    fn sample() -> StoreSnapshot {
        let mut saturn = Vertex::new(VertexId::new(1), "titan");
        saturn.set_property("name", "saturn");
        let mut jupiter = Vertex::new(VertexId::new(2), "god");
        jupiter.set_property("name", "jupiter");
        let father = Edge::new(EdgeId::new(1), "father", VertexId::new(2), VertexId::new(1));
        let schema = Schema::new(SchemaDefault::Default);
        StoreSnapshot::new(7, (3, 2), schema, vec![saturn, jupiter], vec![father])
    }

    #[test]
    fn test_load_without_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::open(dir.path().join("graph")).unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::open(dir.path()).unwrap();
        store.save(&sample()).unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.version, 7);
        assert_eq!(loaded.next_vertex_id, 3);
        assert_eq!(loaded.vertices.len(), 2);
        assert_eq!(loaded.vertices[1].property("name"), Some(&PropertyValue::from("jupiter")));
        assert_eq!(loaded.edges[0].label.as_str(), "father");
        assert!(!dir.path().join("graph.snapshot.tmp").exists());
    }

    #[test]
    fn test_destroy_removes_directory() {
        let dir = tempfile::tempdir().unwrap();
        let graph_dir = dir.path().join("gods");
        let store = SnapshotStore::open(&graph_dir).unwrap();
        store.save(&sample()).unwrap();
        store.destroy().unwrap();
        assert!(!graph_dir.exists());
        // destroying twice is harmless
        store.destroy().unwrap();
    }

    #[test]
    fn test_garbage_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::open(dir.path()).unwrap();
        fs::write(store.snapshot_path(), b"not a snapshot").unwrap();
        assert!(store.load().is_err());
    }
}
