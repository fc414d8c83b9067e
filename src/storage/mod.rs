//! Sled-backed world persistence.
//!
//! The whole mutable world is stored as one bincode-encoded [WorldSnapshot]
//! under a single key, rewritten on every save. A schema version inside the
//! record guards against loading snapshots written by an incompatible build;
//! a mismatch is surfaced to the operator instead of silently reinterpreted.
//!
//! Writes go through a write-behind worker so the game task never touches
//! disk: it queues snapshots, the worker collapses any backlog to the newest
//! one and persists that. Closing the queue drains it, which is how shutdown
//! guarantees the final save lands.

use std::path::{Path, PathBuf};

use chrono::Utc;
use log::{debug, error};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::metrics;
use crate::world::types::{WorldSnapshot, SNAPSHOT_SCHEMA_VERSION};

const TREE_WORLD: &str = "undercroft_world";
const SNAPSHOT_KEY: &[u8] = b"world:snapshot";

/// Errors that can arise while interacting with the snapshot store.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("snapshot encoding error: {0}")]
    Bincode(#[from] bincode::Error),

    /// Covers creating the data directory before sled opens it.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored record was written by an incompatible build.
    #[error("schema mismatch for {entity}: expected {expected}, got {found}")]
    SchemaMismatch {
        entity: &'static str,
        expected: u8,
        found: u8,
    },
}

/// Sled-backed persistence for the world snapshot.
pub struct SnapshotStore {
    _db: sled::Db,
    world: sled::Tree,
}

impl SnapshotStore {
    /// Open (or create) the store rooted at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path_ref = path.as_ref();
        std::fs::create_dir_all(path_ref)?;
        let db = sled::open(path_ref)?;
        let world = db.open_tree(TREE_WORLD)?;
        Ok(Self { _db: db, world })
    }

    pub fn path_of(data_dir: &Path) -> PathBuf {
        data_dir.join("world.sled")
    }

    /// Replace the stored snapshot. Schema version and timestamp are stamped
    /// here so callers cannot write a stale header.
    pub fn put_snapshot(&self, mut snapshot: WorldSnapshot) -> Result<(), StorageError> {
        snapshot.schema_version = SNAPSHOT_SCHEMA_VERSION;
        snapshot.saved_at = Utc::now();
        let bytes = bincode::serialize(&snapshot)?;
        self.world.insert(SNAPSHOT_KEY, bytes)?;
        self.world.flush()?;
        Ok(())
    }

    /// The stored snapshot, or `None` on a fresh data directory.
    pub fn get_snapshot(&self) -> Result<Option<WorldSnapshot>, StorageError> {
        let Some(bytes) = self.world.get(SNAPSHOT_KEY)? else {
            return Ok(None);
        };
        let snapshot: WorldSnapshot = bincode::deserialize(&bytes)?;
        if snapshot.schema_version != SNAPSHOT_SCHEMA_VERSION {
            return Err(StorageError::SchemaMismatch {
                entity: "world snapshot",
                expected: SNAPSHOT_SCHEMA_VERSION,
                found: snapshot.schema_version,
            });
        }
        Ok(Some(snapshot))
    }
}

/// Spawn the write-behind persistence task. Queued snapshots are collapsed
/// to the newest before each write. The task ends once every sender is gone
/// and the queue is drained, so awaiting the handle after dropping the
/// sender flushes the final save.
pub fn start_persistence_worker(
    store: SnapshotStore,
) -> (mpsc::UnboundedSender<WorldSnapshot>, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<WorldSnapshot>();
    let task = tokio::spawn(async move {
        while let Some(received) = rx.recv().await {
            let mut snapshot = received;
            let mut coalesced = 0u32;
            while let Ok(newer) = rx.try_recv() {
                snapshot = newer;
                coalesced += 1;
            }
            if coalesced > 0 {
                debug!("coalesced {} queued snapshots", coalesced);
            }
            match store.put_snapshot(snapshot) {
                Ok(()) => metrics::inc_snapshots_saved(),
                Err(err) => {
                    metrics::inc_snapshot_failures();
                    error!("failed to persist world snapshot: {}", err);
                }
            }
        }
        debug!("persistence worker terminated");
    });
    (tx, task)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::types::RoomSave;
    use tempfile::TempDir;

    fn snapshot_with_coins(coins: u32) -> WorldSnapshot {
        let mut snapshot = WorldSnapshot::new();
        snapshot.rooms.insert(
            "r1".to_string(),
            RoomSave {
                coins,
                items: vec!["item_0".to_string()],
            },
        );
        snapshot
    }

    #[test]
    fn snapshot_round_trip() {
        let dir = TempDir::new().expect("tempdir");
        let store = SnapshotStore::open(dir.path()).expect("store");
        assert!(store.get_snapshot().expect("get").is_none());

        store.put_snapshot(snapshot_with_coins(7)).expect("put");
        let fetched = store.get_snapshot().expect("get").expect("present");
        assert_eq!(fetched.schema_version, SNAPSHOT_SCHEMA_VERSION);
        assert_eq!(fetched.rooms["r1"].coins, 7);
        assert_eq!(fetched.rooms["r1"].items, vec!["item_0".to_string()]);
    }

    #[test]
    fn reopen_sees_the_last_write() {
        let dir = TempDir::new().expect("tempdir");
        {
            let store = SnapshotStore::open(dir.path()).expect("store");
            store.put_snapshot(snapshot_with_coins(1)).expect("put");
            store.put_snapshot(snapshot_with_coins(2)).expect("put");
        }
        let store = SnapshotStore::open(dir.path()).expect("reopen");
        let fetched = store.get_snapshot().expect("get").expect("present");
        assert_eq!(fetched.rooms["r1"].coins, 2);
    }

    #[test]
    fn foreign_schema_is_rejected() {
        let dir = TempDir::new().expect("tempdir");
        {
            let db = sled::open(dir.path()).expect("open");
            let tree = db.open_tree(TREE_WORLD).expect("tree");
            let mut snapshot = snapshot_with_coins(1);
            snapshot.schema_version = SNAPSHOT_SCHEMA_VERSION + 1;
            tree.insert(SNAPSHOT_KEY, bincode::serialize(&snapshot).expect("serialize"))
                .expect("insert");
            tree.flush().expect("flush");
        }
        let store = SnapshotStore::open(dir.path()).expect("store");
        match store.get_snapshot() {
            Err(StorageError::SchemaMismatch {
                entity,
                expected,
                found,
            }) => {
                assert_eq!(entity, "world snapshot");
                assert_eq!(expected, SNAPSHOT_SCHEMA_VERSION);
                assert_eq!(found, SNAPSHOT_SCHEMA_VERSION + 1);
            }
            other => panic!("expected schema mismatch, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn worker_drains_the_queue_before_stopping() {
        let dir = TempDir::new().expect("tempdir");
        let store = SnapshotStore::open(dir.path()).expect("store");
        let (tx, task) = start_persistence_worker(store);
        for coins in [1u32, 2, 3] {
            tx.send(snapshot_with_coins(coins)).expect("queue");
        }
        drop(tx);
        task.await.expect("worker ends cleanly");

        let store = SnapshotStore::open(dir.path()).expect("reopen");
        let fetched = store.get_snapshot().expect("get").expect("present");
        assert_eq!(fetched.rooms["r1"].coins, 3);
    }
}
