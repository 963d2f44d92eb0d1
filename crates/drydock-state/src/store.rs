//! StateStore — redb-backed document store for drydock.
//!
//! Provides typed CRUD over node and task records, plus the conditional
//! taskset swap used by the assignment coordinator. All values are
//! JSON-serialized into redb's `&[u8]` value columns. The store supports
//! both on-disk and in-memory backends (the latter for testing).

use std::path::Path;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use redb::{Database, ReadableDatabase, ReadableTable};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::tables::*;
use crate::types::*;

/// Convert any `Display` error into a `StoreError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StoreError::$variant(e.to_string())
    };
}

/// Outcome of a conditional taskset swap.
#[derive(Debug, Clone, PartialEq)]
pub enum SwapOutcome {
    /// The node's revision matched; the new taskset was written.
    Applied(NodeRecord),
    /// The node changed since it was read; nothing was written.
    Conflict,
    /// No node with the given id exists.
    Absent,
}

/// Thread-safe state store backed by redb.
#[derive(Clone)]
pub struct StateStore {
    db: Arc<Database>,
}

impl StateStore {
    /// Open (or create) a persistent state store at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "state store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory state store (for testing).
    pub fn open_in_memory() -> StoreResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory state store opened");
        Ok(store)
    }

    /// Create all tables if they don't exist yet.
    fn ensure_tables(&self) -> StoreResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        // Opening a table in a write transaction creates it if absent.
        txn.open_table(NODES).map_err(map_err!(Table))?;
        txn.open_table(TASKS).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    // ── Nodes ──────────────────────────────────────────────────────

    /// Insert a new node record.
    ///
    /// Fails with [`StoreError::NameTaken`] if another node already uses
    /// the same name. The uniqueness check and the insert happen in the
    /// same write transaction.
    pub fn insert_node(&self, node: &NodeRecord) -> StoreResult<()> {
        let value = serde_json::to_vec(node).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(NODES).map_err(map_err!(Table))?;
            for entry in table.iter().map_err(map_err!(Read))? {
                let (_, existing) = entry.map_err(map_err!(Read))?;
                let existing: NodeRecord =
                    serde_json::from_slice(existing.value()).map_err(map_err!(Deserialize))?;
                if existing.name == node.name {
                    return Err(StoreError::NameTaken(node.name.clone()));
                }
            }
            table
                .insert(node.id.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(id = %node.id, name = %node.name, "node stored");
        Ok(())
    }

    /// Get a node by id.
    pub fn get_node(&self, node_id: &str) -> StoreResult<Option<NodeRecord>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(NODES).map_err(map_err!(Table))?;
        match table.get(node_id).map_err(map_err!(Read))? {
            Some(guard) => {
                let node: NodeRecord =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(node))
            }
            None => Ok(None),
        }
    }

    /// Get a node by its unique name.
    pub fn get_node_by_name(&self, name: &str) -> StoreResult<Option<NodeRecord>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(NODES).map_err(map_err!(Table))?;
        for entry in table.iter().map_err(map_err!(Read))? {
            let (_, value) = entry.map_err(map_err!(Read))?;
            let node: NodeRecord =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            if node.name == name {
                return Ok(Some(node));
            }
        }
        Ok(None)
    }

    /// List all nodes.
    pub fn list_nodes(&self) -> StoreResult<Vec<NodeRecord>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(NODES).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (_, value) = entry.map_err(map_err!(Read))?;
            let node: NodeRecord =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            results.push(node);
        }
        Ok(results)
    }

    /// Update a node's descriptive fields (name, address, capacity).
    ///
    /// The stored taskset, revision, and creation timestamp are preserved;
    /// taskset changes go through [`StateStore::swap_node_tasks`] only.
    /// Returns false if no node with the given id exists.
    pub fn update_node(&self, node: &NodeRecord) -> StoreResult<bool> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let updated;
        {
            let mut table = txn.open_table(NODES).map_err(map_err!(Table))?;
            let current: Option<NodeRecord> = match table.get(node.id.as_str()).map_err(map_err!(Read))? {
                Some(guard) => {
                    Some(serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?)
                }
                None => None,
            };
            match current {
                Some(current) => {
                    let mut next = node.clone();
                    next.tasks = current.tasks;
                    next.revision = current.revision;
                    next.created_at = current.created_at;
                    next.updated_at = epoch_secs();
                    let value = serde_json::to_vec(&next).map_err(map_err!(Serialize))?;
                    table
                        .insert(node.id.as_str(), value.as_slice())
                        .map_err(map_err!(Write))?;
                    updated = true;
                }
                None => updated = false,
            }
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(updated)
    }

    /// Delete a node by id, returning the deleted record if it existed.
    pub fn delete_node(&self, node_id: &str) -> StoreResult<Option<NodeRecord>> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let deleted;
        {
            let mut table = txn.open_table(NODES).map_err(map_err!(Table))?;
            deleted = match table.remove(node_id).map_err(map_err!(Write))? {
                Some(guard) => {
                    Some(serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?)
                }
                None => None,
            };
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(id = %node_id, existed = deleted.is_some(), "node deleted");
        Ok(deleted)
    }

    /// Conditionally replace a node's taskset.
    ///
    /// The swap applies only if the stored node's revision still equals
    /// `expected_revision`; on a match the new taskset is written, the
    /// revision is bumped, and `updated_at` is refreshed, all inside a
    /// single write transaction. This is the sole mutation path for a
    /// node's taskset — concurrent writers serialize on the revision
    /// check rather than racing read-modify-write.
    pub fn swap_node_tasks(
        &self,
        node_id: &str,
        expected_revision: u64,
        new_tasks: Vec<TaskSnapshot>,
    ) -> StoreResult<SwapOutcome> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let outcome;
        {
            let mut table = txn.open_table(NODES).map_err(map_err!(Table))?;
            let current: Option<NodeRecord> = match table.get(node_id).map_err(map_err!(Read))? {
                Some(guard) => {
                    Some(serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?)
                }
                None => None,
            };
            match current {
                None => outcome = SwapOutcome::Absent,
                Some(node) if node.revision != expected_revision => {
                    debug!(
                        id = %node_id,
                        expected = expected_revision,
                        actual = node.revision,
                        "taskset swap lost the race"
                    );
                    outcome = SwapOutcome::Conflict;
                }
                Some(mut node) => {
                    node.tasks = new_tasks;
                    node.revision += 1;
                    node.updated_at = epoch_secs();
                    let value = serde_json::to_vec(&node).map_err(map_err!(Serialize))?;
                    table
                        .insert(node_id, value.as_slice())
                        .map_err(map_err!(Write))?;
                    outcome = SwapOutcome::Applied(node);
                }
            }
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(outcome)
    }

    // ── Tasks ──────────────────────────────────────────────────────

    /// Insert a new task record. Fails with [`StoreError::NameTaken`] if
    /// another task already uses the same name.
    pub fn insert_task(&self, task: &TaskRecord) -> StoreResult<()> {
        let value = serde_json::to_vec(task).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(TASKS).map_err(map_err!(Table))?;
            for entry in table.iter().map_err(map_err!(Read))? {
                let (_, existing) = entry.map_err(map_err!(Read))?;
                let existing: TaskRecord =
                    serde_json::from_slice(existing.value()).map_err(map_err!(Deserialize))?;
                if existing.name == task.name {
                    return Err(StoreError::NameTaken(task.name.clone()));
                }
            }
            table
                .insert(task.id.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(id = %task.id, name = %task.name, "task stored");
        Ok(())
    }

    /// Get a task by id.
    pub fn get_task(&self, task_id: &str) -> StoreResult<Option<TaskRecord>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(TASKS).map_err(map_err!(Table))?;
        match table.get(task_id).map_err(map_err!(Read))? {
            Some(guard) => {
                let task: TaskRecord =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(task))
            }
            None => Ok(None),
        }
    }

    /// Get a task by its unique name.
    pub fn get_task_by_name(&self, name: &str) -> StoreResult<Option<TaskRecord>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(TASKS).map_err(map_err!(Table))?;
        for entry in table.iter().map_err(map_err!(Read))? {
            let (_, value) = entry.map_err(map_err!(Read))?;
            let task: TaskRecord =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            if task.name == name {
                return Ok(Some(task));
            }
        }
        Ok(None)
    }

    /// List all tasks.
    pub fn list_tasks(&self) -> StoreResult<Vec<TaskRecord>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(TASKS).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (_, value) = entry.map_err(map_err!(Read))?;
            let task: TaskRecord =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            results.push(task);
        }
        Ok(results)
    }

    /// Delete a task by id, returning the deleted record if it existed.
    pub fn delete_task(&self, task_id: &str) -> StoreResult<Option<TaskRecord>> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let deleted;
        {
            let mut table = txn.open_table(TASKS).map_err(map_err!(Table))?;
            deleted = match table.remove(task_id).map_err(map_err!(Write))? {
                Some(guard) => {
                    Some(serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?)
                }
                None => None,
            };
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(id = %task_id, existed = deleted.is_some(), "task deleted");
        Ok(deleted)
    }
}

/// Current Unix epoch in seconds.
fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
