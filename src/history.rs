//! Versioned dataset history: an arena of immutable snapshots indexed by
//! id, chained through optional `previous`/`next` references.
//!
//! A lineage is a line, not a tree: every snapshot has at most one
//! predecessor and one successor, and deriving from a snapshot that already
//! has a successor is rejected rather than forking the history. Snapshots
//! are append-only; after insertion the only field ever rewritten is the
//! predecessor's `next` link.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{EngineError, Result},
    frame::DataFrame,
    io_utils::FileFormat,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SnapshotId(Uuid);

impl SnapshotId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SnapshotId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for SnapshotId {
    type Err = EngineError;

    fn from_str(value: &str) -> Result<Self> {
        Uuid::parse_str(value)
            .map(SnapshotId)
            .map_err(|_| EngineError::SnapshotNotFound(value.to_string()))
    }
}

/// Where a root snapshot's data came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFile {
    pub path: PathBuf,
    pub format: FileFormat,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetSnapshot {
    pub id: SnapshotId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub source: Option<SourceFile>,
    pub frame: DataFrame,
    pub previous: Option<SnapshotId>,
    pub next: Option<SnapshotId>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotArena {
    snapshots: HashMap<SnapshotId, DatasetSnapshot>,
    order: Vec<SnapshotId>,
}

impl SnapshotArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn get(&self, id: SnapshotId) -> Option<&DatasetSnapshot> {
        self.snapshots.get(&id)
    }

    fn require(&self, id: SnapshotId) -> Result<&DatasetSnapshot> {
        self.get(id)
            .ok_or_else(|| EngineError::SnapshotNotFound(id.to_string()))
    }

    /// Inserts a lineage root with no predecessor.
    pub fn insert_root(
        &mut self,
        name: impl Into<String>,
        source: Option<SourceFile>,
        frame: DataFrame,
    ) -> SnapshotId {
        let id = SnapshotId::new();
        self.snapshots.insert(
            id,
            DatasetSnapshot {
                id,
                name: name.into(),
                created_at: Utc::now(),
                source,
                frame,
                previous: None,
                next: None,
            },
        );
        self.order.push(id);
        id
    }

    /// Derives a child snapshot, linking `previous <-> next`. Deriving from
    /// a snapshot that already has a successor would fork the lineage and
    /// is rejected.
    pub fn derive(
        &mut self,
        parent: SnapshotId,
        name: impl Into<String>,
        frame: DataFrame,
    ) -> Result<SnapshotId> {
        let existing_next = self.require(parent)?.next;
        if let Some(next) = existing_next {
            return Err(EngineError::LineageConflict(format!(
                "snapshot {parent} already has successor {next}"
            )));
        }
        let id = SnapshotId::new();
        self.snapshots.insert(
            id,
            DatasetSnapshot {
                id,
                name: name.into(),
                created_at: Utc::now(),
                source: None,
                frame,
                previous: Some(parent),
                next: None,
            },
        );
        self.order.push(id);
        if let Some(parent_snapshot) = self.snapshots.get_mut(&parent) {
            parent_snapshot.next = Some(id);
        }
        Ok(id)
    }

    /// The full chain containing `id`, root first. The arena only ever
    /// links freshly inserted snapshots, so the walk cannot cycle.
    pub fn lineage(&self, id: SnapshotId) -> Result<Vec<&DatasetSnapshot>> {
        let mut root = self.require(id)?;
        while let Some(previous) = root.previous {
            root = self.require(previous)?;
        }
        let mut chain = vec![root];
        let mut cursor = root;
        while let Some(next) = cursor.next {
            cursor = self.require(next)?;
            chain.push(cursor);
        }
        Ok(chain)
    }

    /// Snapshots in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &DatasetSnapshot> {
        self.order.iter().filter_map(|id| self.snapshots.get(id))
    }
}
