//! Column id allocation

use std::sync::atomic::{AtomicU64, Ordering};

use crate::history::VersionHistory;
use crate::schema::{ColumnId, ColumnIdentity};

/// Monotonic source of column identities for one table.
///
/// Ids are never handed out twice, even when the operation that asked
/// for one fails afterwards. Gaps are allowed.
#[derive(Debug)]
pub struct IdAllocator {
    next: AtomicU64,
}

impl IdAllocator {
    /// Allocator for a brand new table; the first id is 1.
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Allocator continuing after `max`.
    pub fn starting_after(max: Option<ColumnId>) -> Self {
        let next = max.map_or(1, |id| id.0 + 1);
        Self {
            next: AtomicU64::new(next),
        }
    }

    /// Allocator for a reopened table: continues after the largest id seen
    /// in any version, dropped columns included.
    pub fn from_history(history: &VersionHistory) -> Self {
        let max = history
            .versions()
            .iter()
            .filter_map(|v| v.max_column_id())
            .max();
        Self::starting_after(max)
    }

    pub fn allocate(&self) -> ColumnIdentity {
        let id = ColumnId(self.next.fetch_add(1, Ordering::SeqCst));
        tracing::debug!("Allocated column id {}", id);
        ColumnIdentity::new(id)
    }

    /// Id the next allocation will return
    pub fn peek(&self) -> ColumnId {
        ColumnId(self.next.load(Ordering::SeqCst))
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}
