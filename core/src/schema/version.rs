//! Immutable snapshot of a table schema at one point in history

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ColmapError, ColmapResult};
use crate::schema::{ColumnId, ColumnSpec, MappingMode, PhysicalSlot, names_match};

/// Table schema at one version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaVersion {
    pub version_number: u64,
    pub mapping_mode: MappingMode,
    pub created_at: DateTime<Utc>,
    pub columns: Vec<ColumnSpec>,
}

impl SchemaVersion {
    pub(crate) fn new(version_number: u64, mapping_mode: MappingMode, columns: Vec<ColumnSpec>) -> Self {
        Self {
            version_number,
            mapping_mode,
            created_at: Utc::now(),
            columns,
        }
    }

    /// Build the next version with the same mode.
    pub(crate) fn successor(&self, columns: Vec<ColumnSpec>) -> Self {
        Self::new(self.version_number + 1, self.mapping_mode, columns)
    }

    /// Case-insensitive lookup by logical name
    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| names_match(&c.logical_name, name))
    }

    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| names_match(&c.logical_name, name))
    }

    pub fn column_by_id(&self, id: ColumnId) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.id() == id)
    }

    pub fn max_column_id(&self) -> Option<ColumnId> {
        self.columns.iter().map(ColumnSpec::id).max()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.logical_name.as_str()).collect()
    }

    /// Check the per-version invariants: distinct names, distinct slots,
    /// and positional slots matching ordinals.
    pub fn validate(&self) -> ColmapResult<()> {
        let mut names = HashSet::new();
        let mut slots = HashSet::new();

        for (position, column) in self.columns.iter().enumerate() {
            if !names.insert(column.logical_name.to_lowercase()) {
                return Err(ColmapError::DuplicateColumnName(column.logical_name.clone()));
            }
            if !slots.insert(column.physical_slot) {
                return Err(ColmapError::Corruption(format!(
                    "slot {} assigned twice in version {}",
                    column.physical_slot, self.version_number
                )));
            }

            let expected = self.mapping_mode.slot_for(position, column.id());
            if column.physical_slot != expected {
                return Err(ColmapError::Corruption(format!(
                    "column '{}' has slot {} but mode '{}' requires {}",
                    column.logical_name, column.physical_slot, self.mapping_mode, expected
                )));
            }
        }

        Ok(())
    }

    /// Slots a file written under this version contains
    pub fn physical_slots(&self) -> Vec<PhysicalSlot> {
        self.columns.iter().map(|c| c.physical_slot).collect()
    }
}
