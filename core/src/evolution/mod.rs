//! Schema evolution: validates rename/drop/add against the mapping mode and
//! derives the next schema version.
//!
//! The engine never mutates the version it is given. Every successful
//! operation returns a fresh [`SchemaVersion`] numbered `current + 1`;
//! appending it to the history is the caller's job.

pub mod ids;

pub use ids::IdAllocator;

use std::collections::HashSet;

use crate::error::{ColmapError, ColmapResult};
use crate::schema::column::check_column_name;
use crate::schema::{ColumnDef, ColumnSpec, MappingMode, SchemaVersion};

/// Where `ADD COLUMN` places the new column in the logical order
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ColumnPosition {
    #[default]
    Last,
    First,
    After(String),
}

/// Validates and applies schema changes for a single table
#[derive(Debug, Default)]
pub struct SchemaEvolutionEngine {
    ids: IdAllocator,
}

impl SchemaEvolutionEngine {
    pub fn new(ids: IdAllocator) -> Self {
        Self { ids }
    }

    pub fn ids(&self) -> &IdAllocator {
        &self.ids
    }

    /// Build version 0 from the initial column list.
    pub fn create(&self, mode: MappingMode, columns: Vec<ColumnDef>) -> ColmapResult<SchemaVersion> {
        if columns.is_empty() {
            return Err(ColmapError::EmptySchema);
        }

        let mut seen = HashSet::new();
        for column in &columns {
            check_column_name(&column.name, mode)?;
            if !seen.insert(column.name.to_lowercase()) {
                return Err(ColmapError::DuplicateColumnName(column.name.clone()));
            }
        }

        let specs = columns
            .into_iter()
            .enumerate()
            .map(|(position, def)| {
                let identity = self.ids.allocate();
                ColumnSpec {
                    identity,
                    physical_slot: mode.slot_for(position, identity.id()),
                    logical_name: def.name,
                    data_type: def.data_type,
                    nullable: def.nullable,
                }
            })
            .collect();

        Ok(SchemaVersion::new(0, mode, specs))
    }

    /// Rename a column. Identity, slot and type carry over unchanged.
    ///
    /// Renaming a column to exactly its current name returns `current`
    /// itself (same version number), and the caller appends nothing.
    pub fn rename_column(
        &self,
        current: &SchemaVersion,
        from_name: &str,
        to_name: &str,
    ) -> ColmapResult<SchemaVersion> {
        ensure_supported(current, "RENAME COLUMN", from_name)?;

        let position = current
            .position_of(from_name)
            .ok_or_else(|| ColmapError::ColumnNotFound(from_name.to_string()))?;

        if current.columns[position].logical_name == to_name {
            tracing::debug!("Rename of '{}' to itself is a no-op", to_name);
            return Ok(current.clone());
        }

        check_column_name(to_name, current.mapping_mode)?;
        if let Some(existing) = current.position_of(to_name)
            && existing != position
        {
            return Err(ColmapError::DuplicateColumnName(to_name.to_string()));
        }

        let mut columns = current.columns.clone();
        columns[position].logical_name = to_name.to_string();

        Ok(current.successor(columns))
    }

    /// Drop a column from the current schema. Its id stays in older
    /// versions and is never allocated again.
    pub fn drop_column(&self, current: &SchemaVersion, name: &str) -> ColmapResult<SchemaVersion> {
        ensure_supported(current, "DROP COLUMN", name)?;

        let position = current
            .position_of(name)
            .ok_or_else(|| ColmapError::ColumnNotFound(name.to_string()))?;

        if current.columns.len() == 1 {
            return Err(ColmapError::EmptySchema);
        }

        let mut columns = current.columns.clone();
        columns.remove(position);

        Ok(current.successor(columns))
    }

    /// Add a column with a freshly allocated identity.
    ///
    /// Positional tables only grow at the tail: any other placement fails
    /// with [`ColmapError::PositionConflict`].
    pub fn add_column(
        &self,
        current: &SchemaVersion,
        column: ColumnDef,
        position: ColumnPosition,
    ) -> ColmapResult<SchemaVersion> {
        let mode = current.mapping_mode;
        check_column_name(&column.name, mode)?;

        if current.column(&column.name).is_some() {
            return Err(ColmapError::DuplicateColumnName(column.name));
        }

        let tail = current.columns.len();
        let index = match &position {
            ColumnPosition::Last => tail,
            ColumnPosition::First => 0,
            ColumnPosition::After(anchor) => {
                current
                    .position_of(anchor)
                    .ok_or_else(|| ColmapError::ColumnNotFound(anchor.clone()))?
                    + 1
            }
        };

        if mode == MappingMode::None && index != tail {
            tracing::warn!(
                "Rejected ADD COLUMN '{}' at position {} on positional table (tail is {})",
                column.name,
                index,
                tail
            );
            return Err(ColmapError::PositionConflict {
                column: column.name,
                requested: index,
                required: tail,
            });
        }

        let identity = self.ids.allocate();
        let spec = ColumnSpec {
            identity,
            physical_slot: mode.slot_for(index, identity.id()),
            logical_name: column.name,
            data_type: column.data_type,
            nullable: column.nullable,
        };

        let mut columns = current.columns.clone();
        columns.insert(index, spec);

        Ok(current.successor(columns))
    }
}

fn ensure_supported(current: &SchemaVersion, operation: &'static str, column: &str) -> ColmapResult<()> {
    if current.mapping_mode.supports_rename_and_drop() {
        return Ok(());
    }

    tracing::warn!(
        "Rejected {} of '{}': column mapping mode is '{}'",
        operation,
        column,
        current.mapping_mode
    );
    Err(ColmapError::UnsupportedSchemaEvolution {
        operation,
        column: column.to_string(),
        mode: current.mapping_mode,
    })
}
