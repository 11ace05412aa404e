//! Column identities and per-version column specs

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ColmapError, ColmapResult};
use crate::schema::{DataType, MappingMode};

/// Characters a positional table cannot carry in a column name, since the
/// logical name doubles as the physical one there.
const INVALID_PHYSICAL_NAME_CHARS: &[char] = &[' ', ',', ';', '{', '}', '(', ')', '\n', '\t', '='];

/// Durable column identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnId(pub u64);

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of one logical column, independent of its current name.
///
/// Only the id allocator hands these out, so an id is assigned exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnIdentity {
    id: ColumnId,
}

impl ColumnIdentity {
    pub(crate) fn new(id: ColumnId) -> Self {
        Self { id }
    }

    pub fn id(&self) -> ColumnId {
        self.id
    }
}

/// Where a column's values live inside a data file
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhysicalSlot {
    Position(usize),
    FieldId(ColumnId),
}

impl fmt::Display for PhysicalSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhysicalSlot::Position(pos) => write!(f, "#{pos}"),
            PhysicalSlot::FieldId(id) => write!(f, "id:{id}"),
        }
    }
}

/// Column as requested by a caller creating or altering a table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
}

impl ColumnDef {
    /// Create a new nullable column
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: true,
        }
    }

    /// Add NOT NULL constraint
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }
}

/// One column as it exists in a single schema version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    #[serde(rename = "id")]
    pub identity: ColumnIdentity,
    #[serde(rename = "name")]
    pub logical_name: String,
    #[serde(rename = "type")]
    pub data_type: DataType,
    pub nullable: bool,
    #[serde(rename = "slot")]
    pub physical_slot: PhysicalSlot,
}

impl ColumnSpec {
    pub fn id(&self) -> ColumnId {
        self.identity.id()
    }

    /// Name of the column inside data files. Id-mapped columns get a name
    /// derived from the id alone, so renames never touch it.
    pub fn physical_name(&self) -> String {
        match self.physical_slot {
            PhysicalSlot::FieldId(id) => format!("col-{id}"),
            PhysicalSlot::Position(_) => self.logical_name.clone(),
        }
    }
}

/// Reject names the given mode cannot store.
pub(crate) fn check_column_name(name: &str, mode: MappingMode) -> ColmapResult<()> {
    if name.trim().is_empty() {
        return Err(ColmapError::InvalidColumnName {
            name: name.to_string(),
            reason: "column names cannot be empty".into(),
        });
    }

    if mode == MappingMode::None && name.contains(INVALID_PHYSICAL_NAME_CHARS) {
        return Err(ColmapError::InvalidColumnName {
            name: name.to_string(),
            reason: "found invalid character(s) among ' ,;{}()\\n\\t=' \
                     (enable column mapping mode 'name' to use them)"
                .into(),
        });
    }

    Ok(())
}
