//! Column mapping modes

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ColmapError, ColmapResult};
use crate::schema::{ColumnId, PhysicalSlot};

/// How logical columns are bound to physical storage.
///
/// Chosen once when a table is created. A table never holds a setter for
/// it, so the only way to obtain a mode for a table is
/// [`MappingMode::apply_at_creation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MappingMode {
    /// Positional: the physical slot is the ordinal position in the schema
    None,
    /// Id based: the physical slot is the column's durable id
    Name,
}

impl MappingMode {
    /// Resolve the mode a new table starts with. Absent requests fall back
    /// to positional mapping.
    pub fn apply_at_creation(requested: Option<MappingMode>) -> MappingMode {
        requested.unwrap_or(MappingMode::None)
    }

    /// Check a later request against the mode fixed at creation. Asking for
    /// the same mode again is not a change.
    pub fn ensure_unchanged(self, requested: MappingMode) -> ColmapResult<()> {
        if self == requested {
            Ok(())
        } else {
            Err(ColmapError::IllegalModeChange {
                current: self,
                requested,
            })
        }
    }

    /// Rename and drop only keep older files readable when slots are ids.
    pub fn supports_rename_and_drop(self) -> bool {
        matches!(self, MappingMode::Name)
    }

    /// Physical slot for a column at `position` carrying `id`.
    pub fn slot_for(self, position: usize, id: ColumnId) -> PhysicalSlot {
        match self {
            MappingMode::None => PhysicalSlot::Position(position),
            MappingMode::Name => PhysicalSlot::FieldId(id),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MappingMode::None => "none",
            MappingMode::Name => "name",
        }
    }
}

impl fmt::Display for MappingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MappingMode {
    type Err = ColmapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" => Ok(MappingMode::None),
            "name" => Ok(MappingMode::Name),
            _ => Err(ColmapError::InvalidProperty {
                key: super::COLUMN_MAPPING_MODE.to_string(),
                value: s.to_string(),
            }),
        }
    }
}
