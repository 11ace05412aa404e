//! Logical to physical column resolution for readers and writers

use crate::error::{ColmapError, ColmapResult};
use crate::schema::{ColumnId, DataType, PhysicalSlot, SchemaVersion};

/// How a reader obtains one query column from one data file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadInstruction {
    /// Read the value stored at `slot` in the file
    Read(PhysicalSlot),
    /// The file predates the column; produce nulls of this type
    NullFill { column: ColumnId, data_type: DataType },
    /// The file still carries this slot but the query schema dropped it
    Ignore(PhysicalSlot),
}

/// Read plan for one file under one query schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadProjection {
    pub file_version: u64,
    pub query_version: u64,
    /// One entry per query column, in query order
    pub columns: Vec<(String, ReadInstruction)>,
    /// Slots present in the file that no query column maps to
    pub ignored: Vec<PhysicalSlot>,
}

/// Resolves logical column names to physical slots
pub struct PhysicalLayoutResolver;

impl PhysicalLayoutResolver {
    /// Physical slot of `logical_name` within `version`
    pub fn resolve(version: &SchemaVersion, logical_name: &str) -> ColmapResult<PhysicalSlot> {
        let column = version
            .column(logical_name)
            .ok_or_else(|| ColmapError::ColumnNotFound(logical_name.to_string()))?;

        tracing::debug!(
            "Resolved '{}' to {} at version {}",
            logical_name,
            column.physical_slot,
            version.version_number
        );
        Ok(column.physical_slot)
    }

    /// Resolve a column for reading a file written under `file_version`
    /// while querying as of `query_version`.
    ///
    /// Columns are matched by identity, never by name, so a renamed
    /// column still finds its data in files written before the rename.
    pub fn resolve_for_read(
        file_version: &SchemaVersion,
        query_version: &SchemaVersion,
        logical_name: &str,
    ) -> ColmapResult<ReadInstruction> {
        if let Some(column) = query_version.column(logical_name) {
            return Ok(match file_version.column_by_id(column.id()) {
                Some(stored) => ReadInstruction::Read(stored.physical_slot),
                None => ReadInstruction::NullFill {
                    column: column.id(),
                    data_type: column.data_type.clone(),
                },
            });
        }

        match file_version.column(logical_name) {
            Some(stored) if query_version.column_by_id(stored.id()).is_none() => {
                Ok(ReadInstruction::Ignore(stored.physical_slot))
            }
            _ => Err(ColmapError::ColumnNotFound(logical_name.to_string())),
        }
    }

    /// Build the full projection for one file: every query column in query
    /// order plus the file slots the query no longer references.
    pub fn project(file_version: &SchemaVersion, query_version: &SchemaVersion) -> ReadProjection {
        let columns = query_version
            .columns
            .iter()
            .map(|column| {
                let instruction = match file_version.column_by_id(column.id()) {
                    Some(stored) => ReadInstruction::Read(stored.physical_slot),
                    None => ReadInstruction::NullFill {
                        column: column.id(),
                        data_type: column.data_type.clone(),
                    },
                };
                (column.logical_name.clone(), instruction)
            })
            .collect();

        let ignored = file_version
            .columns
            .iter()
            .filter(|stored| query_version.column_by_id(stored.id()).is_none())
            .map(|stored| stored.physical_slot)
            .collect();

        ReadProjection {
            file_version: file_version.version_number,
            query_version: query_version.version_number,
            columns,
            ignored,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evolution::{ColumnPosition, SchemaEvolutionEngine};
    use crate::schema::{ColumnDef, MappingMode};
    use pretty_assertions::assert_eq;

    fn versions() -> (SchemaVersion, SchemaVersion, SchemaVersion) {
        let engine = SchemaEvolutionEngine::default();
        let v0 = engine
            .create(
                MappingMode::Name,
                vec![
                    ColumnDef::new("id", DataType::Integer),
                    ColumnDef::new("first name", DataType::String),
                    ColumnDef::new("department", DataType::String),
                ],
            )
            .unwrap();
        let v1 = engine.rename_column(&v0, "first name", "full_name").unwrap();
        let v2 = engine.drop_column(&v1, "department").unwrap();
        let v3 = engine
            .add_column(&v2, ColumnDef::new("email", DataType::String), ColumnPosition::Last)
            .unwrap();
        (v0, v1, v3)
    }

    #[test]
    fn test_resolve_by_mode() {
        let (v0, _, _) = versions();
        assert_eq!(
            PhysicalLayoutResolver::resolve(&v0, "First Name").unwrap(),
            PhysicalSlot::FieldId(ColumnId(2))
        );
        assert!(matches!(
            PhysicalLayoutResolver::resolve(&v0, "email"),
            Err(ColmapError::ColumnNotFound(_))
        ));

        let engine = SchemaEvolutionEngine::default();
        let positional = engine
            .create(
                MappingMode::None,
                vec![
                    ColumnDef::new("id", DataType::Integer),
                    ColumnDef::new("firstname", DataType::String),
                ],
            )
            .unwrap();
        assert_eq!(
            PhysicalLayoutResolver::resolve(&positional, "firstname").unwrap(),
            PhysicalSlot::Position(1)
        );
    }

    #[test]
    fn test_renamed_column_reads_old_slot() {
        let (v0, _, v3) = versions();
        assert_eq!(
            PhysicalLayoutResolver::resolve_for_read(&v0, &v3, "full_name").unwrap(),
            ReadInstruction::Read(PhysicalSlot::FieldId(ColumnId(2)))
        );
    }

    #[test]
    fn test_added_column_is_null_filled() {
        let (v0, _, v3) = versions();
        assert_eq!(
            PhysicalLayoutResolver::resolve_for_read(&v0, &v3, "email").unwrap(),
            ReadInstruction::NullFill {
                column: ColumnId(4),
                data_type: DataType::String,
            }
        );
    }

    #[test]
    fn test_dropped_column_is_ignored() {
        let (v0, _, v3) = versions();
        assert_eq!(
            PhysicalLayoutResolver::resolve_for_read(&v0, &v3, "department").unwrap(),
            ReadInstruction::Ignore(PhysicalSlot::FieldId(ColumnId(3)))
        );
        assert!(PhysicalLayoutResolver::resolve_for_read(&v0, &v3, "missing").is_err());
    }

    #[test]
    fn test_old_name_does_not_alias_renamed_column() {
        let (v0, _, v3) = versions();
        // "first name" only exists in the file schema, but its identity is
        // still live in the query schema under another name.
        assert!(matches!(
            PhysicalLayoutResolver::resolve_for_read(&v0, &v3, "first name"),
            Err(ColmapError::ColumnNotFound(_))
        ));
    }

    #[test]
    fn test_projection() {
        let (v0, v1, v3) = versions();
        let projection = PhysicalLayoutResolver::project(&v0, &v3);

        assert_eq!(
            projection.columns,
            vec![
                (
                    "id".to_string(),
                    ReadInstruction::Read(PhysicalSlot::FieldId(ColumnId(1)))
                ),
                (
                    "full_name".to_string(),
                    ReadInstruction::Read(PhysicalSlot::FieldId(ColumnId(2)))
                ),
                (
                    "email".to_string(),
                    ReadInstruction::NullFill {
                        column: ColumnId(4),
                        data_type: DataType::String,
                    }
                ),
            ]
        );
        assert_eq!(projection.ignored, vec![PhysicalSlot::FieldId(ColumnId(3))]);

        let same = PhysicalLayoutResolver::project(&v1, &v1);
        assert!(same.ignored.is_empty());
        for (name, instruction) in &same.columns {
            assert_eq!(
                *instruction,
                ReadInstruction::Read(PhysicalLayoutResolver::resolve(&v1, name).unwrap())
            );
        }
    }
}
