//! Schema metadata: column identities, mapping modes and schema versions

pub mod column;
pub mod mode;
pub mod properties;
pub mod types;
pub mod version;

pub use column::{ColumnDef, ColumnId, ColumnIdentity, ColumnSpec, PhysicalSlot};
pub use mode::MappingMode;
pub use properties::{COLUMN_MAPPING_MODE, TableProperties};
pub use types::{DataType, StructField};
pub use version::SchemaVersion;

/// Case-insensitive name comparison used for every logical column lookup.
pub(crate) fn names_match(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}
