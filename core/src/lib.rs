//! Column mapping metadata layer for lakehouse tables
//!
//! Tracks each table's schema as an append-only sequence of versions and
//! decides, per mapping mode, which rename/drop/add operations are legal
//! and how logical columns resolve to physical slots in data files
//! written under any earlier version.

pub mod config;
pub mod error;
pub mod evolution;
pub mod history;
pub mod layout;
pub mod schema;
pub mod storage;
pub mod table;

pub use config::Config;
pub use error::{ColmapError, ColmapResult};
pub use evolution::{ColumnPosition, IdAllocator, SchemaEvolutionEngine};
pub use history::VersionHistory;
pub use layout::{PhysicalLayoutResolver, ReadInstruction, ReadProjection};
pub use schema::{
    ColumnDef, ColumnId, ColumnIdentity, ColumnSpec, DataType, MappingMode, PhysicalSlot, SchemaVersion,
    StructField, TableProperties,
};
pub use storage::{HistoryExport, SchemaLog};
pub use table::{DataFile, Table, retry_on_conflict};
