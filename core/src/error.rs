use thiserror::Error;

use crate::schema::MappingMode;

pub type ColmapResult<T> = Result<T, ColmapError>;

/// Errors returned by schema evolution, resolution and the schema log.
///
/// Every variant is a value handed back to the caller. Only
/// [`ColmapError::NonMonotonicVersion`] is worth retrying: it means another
/// writer appended first, and resubmitting against the new latest version
/// may succeed.
#[derive(Error, Debug)]
pub enum ColmapError {
    #[error("Cannot change column mapping mode from '{current}' to '{requested}' on an existing table")]
    IllegalModeChange {
        current: MappingMode,
        requested: MappingMode,
    },

    #[error("{operation} of column '{column}' is not supported with column mapping mode '{mode}'")]
    UnsupportedSchemaEvolution {
        operation: &'static str,
        column: String,
        mode: MappingMode,
    },

    #[error("Column '{column}' must be added at position {required}, not {requested}")]
    PositionConflict {
        column: String,
        requested: usize,
        required: usize,
    },

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Duplicate column name: {0}")]
    DuplicateColumnName(String),

    #[error("Invalid column name '{name}': {reason}")]
    InvalidColumnName { name: String, reason: String },

    #[error("A table must have at least one column")]
    EmptySchema,

    #[error("Schema version {0} not found")]
    VersionNotFound(u64),

    #[error("Expected schema version {expected}, got {actual}")]
    NonMonotonicVersion { expected: u64, actual: u64 },

    #[error("Invalid table property {key} = '{value}'")]
    InvalidProperty { key: String, value: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Schema log corrupted: {0}")]
    Corruption(String),

    #[error("Schema log {} already holds versions", .0.display())]
    LogNotEmpty(std::path::PathBuf),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ColmapError {
    /// Whether resubmitting the same operation against a fresh `latest()`
    /// can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ColmapError::NonMonotonicVersion { .. })
    }

    /// Get a short error kind name
    pub fn kind(&self) -> &'static str {
        match self {
            ColmapError::IllegalModeChange { .. } => "illegal_mode_change",
            ColmapError::UnsupportedSchemaEvolution { .. } => "unsupported_schema_evolution",
            ColmapError::PositionConflict { .. } => "position_conflict",
            ColmapError::ColumnNotFound(_) => "column_not_found",
            ColmapError::DuplicateColumnName(_) => "duplicate_column_name",
            ColmapError::InvalidColumnName { .. } => "invalid_column_name",
            ColmapError::EmptySchema => "empty_schema",
            ColmapError::VersionNotFound(_) => "version_not_found",
            ColmapError::NonMonotonicVersion { .. } => "non_monotonic_version",
            ColmapError::InvalidProperty { .. } => "invalid_property",
            ColmapError::Io(_) => "io_error",
            ColmapError::Serialization(_) => "serialization_error",
            ColmapError::Corruption(_) => "corruption",
            ColmapError::LogNotEmpty(_) => "log_not_empty",
            ColmapError::Config(_) => "config_error",
        }
    }
}
