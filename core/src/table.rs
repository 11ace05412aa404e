//! Table facade: one version history, one mapping mode, one id allocator

use std::sync::Arc;

use crate::error::{ColmapError, ColmapResult};
use crate::evolution::{ColumnPosition, IdAllocator, SchemaEvolutionEngine};
use crate::history::VersionHistory;
use crate::layout::{PhysicalLayoutResolver, ReadInstruction, ReadProjection};
use crate::schema::{ColumnDef, MappingMode, PhysicalSlot, SchemaVersion, TableProperties};
use crate::storage::SchemaLog;

/// A data file, tagged with the schema version it was written under.
/// The metadata layer never rewrites files; it only reads this tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DataFile {
    pub path: String,
    pub schema_version: u64,
}

/// A table's schema metadata.
///
/// Writers go through [`Table::commit`], which appends only if no other
/// writer got there first. Readers pin a [`SchemaVersion`] with
/// [`Table::snapshot`] and keep resolving against it for the whole read.
pub struct Table {
    name: String,
    mode: MappingMode,
    properties: TableProperties,
    history: Arc<VersionHistory>,
    engine: SchemaEvolutionEngine,
    log: Option<SchemaLog>,
}

impl Table {
    /// Create a table at version 0
    pub fn create(name: impl Into<String>, columns: Vec<ColumnDef>, properties: TableProperties) -> ColmapResult<Self> {
        Self::create_inner(name.into(), columns, properties, None)
    }

    /// Create a table whose versions are persisted to `log`. The log
    /// must be empty; use [`Table::open_from_log`] to continue one.
    pub fn create_with_log(
        name: impl Into<String>,
        columns: Vec<ColumnDef>,
        properties: TableProperties,
        log: SchemaLog,
    ) -> ColmapResult<Self> {
        Self::create_inner(name.into(), columns, properties, Some(log))
    }

    fn create_inner(
        name: String,
        columns: Vec<ColumnDef>,
        properties: TableProperties,
        log: Option<SchemaLog>,
    ) -> ColmapResult<Self> {
        if let Some(log) = &log
            && !log.is_empty()?
        {
            return Err(ColmapError::LogNotEmpty(log.path().to_path_buf()));
        }

        let mode = MappingMode::apply_at_creation(properties.mapping_mode()?);
        let engine = SchemaEvolutionEngine::new(IdAllocator::new());
        let v0 = engine.create(mode, columns)?;

        if let Some(log) = &log {
            log.append(&v0)?;
        }

        tracing::info!(
            "Created table '{}' with {} columns (column mapping mode '{}')",
            name,
            v0.columns.len(),
            mode
        );

        Ok(Self {
            name,
            mode,
            properties,
            history: Arc::new(VersionHistory::new(v0)?),
            engine,
            log,
        })
    }

    /// Open a table from an existing history. The id allocator resumes
    /// after the largest id any version ever used.
    pub fn open(name: impl Into<String>, history: VersionHistory, properties: TableProperties) -> ColmapResult<Self> {
        Self::open_inner(name.into(), history, properties, None)
    }

    /// Open a table by replaying its schema log
    pub fn open_from_log(name: impl Into<String>, log: SchemaLog, properties: TableProperties) -> ColmapResult<Self> {
        let history = VersionHistory::from_versions(log.replay()?)?;
        Self::open_inner(name.into(), history, properties, Some(log))
    }

    fn open_inner(
        name: String,
        history: VersionHistory,
        properties: TableProperties,
        log: Option<SchemaLog>,
    ) -> ColmapResult<Self> {
        let mode = history.at(0)?.mapping_mode;
        if let Some(requested) = properties.mapping_mode()? {
            mode.ensure_unchanged(requested)?;
        }

        let engine = SchemaEvolutionEngine::new(IdAllocator::from_history(&history));
        tracing::info!(
            "Opened table '{}' at version {} (next column id {})",
            name,
            history.latest().version_number,
            engine.ids().peek()
        );

        Ok(Self {
            name,
            mode,
            properties,
            history: Arc::new(history),
            engine,
            log,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mapping_mode(&self) -> MappingMode {
        self.mode
    }

    pub fn properties(&self) -> &TableProperties {
        &self.properties
    }

    pub fn history(&self) -> &Arc<VersionHistory> {
        &self.history
    }

    pub fn engine(&self) -> &SchemaEvolutionEngine {
        &self.engine
    }

    pub fn latest(&self) -> Arc<SchemaVersion> {
        self.history.latest()
    }

    /// Pin a reader to one version
    pub fn snapshot(&self, version_number: u64) -> ColmapResult<Arc<SchemaVersion>> {
        self.history.at(version_number)
    }

    /// Request a different mapping mode. Only the mode the table was
    /// created with is accepted.
    pub fn set_mapping_mode(&self, requested: MappingMode) -> ColmapResult<()> {
        self.mode.ensure_unchanged(requested).inspect_err(|_| {
            tracing::warn!(
                "Rejected column mapping mode change on '{}' ({} -> {})",
                self.name,
                self.mode,
                requested
            );
        })
    }

    pub fn rename_column(&self, from_name: &str, to_name: &str) -> ColmapResult<Arc<SchemaVersion>> {
        let current = self.latest();
        let next = self.engine.rename_column(&current, from_name, to_name)?;
        if next.version_number == current.version_number {
            return Ok(current);
        }
        self.commit(next)
    }

    pub fn drop_column(&self, name: &str) -> ColmapResult<Arc<SchemaVersion>> {
        let current = self.latest();
        let next = self.engine.drop_column(&current, name)?;
        self.commit(next)
    }

    pub fn add_column(&self, column: ColumnDef, position: ColumnPosition) -> ColmapResult<Arc<SchemaVersion>> {
        let current = self.latest();
        let next = self.engine.add_column(&current, column, position)?;
        self.commit(next)
    }

    /// Compare-and-append `next`, persisting it first when a log is
    /// attached. Fails with a retryable version conflict when
    /// another writer appended since `next` was derived.
    pub fn commit(&self, next: SchemaVersion) -> ColmapResult<Arc<SchemaVersion>> {
        let committed = self.history.append_with(next, |version| match &self.log {
            Some(log) => log.append(version),
            None => Ok(()),
        })?;

        tracing::info!(
            "Table '{}' advanced to schema version {}",
            self.name,
            committed.version_number
        );
        Ok(committed)
    }

    /// Physical slot for a write at the latest version
    pub fn resolve(&self, logical_name: &str) -> ColmapResult<PhysicalSlot> {
        PhysicalLayoutResolver::resolve(&self.latest(), logical_name)
    }

    /// Tag a new data file with the latest version
    pub fn new_data_file(&self, path: impl Into<String>) -> DataFile {
        DataFile {
            path: path.into(),
            schema_version: self.latest().version_number,
        }
    }

    pub fn resolve_for_read(
        &self,
        file: &DataFile,
        query_version: u64,
        logical_name: &str,
    ) -> ColmapResult<ReadInstruction> {
        let file_version = self.history.at(file.schema_version)?;
        let query_version = self.history.at(query_version)?;
        PhysicalLayoutResolver::resolve_for_read(&file_version, &query_version, logical_name)
    }

    /// Read plan for `file` as of `query_version`
    pub fn plan_read(&self, file: &DataFile, query_version: u64) -> ColmapResult<ReadProjection> {
        let file_version = self.history.at(file.schema_version)?;
        let query_version = self.history.at(query_version)?;
        Ok(PhysicalLayoutResolver::project(&file_version, &query_version))
    }
}

/// Run `op` until it stops failing with a retryable error, at most
/// `attempts` times.
pub fn retry_on_conflict<T, F>(attempts: usize, mut op: F) -> ColmapResult<T>
where
    F: FnMut() -> ColmapResult<T>,
{
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        match op() {
            Err(e) if e.is_retryable() && attempt < attempts => {
                tracing::debug!("Attempt {} hit a version conflict: {}", attempt, e);
                attempt += 1;
            }
            other => return other,
        }
    }
}
