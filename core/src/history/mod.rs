//! Append-only history of schema versions

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::error::{ColmapError, ColmapResult};
use crate::schema::SchemaVersion;

/// Ordered, append-only sequence of schema versions for one table.
///
/// Entries are immutable once appended and handed out as `Arc`s, so a
/// reader holds the lock only long enough to clone a pointer. Writers are
/// serialized by a separate mutex and perform a compare-and-append: the
/// new version must be exactly `latest + 1`, otherwise the append fails
/// with [`ColmapError::NonMonotonicVersion`] and nothing changes.
#[derive(Debug)]
pub struct VersionHistory {
    versions: RwLock<Vec<Arc<SchemaVersion>>>,
    writer: Mutex<()>,
}

impl VersionHistory {
    /// Start a history at version 0.
    pub fn new(initial: SchemaVersion) -> ColmapResult<Self> {
        Self::from_versions(vec![initial])
    }

    /// Rebuild a history from persisted versions, checking contiguity and
    /// that the mapping mode never changes.
    pub fn from_versions(versions: Vec<SchemaVersion>) -> ColmapResult<Self> {
        let first = versions.first().ok_or(ColmapError::VersionNotFound(0))?;
        let mode = first.mapping_mode;

        for (expected, version) in versions.iter().enumerate() {
            if version.version_number != expected as u64 {
                return Err(ColmapError::NonMonotonicVersion {
                    expected: expected as u64,
                    actual: version.version_number,
                });
            }
            mode.ensure_unchanged(version.mapping_mode)?;
            version.validate()?;
        }

        Ok(Self {
            versions: RwLock::new(versions.into_iter().map(Arc::new).collect()),
            writer: Mutex::new(()),
        })
    }

    /// Append the next version.
    pub fn append(&self, version: SchemaVersion) -> ColmapResult<Arc<SchemaVersion>> {
        self.append_with(version, |_| Ok(()))
    }

    /// Append the next version, running `persist` after the version check
    /// and before the version becomes visible to readers. A failing
    /// `persist` leaves the history untouched.
    pub fn append_with<F>(&self, version: SchemaVersion, persist: F) -> ColmapResult<Arc<SchemaVersion>>
    where
        F: FnOnce(&SchemaVersion) -> ColmapResult<()>,
    {
        let _writer = self.writer.lock();
        let latest = self.latest();

        let expected = latest.version_number + 1;
        if version.version_number != expected {
            tracing::warn!(
                "Append conflict: expected version {}, got {}",
                expected,
                version.version_number
            );
            return Err(ColmapError::NonMonotonicVersion {
                expected,
                actual: version.version_number,
            });
        }
        latest.mapping_mode.ensure_unchanged(version.mapping_mode)?;
        version.validate()?;

        persist(&version)?;

        let version = Arc::new(version);
        self.versions.write().push(Arc::clone(&version));
        Ok(version)
    }

    /// Get a version by number
    pub fn at(&self, version_number: u64) -> ColmapResult<Arc<SchemaVersion>> {
        let index = usize::try_from(version_number)
            .map_err(|_| ColmapError::VersionNotFound(version_number))?;
        self.versions
            .read()
            .get(index)
            .cloned()
            .ok_or(ColmapError::VersionNotFound(version_number))
    }

    pub fn latest(&self) -> Arc<SchemaVersion> {
        let versions = self.versions.read();
        // never empty: constructors require version 0
        Arc::clone(&versions[versions.len() - 1])
    }

    pub fn len(&self) -> usize {
        self.versions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.read().is_empty()
    }

    /// Point-in-time copy of every version
    pub fn versions(&self) -> Vec<Arc<SchemaVersion>> {
        self.versions.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evolution::SchemaEvolutionEngine;
    use crate::schema::{ColumnDef, DataType, MappingMode};

    fn history(engine: &SchemaEvolutionEngine) -> VersionHistory {
        let v0 = engine
            .create(
                MappingMode::Name,
                vec![
                    ColumnDef::new("id", DataType::Integer),
                    ColumnDef::new("name", DataType::String),
                ],
            )
            .unwrap();
        VersionHistory::new(v0).unwrap()
    }

    #[test]
    fn test_append_and_lookup() {
        let engine = SchemaEvolutionEngine::default();
        let history = history(&engine);

        let v1 = engine.rename_column(&history.latest(), "name", "full_name").unwrap();
        history.append(v1).unwrap();

        assert_eq!(history.len(), 2);
        assert_eq!(history.latest().version_number, 1);
        assert!(history.at(0).unwrap().column("name").is_some());
        assert!(history.at(1).unwrap().column("full_name").is_some());
        assert!(matches!(history.at(2), Err(ColmapError::VersionNotFound(2))));
    }

    #[test]
    fn test_append_rejects_gaps_and_replays() {
        let engine = SchemaEvolutionEngine::default();
        let history = history(&engine);
        let v0 = history.latest();

        let v1 = engine.drop_column(&v0, "name").unwrap();
        let mut skipped = v1.clone();
        skipped.version_number = 2;

        assert!(matches!(
            history.append(skipped),
            Err(ColmapError::NonMonotonicVersion {
                expected: 1,
                actual: 2
            })
        ));
        assert!(matches!(
            history.append((*v0).clone()),
            Err(ColmapError::NonMonotonicVersion { .. })
        ));
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_append_rejects_mode_change() {
        let engine = SchemaEvolutionEngine::default();
        let history = history(&engine);

        let mut v1 = engine.drop_column(&history.latest(), "name").unwrap();
        v1.mapping_mode = MappingMode::None;
        assert!(matches!(
            history.append(v1),
            Err(ColmapError::IllegalModeChange { .. })
        ));
    }

    #[test]
    fn test_failed_persist_leaves_history_untouched() {
        let engine = SchemaEvolutionEngine::default();
        let history = history(&engine);

        let v1 = engine.drop_column(&history.latest(), "name").unwrap();
        let result = history.append_with(v1, |_| Err(ColmapError::Serialization("disk full".into())));

        assert!(result.is_err());
        assert_eq!(history.latest().version_number, 0);
    }

    #[test]
    fn test_from_versions_requires_contiguity() {
        let engine = SchemaEvolutionEngine::default();
        let history = history(&engine);
        let v0 = (*history.latest()).clone();
        let mut v1 = engine.drop_column(&v0, "name").unwrap();
        v1.version_number = 5;

        assert!(matches!(
            VersionHistory::from_versions(vec![v0, v1]),
            Err(ColmapError::NonMonotonicVersion {
                expected: 1,
                actual: 5
            })
        ));
        assert!(VersionHistory::from_versions(vec![]).is_err());
    }
}
