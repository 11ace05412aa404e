//! Table properties supplied at creation time

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ColmapResult;
use crate::schema::MappingMode;

/// Property key selecting the column mapping mode
pub const COLUMN_MAPPING_MODE: &str = "delta.columnMapping.mode";

/// String key/value table properties. Keys other than the ones this crate
/// understands are kept as given and otherwise ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableProperties {
    entries: BTreeMap<String, String>,
}

impl TableProperties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    /// Properties requesting `mode`
    pub fn with_mapping_mode(self, mode: MappingMode) -> Self {
        self.with(COLUMN_MAPPING_MODE, mode.as_str())
    }

    /// Fill in the mapping mode only when none was requested.
    pub fn or_default_mode(self, mode: MappingMode) -> Self {
        if self.entries.contains_key(COLUMN_MAPPING_MODE) {
            self
        } else {
            self.with_mapping_mode(mode)
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Requested mapping mode, if the property is present
    pub fn mapping_mode(&self) -> ColmapResult<Option<MappingMode>> {
        self.get(COLUMN_MAPPING_MODE)
            .map(str::parse::<MappingMode>)
            .transpose()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TableProperties {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ColmapError;

    #[test]
    fn test_mapping_mode_property() {
        let props: TableProperties = [(COLUMN_MAPPING_MODE, "name")].into_iter().collect();
        assert_eq!(props.mapping_mode().unwrap(), Some(MappingMode::Name));

        assert_eq!(TableProperties::new().mapping_mode().unwrap(), None);

        let bad = TableProperties::new().with(COLUMN_MAPPING_MODE, "position");
        assert!(matches!(
            bad.mapping_mode(),
            Err(ColmapError::InvalidProperty { .. })
        ));
    }

    #[test]
    fn test_default_mode_does_not_override() {
        let props = TableProperties::new()
            .with_mapping_mode(MappingMode::None)
            .or_default_mode(MappingMode::Name);
        assert_eq!(props.mapping_mode().unwrap(), Some(MappingMode::None));

        let props = TableProperties::new()
            .with("delta.appendOnly", "false")
            .or_default_mode(MappingMode::Name);
        assert_eq!(props.mapping_mode().unwrap(), Some(MappingMode::Name));
        assert_eq!(props.get("delta.appendOnly"), Some("false"));
    }
}
