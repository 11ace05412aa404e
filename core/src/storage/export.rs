//! JSON export of a table's schema history

use crate::error::{ColmapError, ColmapResult};
use crate::history::VersionHistory;
use crate::schema::SchemaVersion;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryExport {
	pub table: String,
	pub versions: Vec<SchemaVersion>,
}

impl HistoryExport {
	pub fn from_history(table: impl Into<String>, history: &VersionHistory) -> Self {
		Self {
			table: table.into(),
			versions: history.versions().iter().map(|v| (**v).clone()).collect(),
		}
	}

	pub fn to_json(&self) -> ColmapResult<String> {
		serde_json::to_string_pretty(self)
			.map_err(|e| ColmapError::Serialization(format!("Failed to serialize history: {}", e)))
	}

	pub fn from_json(json: &str) -> ColmapResult<Self> {
		serde_json::from_str(json)
			.map_err(|e| ColmapError::Serialization(format!("Failed to parse history: {}", e)))
	}

	/// Load an export from disk
	pub fn load<P: AsRef<Path>>(path: P) -> ColmapResult<Self> {
		let mut file = File::open(path)?;
		let mut contents = String::new();
		file.read_to_string(&mut contents)?;
		Self::from_json(&contents)
	}

	/// Save the export to disk
	pub fn save<P: AsRef<Path>>(&self, path: P) -> ColmapResult<()> {
		let json = self.to_json()?;

		let mut file = OpenOptions::new()
			.create(true)
			.write(true)
			.truncate(true)
			.open(path)?;

		file.write_all(json.as_bytes())?;
		file.sync_all()?;

		Ok(())
	}

	/// Rebuild the history, re-checking every invariant
	pub fn into_history(self) -> ColmapResult<VersionHistory> {
		VersionHistory::from_versions(self.versions)
	}
}
