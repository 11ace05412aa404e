//! Durable append-only log of schema versions

use crate::error::{ColmapError, ColmapResult};
use crate::schema::SchemaVersion;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Frame header: payload length then CRC32 of the payload, both LE
const FRAME_HEADER_SIZE: usize = 8;

/// Upper bound for a single encoded version
const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Schema log writer and reader.
///
/// Each appended [`SchemaVersion`] is one bincode frame. A partially
/// written trailing frame is cut off on replay; a bad checksum anywhere
/// else is reported as corruption.
///
/// An append either leaves a complete frame at the end of the file or
/// leaves the file as it was: bytes past the last complete frame are cut
/// off before every write and after a failed one.
pub struct SchemaLog {
	path: PathBuf,
	state: Mutex<LogState>,
	sync_on_write: bool,
}

struct LogState {
	file: File,
	/// Offset just past the last complete frame, once known
	end: Option<u64>,
}

impl SchemaLog {
	/// Open an existing log, creating it if missing
	pub fn open<P: AsRef<Path>>(path: P, sync_on_write: bool) -> ColmapResult<Self> {
		let file = OpenOptions::new()
			.create(true)
			.read(true)
			.write(true)
			.truncate(false)
			.open(path.as_ref())?;

		Ok(Self {
			path: path.as_ref().to_path_buf(),
			state: Mutex::new(LogState { file, end: None }),
			sync_on_write,
		})
	}

	/// Create an empty log, discarding any previous contents
	pub fn create<P: AsRef<Path>>(path: P, sync_on_write: bool) -> ColmapResult<Self> {
		let file = OpenOptions::new()
			.create(true)
			.read(true)
			.write(true)
			.truncate(true)
			.open(path.as_ref())?;

		Ok(Self {
			path: path.as_ref().to_path_buf(),
			state: Mutex::new(LogState { file, end: Some(0) }),
			sync_on_write,
		})
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Whether the file holds no bytes at all
	pub fn is_empty(&self) -> ColmapResult<bool> {
		Ok(self.state.lock().file.metadata()?.len() == 0)
	}

	/// Append one version
	pub fn append(&self, version: &SchemaVersion) -> ColmapResult<()> {
		let data = bincode::serialize(version)
			.map_err(|e| ColmapError::Serialization(format!("Failed to encode schema version: {}", e)))?;

		let mut frame = Vec::with_capacity(FRAME_HEADER_SIZE + data.len());
		frame.extend_from_slice(&(data.len() as u32).to_le_bytes());
		frame.extend_from_slice(&crc32fast::hash(&data).to_le_bytes());
		frame.extend_from_slice(&data);

		let mut state = self.state.lock();
		let known_end = state.end;
		let end = match known_end {
			Some(end) => end,
			None => scan_frames(&mut state.file)?.1,
		};

		// Drop anything a failed append left behind
		if state.file.metadata()?.len() > end {
			tracing::warn!("Discarding bytes past offset {} in {}", end, self.path.display());
			state.file.set_len(end)?;
		}

		if let Err(e) = self.write_frame(&mut state.file, end, &frame) {
			tracing::warn!(
				"Failed to log schema version {} to {}: {}",
				version.version_number,
				self.path.display(),
				e
			);
			if let Err(rollback) = state.file.set_len(end) {
				tracing::warn!("Could not roll back {}: {}", self.path.display(), rollback);
			}
			state.end = Some(end);
			return Err(e);
		}
		state.end = Some(end + frame.len() as u64);

		tracing::debug!(
			"Logged schema version {} to {}",
			version.version_number,
			self.path.display()
		);
		Ok(())
	}

	fn write_frame(&self, file: &mut File, end: u64, frame: &[u8]) -> ColmapResult<()> {
		file.seek(SeekFrom::Start(end))?;
		file.write_all(frame)?;
		if self.sync_on_write {
			file.sync_all()?;
		}
		Ok(())
	}

	/// Read every version back in append order
	pub fn replay(&self) -> ColmapResult<Vec<SchemaVersion>> {
		let mut state = self.state.lock();
		let file_len = state.file.metadata()?.len();
		let (versions, valid_len) = scan_frames(&mut state.file)?;

		if valid_len < file_len {
			tracing::warn!(
				"Truncating torn tail of {} ({} of {} bytes valid)",
				self.path.display(),
				valid_len,
				file_len
			);
			state.file.set_len(valid_len)?;
			state.file.sync_all()?;
		}
		state.end = Some(valid_len);

		Ok(versions)
	}
}

/// Decode frames from the start of `file`, stopping at the first short
/// one. Returns the versions and the offset just past the last complete
/// frame.
fn scan_frames(file: &mut File) -> ColmapResult<(Vec<SchemaVersion>, u64)> {
	file.seek(SeekFrom::Start(0))?;

	let mut versions = Vec::new();
	let mut valid_len = 0u64;

	loop {
		// Read frame header
		let mut header = [0u8; FRAME_HEADER_SIZE];
		match file.read_exact(&mut header) {
			Ok(_) => {}
			Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
			Err(e) => return Err(ColmapError::Io(e)),
		}

		let len = u32::from_le_bytes([header[0], header[1], header[2], header[3]]) as usize;
		let checksum = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);

		if len > MAX_FRAME_SIZE {
			return Err(ColmapError::Corruption(format!(
				"frame at offset {} claims {} bytes",
				valid_len, len
			)));
		}

		let mut data = vec![0u8; len];
		match file.read_exact(&mut data) {
			Ok(_) => {}
			Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
			Err(e) => return Err(ColmapError::Io(e)),
		}

		if crc32fast::hash(&data) != checksum {
			return Err(ColmapError::Corruption(format!(
				"checksum mismatch in frame at offset {}",
				valid_len
			)));
		}

		let version: SchemaVersion = bincode::deserialize(&data).map_err(|e| {
			ColmapError::Corruption(format!("undecodable frame at offset {}: {}", valid_len, e))
		})?;
		versions.push(version);
		valid_len += (FRAME_HEADER_SIZE + len) as u64;
	}

	Ok((versions, valid_len))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::evolution::SchemaEvolutionEngine;
	use crate::schema::{ColumnDef, DataType, MappingMode, StructField};
	use pretty_assertions::assert_eq;
	use tempfile::tempdir;

	fn sample_versions() -> Vec<SchemaVersion> {
		let engine = SchemaEvolutionEngine::default();
		let v0 = engine
			.create(
				MappingMode::Name,
				vec![
					ColumnDef::new("id", DataType::Integer).not_null(),
					ColumnDef::new("first name", DataType::String),
					ColumnDef::new(
						"address",
						DataType::Struct(vec![StructField::new("city", DataType::String, true)]),
					),
				],
			)
			.unwrap();
		let v1 = engine.rename_column(&v0, "first name", "full_name").unwrap();
		vec![v0, v1]
	}

	#[test]
	fn test_log_append_and_replay() {
		let dir = tempdir().unwrap();
		let path = dir.path().join("customer.log");
		let versions = sample_versions();

		let log = SchemaLog::create(&path, true).unwrap();
		for version in &versions {
			log.append(version).unwrap();
		}

		let reopened = SchemaLog::open(&path, true).unwrap();
		assert_eq!(reopened.replay().unwrap(), versions);
	}

	#[test]
	fn test_torn_tail_is_truncated() {
		let dir = tempdir().unwrap();
		let path = dir.path().join("customer.log");
		let versions = sample_versions();

		let log = SchemaLog::create(&path, false).unwrap();
		log.append(&versions[0]).unwrap();
		let good_len = std::fs::metadata(&path).unwrap().len();
		log.append(&versions[1]).unwrap();
		drop(log);

		// Simulate a crash halfway through the second frame
		let file = OpenOptions::new().write(true).open(&path).unwrap();
		file.set_len(good_len + 5).unwrap();
		drop(file);

		let log = SchemaLog::open(&path, false).unwrap();
		assert_eq!(log.replay().unwrap(), vec![versions[0].clone()]);
		assert_eq!(std::fs::metadata(&path).unwrap().len(), good_len);
	}

	/// Bytes of a frame whose header promises more payload than follows
	const PARTIAL_FRAME: [u8; 10] = [200, 0, 0, 0, 1, 2, 3, 4, 9, 9];

	fn append_raw(path: &Path, bytes: &[u8]) {
		let mut file = OpenOptions::new().append(true).open(path).unwrap();
		file.write_all(bytes).unwrap();
	}

	#[test]
	fn test_append_after_partial_frame_survives_replay() {
		let dir = tempdir().unwrap();
		let path = dir.path().join("customer.log");
		let versions = sample_versions();

		let log = SchemaLog::create(&path, true).unwrap();
		log.append(&versions[0]).unwrap();
		let good_len = std::fs::metadata(&path).unwrap().len();

		// A write that died partway through its frame
		append_raw(&path, &PARTIAL_FRAME);
		log.append(&versions[1]).unwrap();
		drop(log);

		let reopened = SchemaLog::open(&path, true).unwrap();
		assert_eq!(reopened.replay().unwrap(), versions);
		assert!(std::fs::metadata(&path).unwrap().len() > good_len);
	}

	#[test]
	fn test_reopened_log_discards_partial_frame_on_append() {
		let dir = tempdir().unwrap();
		let path = dir.path().join("customer.log");
		let versions = sample_versions();

		let log = SchemaLog::create(&path, false).unwrap();
		log.append(&versions[0]).unwrap();
		drop(log);
		append_raw(&path, &PARTIAL_FRAME);

		// No replay before appending; the log finds the last frame itself
		let log = SchemaLog::open(&path, false).unwrap();
		assert!(!log.is_empty().unwrap());
		log.append(&versions[1]).unwrap();
		drop(log);

		let log = SchemaLog::open(&path, false).unwrap();
		assert_eq!(log.replay().unwrap(), versions);
	}

	#[test]
	fn test_new_log_is_empty() {
		let dir = tempdir().unwrap();
		let path = dir.path().join("customer.log");

		let log = SchemaLog::create(&path, false).unwrap();
		assert!(log.is_empty().unwrap());
		assert_eq!(log.path(), path.as_path());
		log.append(&sample_versions()[0]).unwrap();
		assert!(!log.is_empty().unwrap());
	}

	#[test]
	fn test_checksum_mismatch_is_corruption() {
		let dir = tempdir().unwrap();
		let path = dir.path().join("customer.log");
		let versions = sample_versions();

		let log = SchemaLog::create(&path, false).unwrap();
		log.append(&versions[0]).unwrap();
		drop(log);

		let mut bytes = std::fs::read(&path).unwrap();
		let last = bytes.len() - 1;
		bytes[last] ^= 0xFF;
		std::fs::write(&path, bytes).unwrap();

		let log = SchemaLog::open(&path, false).unwrap();
		assert!(matches!(log.replay(), Err(ColmapError::Corruption(_))));
	}
}
