use std::{
    env, fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::error::{ColmapError, ColmapResult};
use crate::schema::MappingMode;

/// Defaults applied to tables created without explicit properties.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableConfig {
    /// Mapping mode used when `delta.columnMapping.mode` is absent
    pub default_mapping_mode: MappingMode,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            default_mapping_mode: MappingMode::None,
        }
    }
}

/// Schema log settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Directory holding one `<table>.log` file per table
    pub dir: PathBuf,
    /// Whether to sync after every appended version (default: true)
    #[serde(default = "default_sync_on_write")]
    pub sync_on_write: bool,
}

fn default_sync_on_write() -> bool {
    true
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./colmap_data"),
            sync_on_write: true,
        }
    }
}

impl LogConfig {
    pub fn table_log_path(&self, table: &str) -> PathBuf {
        self.dir.join(format!("{table}.log"))
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub table: TableConfig,
    #[serde(default)]
    pub log: LogConfig,
}

impl Config {
    /// Load config from TOML file, with environment variable overrides.
    /// Falls back to defaults if file is not found. COLMAP_CONFIG overrides the path.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> ColmapResult<Self> {
        let cfg_path = env::var("COLMAP_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| path.as_ref().to_path_buf());

        let mut cfg = match fs::read_to_string(&cfg_path) {
            Ok(s) => Self::from_toml_str(&s)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No config at {}, using defaults", cfg_path.display());
                Config::default()
            }
            Err(e) => return Err(e.into()),
        };

        cfg.apply_overrides(|key| env::var(key).ok())?;
        Ok(cfg)
    }

    pub fn from_toml_str(s: &str) -> ColmapResult<Self> {
        toml::from_str(s).map_err(|e| ColmapError::Config(e.to_string()))
    }

    /// Apply COLMAP_* overrides obtained through `lookup`.
    fn apply_overrides<F>(&mut self, lookup: F) -> ColmapResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("COLMAP_LOG_DIR") {
            self.log.dir = PathBuf::from(v);
        }

        if let Some(v) = lookup("COLMAP_MAPPING_MODE") {
            self.table.default_mapping_mode = v.parse()?;
        }

        Ok(())
    }
}
