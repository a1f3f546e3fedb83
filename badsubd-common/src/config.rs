use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use getset::{Getters, Setters};
use serde::{Deserialize, Serialize};

use crate::error::EngineResult;

/// The default character capacity a VARCHAR column gets when a
/// CREATE TABLE statement omits an explicit size.
pub const DEFAULT_VARCHAR_SIZE: u16 = 255;
/// The largest character capacity a VARCHAR column may declare (§3).
pub const MAX_VARCHAR_SIZE: u16 = 255;
/// Width in bytes of an on-disk INT value.
pub const INT_WIDTH_BYTES: usize = 8;
/// Width in bytes of a single UTF-32 code unit.
pub const CHAR_WIDTH_BYTES: usize = 4;

/// Merged engine configuration: built-in defaults, overridden by an
/// optional `badsubd.toml`, overridden in turn by `BADSUBD_*`
/// environment variables.
#[derive(Debug, Clone, Getters, Setters, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Base directory holding `schemas/`, `tables/` and `indexes/`.
    #[serde(default = "default_data_dir")]
    #[getset(get = "pub", set = "pub")]
    data_dir: PathBuf,

    /// VARCHAR capacity used when a column definition omits one.
    #[serde(default = "default_varchar_size")]
    #[getset(get = "pub", set = "pub")]
    default_varchar_size: u16,

    #[serde(default)]
    #[getset(get = "pub", set = "pub")]
    logging: LoggingConfig,
}

#[derive(Debug, Clone, Getters, Setters, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[getset(get = "pub", set = "pub")]
    level: String,

    #[getset(get = "pub", set = "pub")]
    log_dir: Option<String>,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_varchar_size() -> u16 {
    DEFAULT_VARCHAR_SIZE
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            data_dir: PathBuf::from("./data"),
            default_varchar_size: DEFAULT_VARCHAR_SIZE,
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
            log_dir: None,
        }
    }
}

impl EngineConfig {
    /// Builds the effective configuration: defaults, then an optional
    /// TOML file, then `BADSUBD_*` environment overrides.
    pub fn load(toml_path: Option<&Path>) -> EngineResult<Self> {
        let mut config = EngineConfig::default();

        if let Some(path) = toml_path {
            if path.exists() {
                let text = fs::read_to_string(path)?;
                config = toml::from_str(&text)?;
            }
        }

        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(dir) = env::var("BADSUBD_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Ok(level) = env::var("BADSUBD_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(dir) = env::var("BADSUBD_LOG_DIR") {
            self.logging.log_dir = Some(dir);
        }
    }

    pub fn schema_dir(&self) -> PathBuf {
        self.data_dir.join("schemas")
    }

    pub fn table_dir(&self) -> PathBuf {
        self.data_dir.join("tables")
    }

    pub fn index_dir(&self) -> PathBuf {
        self.data_dir.join("indexes")
    }

    /// Creates the schema/table/index subdirectories if missing.
    pub fn ensure_directories(&self) -> EngineResult<()> {
        fs::create_dir_all(self.schema_dir())?;
        fs::create_dir_all(self.table_dir())?;
        fs::create_dir_all(self.index_dir())?;
        Ok(())
    }
}
