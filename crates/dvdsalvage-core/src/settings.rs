//! Persistent user settings for dvdsalvage
//!
//! Settings are stored in a TOML configuration file at:
//! - Linux: `~/.config/dvdsalvage/dvdsalvage_config.toml`
//! - macOS: `~/Library/Application Support/dvdsalvage/dvdsalvage_config.toml`
//! - Windows: `%APPDATA%\dvdsalvage\dvdsalvage_config.toml`
//!
//! # Example Configuration
//!
//! ```toml
//! [copy]
//! chunk_blocks = 128
//! repair_chunk_blocks = 1
//! ledger_file_name = "dvdsalvage.bad"
//!
//! [behavior]
//! quiet = false
//! ```

use crate::config::{
    CopyConfig, DEFAULT_CHUNK_BLOCKS, DEFAULT_LEDGER_FILE_NAME, DEFAULT_REPAIR_CHUNK_BLOCKS,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration file name
const CONFIG_FILE_NAME: &str = "dvdsalvage_config.toml";

/// Application name for config directory
const APP_NAME: &str = "dvdsalvage";

/// User settings loaded from configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Copy and repair settings
    pub copy: CopySettings,

    /// Behavior settings
    pub behavior: BehaviorSettings,
}

/// Settings for copy and repair runs
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CopySettings {
    /// Sectors per read request during a copy
    pub chunk_blocks: u64,

    /// Sectors per read request during a repair
    pub repair_chunk_blocks: u64,

    /// Ledger file name at the destination root
    pub ledger_file_name: String,
}

/// General behavior settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BehaviorSettings {
    /// Whether to suppress non-error output
    pub quiet: bool,
}

impl Default for CopySettings {
    fn default() -> Self {
        Self {
            chunk_blocks: DEFAULT_CHUNK_BLOCKS,
            repair_chunk_blocks: DEFAULT_REPAIR_CHUNK_BLOCKS,
            ledger_file_name: DEFAULT_LEDGER_FILE_NAME.to_string(),
        }
    }
}

impl CopySettings {
    /// Build a runtime config from these settings
    pub fn to_config(&self) -> CopyConfig {
        CopyConfig::new()
            .chunk_blocks(self.chunk_blocks)
            .repair_chunk_blocks(self.repair_chunk_blocks)
            .ledger_file_name(self.ledger_file_name.clone())
    }
}

impl Settings {
    /// Load settings from the default configuration file
    ///
    /// Falls back to defaults when the file is missing or unreadable.
    pub fn load() -> Self {
        Self::load_from_path(Self::config_path())
    }

    /// Load settings from `path`, falling back to defaults
    pub fn load_from_path(path: Option<PathBuf>) -> Self {
        match path {
            Some(path) if path.exists() => Self::read(&path).unwrap_or_else(|e| {
                tracing::warn!("Ignoring configuration file: {}", e);
                Self::default()
            }),
            Some(path) => {
                tracing::debug!("No configuration file at {:?}", path);
                Self::default()
            }
            None => Self::default(),
        }
    }

    /// Parse the settings file at `path`
    pub fn read(path: &Path) -> Result<Self, SettingsError> {
        let contents = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = toml::from_str(&contents).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!("Loaded settings from {:?}", path);
        Ok(settings)
    }

    /// Save settings to the default configuration file
    pub fn save(&self) -> Result<PathBuf, SettingsError> {
        self.save_to_path(Self::config_path())
    }

    /// Save settings to `path`, creating its directory
    pub fn save_to_path(&self, path: Option<PathBuf>) -> Result<PathBuf, SettingsError> {
        let path = path.ok_or(SettingsError::NoConfigDir)?;
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(|source| SettingsError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        let contents = toml::to_string_pretty(self).map_err(SettingsError::Serialize)?;
        if let Err(source) = std::fs::write(&path, contents) {
            return Err(SettingsError::Io { path, source });
        }

        tracing::info!("Saved settings to {:?}", path);
        Ok(path)
    }

    /// `<config_dir>/dvdsalvage/dvdsalvage_config.toml`, if the platform has a config dir
    pub fn config_path() -> Option<PathBuf> {
        dirs_next::config_dir().map(|dir| dir.join(APP_NAME).join(CONFIG_FILE_NAME))
    }
}

/// Settings file errors
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// The platform has no configuration directory
    #[error("Could not determine configuration directory")]
    NoConfigDir,

    /// Reading or writing the file failed
    #[error("{path:?}: {source}")]
    Io {
        /// File or directory involved
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// The file is not valid settings TOML
    #[error("{path:?} is not valid: {source}")]
    Parse {
        /// File that failed to parse
        path: PathBuf,
        /// Parser error
        source: toml::de::Error,
    },

    /// Settings could not be turned into TOML
    #[error("Failed to serialize settings: {0}")]
    Serialize(toml::ser::Error),
}
