//! Vault configuration stored as TOML.
//!
//! Environment overrides, applied after the file is read:
//! - `VAULT_DATA_DIR`: data directory
//! - `VAULT_CLIPBOARD_PASSTHROUGH`: `true`/`false` (also `1`/`0`, `yes`/`no`, `on`/`off`)

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use common::AggregateId;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DATA_DIR_ENV: &str = "VAULT_DATA_DIR";
pub const PASSTHROUGH_ENV: &str = "VAULT_CLIPBOARD_PASSTHROUGH";

type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the database and the device identity.
    pub data_dir: PathBuf,

    /// Mirror copies to the system clipboard.
    pub clipboard_passthrough: bool,

    /// Collection used when a copy or paste names none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_collection: Option<AggregateId>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            clipboard_passthrough: false,
            default_collection: None,
        }
    }
}

impl Config {
    /// Reads the config at `path` and applies environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;
        config.data_dir = expand_tilde(&config.data_dir);
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Reads the config at `path`, writing the defaults there first if the
    /// file does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            return Self::load(path);
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let config = Config::default();
        config.save(path)?;
        tracing::info!(path = %path.display(), "wrote default config");

        Self::load(path)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    pub fn ensure_data_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.data_dir)?;
        Ok(())
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(dir) = env::var(DATA_DIR_ENV)
            && !dir.trim().is_empty()
        {
            self.data_dir = expand_tilde(Path::new(dir.trim()));
        }

        if let Ok(value) = env::var(PASSTHROUGH_ENV) {
            self.clipboard_passthrough =
                parse_bool(&value).ok_or_else(|| ConfigError::InvalidEnv {
                    key: PASSTHROUGH_ENV,
                    value,
                })?;
        }

        Ok(())
    }
}

/// `<config dir>/vault/config.toml`.
pub fn default_config_path() -> Result<PathBuf> {
    let root = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
    Ok(root.join("vault").join("config.toml"))
}

fn default_data_dir() -> PathBuf {
    match dirs::home_dir() {
        Some(home) => home.join(".vault"),
        None => PathBuf::from(".vault"),
    }
}

/// Replaces a leading `~` with the home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match dirs::home_dir() {
        Some(home) => home.join(rest),
        None => path.to_path_buf(),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
