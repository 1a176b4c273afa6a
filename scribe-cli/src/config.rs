//! Layered configuration for the scribe binary
//!
//! The base file is `~/.scribe/config.toml` (or `--config` / `$SCRIBE_CONFIG`).
//! A `config.override.toml` next to it, when present, is merged on top:
//! tables merge key by key, anything else is replaced.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use scribe_orm::DbConfig;
use serde::Deserialize;

const OVERRIDE_FILE: &str = "config.override.toml";

#[derive(Debug, Clone)]
pub struct ScribeConfig {
    pub path: PathBuf,
    pub database: DbConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: Option<String>,
}

impl ScribeConfig {
    /// Default config path: ~/.scribe/config.toml
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".scribe/config.toml")
    }

    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(Self::default_path);

        if !path.exists() {
            anyhow::bail!(
                "Config not found at {:?}\n\nCreate it with a [database] table or pass --config",
                path
            );
        }

        let mut merged = read_table(&path)?;
        let override_path = path.with_file_name(OVERRIDE_FILE);
        if override_path.exists() {
            merge(&mut merged, read_table(&override_path)?);
        }

        Self::from_value(path, merged)
    }

    fn from_value(path: PathBuf, mut value: toml::Value) -> Result<Self> {
        let table = value
            .as_table_mut()
            .context("Config root must be a table")?;

        let database = table
            .remove("database")
            .context("Missing [database] table in config")?;
        let database = DbConfig::from_toml_value(database)
            .with_context(|| format!("Invalid [database] config in {:?}", path))?;

        let log = match table.remove("log") {
            Some(log) => log.try_into().context("Invalid [log] config")?,
            None => LogConfig::default(),
        };

        Ok(Self {
            path,
            database,
            log,
        })
    }
}

fn read_table(path: &Path) -> Result<toml::Value> {
    let content = fs::read_to_string(path)
        .context(format!("Failed to read config file: {:?}", path))?;
    toml::from_str(&content).context(format!("Failed to parse config file (invalid TOML): {:?}", path))
}

/// Merge `overlay` into `base`, recursing into tables.
pub fn merge(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}
