//! Configuration loading from and saving to disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::Config;

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML encode error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Toml,
    Json,
}

impl Format {
    fn of(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Format::Json,
            _ => Format::Toml,
        }
    }
}

/// Load a configuration file. The format is picked from the extension:
/// `.json` is JSON, everything else is TOML.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse(&content, Format::of(path))
}

/// Like [`load_config`], but any failure yields [`Config::default`].
///
/// The error is handed back alongside so callers can report it.
pub fn load_or_default(path: &Path) -> (Config, Option<ConfigError>) {
    match load_config(path) {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    }
}

fn parse(content: &str, format: Format) -> Result<Config, ConfigError> {
    let config = match format {
        Format::Toml => toml::from_str(content)?,
        Format::Json => serde_json::from_str(content)?,
    };
    Ok(config)
}

impl Config {
    /// Write this config to `path`, using the same extension rules as [`load_config`].
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = match Format::of(path) {
            Format::Toml => toml::to_string_pretty(self)?,
            Format::Json => serde_json::to_string_pretty(self)?,
        };
        fs::write(path, content)?;
        Ok(())
    }
}
