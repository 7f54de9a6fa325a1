//! Configuration schema definitions.
//!
//! All types derive Serde traits for (de)serialization from config files.

use serde::{Deserialize, Serialize};

use crate::level::{DEFAULT_LEVEL, LEVEL_ERROR};

/// Root scope configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Global log level used for every module without an override.
    pub log_level: String,

    /// Per-module overrides. Later entries win over earlier ones with the same name.
    pub packages: Vec<Package>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LEVEL.to_string(),
            packages: Vec::new(),
        }
    }
}

impl Config {
    /// Config with the given global level and no overrides.
    pub fn with_level(log_level: impl Into<String>) -> Self {
        Self {
            log_level: log_level.into(),
            packages: Vec::new(),
        }
    }

    /// Adds an override for `name`.
    pub fn package(mut self, name: impl Into<String>, log_level: impl Into<String>) -> Self {
        self.packages.push(Package {
            name: name.into(),
            log_level: log_level.into(),
        });
        self
    }

    /// Starter config listing `modules` at `ERROR`, so noisy modules can be
    /// opened up one by one.
    pub fn template<I, S>(modules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            log_level: DEFAULT_LEVEL.to_string(),
            packages: modules
                .into_iter()
                .map(|name| Package {
                    name: name.into(),
                    log_level: LEVEL_ERROR.to_string(),
                })
                .collect(),
        }
    }
}

/// Log level override for a single module.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Package {
    /// Module identifier, e.g. `my_app::db`.
    pub name: String,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    DEFAULT_LEVEL.to_string()
}
