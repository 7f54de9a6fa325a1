//! Scope configuration: schema, loading and file watching.
//!
//! # Data Flow
//! ```text
//! config file (TOML/JSON)
//!     → loader.rs (read & deserialize, defaults on failure)
//!     → Config (immutable snapshot)
//!     → Handler rebuilds its ScopeTable and swaps it in
//!
//! While a file is bound and watching is enabled:
//!     watcher.rs sees a content change
//!     → Handler::apply_config_file (reload)
//!     → fresh watcher armed for the next change
//! ```
//!
//! # Design Decisions
//! - Config is never mutated in place; every change replaces it wholesale
//! - All fields have defaults so an empty file is a valid config
//! - A missing or broken file degrades to the default config, never an error

pub mod loader;
pub mod schema;
pub mod watcher;

pub use loader::{load_config, load_or_default, ConfigError};
pub use schema::{Config, Package};
pub use watcher::{ConfigWatcher, WatchEvent};

/// File name used when watching is requested without an explicit file.
pub const DEFAULT_CONFIG_FILE: &str = "scope.toml";
