//! Per-module log level filtering for `tracing`, reconfigurable at runtime.
//!
//! # Architecture Overview
//!
//! ```text
//!   log call ──▶ ScopeLayer::enabled ──▶ Handler::decide ──▶ CallerResolver
//!                      │                        │
//!                      │                        ▼
//!                      │                 ScopeTable (ArcSwap snapshot)
//!                      ▼
//!               wrapped sink layer (fmt, json, ...)
//!
//!   Config / config file ──▶ Handler (writers serialized) ──▶ new ScopeTable
//!                                   ▲              │
//!                                   │              ▼
//!                       revert timer│        ConfigWatcher (notify)
//!                                   └──────────────┘ on change: reload
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use scopelog::{Config, HandlerOptions};
//!
//! let handler = scopelog::try_init(HandlerOptions {
//!     enable_file_watcher: true,
//!     config_file: Some("scope.toml".into()),
//!     ..Default::default()
//! })?;
//!
//! // open up one module for a minute
//! handler.apply_config_temporarily(
//!     Config::with_level("INFO").package("my_app::db", "DEBUG"),
//!     Duration::from_secs(60),
//! );
//! # Ok::<(), scopelog::ScopeError>(())
//! ```

/// Target of all internal diagnostics.
pub const DIAG_TARGET: &str = "scopelog";

/// Internal diagnostics, only emitted when the handler runs in debug mode.
macro_rules! diag {
    ($debug:expr, $($arg:tt)+) => {
        if $debug {
            ::tracing::debug!(target: "scopelog", $($arg)+);
        }
    };
}

pub mod caller;
pub mod config;
pub mod handler;
pub mod layer;
pub mod level;
pub mod scope;

pub use caller::{CallInfo, CallerResolver, FixedResolver, ModulePathResolver, TargetResolver};
pub use config::{Config, ConfigError, Package, DEFAULT_CONFIG_FILE};
pub use handler::{ConfigSource, Handler, HandlerOptions};
pub use layer::ScopeLayer;
pub use level::{level_from_token, Severity};
pub use scope::ScopeTable;

use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Errors surfaced to applications wiring up scoped logging.
#[derive(Debug, Error)]
pub enum ScopeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to install global subscriber: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Install a global subscriber that writes through a `fmt` layer wrapped in
/// a [`ScopeLayer`], and return the handler that controls it.
pub fn try_init(options: HandlerOptions) -> Result<Handler, ScopeError> {
    let debug = options.debug;
    let layer = ScopeLayer::new(tracing_subscriber::fmt::layer(), options);
    let handler = layer.handler().clone();

    tracing_subscriber::registry().with(layer).try_init()?;

    diag!(debug, config = ?handler.config(), "scoped logging installed");
    Ok(handler)
}
