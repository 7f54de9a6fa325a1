//! Runtime reconfiguration of scoped log levels.
//!
//! # Data Flow
//! ```text
//! apply_config / apply_config_file / apply_config_temporarily
//!     → config file read, if any (no lock held)
//!     → state lock (writers are serialized)
//!     → ScopeTable rebuilt and swapped into the ArcSwap
//!     → lock released, old watcher dropped
//!     → watcher armed again when the source is a watched file
//!
//! log call
//!     → decide(metadata)
//!     → CallerResolver picks the module
//!     → ScopeTable lookup on the current snapshot (no lock)
//! ```
//!
//! # Design Decisions
//! - Readers never take the state lock; they load an immutable snapshot
//! - An explicit config always wins over a config file at construction
//! - A temporary override restores the state from before the first
//!   still-pending override; later reconfigurations void older timers

pub mod revert;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use arc_swap::ArcSwap;
use serde::Deserialize;
use tracing::Metadata;

use crate::caller::{CallerResolver, ModulePathResolver};
use crate::config::watcher::WatchEvent;
use crate::config::{load_or_default, Config, ConfigWatcher, DEFAULT_CONFIG_FILE};
use crate::level::Severity;
use crate::scope::ScopeTable;

/// Construction options for a [`Handler`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HandlerOptions {
    /// Watch the bound config file and reload it on change.
    pub enable_file_watcher: bool,

    /// Config file to load. Defaults to [`DEFAULT_CONFIG_FILE`] when watching.
    pub config_file: Option<PathBuf>,

    /// Explicit config. Takes precedence over `config_file`.
    pub config: Option<Config>,

    /// Emit internal diagnostics under the `scopelog` target.
    pub debug: bool,
}

/// Where the live config came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Static,
    File { path: PathBuf, watch: bool },
}

struct PendingRevert {
    token: u64,
    config: Config,
    source: ConfigSource,
}

struct State {
    source: ConfigSource,
    bound_path: PathBuf,
    watcher: Option<ConfigWatcher>,
    /// Bumped by every commit. A file read is retried if it moved meanwhile.
    generation: u64,
    /// Identifies the watcher that may still report; events from any other are ignored.
    watch_id: u64,
    pending_revert: Option<PendingRevert>,
    next_token: u64,
}

/// Result of swapping in a config under the lock. The watcher work it
/// carries is finished after the lock is released.
struct Commit {
    retired: Option<ConfigWatcher>,
    arm: Option<(u64, PathBuf)>,
}

struct Shared {
    table: ArcSwap<ScopeTable>,
    state: Mutex<State>,
    resolver: Box<dyn CallerResolver>,
    debug: bool,
}

/// Decides per log call whether it is enabled, and owns the live config.
///
/// Cloning is cheap; all clones share the same state.
#[derive(Clone)]
pub struct Handler {
    shared: Arc<Shared>,
}

impl Handler {
    /// Create a handler that scopes log calls by their module path.
    pub fn new(options: HandlerOptions) -> Self {
        Self::with_resolver(options, ModulePathResolver)
    }

    pub fn with_resolver<R>(options: HandlerOptions, resolver: R) -> Self
    where
        R: CallerResolver + 'static,
    {
        let debug = options.debug;
        diag!(debug, "debug mode enabled");

        let bound_path = options
            .config_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        let handler = Self {
            shared: Arc::new(Shared {
                table: ArcSwap::from_pointee(ScopeTable::default()),
                state: Mutex::new(State {
                    source: ConfigSource::Static,
                    bound_path: bound_path.clone(),
                    watcher: None,
                    generation: 0,
                    watch_id: 0,
                    pending_revert: None,
                    next_token: 0,
                }),
                resolver: Box::new(resolver),
                debug,
            }),
        };

        let (config, source) = match options.config {
            Some(config) => (config, ConfigSource::Static),
            None if options.config_file.is_some() || options.enable_file_watcher => {
                let config = handler.read_file(&bound_path);
                let source = ConfigSource::File {
                    path: bound_path,
                    watch: options.enable_file_watcher,
                };
                (config, source)
            }
            None => (Config::default(), ConfigSource::Static),
        };
        let commit = handler.commit(&mut handler.lock(), config, source);
        handler.finish(commit);
        handler
    }

    /// The live config, by value.
    pub fn config(&self) -> Config {
        self.shared.table.load().config().clone()
    }

    /// The live lookup table.
    pub fn scope(&self) -> Arc<ScopeTable> {
        self.shared.table.load_full()
    }

    pub fn source(&self) -> ConfigSource {
        self.lock().source.clone()
    }

    /// Whether a file watcher is currently armed.
    pub fn is_watching(&self) -> bool {
        self.lock().watcher.is_some()
    }

    /// Whether internal diagnostics are enabled.
    pub fn is_debug(&self) -> bool {
        self.shared.debug
    }

    /// Replace the live config and stop watching any file.
    pub fn apply_config(&self, config: Config) {
        let commit = {
            let mut state = self.lock();
            state.pending_revert = None;
            self.commit(&mut state, config, ConfigSource::Static)
        };
        self.finish(commit);
        diag!(self.shared.debug, config = ?self.config(), "using config");
    }

    /// Load the config from `path` and watch it for changes.
    ///
    /// Without a path, the previously bound file (or [`DEFAULT_CONFIG_FILE`])
    /// is used. A missing or broken file yields the default config.
    pub fn apply_config_file(&self, path: Option<&Path>) {
        if let Some(path) = path {
            self.lock().bound_path = path.to_path_buf();
        }

        // the file is read without the lock; start over if a writer got in first
        let commit = loop {
            let (path, generation) = {
                let state = self.lock();
                (state.bound_path.clone(), state.generation)
            };
            let config = self.read_file(&path);

            let mut state = self.lock();
            if state.generation != generation {
                diag!(self.shared.debug, path = %path.display(), "config changed while reading file, retrying");
                continue;
            }
            state.pending_revert = None;
            break self.commit(&mut state, config, ConfigSource::File { path, watch: true });
        };
        self.finish(commit);
    }

    /// Apply `config` now and restore the current state after `duration`.
    ///
    /// If the restored state was a watched file, it is reloaded and watched
    /// again. Calling this while an earlier override is still pending keeps
    /// the earlier restore point and voids the earlier timer.
    pub fn apply_config_temporarily(&self, config: Config, duration: Duration) {
        let (token, commit) = {
            let mut state = self.lock();
            let restore = match state.pending_revert.take() {
                Some(pending) => (pending.config, pending.source),
                None => (self.config(), state.source.clone()),
            };
            state.next_token += 1;
            let token = state.next_token;

            let commit = self.commit(&mut state, config, ConfigSource::Static);
            state.pending_revert = Some(PendingRevert {
                token,
                config: restore.0,
                source: restore.1,
            });
            (token, commit)
        };
        self.finish(commit);
        diag!(self.shared.debug, config = ?self.config(), ?duration, "using config temporarily");

        let weak = Arc::downgrade(&self.shared);
        if let Err(e) = revert::schedule(duration, move || {
            if let Some(handler) = Self::upgrade(&weak) {
                handler.revert(token);
            }
        }) {
            tracing::warn!(target: "scopelog", error = %e, "failed to schedule config revert");
        }
    }

    /// Stop the file watcher, if any. Pending reverts become no-ops.
    ///
    /// The handler keeps filtering with the config it has. A file source
    /// stays bound but unwatched, so later reverts do not watch it again.
    pub fn close(&self) {
        let retired = {
            let mut state = self.lock();
            state.pending_revert = None;
            state.watch_id += 1;
            if let ConfigSource::File { watch, .. } = &mut state.source {
                *watch = false;
            }
            state.watcher.take()
        };
        drop(retired);
        diag!(self.shared.debug, "handler closed");
    }

    /// Enable decision for an explicit module and severity.
    pub fn is_enabled(&self, module: Option<&str>, severity: Severity) -> bool {
        self.shared.table.load().is_enabled(module, severity)
    }

    /// Enable decision for a tracing callsite.
    pub fn decide(&self, metadata: &Metadata<'_>) -> bool {
        let caller = self.shared.resolver.resolve(metadata);
        self.is_enabled(caller.module, Severity::from(metadata.level()))
    }

    fn revert(&self, token: u64) {
        let pending = {
            let state = self.lock();
            match &state.pending_revert {
                Some(pending) if pending.token == token => {
                    (pending.config.clone(), pending.source.clone())
                }
                _ => {
                    diag!(self.shared.debug, token, "config revert superseded, skipping");
                    return;
                }
            }
        };

        let (config, source) = match pending {
            (_, ConfigSource::File { path, watch }) => {
                (self.read_file(&path), ConfigSource::File { path, watch })
            }
            (config, ConfigSource::Static) => (config, ConfigSource::Static),
        };

        let commit = {
            let mut state = self.lock();
            if !matches!(&state.pending_revert, Some(pending) if pending.token == token) {
                diag!(self.shared.debug, token, "config revert superseded, skipping");
                return;
            }
            state.pending_revert = None;
            if let ConfigSource::File { path, .. } = &source {
                state.bound_path = path.clone();
            }
            self.commit(&mut state, config, source)
        };
        self.finish(commit);
        diag!(self.shared.debug, config = ?self.config(), "reverted config to original");
    }

    /// Called from a watcher thread. Events from a watcher that has since
    /// been replaced or disarmed are ignored.
    fn on_watch_event(&self, watch_id: u64, event: WatchEvent) {
        let reload = {
            let mut state = self.lock();
            if state.watch_id != watch_id {
                return;
            }
            let file = match &state.source {
                ConfigSource::File { path, watch } => Some((path.clone(), *watch)),
                ConfigSource::Static => None,
            };
            match (event, file) {
                (WatchEvent::Modified, Some(file)) => Ok(file),
                // keep the last good config until something binds a file again
                _ => {
                    state.watch_id += 1;
                    Err(state.watcher.take())
                }
            }
        };
        let (path, watch) = match reload {
            Ok(file) => file,
            Err(retired) => {
                drop(retired);
                return;
            }
        };

        let config = self.read_file(&path);
        let commit = {
            let mut state = self.lock();
            if state.watch_id != watch_id {
                diag!(self.shared.debug, path = %path.display(), "config changed during reload, dropping it");
                return;
            }
            self.commit(&mut state, config, ConfigSource::File { path, watch })
        };
        self.finish(commit);
    }

    fn read_file(&self, path: &Path) -> Config {
        let (config, err) = load_or_default(path);
        match err {
            Some(e) => {
                diag!(self.shared.debug, path = %path.display(), error = %e, "cannot load config file, using defaults")
            }
            None => diag!(self.shared.debug, path = %path.display(), "config file loaded"),
        }
        config
    }

    /// Swap in `config` and invalidate the current watcher.
    fn commit(&self, state: &mut State, config: Config, source: ConfigSource) -> Commit {
        let retired = state.watcher.take();
        state.generation += 1;
        state.watch_id += 1;
        self.shared.table.store(Arc::new(ScopeTable::build(config)));

        let arm = match &source {
            ConfigSource::File { path, watch: true } => Some((state.watch_id, path.clone())),
            _ => None,
        };
        state.source = source;
        Commit { retired, arm }
    }

    /// Drop the retired watcher and arm the new one, outside the lock.
    fn finish(&self, commit: Commit) {
        drop(commit.retired);
        let Some((watch_id, path)) = commit.arm else {
            return;
        };

        let weak = Arc::downgrade(&self.shared);
        let armed = ConfigWatcher::arm(&path, self.shared.debug, move |event| {
            if let Some(handler) = Self::upgrade(&weak) {
                handler.on_watch_event(watch_id, event);
            }
        });
        let watcher = match armed {
            Ok(Some(watcher)) => watcher,
            Ok(None) => return,
            Err(e) => {
                diag!(self.shared.debug, path = %path.display(), error = %e, "cannot watch config file");
                return;
            }
        };

        // a newer commit, close or vanish may have happened while arming
        let stale = {
            let mut state = self.lock();
            if state.watch_id == watch_id {
                state.watcher = Some(watcher);
                None
            } else {
                Some(watcher)
            }
        };
        drop(stale);
    }

    fn upgrade(weak: &Weak<Shared>) -> Option<Self> {
        weak.upgrade().map(|shared| Self { shared })
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handler")
            .field("config", &self.config())
            .field("debug", &self.shared.debug)
            .finish()
    }
}
