//! Configuration file watcher for hot reload.
//!
//! Each [`ConfigWatcher`] is single-shot: it reports at most one
//! [`WatchEvent`] and then stops. A content change is reported as
//! `Modified`, and the reload it triggers arms a fresh watcher. A rename
//! or removal is reported as `Vanished`; nothing is watched after that
//! until a file is bound again.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

use notify::event::ModifyKind;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

/// Quiet period after a modification before the file is considered written.
const SETTLE: Duration = Duration::from_millis(50);

enum WatchMsg {
    Event(notify::Result<Event>),
    Stop,
}

/// What a watcher saw before stopping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchEvent {
    /// The file content changed and has settled.
    Modified,
    /// The file was renamed or removed.
    Vanished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Change {
    Modified,
    Renamed,
    Removed,
}

/// A live subscription to change notifications for one config file.
///
/// Dropping it closes the subscription and ends its background thread.
pub struct ConfigWatcher {
    path: PathBuf,
    stop_tx: Sender<WatchMsg>,
    _watcher: RecommendedWatcher,
}

impl ConfigWatcher {
    /// Start watching `path` in a background thread.
    ///
    /// `on_event` runs on that thread, at most once. It is not called when
    /// the watcher is dropped first. Returns `Ok(None)` when the file does
    /// not exist; there is nothing to watch until something binds an
    /// existing file again.
    pub fn arm<F>(path: &Path, debug: bool, on_event: F) -> Result<Option<Self>, notify::Error>
    where
        F: FnOnce(WatchEvent) + Send + 'static,
    {
        if !path.exists() {
            diag!(debug, path = %path.display(), "config file does not exist, file watcher is disabled");
            return Ok(None);
        }

        let (tx, rx) = mpsc::channel();
        let event_tx = tx.clone();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                let _ = event_tx.send(WatchMsg::Event(res));
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;
        watcher.watch(path, RecursiveMode::NonRecursive)?;

        let thread_path = path.to_path_buf();
        thread::Builder::new()
            .name("scopelog-watcher".into())
            .spawn(move || run(thread_path, rx, debug, on_event))
            .map_err(notify::Error::io)?;

        diag!(debug, path = %path.display(), "started file watcher for config file");
        Ok(Some(Self {
            path: path.to_path_buf(),
            stop_tx: tx,
            _watcher: watcher,
        }))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ConfigWatcher {
    fn drop(&mut self) {
        let _ = self.stop_tx.send(WatchMsg::Stop);
    }
}

impl std::fmt::Debug for ConfigWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigWatcher").field("path", &self.path).finish()
    }
}

fn run<F>(path: PathBuf, rx: Receiver<WatchMsg>, debug: bool, on_event: F)
where
    F: FnOnce(WatchEvent),
{
    loop {
        let event = match rx.recv() {
            Ok(WatchMsg::Event(Ok(event))) => event,
            Ok(WatchMsg::Event(Err(e))) => {
                diag!(debug, path = %path.display(), error = %e, "file watcher error");
                continue;
            }
            Ok(WatchMsg::Stop) | Err(_) => break,
        };

        match classify(&event) {
            Some(Change::Removed) => {
                diag!(debug, path = %path.display(), "config file was removed");
                on_event(WatchEvent::Vanished);
                break;
            }
            Some(Change::Renamed) => {
                diag!(debug, path = %path.display(), "config file was renamed");
                on_event(WatchEvent::Vanished);
                break;
            }
            Some(Change::Modified) => {
                diag!(debug, path = %path.display(), "config file was modified");
                match settle(&rx, &path, debug) {
                    Some(Change::Modified) => on_event(WatchEvent::Modified),
                    Some(change) => {
                        diag!(debug, path = %path.display(), ?change, "config file vanished before reload");
                        on_event(WatchEvent::Vanished);
                    }
                    None => {}
                }
                break;
            }
            None => {}
        }
    }
    diag!(debug, path = %path.display(), "stopped file watcher for config file");
}

/// Waits until the file has been quiet for [`SETTLE`].
///
/// Returns `Modified` once quiet, the vanishing change if the file went away
/// meanwhile, or `None` if the watcher was stopped.
fn settle(rx: &Receiver<WatchMsg>, path: &Path, debug: bool) -> Option<Change> {
    loop {
        match rx.recv_timeout(SETTLE) {
            Ok(WatchMsg::Event(Ok(event))) => match classify(&event) {
                Some(change @ (Change::Removed | Change::Renamed)) => return Some(change),
                _ => continue,
            },
            Ok(WatchMsg::Event(Err(e))) => {
                diag!(debug, path = %path.display(), error = %e, "file watcher error");
            }
            Ok(WatchMsg::Stop) | Err(RecvTimeoutError::Disconnected) => return None,
            Err(RecvTimeoutError::Timeout) => return Some(Change::Modified),
        }
    }
}

fn classify(event: &Event) -> Option<Change> {
    match event.kind {
        EventKind::Remove(_) => Some(Change::Removed),
        EventKind::Modify(ModifyKind::Name(_)) => Some(Change::Renamed),
        EventKind::Modify(ModifyKind::Data(_)) | EventKind::Modify(ModifyKind::Any) => {
            Some(Change::Modified)
        }
        _ => None,
    }
}
