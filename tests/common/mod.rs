//! Shared utilities for integration tests.

use std::io;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use scopelog::{Handler, ScopeLayer};
use tracing::Subscriber;
use tracing_subscriber::layer::SubscriberExt;

/// In-memory sink for a `fmt` layer.
#[allow(dead_code)]
#[derive(Clone, Default)]
pub struct Capture(Arc<Mutex<Vec<u8>>>);

#[allow(dead_code)]
impl Capture {
    pub fn lines(&self) -> Vec<String> {
        let buf = self.0.lock().unwrap();
        String::from_utf8_lossy(&buf)
            .lines()
            .map(str::to_owned)
            .collect()
    }

    /// Number of captured records at `level` ("DEBUG", "INFO", ...).
    pub fn count(&self, level: &str) -> usize {
        self.lines()
            .iter()
            .filter(|line| line.trim_start().starts_with(level))
            .count()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|line| line.contains(needle))
    }
}

impl io::Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Subscriber writing plain `LEVEL message` lines into `capture`, filtered by `handler`.
#[allow(dead_code)]
pub fn subscriber(handler: Handler, capture: Capture) -> impl Subscriber + Send + Sync {
    let sink = tracing_subscriber::fmt::layer()
        .with_writer(move || capture.clone())
        .with_ansi(false)
        .without_time()
        .with_target(false);
    tracing_subscriber::registry().with(ScopeLayer::with_handler(sink, handler))
}

/// Poll `check` until it holds or `timeout` passes.
#[allow(dead_code)]
pub fn wait_for(timeout: Duration, mut check: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if check() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    check()
}
