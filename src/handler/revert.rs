//! One-shot deferred actions used to undo temporary overrides.

use std::io;
use std::thread;
use std::time::Duration;

/// Run `action` once after `delay`, without blocking the caller.
///
/// Inside a tokio runtime the wait is a timer task and the action runs on
/// the blocking pool, since it may read files. Outside a runtime a
/// dedicated thread sleeps and then runs it. Timers are not tied to any
/// shutdown signal: if the runtime goes away first, the action is dropped.
pub(crate) fn schedule<F>(delay: Duration, action: F) -> io::Result<()>
where
    F: FnOnce() + Send + 'static,
{
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn(async move {
                tokio::time::sleep(delay).await;
                if let Err(e) = tokio::task::spawn_blocking(action).await {
                    tracing::warn!(target: "scopelog", error = %e, "deferred config revert failed");
                }
            });
            Ok(())
        }
        Err(_) => thread::Builder::new()
            .name("scopelog-revert".into())
            .spawn(move || {
                thread::sleep(delay);
                action();
            })
            .map(|_| ()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Instant;

    #[test]
    fn test_runs_once_on_thread() {
        let (tx, rx) = mpsc::channel();
        let started = Instant::now();
        schedule(Duration::from_millis(50), move || tx.send(Instant::now()).unwrap()).unwrap();

        let fired = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(fired.duration_since(started) >= Duration::from_millis(50));
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
    }

    #[tokio::test]
    async fn test_runs_on_runtime() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        schedule(Duration::from_millis(20), move || {
            let _ = tx.send(());
        })
        .unwrap();

        let fired = tokio::time::timeout(Duration::from_secs(5), rx.recv()).await;
        assert!(matches!(fired, Ok(Some(()))));
    }

    struct Sink(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl io::Write for Sink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_panicking_action_is_logged() {
        let buf = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let writer = buf.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || Sink(writer.clone()))
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        schedule(Duration::from_millis(10), || panic!("revert blew up")).unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;

        let out = String::from_utf8_lossy(&buf.lock().unwrap()).into_owned();
        assert!(out.contains("deferred config revert failed"), "got: {}", out);
    }
}
