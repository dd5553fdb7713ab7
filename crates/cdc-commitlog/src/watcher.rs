//! The Directory Watcher: debounced filesystem-event poller.
//!
//! Built on `notify` with an `mpsc` channel fed from the watcher callback,
//! but polled on a fixed cadence rather than waiting for a quiet period: the
//! Detector calls this on a cadence ("polls a directory at `pollIntervalMs`"),
//! not as an idle-triggered rebuild, and duplicate events for the same path
//! are debounced *within* one poll.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher as _};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to start filesystem watcher")]
    Notify(#[from] notify::Error),
}

/// Polls `dir` for `{CREATE, MODIFY}` events, debouncing duplicate paths
/// within a single [`poll`](DirectoryWatcher::poll) call.
///
/// Filesystem notifications are inherently best-effort; the
/// Detector compensates by rescanning the directory on every poll cycle
/// regardless of what this type reports, so missed events here are not
/// fatal — they are just a latency hint.
pub struct DirectoryWatcher {
    _watcher: RecommendedWatcher,
    events: crossbeam_channel::Receiver<PathBuf>,
}

impl DirectoryWatcher {
    pub fn new(dir: &Path) -> Result<Self, Error> {
        let (tx, events) = crossbeam_channel::unbounded();

        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            let Ok(event) = res else { return };
            if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
                return;
            }
            for path in event.paths {
                // A send error means the receiver (and the whole watcher)
                // has been dropped; nothing to do but let this event go.
                let _ = tx.send(path);
            }
        })?;
        watcher.watch(dir, RecursiveMode::NonRecursive)?;

        Ok(Self {
            _watcher: watcher,
            events,
        })
    }

    /// Block for up to `interval`, collecting events, then return the
    /// distinct paths touched during that window in first-seen order.
    ///
    /// Returns immediately with whatever has already arrived once `interval`
    /// elapses; never blocks longer than `interval` even under a steady
    /// stream of events.
    pub fn poll(&self, interval: Duration) -> Vec<PathBuf> {
        let deadline = Instant::now() + interval;
        let mut seen = BTreeSet::new();
        let mut ordered = Vec::new();

        loop {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            match self.events.recv_timeout(deadline - now) {
                Ok(path) => {
                    if seen.insert(path.clone()) {
                        ordered.push(path);
                    }
                }
                Err(crossbeam_channel::RecvTimeoutError::Timeout) => break,
                Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
            }
        }

        ordered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::thread;

    #[test]
    fn reports_created_file_once() {
        let tmp = tempfile::tempdir().unwrap();
        let watcher = DirectoryWatcher::new(tmp.path()).unwrap();

        let path = tmp.path().join("CommitLog-7-1.log");
        let dir = tmp.path().to_owned();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            fs::write(dir.join("CommitLog-7-1.log"), b"data").unwrap();
        });

        let events = watcher.poll(Duration::from_secs(2));
        assert!(events.iter().any(|p| p == &path), "events = {events:?}");
    }

    #[test]
    fn poll_returns_by_deadline_with_no_events() {
        let tmp = tempfile::tempdir().unwrap();
        let watcher = DirectoryWatcher::new(tmp.path()).unwrap();
        let start = Instant::now();
        let events = watcher.poll(Duration::from_millis(100));
        assert!(events.is_empty());
        assert!(start.elapsed() >= Duration::from_millis(90));
    }
}
