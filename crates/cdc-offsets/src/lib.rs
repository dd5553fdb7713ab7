//! The Offset Store: a totally ordered `(segmentId, position)`
//! cursor that gates reprocessing and is advanced only on confirmed publish.
//!
//! Built on plain `io::Result` returns with `tracing` for diagnostics, and
//! a per-crate `thiserror::Error` convention.

use std::cmp::Ordering;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;

/// `CommitLogPosition` — totally ordered pair `(segmentId, position)`.
///
/// Compared lexicographically: a higher segment id always wins regardless of
/// `position`, matching "all mutations at or before this byte offset of this
/// segment have been durably published."
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CommitLogPosition {
    pub segment_id: u64,
    pub position: i32,
}

impl CommitLogPosition {
    pub const ZERO: CommitLogPosition = CommitLogPosition {
        segment_id: 0,
        position: 0,
    };

    pub fn new(segment_id: u64, position: i32) -> Self {
        Self { segment_id, position }
    }
}

impl PartialOrd for CommitLogPosition {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CommitLogPosition {
    fn cmp(&self, other: &Self) -> Ordering {
        self.segment_id
            .cmp(&other.segment_id)
            .then_with(|| self.position.cmp(&other.position))
    }
}

impl fmt::Display for CommitLogPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.segment_id, self.position)
    }
}

impl FromStr for CommitLogPosition {
    type Err = ParsePositionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (seg, pos) = s
            .split_once(':')
            .ok_or_else(|| ParsePositionError(s.to_string()))?;
        let segment_id = seg.parse().map_err(|_| ParsePositionError(s.to_string()))?;
        let position = pos.parse().map_err(|_| ParsePositionError(s.to_string()))?;
        Ok(Self { segment_id, position })
    }
}

#[derive(Debug, Error)]
#[error("malformed offset {0:?}, expected \"segmentId:position\"")]
pub struct ParsePositionError(String);

/// Durable backend for the offset cursor. Implementors need only guarantee
/// that a write which returns `Ok` is observable by a subsequent process
/// start; the in-process monotonicity is enforced by [`OffsetStore`] itself.
pub trait OffsetBackend: Send + Sync {
    /// Read the last durably persisted position, if any has ever been written.
    fn read(&self) -> Result<Option<CommitLogPosition>, Error>;
    /// Durably persist `position`. Must be atomic: a crash during the write
    /// must never leave a backend that reads back a torn value.
    fn write(&self, position: CommitLogPosition) -> Result<(), Error>;
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("offset backend I/O error")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Parse(#[from] ParsePositionError),
}

/// The in-memory monotonic cursor, backed by a durable [`OffsetBackend`].
///
/// `load` and `mark` are the only two operations. Both take
/// the same lock, so `mark`'s read-modify-write is atomic with respect to
/// concurrent `load`s. Contention here is negligible, so a plain mutex is
/// used rather than a lock-free structure.
pub struct OffsetStore {
    backend: Arc<dyn OffsetBackend>,
    current: Mutex<CommitLogPosition>,
}

impl OffsetStore {
    /// Open the store, seeding the in-memory cursor from the backend (or
    /// `CommitLogPosition::ZERO` if nothing was ever persisted).
    pub fn open(backend: Arc<dyn OffsetBackend>) -> Result<Self, Error> {
        let current = backend.read()?.unwrap_or(CommitLogPosition::ZERO);
        tracing::info!(%current, "offset store opened");
        Ok(Self {
            backend,
            current: Mutex::new(current),
        })
    }

    /// `load() -> CommitLogPosition` — readable concurrently.
    pub fn load(&self) -> CommitLogPosition {
        *self.current.lock()
    }

    /// `mark(position)` — advances to `max(current, position)`;
    /// atomic w.r.t. `load`.
    pub fn mark(&self, position: CommitLogPosition) -> Result<(), Error> {
        let mut guard = self.current.lock();
        if position <= *guard {
            return Ok(());
        }
        self.backend.write(position)?;
        *guard = position;
        drop(guard);
        cdc_metrics::observe_offset(position.segment_id, position.position);
        tracing::debug!(%position, "offset advanced");
        Ok(())
    }
}

/// File-backed [`OffsetBackend`]: a single line `segmentId:position`,
/// written atomically (write-temp + rename) via `cdc_fs_utils::atomic_write`.
pub struct FileOffsetBackend {
    path: PathBuf,
}

impl FileOffsetBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl OffsetBackend for FileOffsetBackend {
    fn read(&self) -> Result<Option<CommitLogPosition>, Error> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(contents.trim().parse()?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, position: CommitLogPosition) -> Result<(), Error> {
        cdc_fs_utils::atomic_write(&self.path, position.to_string())?;
        Ok(())
    }
}

/// A backend that never persists anything; `load` after restart always
/// starts from `CommitLogPosition::ZERO`. Useful for tests and for
/// `PublisherInitError`-adjacent failure injection.
pub struct NullOffsetBackend;

impl OffsetBackend for NullOffsetBackend {
    fn read(&self) -> Result<Option<CommitLogPosition>, Error> {
        Ok(None)
    }

    fn write(&self, _position: CommitLogPosition) -> Result<(), Error> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn position_ordering_is_lexicographic() {
        assert!(CommitLogPosition::new(1, 1000) < CommitLogPosition::new(2, 0));
        assert!(CommitLogPosition::new(2, 0) < CommitLogPosition::new(2, 1));
        assert_eq!(CommitLogPosition::new(2, 5), CommitLogPosition::new(2, 5));
    }

    #[test]
    fn display_roundtrips_through_fromstr() {
        let p = CommitLogPosition::new(42, 100);
        let parsed: CommitLogPosition = p.to_string().parse().unwrap();
        assert_eq!(p, parsed);
    }

    #[test]
    fn mark_never_moves_backward() {
        let store = OffsetStore::open(Arc::new(NullOffsetBackend)).unwrap();
        store.mark(CommitLogPosition::new(5, 10)).unwrap();
        store.mark(CommitLogPosition::new(3, 999)).unwrap();
        assert_eq!(store.load(), CommitLogPosition::new(5, 10));
    }

    #[test]
    fn mark_at_exactly_current_is_a_noop_skip() {
        let store = OffsetStore::open(Arc::new(NullOffsetBackend)).unwrap();
        store.mark(CommitLogPosition::new(5, 10)).unwrap();
        let before = store.load();
        store.mark(CommitLogPosition::new(5, 10)).unwrap();
        assert_eq!(store.load(), before);
    }

    #[test]
    fn file_backend_survives_restart() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("offset");

        {
            let store = OffsetStore::open(Arc::new(FileOffsetBackend::new(&path))).unwrap();
            store.mark(CommitLogPosition::new(42, 100)).unwrap();
        }
        // a subsequent process start observes at least that value
        let restarted = OffsetStore::open(Arc::new(FileOffsetBackend::new(&path))).unwrap();
        assert!(restarted.load() >= CommitLogPosition::new(42, 100));
    }

    proptest! {
        #[test]
        fn ordering_matches_tuple_ordering(
            a_seg in 0u64..10, a_pos in 0i32..10,
            b_seg in 0u64..10, b_pos in 0i32..10,
        ) {
            let a = CommitLogPosition::new(a_seg, a_pos);
            let b = CommitLogPosition::new(b_seg, b_pos);
            prop_assert_eq!(a.cmp(&b), (a_seg, a_pos).cmp(&(b_seg, b_pos)));
        }
    }
}
