//! The Commit-Log Detector: startup backlog scan plus
//! steady-state new-file detection, handing segments to the Reader queue.

use std::path::PathBuf;
use std::time::Duration;

use cdc_offsets::OffsetStore;
use cdc_paths::{CdcDir, ErrorDir};
use crossbeam_channel::Sender;

use crate::filename::{classify, list_segments, SegmentFileKind};
use crate::stop::StopSignal;
use crate::transfer::recycle_error_commit_log_files;
use crate::watcher::{self, DirectoryWatcher};

/// Whether the source database is writing complete `.log` segments only
/// (`Batch`) or also flushing a live `_cdc.idx` sidecar (`NearRealTime`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Batch,
    NearRealTime,
}

pub struct DetectorConfig {
    pub cdc_dir: CdcDir,
    /// `Some` iff `errorCommitLogReprocessEnabled`.
    pub error_dir: Option<ErrorDir>,
    pub poll_interval: Duration,
    pub mode: Mode,
}

pub struct Detector {
    cdc_dir: CdcDir,
    error_dir: Option<ErrorDir>,
    poll_interval: Duration,
    mode: Mode,
    watcher: DirectoryWatcher,
    queue: Sender<PathBuf>,
}

impl Detector {
    pub fn new(config: DetectorConfig, queue: Sender<PathBuf>) -> Result<Self, watcher::Error> {
        let watcher = DirectoryWatcher::new(&config.cdc_dir)?;
        Ok(Self {
            cdc_dir: config.cdc_dir,
            error_dir: config.error_dir,
            poll_interval: config.poll_interval,
            mode: config.mode,
            watcher,
            queue,
        })
    }

    /// Run the detector loop until `stop.is_stopped()`:
    /// `{recycle-if-enabled -> (first time only: backlog scan) -> watcher.poll}`
    /// shared with the Reader.
    pub fn run(&mut self, offsets: &OffsetStore, stop: &StopSignal) {
        self.backlog_scan(offsets);
        while !stop.is_stopped() {
            self.recycle_if_enabled();
            let events = self.watcher.poll(self.poll_interval);
            self.submit_steady_state(events);
        }
    }

    fn recycle_if_enabled(&self) {
        if let Some(error_dir) = &self.error_dir {
            if let Err(e) = recycle_error_commit_log_files(error_dir, &self.cdc_dir) {
                tracing::error!(error = %e, "failed to recycle error-folder segments");
            }
        }
    }

    /// On start, performs one backlog pass.
    fn backlog_scan(&self, offsets: &OffsetStore) {
        self.recycle_if_enabled();

        let segments = match list_segments(&self.cdc_dir) {
            Ok(segments) => segments,
            Err(e) => {
                tracing::error!(error = %e, dir = %self.cdc_dir, "failed to list CDC directory during backlog scan");
                return;
            }
        };

        let threshold = offsets.load().segment_id;
        let mut newest_cdc_index = None;

        for path in segments {
            match classify(&path) {
                Ok((segment_id, SegmentFileKind::Log)) if segment_id >= threshold => {
                    self.submit(path);
                }
                Ok((_, SegmentFileKind::CdcIndex)) => {
                    // `list_segments` is sorted ascending, so the last one
                    // seen is the newest.
                    newest_cdc_index = Some(path);
                }
                _ => {}
            }
        }

        if self.mode == Mode::NearRealTime {
            if let Some(idx) = newest_cdc_index {
                self.submit(idx);
            }
        }
    }

    /// On every watcher poll, files matching the active mode are submitted
    /// in arrival order. The Detector does not itself sort steady-state
    /// arrivals.
    fn submit_steady_state(&self, events: Vec<PathBuf>) {
        for path in events {
            let Ok((_, kind)) = classify(&path) else { continue };
            let matches_mode = match self.mode {
                Mode::Batch => kind == SegmentFileKind::Log,
                Mode::NearRealTime => kind == SegmentFileKind::CdcIndex,
            };
            if matches_mode {
                self.submit(path);
            }
        }
    }

    fn submit(&self, path: PathBuf) {
        tracing::info!(path = %path.display(), "segment submitted to reader queue");
        if self.queue.send(path).is_err() {
            tracing::error!("reader queue disconnected, detector cannot submit further segments");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::segment_queue;
    use cdc_offsets::{CommitLogPosition, NullOffsetBackend};
    use std::fs;
    use std::sync::Arc;

    fn offsets_at(segment_id: u64) -> OffsetStore {
        let store = OffsetStore::open(Arc::new(NullOffsetBackend)).unwrap();
        if segment_id > 0 {
            store.mark(CommitLogPosition::new(segment_id, 0)).unwrap();
        }
        store
    }

    #[test]
    fn backlog_scan_submits_only_segments_at_or_past_offset() {
        let tmp = tempfile::tempdir().unwrap();
        let cdc_dir = CdcDir(tmp.path().to_owned());
        for id in [5, 6, 7] {
            fs::write(cdc_dir.0.join(format!("CommitLog-7-{id}.log")), b"x").unwrap();
        }

        let (tx, rx) = segment_queue(10);
        let mut detector = Detector::new(
            DetectorConfig {
                cdc_dir: cdc_dir.clone(),
                error_dir: None,
                poll_interval: Duration::from_millis(10),
                mode: Mode::Batch,
            },
            tx,
        )
        .unwrap();

        let offsets = offsets_at(6);
        detector.backlog_scan(&offsets);

        let mut submitted = Vec::new();
        while let Ok(path) = rx.try_recv() {
            submitted.push(path);
        }
        let ids: Vec<u64> = submitted
            .iter()
            .map(|p| crate::filename::extract_segment_id(p).unwrap())
            .collect();
        assert_eq!(ids, vec![6, 7]);
    }

    #[test]
    fn near_real_time_backlog_submits_newest_idx_last() {
        let tmp = tempfile::tempdir().unwrap();
        let cdc_dir = CdcDir(tmp.path().to_owned());
        fs::write(cdc_dir.0.join("CommitLog-7-1.log"), b"x").unwrap();
        fs::write(cdc_dir.0.join("1_cdc.idx"), b"x").unwrap();
        fs::write(cdc_dir.0.join("2_cdc.idx"), b"x").unwrap();

        let (tx, rx) = segment_queue(10);
        let mut detector = Detector::new(
            DetectorConfig {
                cdc_dir: cdc_dir.clone(),
                error_dir: None,
                poll_interval: Duration::from_millis(10),
                mode: Mode::NearRealTime,
            },
            tx,
        )
        .unwrap();

        detector.backlog_scan(&offsets_at(0));

        let submitted: Vec<PathBuf> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
        assert_eq!(submitted.last().unwrap().file_name().unwrap(), "2_cdc.idx");
    }

    #[test]
    fn empty_cdc_directory_backlog_scan_does_not_error() {
        let tmp = tempfile::tempdir().unwrap();
        let cdc_dir = CdcDir(tmp.path().to_owned());
        let (tx, _rx) = segment_queue(10);
        let mut detector = Detector::new(
            DetectorConfig {
                cdc_dir,
                error_dir: None,
                poll_interval: Duration::from_millis(10),
                mode: Mode::Batch,
            },
            tx,
        )
        .unwrap();
        detector.backlog_scan(&offsets_at(0));
    }
}
