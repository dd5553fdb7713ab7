//! The Commit-Log Reader: drives the external parser against
//! one segment at a time, in the order the Detector submits them.

use std::path::PathBuf;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use crate::parser::{MutationHandler, ParseError, SegmentDescriptor, SegmentParser};
use crate::stop::StopSignal;
use crate::transfer::TransferPolicy;

/// How long the Reader blocks on an empty queue before re-checking the stop
/// signal. Not a spec-mandated cadence (the queue has no poll interval of
/// its own); chosen small enough that `request_stop` is noticed promptly.
const QUEUE_POLL: Duration = Duration::from_millis(200);

/// The bounded hand-off from Detector to Reader: this queue is the only
/// shared state between the two workers beyond the stop signal.
pub fn segment_queue(capacity: usize) -> (Sender<PathBuf>, Receiver<PathBuf>) {
    crossbeam_channel::bounded(capacity)
}

/// Drains `queue`, processing one segment fully before the next — this is what
/// guarantees per-segment in-order delivery, since the handler's calls into
/// the Delivery Loop all happen on this thread.
pub struct Reader<P, H, T> {
    parser: P,
    handler: H,
    transfer: T,
    queue: Receiver<PathBuf>,
}

impl<P, H, T> Reader<P, H, T>
where
    P: SegmentParser,
    H: MutationHandler<P::Mutation>,
    T: TransferPolicy,
{
    pub fn new(parser: P, handler: H, transfer: T, queue: Receiver<PathBuf>) -> Self {
        Self {
            parser,
            handler,
            transfer,
            queue,
        }
    }

    /// Run until `stop.is_stopped()`. Blocks on the queue between segments;
    /// an in-flight segment is always finished before the stop signal is
    /// honored (in-flight `sendAsync` awaits are allowed to
    /// complete").
    pub fn run(&mut self, stop: &StopSignal) {
        while !stop.is_stopped() {
            match self.queue.recv_timeout(QUEUE_POLL) {
                Ok(path) => self.process_segment(path),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
    }

    /// Process exactly one segment; exposed separately so tests (and a
    /// synchronous driver with no background thread) can call it directly.
    pub fn process_segment(&mut self, path: PathBuf) {
        let descriptor = SegmentDescriptor::new(path.file_name().unwrap_or_default());
        tracing::info!(path = %path.display(), "segment read started");

        match self.parser.read_segment(&path, &descriptor, &mut self.handler) {
            Ok(()) => {
                tracing::info!(path = %path.display(), "segment read completed");
                if let Err(e) = self.transfer.on_success_transfer(&path) {
                    tracing::error!(path = %path.display(), error = %e, "failed to transfer completed segment");
                }
            }
            Err(ParseError::Permissible(msg)) => {
                // Logs and continues the segment: the
                // parser has already delivered every mutation it could
                // decode before hitting this; the segment is done as far as
                // the Reader is concerned.
                tracing::warn!(path = %path.display(), reason = %msg, "permissible parse error, segment considered read");
                if let Err(e) = self.transfer.on_success_transfer(&path) {
                    tracing::error!(path = %path.display(), error = %e, "failed to transfer completed segment");
                }
            }
            Err(ParseError::NonPermissible(msg)) => {
                // "the error is surfaced and the process treats the segment
                // as failed — the Reader itself keeps
                // running and moves on to the next queued segment.
                tracing::error!(path = %path.display(), reason = %msg, "non-permissible parse error, segment failed");
                if let Err(e) = self.transfer.on_error_transfer(&path) {
                    tracing::error!(path = %path.display(), error = %e, "failed to transfer failed segment");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::test_support::{FakeParser, Script};
    use crate::parser::HandlerError;
    use crate::transfer::ArchiveTransferPolicy;
    use cdc_paths::{ArchiveDir, ErrorDir, FromPathUnchecked};
    use std::sync::{Arc, Mutex};

    #[derive(Clone)]
    struct RecordingHandler(Arc<Mutex<Vec<(u32, i32)>>>);

    impl MutationHandler<u32> for RecordingHandler {
        fn on_mutation(
            &mut self,
            mutation: u32,
            entry_location: i32,
            _descriptor: &SegmentDescriptor,
        ) -> Result<(), HandlerError> {
            self.0.lock().unwrap().push((mutation, entry_location));
            Ok(())
        }
    }

    #[test]
    fn successful_segment_is_archived_and_mutations_recorded() {
        let tmp = tempfile::tempdir().unwrap();
        let archives = ArchiveDir::from_path_unchecked(tmp.path().join("archives"));
        let errors = ErrorDir::from_path_unchecked(tmp.path().join("errors"));
        let segment = tmp.path().join("CommitLog-7-1.log");
        std::fs::write(&segment, b"x").unwrap();

        let parser = FakeParser::<u32>::new();
        parser.script(
            &segment,
            Script {
                mutations: vec![(1, 0), (2, 10), (3, 20)],
                trailing_error: None,
            },
        );

        let seen = Arc::new(Mutex::new(Vec::new()));
        let handler = RecordingHandler(Arc::clone(&seen));
        let transfer = ArchiveTransferPolicy::new(archives.clone(), errors);
        let (_tx, rx) = segment_queue(1);
        let mut reader = Reader::new(parser, handler, transfer, rx);

        reader.process_segment(segment.clone());

        assert_eq!(*seen.lock().unwrap(), vec![(1, 0), (2, 10), (3, 20)]);
        assert!(!segment.exists());
        assert!(archives.0.join("CommitLog-7-1.log").exists());
    }

    #[test]
    fn non_permissible_error_moves_segment_to_error_folder() {
        let tmp = tempfile::tempdir().unwrap();
        let archives = ArchiveDir::from_path_unchecked(tmp.path().join("archives"));
        let errors = ErrorDir::from_path_unchecked(tmp.path().join("errors"));
        let segment = tmp.path().join("CommitLog-7-1.log");
        std::fs::write(&segment, b"x").unwrap();

        let parser = FakeParser::<u32>::new();
        parser.script(
            &segment,
            Script {
                mutations: vec![(1, 0)],
                trailing_error: Some(ParseError::NonPermissible("corrupt commit".into())),
            },
        );

        let seen = Arc::new(Mutex::new(Vec::new()));
        let handler = RecordingHandler(Arc::clone(&seen));
        let transfer = ArchiveTransferPolicy::new(archives, errors.clone());
        let (_tx, rx) = segment_queue(1);
        let mut reader = Reader::new(parser, handler, transfer, rx);

        reader.process_segment(segment.clone());

        assert!(!segment.exists());
        assert!(errors.0.join("CommitLog-7-1.log").exists());
    }

    #[test]
    fn permissible_error_still_archives_segment() {
        let tmp = tempfile::tempdir().unwrap();
        let archives = ArchiveDir::from_path_unchecked(tmp.path().join("archives"));
        let errors = ErrorDir::from_path_unchecked(tmp.path().join("errors"));
        let segment = tmp.path().join("CommitLog-7-1.log");
        std::fs::write(&segment, b"x").unwrap();

        let parser = FakeParser::<u32>::new();
        parser.script(
            &segment,
            Script {
                mutations: vec![(1, 0)],
                trailing_error: Some(ParseError::Permissible("skipped one bad record".into())),
            },
        );

        let handler = RecordingHandler(Arc::new(Mutex::new(Vec::new())));
        let transfer = ArchiveTransferPolicy::new(archives.clone(), errors);
        let (_tx, rx) = segment_queue(1);
        let mut reader = Reader::new(parser, handler, transfer, rx);

        reader.process_segment(segment.clone());

        assert!(archives.0.join("CommitLog-7-1.log").exists());
    }
}
