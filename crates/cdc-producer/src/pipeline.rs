//! Wiring: builds every component and spawns the two worker threads —
//! no inheritance chain; the Detector and Reader share nothing but the
//! stop signal.

use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use cdc_commitlog::detector::{Detector, DetectorConfig, Mode};
use cdc_commitlog::parser::SegmentParser;
use cdc_commitlog::reader::{segment_queue, Reader};
use cdc_commitlog::stop::StopSignal;
use cdc_commitlog::transfer::ArchiveTransferPolicy;
use cdc_extract::metadata::TableMetadata;
use cdc_extract::raw::RawMutation;
use cdc_extract::Extractor;
use cdc_offsets::{FileOffsetBackend, OffsetStore};
use cdc_paths::{CdcDir, WorkingRoot};
use cdc_publish::{BusClient, Publisher};

use crate::config::ProducerConfig;
use crate::context::SourceContext;
use crate::delivery::DeliveryLoop;

/// The Detector and Reader worker threads, plus the shared stop signal and
/// offset store, for one running producer instance.
pub struct Pipeline {
    stop: StopSignal,
    offsets: Arc<OffsetStore>,
    detector_handle: thread::JoinHandle<()>,
    reader_handle: thread::JoinHandle<()>,
}

impl Pipeline {
    /// Build every component and spawn the Detector and Reader threads.
    ///
    /// `parser` is the external commit-log reader library: a real
    /// deployment supplies its own `SegmentParser` whose `Mutation`
    /// type is `RawMutation<M>` for whichever `TableMetadata` version `M`
    /// that deployment targets; `cdc_commitlog::parser::UnimplementedParser`
    /// is the production default when none is linked.
    pub fn spawn<P, M, B>(config: &ProducerConfig, parser: P, bus: Arc<B>, context: SourceContext, runtime: tokio::runtime::Handle) -> anyhow::Result<Self>
    where
        P: SegmentParser<Mutation = RawMutation<M>> + Send + 'static,
        M: TableMetadata + Send + 'static,
        B: BusClient + 'static,
    {
        let working_root = WorkingRoot::from_path_unchecked(&config.cdc_working_dir);
        let cdc_dir = CdcDir::from_path_unchecked(&config.cdc_working_dir);
        working_root.archives().create()?;
        working_root.errors().create()?;

        let offset_path = Path::new(&config.cdc_working_dir).join("offset");
        let offsets = Arc::new(OffsetStore::open(Arc::new(FileOffsetBackend::new(offset_path)))?);

        let stop = StopSignal::new();
        let (segment_tx, segment_rx) = segment_queue(256);

        let error_dir = config.error_commit_log_reprocess_enabled.then(|| working_root.errors());

        let detector = Detector::new(
            DetectorConfig {
                cdc_dir,
                error_dir,
                poll_interval: Duration::from_millis(config.cdc_dir_poll_interval_ms),
                mode: Mode::Batch,
            },
            segment_tx,
        )?;

        let publisher = Arc::new(Publisher::new(bus, config.topic_prefix.clone()));
        let delivery = DeliveryLoop::new(Arc::clone(&offsets), publisher, runtime, stop.clone());
        let extractor = Extractor::new(Arc::clone(&offsets), context.source_info(), delivery);
        let transfer = ArchiveTransferPolicy::new(working_root.archives(), working_root.errors());
        let reader = Reader::new(parser, extractor, transfer, segment_rx);

        let detector_handle = {
            let mut detector = detector;
            let stop = stop.clone();
            let offsets = Arc::clone(&offsets);
            thread::Builder::new().name("cdc-detector".to_string()).spawn(move || detector.run(&offsets, &stop))?
        };

        let reader_handle = {
            let mut reader = reader;
            let stop = stop.clone();
            thread::Builder::new().name("cdc-reader".to_string()).spawn(move || reader.run(&stop))?
        };

        Ok(Self {
            stop,
            offsets,
            detector_handle,
            reader_handle,
        })
    }

    pub fn offsets(&self) -> &Arc<OffsetStore> {
        &self.offsets
    }

    /// Requests both workers stop at the top of their next loop iteration.
    /// Does not block; call [`Self::join`] afterward to wait for both
    /// threads to exit.
    pub fn request_stop(&self) {
        self.stop.request_stop();
    }

    pub fn join(self) -> anyhow::Result<()> {
        self.detector_handle.join().map_err(|_| anyhow::anyhow!("detector worker thread panicked"))?;
        self.reader_handle.join().map_err(|_| anyhow::anyhow!("reader worker thread panicked"))?;
        Ok(())
    }
}
