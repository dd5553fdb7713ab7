//! The Delivery Loop: the `MutationSink` the Extractor calls
//! inline, on the Reader thread, for every emitted mutation. Blocking and
//! retrying here is what gives the Reader its backpressure — blocking
//! `get()` on futures inside the Reader is kept deliberately.

use std::sync::Arc;
use std::time::Duration;

use cdc_commitlog::stop::StopSignal;
use cdc_extract::metadata::TableMetadata;
use cdc_extract::{Mutation, MutationSink};
use cdc_offsets::OffsetStore;
use cdc_publish::{BusClient, Publisher, PublishError};

/// On failure: sleep, then retry indefinitely.
const RETRY_COOLDOWN: Duration = Duration::from_secs(10);

/// How finely the cooldown is chopped up so a stop request is noticed
/// promptly; the retry sleep is interruptible.
const STOP_CHECK_INTERVAL: Duration = Duration::from_millis(100);

/// Implements [`MutationSink`] by handing each mutation to a
/// [`cdc_publish::Publisher`] and blocking the calling (Reader) thread until
/// it is durably acknowledged.
pub struct DeliveryLoop<B> {
    offsets: Arc<OffsetStore>,
    publisher: Arc<Publisher<B>>,
    runtime: tokio::runtime::Handle,
    stop: StopSignal,
}

impl<B: BusClient> DeliveryLoop<B> {
    pub fn new(offsets: Arc<OffsetStore>, publisher: Arc<Publisher<B>>, runtime: tokio::runtime::Handle, stop: StopSignal) -> Self {
        Self {
            offsets,
            publisher,
            runtime,
            stop,
        }
    }

    /// Sleeps up to [`RETRY_COOLDOWN`], returning early (`true`) if a stop
    /// was requested mid-sleep so the caller can abandon the retry without
    /// marking the offset.
    fn interruptible_cooldown(&self) -> bool {
        let mut remaining = RETRY_COOLDOWN;
        while !remaining.is_zero() {
            if self.stop.is_stopped() {
                return true;
            }
            let slice = remaining.min(STOP_CHECK_INTERVAL);
            std::thread::sleep(slice);
            remaining -= slice;
        }
        self.stop.is_stopped()
    }
}

impl<M, B> MutationSink<M> for DeliveryLoop<B>
where
    M: TableMetadata,
    B: BusClient,
{
    fn send(&mut self, mutation: Mutation<M>) {
        let cursor = self.offsets.load();
        // Fail fast — logged rather than panicking, since a position at or
        // behind the cursor here means an upstream invariant (the
        // Extractor's own skip filter) was already supposed to have dropped
        // this mutation.
        if mutation.position <= cursor {
            tracing::error!(position = %mutation.position, cursor = %cursor, "delivery loop received a mutation at or behind the offset cursor");
            return;
        }

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.runtime.block_on(self.publisher.publish(&mutation)) {
                Ok(()) => {
                    if let Err(e) = self.offsets.mark(mutation.position) {
                        // `OffsetPersistError`: the mutation was sent but its
                        // position is not yet durable; treat it as
                        // unacknowledged and retry the whole send, since a
                        // duplicate publish is acceptable (at-least-once) but
                        // losing the mark on a crash is not.
                        tracing::error!(position = %mutation.position, error = %e, "failed to persist offset after successful send, retrying");
                        cdc_metrics::SENT_ERRORS.inc();
                        if self.interruptible_cooldown() {
                            return;
                        }
                        continue;
                    }
                    cdc_metrics::SENT_MUTATIONS.inc();
                    return;
                }
                Err(PublishError::UnsupportedColumnType(cql_type)) => {
                    // `UnsupportedColumnType`: log-warn, increment
                    // skippedMutations, complete immediately — not retried,
                    // and the offset is deliberately left unadvanced.
                    tracing::warn!(cql_type = %cql_type, position = %mutation.position, "dropping mutation with unsupported primary-key column type");
                    cdc_metrics::SKIPPED_MUTATIONS.inc();
                    return;
                }
                Err(e) => {
                    tracing::warn!(attempt, position = %mutation.position, error = %e, "publish failed, retrying after cooldown");
                    cdc_metrics::SENT_ERRORS.inc();
                    if self.interruptible_cooldown() {
                        return;
                    }
                }
            }
        }
    }
}
