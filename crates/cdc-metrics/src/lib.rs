//! Process-global counters, registered once via `once_cell::Lazy`, using
//! plain `prometheus::register_int_counter!`/`register_int_gauge_vec!` calls
//! rather than a custom registration macro.

use once_cell::sync::Lazy;
use prometheus::{register_int_counter, register_int_gauge_vec, IntCounter, IntGaugeVec};

/// Cumulative count of mutations successfully published.
pub static SENT_MUTATIONS: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "cdc_sent_mutations_total",
        "Mutations published to the bus and acknowledged"
    )
    .expect("cdc_sent_mutations_total registration")
});

/// Cumulative count of publish-future failures observed by the
/// Delivery Loop (each one is followed by a retry, not a drop).
pub static SENT_ERRORS: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("cdc_sent_errors_total", "Publish attempts that failed and were retried")
        .expect("cdc_sent_errors_total registration")
});

/// Cumulative count of mutations dropped for
/// `UnsupportedColumnType` (the only skip that increments this counter; all
/// other drops are logged but not counted as skipped mutations).
pub static SKIPPED_MUTATIONS: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "cdc_skipped_mutations_total",
        "Mutations dropped due to an unsupported primary-key column type"
    )
    .expect("cdc_skipped_mutations_total registration")
});

/// Current offset cursor, exposed as a gauge vector so a single process
/// (one `segment_id`/`position` pair) still renders through dashboards
/// built for a label-based scrape.
pub static OFFSET_POSITION: Lazy<IntGaugeVec> = Lazy::new(|| {
    register_int_gauge_vec!(
        "cdc_offset_position",
        "Current (segment_id, position) cursor of the Offset Store",
        &["component"]
    )
    .expect("cdc_offset_position registration")
});

/// Update [`OFFSET_POSITION`] after a successful `OffsetStore::mark`.
///
/// Encodes the pair as two gauge samples under `component="segment_id"` and
/// `component="position"` rather than trying to cram a 96-bit pair into one
/// `i64` sample.
pub fn observe_offset(segment_id: u64, position: i32) {
    OFFSET_POSITION
        .with_label_values(&["segment_id"])
        .set(segment_id as i64);
    OFFSET_POSITION.with_label_values(&["position"]).set(position as i64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero_and_increment() {
        let before = SENT_MUTATIONS.get();
        SENT_MUTATIONS.inc();
        assert_eq!(SENT_MUTATIONS.get(), before + 1);
    }

    #[test]
    fn observe_offset_sets_both_gauges() {
        observe_offset(42, 100);
        assert_eq!(OFFSET_POSITION.with_label_values(&["segment_id"]).get(), 42);
        assert_eq!(OFFSET_POSITION.with_label_values(&["position"]).get(), 100);
    }
}
