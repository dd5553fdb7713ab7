//! The callback contract's payload shape: specified here, while the actual
//! parser internals stay external. A concrete external parser sets
//! `cdc_commitlog::parser::SegmentParser::Mutation` to `RawMutation<M>` for
//! whichever [`crate::metadata::TableMetadata`] type `M` it uses; this crate
//! owns the shape, not the framing that produces it.

/// One parser-level mutation: an atomic change applied by the database,
/// potentially touching multiple partitions.
#[derive(Debug, Clone)]
pub struct RawMutation<M> {
    pub partition_updates: Vec<RawPartitionUpdate<M>>,
}

/// The portion of a [`RawMutation`] that targets one partition.
#[derive(Debug, Clone)]
pub struct RawPartitionUpdate<M> {
    pub metadata: M,
    /// Raw partition-key bytes as laid out on the wire: either the single
    /// column's bytes directly, or the composite encoding in [`crate::keydecode`].
    pub partition_key_bytes: Vec<u8>,
    /// `Some(timestamp)` iff this update carries a partition-level deletion.
    pub partition_deletion: Option<i64>,
    pub unfiltereds: Vec<RawUnfiltered>,
}

/// Either a row or a range-tombstone marker.
#[derive(Debug, Clone)]
pub enum RawUnfiltered {
    RangeTombstone,
    Row(RawRow),
}

/// One row inside a partition update.
#[derive(Debug, Clone)]
pub struct RawRow {
    /// Raw clustering-key bytes, already split per-column by the parser
    /// (unlike the partition key, clustering columns are not re-encoded
    /// composite-style here).
    pub clustering_key_bytes: Vec<Vec<u8>>,
    /// `row.deletion().markedForDeleteAt()`; `None` represents
    /// `NO_TIMESTAMP`.
    pub deletion_marked_for_delete_at: Option<i64>,
    /// `row.primaryKeyLivenessInfo().timestamp()`; `None` represents
    /// `NO_TIMESTAMP`.
    pub primary_key_liveness_timestamp: Option<i64>,
    /// `pu.maxTimestamp()`-equivalent used for INSERT/UPDATE `tsMicros`.
    /// This system always uses the deletion timestamp for DELETE and
    /// `max_timestamp` for INSERT/UPDATE.
    pub max_timestamp: i64,
}
