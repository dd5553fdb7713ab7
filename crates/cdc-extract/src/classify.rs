//! PartitionType and RowType classification, in a fixed priority
//! order — including `MATERIALIZED_VIEW`/`SECONDARY_INDEX` being checked
//! ahead of the deletion-shape checks, preserved as-is.

use crate::metadata::TableKind;
use crate::raw::RawUnfiltered;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionType {
    Counter,
    MaterializedView,
    SecondaryIndex,
    PartitionAndClusteringKeyRowDeletion,
    PartitionKeyRowDeletion,
    RowLevelModification,
}

impl PartitionType {
    /// The supported set: everything else is logged and dropped.
    pub fn is_supported(self) -> bool {
        matches!(self, PartitionType::PartitionKeyRowDeletion | PartitionType::RowLevelModification)
    }
}

pub fn classify_partition_type(kind: TableKind, partition_deletion: Option<i64>, has_clustering_columns: bool) -> PartitionType {
    match kind {
        TableKind::Counter => PartitionType::Counter,
        TableKind::MaterializedView => PartitionType::MaterializedView,
        TableKind::SecondaryIndex => PartitionType::SecondaryIndex,
        TableKind::Regular => match (partition_deletion, has_clustering_columns) {
            (Some(_), true) => PartitionType::PartitionAndClusteringKeyRowDeletion,
            (Some(_), false) => PartitionType::PartitionKeyRowDeletion,
            (None, _) => PartitionType::RowLevelModification,
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowType {
    RangeTombstone,
    Delete,
    Insert,
    Update,
    /// Unreachable under this crate's `RawRow` modeling (both timestamp
    /// fields are always present as `Option`), kept as the classification's
    /// final fallthrough.
    Unknown,
}

pub fn classify_row_type(unfiltered: &RawUnfiltered) -> RowType {
    match unfiltered {
        RawUnfiltered::RangeTombstone => RowType::RangeTombstone,
        RawUnfiltered::Row(row) => {
            if row.deletion_marked_for_delete_at.is_some() {
                RowType::Delete
            } else if row.primary_key_liveness_timestamp.is_some() {
                RowType::Insert
            } else {
                RowType::Update
            }
        }
    }
}
