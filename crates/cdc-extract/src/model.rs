//! Data Model: the in-memory shapes the Extractor builds and
//! hands to the Publisher. Deliberately carries no column *values* beyond
//! the primary key.

use cdc_offsets::CommitLogPosition;
use uuid::Uuid;

use crate::metadata::CqlType;

/// Which half of the primary key a cell belongs to. REGULAR cells are never
/// produced by the Extractor — consumers re-read those from the source
/// database — so there is no variant for them here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Partition,
    Clustering,
}

/// One primary-key column's value as extracted from the raw mutation.
/// `value` is the column's raw, type-tagged-by-position bytes; typed
/// interpretation happens downstream in the Publisher's schema derivation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellData {
    pub name: String,
    pub value: Vec<u8>,
    pub deletion_timestamp: Option<i64>,
    pub kind: ColumnKind,
    /// Carried through from `TableMetadata::primary_key_columns` so
    /// `cdc-publish`'s schema derivation doesn't need a second metadata
    /// lookup per cell.
    pub cql_type: CqlType,
}

/// Ordered collection of [`CellData`], in primary-key column order
/// (partition-key columns first, then clustering, matching the table's
/// declared order).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowData(pub Vec<CellData>);

impl RowData {
    pub fn partition_cells(&self) -> impl Iterator<Item = &CellData> {
        self.0.iter().filter(|c| c.kind == ColumnKind::Partition)
    }

    pub fn clustering_cells(&self) -> impl Iterator<Item = &CellData> {
        self.0.iter().filter(|c| c.kind == ColumnKind::Clustering)
    }
}

/// `(clusterName, nodeUuid)` — immutable per process.
#[derive(Debug, Clone)]
pub struct SourceInfo {
    pub cluster_name: String,
    pub node_uuid: Uuid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Insert,
    Update,
    Delete,
}

/// Mutation<M>: one immutable record per emitted event.
///
/// `operation` is required to populate `MutationValue.operation` downstream
/// and is carried here rather than re-derived at the publish boundary.
#[derive(Debug, Clone)]
pub struct Mutation<M> {
    pub position: CommitLogPosition,
    pub source: SourceInfo,
    pub data: RowData,
    pub ts_micros: i64,
    pub digest: String,
    pub operation: Operation,
    pub metadata: M,
}

/// The wire payload: no column values, only routing and
/// dedup metadata.
#[derive(Debug, Clone)]
pub struct MutationValue {
    pub digest: String,
    pub node_uuid: Uuid,
    pub operation: Operation,
}

impl<M> From<&Mutation<M>> for MutationValue {
    fn from(m: &Mutation<M>) -> Self {
        Self {
            digest: m.digest.clone(),
            node_uuid: m.source.node_uuid,
            operation: m.operation,
        }
    }
}
