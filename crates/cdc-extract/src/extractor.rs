//! The Mutation Extractor: the `MutationHandler` the Reader
//! drives per decoded raw mutation, turning it into zero or more
//! [`Mutation`] records for the sink.

use std::sync::Arc;

use cdc_commitlog::parser::{HandlerError, MutationHandler, SegmentDescriptor};
use cdc_offsets::{CommitLogPosition, OffsetStore};

use crate::classify::{classify_partition_type, classify_row_type, RowType};
use crate::digest::md5_hex;
use crate::keydecode::decode_partition_key;
use crate::metadata::TableMetadata;
use crate::model::{CellData, ColumnKind, Mutation, Operation, RowData, SourceInfo};
use crate::raw::{RawMutation, RawPartitionUpdate, RawUnfiltered};
use crate::sink::MutationSink;

pub struct Extractor<M, S> {
    offsets: Arc<OffsetStore>,
    source: SourceInfo,
    sink: S,
    _metadata: std::marker::PhantomData<M>,
}

impl<M, S> Extractor<M, S>
where
    M: TableMetadata,
    S: MutationSink<M>,
{
    pub fn new(offsets: Arc<OffsetStore>, source: SourceInfo, sink: S) -> Self {
        Self {
            offsets,
            source,
            sink,
            _metadata: std::marker::PhantomData,
        }
    }

    fn process_partition_update(&mut self, pu: RawPartitionUpdate<M>, position: CommitLogPosition, digest: &str) -> Result<(), HandlerError> {
        let has_clustering = pu.metadata.has_clustering_columns();
        let partition_type = classify_partition_type(pu.metadata.kind(), pu.partition_deletion, has_clustering);

        if !partition_type.is_supported() {
            tracing::warn!(
                keyspace = pu.metadata.keyspace(),
                table = pu.metadata.table(),
                partition_type = ?partition_type,
                "dropping unsupported partition type"
            );
            return Ok(());
        }

        let pk_columns = pu.metadata.partition_key_columns();
        // A malformed composite key is not confined to this one mutation, it
        // means the Reader's whole notion of where it is in the segment may
        // be wrong, so it propagates rather than being dropped.
        let decoded = decode_partition_key(&pu.partition_key_bytes, pk_columns.len()).map_err(|e| {
            tracing::error!(
                keyspace = pu.metadata.keyspace(),
                table = pu.metadata.table(),
                error = %e,
                "partition key decode failed"
            );
            HandlerError(e.to_string())
        })?;

        let partition_cells: Vec<CellData> = pk_columns
            .iter()
            .zip(decoded.iter())
            .map(|(col, value)| CellData {
                name: col.name.clone(),
                value: value.clone(),
                deletion_timestamp: pu.partition_deletion,
                kind: ColumnKind::Partition,
                cql_type: col.cql_type.clone(),
            })
            .collect();

        if partition_type == crate::classify::PartitionType::PartitionKeyRowDeletion {
            let ts_micros = pu.partition_deletion.unwrap_or(0);
            self.emit(position, RowData(partition_cells), ts_micros, digest, Operation::Delete, pu.metadata);
            return Ok(());
        }

        let clustering_columns: Vec<_> = pu.metadata.primary_key_columns().iter().filter(|c| c.is_clustering).collect();

        for unfiltered in pu.unfiltereds {
            let row_type = classify_row_type(&unfiltered);
            let row = match (row_type, unfiltered) {
                (RowType::RangeTombstone, _) => {
                    tracing::warn!(keyspace = pu.metadata.keyspace(), table = pu.metadata.table(), "dropping range tombstone");
                    continue;
                }
                (RowType::Unknown, _) => {
                    tracing::warn!(keyspace = pu.metadata.keyspace(), table = pu.metadata.table(), "dropping row of unknown type");
                    continue;
                }
                (_, RawUnfiltered::Row(row)) => row,
                (_, RawUnfiltered::RangeTombstone) => unreachable!("classify_row_type maps RangeTombstone only to RowType::RangeTombstone"),
            };

            let clustering_cells: Vec<CellData> = clustering_columns
                .iter()
                .zip(row.clustering_key_bytes.iter())
                .map(|(col, value)| CellData {
                    name: col.name.clone(),
                    value: value.clone(),
                    deletion_timestamp: row.deletion_marked_for_delete_at,
                    kind: ColumnKind::Clustering,
                    cql_type: col.cql_type.clone(),
                })
                .collect();

            let mut cells = partition_cells.clone();
            cells.extend(clustering_cells);

            let (ts_micros, operation) = match row_type {
                RowType::Delete => (row.deletion_marked_for_delete_at.unwrap_or(0), Operation::Delete),
                RowType::Insert => (row.max_timestamp, Operation::Insert),
                RowType::Update => (row.max_timestamp, Operation::Update),
                RowType::RangeTombstone | RowType::Unknown => unreachable!("filtered out above"),
            };

            self.emit(position, RowData(cells), ts_micros, digest, operation, pu.metadata.clone());
        }

        Ok(())
    }

    fn emit(&mut self, position: CommitLogPosition, data: RowData, ts_micros: i64, digest: &str, operation: Operation, metadata: M) {
        let mutation = Mutation {
            position,
            source: self.source.clone(),
            data,
            ts_micros,
            digest: digest.to_string(),
            operation,
            metadata,
        };
        self.sink.send(mutation);
    }
}

impl<M, S> MutationHandler<RawMutation<M>> for Extractor<M, S>
where
    M: TableMetadata,
    S: MutationSink<M>,
{
    fn on_mutation(
        &mut self,
        mutation: RawMutation<M>,
        entry_location: i32,
        descriptor: &SegmentDescriptor,
    ) -> Result<(), HandlerError> {
        let entry_position = CommitLogPosition::new(descriptor.segment_id(), entry_location);

        // Drop the entire mutation, all partition updates included, if
        // it's at or behind the durable cursor.
        if self.offsets.load() >= entry_position {
            return Ok(());
        }

        let Some(first) = mutation.partition_updates.first() else {
            return Ok(());
        };
        let digest = md5_hex(&first.metadata.serialize_mutation(&mutation));

        for pu in mutation.partition_updates {
            self.process_partition_update(pu, entry_position, &digest)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{PrimaryKeyColumn, TableKind, TableMetadataV4};
    use crate::raw::RawRow;
    use cdc_offsets::NullOffsetBackend;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;
    use uuid::Uuid;

    #[derive(Default)]
    struct CollectingSink(Arc<Mutex<Vec<Mutation<TableMetadataV4>>>>);

    impl MutationSink<TableMetadataV4> for CollectingSink {
        fn send(&mut self, mutation: Mutation<TableMetadataV4>) {
            self.0.lock().unwrap().push(mutation);
        }
    }

    fn source() -> SourceInfo {
        SourceInfo {
            cluster_name: "test-cluster".into(),
            node_uuid: Uuid::nil(),
        }
    }

    fn single_column_table() -> TableMetadataV4 {
        TableMetadataV4::new(
            "ks",
            "t",
            TableKind::Regular,
            vec![PrimaryKeyColumn {
                name: "id".into(),
                cql_type: crate::metadata::CqlType::Text,
                is_clustering: false,
            }],
        )
    }

    fn clustered_table() -> TableMetadataV4 {
        TableMetadataV4::new(
            "ks",
            "t",
            TableKind::Regular,
            vec![
                PrimaryKeyColumn {
                    name: "id".into(),
                    cql_type: crate::metadata::CqlType::Text,
                    is_clustering: false,
                },
                PrimaryKeyColumn {
                    name: "seq".into(),
                    cql_type: crate::metadata::CqlType::Int,
                    is_clustering: true,
                },
            ],
        )
    }

    fn descriptor(segment_id: u64) -> SegmentDescriptor {
        SegmentDescriptor::new(format!("CommitLog-7-{segment_id}.log"))
    }

    fn extractor_at(segment_id: u64, position: i32) -> (Extractor<TableMetadataV4, CollectingSink>, Arc<Mutex<Vec<Mutation<TableMetadataV4>>>>) {
        let offsets = Arc::new(OffsetStore::open(Arc::new(NullOffsetBackend)).unwrap());
        if segment_id > 0 || position > 0 {
            offsets.mark(CommitLogPosition::new(segment_id, position)).unwrap();
        }
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = CollectingSink(Arc::clone(&seen));
        (Extractor::new(offsets, source(), sink), seen)
    }

    #[test]
    fn fresh_insert_is_emitted() {
        let (mut extractor, seen) = extractor_at(0, 0);
        let raw = RawMutation {
            partition_updates: vec![RawPartitionUpdate {
                metadata: single_column_table(),
                partition_key_bytes: b"a".to_vec(),
                partition_deletion: None,
                unfiltereds: vec![RawUnfiltered::Row(RawRow {
                    clustering_key_bytes: vec![],
                    deletion_marked_for_delete_at: None,
                    primary_key_liveness_timestamp: Some(1000),
                    max_timestamp: 1000,
                })],
            }],
        };
        extractor.on_mutation(raw, 10, &descriptor(42)).unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].operation, Operation::Insert);
        assert_eq!(seen[0].position, CommitLogPosition::new(42, 10));
        assert_eq!(seen[0].data.0.len(), 1);
        assert_eq!(seen[0].data.0[0].name, "id");
    }

    #[test]
    fn mutation_at_or_behind_cursor_is_skipped() {
        let (mut extractor, seen) = extractor_at(42, 100);
        let raw = RawMutation {
            partition_updates: vec![RawPartitionUpdate {
                metadata: single_column_table(),
                partition_key_bytes: b"a".to_vec(),
                partition_deletion: None,
                unfiltereds: vec![RawUnfiltered::Row(RawRow {
                    clustering_key_bytes: vec![],
                    deletion_marked_for_delete_at: None,
                    primary_key_liveness_timestamp: Some(1000),
                    max_timestamp: 1000,
                })],
            }],
        };
        extractor.on_mutation(raw, 100, &descriptor(42)).unwrap();
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn partition_level_delete_without_clustering_emits_one_delete() {
        let (mut extractor, seen) = extractor_at(0, 0);
        let raw = RawMutation {
            partition_updates: vec![RawPartitionUpdate {
                metadata: single_column_table(),
                partition_key_bytes: b"a".to_vec(),
                partition_deletion: Some(555),
                unfiltereds: vec![],
            }],
        };
        extractor.on_mutation(raw, 5, &descriptor(7)).unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].operation, Operation::Delete);
        assert_eq!(seen[0].ts_micros, 555);
    }

    #[test]
    fn range_tombstone_is_dropped_without_publish() {
        let (mut extractor, seen) = extractor_at(0, 0);
        let raw = RawMutation {
            partition_updates: vec![RawPartitionUpdate {
                metadata: clustered_table(),
                partition_key_bytes: b"a".to_vec(),
                partition_deletion: None,
                unfiltereds: vec![RawUnfiltered::RangeTombstone],
            }],
        };
        extractor.on_mutation(raw, 5, &descriptor(7)).unwrap();
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn counter_table_is_dropped_as_unsupported_partition_type() {
        let meta = TableMetadataV4::new(
            "ks",
            "counters",
            TableKind::Counter,
            vec![PrimaryKeyColumn {
                name: "id".into(),
                cql_type: crate::metadata::CqlType::Text,
                is_clustering: false,
            }],
        );
        let (mut extractor, seen) = extractor_at(0, 0);
        let raw = RawMutation {
            partition_updates: vec![RawPartitionUpdate {
                metadata: meta,
                partition_key_bytes: b"a".to_vec(),
                partition_deletion: None,
                unfiltereds: vec![RawUnfiltered::Row(RawRow {
                    clustering_key_bytes: vec![],
                    deletion_marked_for_delete_at: None,
                    primary_key_liveness_timestamp: Some(1),
                    max_timestamp: 1,
                })],
            }],
        };
        extractor.on_mutation(raw, 5, &descriptor(7)).unwrap();
        assert!(seen.lock().unwrap().is_empty());
    }

    fn composite_partition_key_table() -> TableMetadataV4 {
        TableMetadataV4::new(
            "ks",
            "t",
            TableKind::Regular,
            vec![
                PrimaryKeyColumn {
                    name: "tenant".into(),
                    cql_type: crate::metadata::CqlType::Text,
                    is_clustering: false,
                },
                PrimaryKeyColumn {
                    name: "id".into(),
                    cql_type: crate::metadata::CqlType::Text,
                    is_clustering: false,
                },
            ],
        )
    }

    #[test]
    fn malformed_composite_key_propagates_as_handler_error() {
        // A malformed composite key bubbles up as an `Err` from `on_mutation`
        // so the Reader fails the whole segment, rather than being dropped
        // like an unsupported partition type.
        let (mut extractor, seen) = extractor_at(0, 0);
        let raw = RawMutation {
            partition_updates: vec![RawPartitionUpdate {
                metadata: composite_partition_key_table(),
                // Truncated: claims a 2-byte component but supplies none.
                partition_key_bytes: vec![0, 2],
                partition_deletion: None,
                unfiltereds: vec![],
            }],
        };
        let err = extractor.on_mutation(raw, 5, &descriptor(7)).unwrap_err();
        assert!(err.0.contains("components"));
        assert!(seen.lock().unwrap().is_empty());
    }
}
