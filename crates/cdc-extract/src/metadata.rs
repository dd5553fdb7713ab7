//! The table-metadata capability: a small trait standing in for a generic
//! type parameter over table metadata, with two concrete implementations.
//! `M` in `Mutation<M>` is any type implementing [`TableMetadata`].

use crate::raw::RawMutation;

/// Which of the non-regular table flavors, if any, a table is.
/// Checked first in `PartitionType` classification, ahead of any
/// deletion-shape check — preserved as-is, even for a deletion against a
/// materialized view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Counter,
    MaterializedView,
    SecondaryIndex,
    Regular,
}

/// One primary-key column, in the shape the Extractor and Publisher need:
/// name, CQL type, and whether it is a clustering (vs. partition) column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimaryKeyColumn {
    pub name: String,
    pub cql_type: CqlType,
    pub is_clustering: bool,
}

/// The supported primary-key CQL types.
/// `Other` carries through an unrecognized type name so `cdc-publish` can
/// report `UnsupportedColumnType` with the offending type in the message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CqlType {
    Text,
    Boolean,
    Blob,
    TinyInt,
    SmallInt,
    Int,
    BigInt,
    Float,
    Double,
    Timestamp,
    Date,
    Time,
    Uuid,
    TimeUuid,
    Inet,
    Other(String),
}

/// The narrow capability the Extractor and Publisher need over a table's
/// metadata: enough to classify, decode keys, derive a schema, and digest a
/// mutation. Does not attempt to model the rest of the source database's
/// schema representation.
pub trait TableMetadata: Clone {
    fn keyspace(&self) -> &str;
    fn table(&self) -> &str;
    fn kind(&self) -> TableKind;

    /// Primary-key columns in declared order: partition-key columns first,
    /// then clustering columns. `CellData` iteration order matches this
    /// primary-key column order.
    fn primary_key_columns(&self) -> &[PrimaryKeyColumn];

    fn partition_key_columns(&self) -> Vec<&PrimaryKeyColumn> {
        self.primary_key_columns().iter().filter(|c| !c.is_clustering).collect()
    }

    fn has_clustering_columns(&self) -> bool {
        self.primary_key_columns().iter().any(|c| c.is_clustering)
    }

    /// The parser-provided wire serialization of a raw mutation at this
    /// table's protocol version, used only to compute the digest
    /// (never transmitted itself). Two illustrative implementations below
    /// model the two protocol-version framings the source database has used
    /// historically, one per supported database major version.
    fn serialize_mutation(&self, raw: &RawMutation<Self>) -> Vec<u8>
    where
        Self: Sized;
}

/// Protocol-version-3-era framing: a one-byte version tag followed by each
/// partition update's partition key and unfiltered count, concatenated.
/// Illustrative only — the real wire format lives in the external parser
/// library and is not reproduced here.
#[derive(Debug, Clone)]
pub struct TableMetadataV3 {
    keyspace: String,
    table: String,
    kind: TableKind,
    columns: Vec<PrimaryKeyColumn>,
}

/// Protocol-version-4-era framing: same shape as V3 but with a different
/// version tag, reflecting that the two formats otherwise agree on which
/// fields go into the digest.
#[derive(Debug, Clone)]
pub struct TableMetadataV4 {
    keyspace: String,
    table: String,
    kind: TableKind,
    columns: Vec<PrimaryKeyColumn>,
}

macro_rules! impl_table_metadata {
    ($ty:ident, $version_tag:expr) => {
        impl $ty {
            pub fn new(keyspace: impl Into<String>, table: impl Into<String>, kind: TableKind, columns: Vec<PrimaryKeyColumn>) -> Self {
                Self {
                    keyspace: keyspace.into(),
                    table: table.into(),
                    kind,
                    columns,
                }
            }
        }

        impl TableMetadata for $ty {
            fn keyspace(&self) -> &str {
                &self.keyspace
            }

            fn table(&self) -> &str {
                &self.table
            }

            fn kind(&self) -> TableKind {
                self.kind
            }

            fn primary_key_columns(&self) -> &[PrimaryKeyColumn] {
                &self.columns
            }

            fn serialize_mutation(&self, raw: &RawMutation<Self>) -> Vec<u8>
            where
                Self: Sized,
            {
                let mut bytes = vec![$version_tag];
                for pu in &raw.partition_updates {
                    bytes.extend_from_slice(&pu.partition_key_bytes);
                    bytes.push(pu.unfiltereds.len() as u8);
                }
                bytes
            }
        }
    };
}

impl_table_metadata!(TableMetadataV3, 0x03u8);
impl_table_metadata!(TableMetadataV4, 0x04u8);

#[cfg(test)]
mod tests {
    use super::*;

    fn pk(name: &str, is_clustering: bool) -> PrimaryKeyColumn {
        PrimaryKeyColumn {
            name: name.into(),
            cql_type: CqlType::Text,
            is_clustering,
        }
    }

    #[test]
    fn partition_key_columns_excludes_clustering() {
        let meta = TableMetadataV4::new("ks", "t", TableKind::Regular, vec![pk("id", false), pk("seq", true)]);
        assert_eq!(meta.partition_key_columns().len(), 1);
        assert!(meta.has_clustering_columns());
    }

    #[test]
    fn v3_and_v4_serialize_with_distinct_version_tags() {
        let meta3 = TableMetadataV3::new("ks", "t", TableKind::Regular, vec![pk("id", false)]);
        let meta4 = TableMetadataV4::new("ks", "t", TableKind::Regular, vec![pk("id", false)]);
        let raw3 = crate::raw::RawMutation::<TableMetadataV3> { partition_updates: vec![] };
        let raw4 = crate::raw::RawMutation::<TableMetadataV4> { partition_updates: vec![] };
        assert_eq!(meta3.serialize_mutation(&raw3)[0], 0x03);
        assert_eq!(meta4.serialize_mutation(&raw4)[0], 0x04);
    }
}
