//! Typed AVRO encoding of the primary-key cell bytes the Extractor produced,
//! and of the fixed mutation-value record. Wire-level message composition
//! (how the key and value bytes reach the bus) lives in [`crate::bus`].

use std::net::{Ipv4Addr, Ipv6Addr};

use apache_avro::types::Value;
use apache_avro::Schema;
use uuid::Uuid;

use cdc_extract::metadata::{CqlType, TableMetadata};
use cdc_extract::{MutationValue, Operation, RowData};

use crate::error::PublishError;

/// Interpret one cell's raw wire bytes per the CQL-to-AVRO
/// mapping table, producing the typed [`Value`] the column's schema expects.
fn decode_cell(cql_type: &CqlType, bytes: &[u8]) -> Result<Value, PublishError> {
    let too_short = |expected: usize| {
        PublishError::Encode(format!(
            "expected at least {expected} bytes for {cql_type:?}, got {}",
            bytes.len()
        ))
    };

    match cql_type {
        CqlType::Text => Ok(Value::String(
            String::from_utf8(bytes.to_vec()).map_err(|e| PublishError::Encode(e.to_string()))?,
        )),
        CqlType::Boolean => {
            let b = *bytes.first().ok_or_else(|| too_short(1))?;
            Ok(Value::Boolean(b != 0))
        }
        CqlType::Blob => Ok(Value::Bytes(bytes.to_vec())),
        CqlType::TinyInt => {
            let b = *bytes.first().ok_or_else(|| too_short(1))?;
            Ok(Value::Int(b as i8 as i32))
        }
        CqlType::SmallInt => {
            let arr: [u8; 2] = bytes.get(..2).ok_or_else(|| too_short(2))?.try_into().unwrap();
            Ok(Value::Int(i16::from_be_bytes(arr) as i32))
        }
        CqlType::Int => {
            let arr: [u8; 4] = bytes.get(..4).ok_or_else(|| too_short(4))?.try_into().unwrap();
            Ok(Value::Int(i32::from_be_bytes(arr)))
        }
        CqlType::BigInt => {
            let arr: [u8; 8] = bytes.get(..8).ok_or_else(|| too_short(8))?.try_into().unwrap();
            Ok(Value::Long(i64::from_be_bytes(arr)))
        }
        CqlType::Float => {
            let arr: [u8; 4] = bytes.get(..4).ok_or_else(|| too_short(4))?.try_into().unwrap();
            Ok(Value::Float(f32::from_be_bytes(arr)))
        }
        CqlType::Double => {
            let arr: [u8; 8] = bytes.get(..8).ok_or_else(|| too_short(8))?.try_into().unwrap();
            Ok(Value::Double(f64::from_be_bytes(arr)))
        }
        CqlType::Timestamp => {
            let arr: [u8; 8] = bytes.get(..8).ok_or_else(|| too_short(8))?.try_into().unwrap();
            Ok(Value::Long(i64::from_be_bytes(arr)))
        }
        CqlType::Date => {
            // Add the INT_MIN offset from the source representation, convert to
            // epoch day" — the source stores an unsigned 32-bit day count
            // biased by `i32::MIN` so that it sorts correctly as a signed
            // integer; undo the bias to recover a signed epoch-day count.
            let arr: [u8; 4] = bytes.get(..4).ok_or_else(|| too_short(4))?.try_into().unwrap();
            let biased = u32::from_be_bytes(arr) as i64;
            let epoch_day = biased + i32::MIN as i64;
            Ok(Value::Int(epoch_day as i32))
        }
        CqlType::Time => {
            // Source nanos / 1_000_000 — nanoseconds since
            // midnight, narrowed to milliseconds.
            let arr: [u8; 8] = bytes.get(..8).ok_or_else(|| too_short(8))?.try_into().unwrap();
            let nanos_of_day = i64::from_be_bytes(arr);
            Ok(Value::Int((nanos_of_day / 1_000_000) as i32))
        }
        CqlType::Uuid | CqlType::TimeUuid => {
            let uuid = Uuid::from_slice(bytes).map_err(|e| PublishError::Encode(e.to_string()))?;
            Ok(Value::String(uuid.to_string()))
        }
        CqlType::Inet => {
            let addr = match bytes.len() {
                4 => Ipv4Addr::from(<[u8; 4]>::try_from(bytes).unwrap()).to_string(),
                16 => Ipv6Addr::from(<[u8; 16]>::try_from(bytes).unwrap()).to_string(),
                n => return Err(PublishError::Encode(format!("inet address must be 4 or 16 bytes, got {n}"))),
            };
            Ok(Value::String(addr))
        }
        CqlType::Other(name) => Err(PublishError::UnsupportedColumnType(name.clone())),
    }
}

/// Encode the primary-key [`Value`]s for `data` against `schema`, in
/// [`TableMetadata::primary_key_columns`] order. A primary-key column with
/// no corresponding cell (clustering cells are absent from a
/// `PARTITION_KEY_ROW_DELETION`) encodes as the nullable union's `null`
/// branch; every other column is wrapped in the union's non-null branch if
/// it is a clustering column, or left bare if it is a partition column.
pub fn encode_key<M: TableMetadata>(schema: &Schema, meta: &M, data: &RowData) -> Result<Vec<u8>, PublishError> {
    let mut fields = Vec::with_capacity(meta.primary_key_columns().len());
    for col in meta.primary_key_columns() {
        let cell = data.0.iter().find(|c| c.name == col.name);
        let value = match cell {
            Some(cell) => decode_cell(&col.cql_type, &cell.value)?,
            None => Value::Null,
        };
        let value = if col.is_clustering {
            match value {
                Value::Null => Value::Union(0, Box::new(Value::Null)),
                other => Value::Union(1, Box::new(other)),
            }
        } else {
            value
        };
        fields.push((col.name.clone(), value));
    }
    apache_avro::to_avro_datum(schema, Value::Record(fields)).map_err(|e| PublishError::Encode(e.to_string()))
}

fn operation_name(op: Operation) -> &'static str {
    match op {
        Operation::Insert => "INSERT",
        Operation::Update => "UPDATE",
        Operation::Delete => "DELETE",
    }
}

/// Encode a [`MutationValue`] against the fixed [`crate::schema::value_schema`].
pub fn encode_value(schema: &Schema, value: &MutationValue) -> Result<Vec<u8>, PublishError> {
    let record = Value::Record(vec![
        ("md5Digest".to_string(), Value::String(value.digest.clone())),
        ("nodeId".to_string(), Value::String(value.node_uuid.to_string())),
        ("operation".to_string(), Value::String(operation_name(value.operation).to_string())),
    ]);
    apache_avro::to_avro_datum(schema, record).map_err(|e| PublishError::Encode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cdc_extract::metadata::{PrimaryKeyColumn, TableKind, TableMetadataV4};
    use cdc_extract::{CellData, ColumnKind};
    use pretty_assertions::assert_eq;

    fn pk(name: &str, cql_type: CqlType, is_clustering: bool) -> PrimaryKeyColumn {
        PrimaryKeyColumn {
            name: name.into(),
            cql_type,
            is_clustering,
        }
    }

    #[test]
    fn encode_key_round_trips_through_avro() {
        let meta = TableMetadataV4::new("ks", "t", TableKind::Regular, vec![pk("id", CqlType::Text, false)]);
        let schema = crate::schema::derive_key_schema(&meta).unwrap();
        let data = RowData(vec![CellData {
            name: "id".into(),
            value: b"a".to_vec(),
            deletion_timestamp: None,
            kind: ColumnKind::Partition,
            cql_type: CqlType::Text,
        }]);
        let bytes = encode_key(&schema, &meta, &data).unwrap();
        let decoded = apache_avro::from_avro_datum(&schema, &mut &bytes[..], None).unwrap();
        match decoded {
            Value::Record(fields) => assert_eq!(fields, vec![("id".to_string(), Value::String("a".to_string()))]),
            other => panic!("expected a record, got {other:?}"),
        }
    }

    #[test]
    fn missing_clustering_cell_encodes_as_null_union_branch() {
        let meta = TableMetadataV4::new(
            "ks",
            "t",
            TableKind::Regular,
            vec![pk("id", CqlType::Text, false), pk("seq", CqlType::Int, true)],
        );
        let schema = crate::schema::derive_key_schema(&meta).unwrap();
        let data = RowData(vec![CellData {
            name: "id".into(),
            value: b"a".to_vec(),
            deletion_timestamp: None,
            kind: ColumnKind::Partition,
            cql_type: CqlType::Text,
        }]);
        let bytes = encode_key(&schema, &meta, &data).unwrap();
        let decoded = apache_avro::from_avro_datum(&schema, &mut &bytes[..], None).unwrap();
        match decoded {
            Value::Record(fields) => assert_eq!(fields[1].1, Value::Union(0, Box::new(Value::Null))),
            other => panic!("expected a record, got {other:?}"),
        }
    }

    #[test]
    fn date_decode_undoes_int_min_bias() {
        // Epoch day 0 is stored as the biased value `2^31`.
        let biased: u32 = 1 << 31;
        let value = decode_cell(&CqlType::Date, &biased.to_be_bytes()).unwrap();
        assert_eq!(value, Value::Int(0));
    }

    #[test]
    fn time_decode_narrows_nanos_to_millis() {
        let nanos: i64 = 1_500_000;
        let value = decode_cell(&CqlType::Time, &nanos.to_be_bytes()).unwrap();
        assert_eq!(value, Value::Int(1));
    }

    #[test]
    fn unsupported_column_type_is_rejected_at_encode_time() {
        let err = decode_cell(&CqlType::Other("decimal".into()), &[]).unwrap_err();
        assert!(matches!(err, PublishError::UnsupportedColumnType(t) if t == "decimal"));
    }
}
