//! Schema derivation: an AVRO record over a table's primary
//! key only, clustering columns wrapped in `union { null, T }`, plus the
//! fixed `MutationValue` wire schema.
//!
//! Built from a CQL-to-AVRO mapping table; schemas are built
//! as hand-assembled JSON (no `serde_json` dependency — the workspace
//! doesn't otherwise need it) and parsed with `apache_avro::Schema::parse_str`.

use apache_avro::Schema;

use cdc_extract::metadata::{CqlType, TableMetadata};

use crate::error::PublishError;

/// The CQL-to-AVRO mapping table. Returns the AVRO primitive
/// type name, or [`PublishError::UnsupportedColumnType`] for anything
/// outside the supported set.
fn avro_type_name(cql_type: &CqlType) -> Result<&'static str, PublishError> {
    match cql_type {
        CqlType::Text => Ok("string"),
        CqlType::Boolean => Ok("boolean"),
        CqlType::Blob => Ok("bytes"),
        CqlType::TinyInt | CqlType::SmallInt | CqlType::Int => Ok("int"),
        CqlType::BigInt => Ok("long"),
        CqlType::Float => Ok("float"),
        CqlType::Double => Ok("double"),
        CqlType::Timestamp => Ok("long"),
        CqlType::Date => Ok("int"),
        CqlType::Time => Ok("int"),
        CqlType::Uuid | CqlType::TimeUuid => Ok("string"),
        CqlType::Inet => Ok("string"),
        CqlType::Other(name) => Err(PublishError::UnsupportedColumnType(name.clone())),
    }
}

/// AVRO record/namespace names must match `[A-Za-z_][A-Za-z0-9_]*`; CQL
/// keyspace/table identifiers are already restricted to roughly that
/// alphabet (plus leading digits, which AVRO disallows), so this only
/// guards the one character AVRO is stricter about.
fn avro_safe_name(name: &str) -> String {
    match name.chars().next() {
        Some(c) if c.is_ascii_digit() => format!("_{name}"),
        _ => name.to_string(),
    }
}

/// Derive the key schema: an AVRO record over [`TableMetadata::primary_key_columns`]
/// in declared order, partition-key columns non-null, clustering columns
/// `union { null, T }` with a `null` default.
pub fn derive_key_schema<M: TableMetadata>(meta: &M) -> Result<Schema, PublishError> {
    let mut fields_json = String::new();
    for (i, col) in meta.primary_key_columns().iter().enumerate() {
        if i > 0 {
            fields_json.push(',');
        }
        let avro_type = avro_type_name(&col.cql_type)?;
        if col.is_clustering {
            fields_json.push_str(&format!(
                "{{\"name\":\"{}\",\"type\":[\"null\",\"{}\"],\"default\":null}}",
                col.name, avro_type
            ));
        } else {
            fields_json.push_str(&format!("{{\"name\":\"{}\",\"type\":\"{}\"}}", col.name, avro_type));
        }
    }

    let schema_json = format!(
        "{{\"type\":\"record\",\"name\":\"{}\",\"namespace\":\"{}\",\"fields\":[{}]}}",
        avro_safe_name(meta.table()),
        avro_safe_name(meta.keyspace()),
        fields_json
    );
    Schema::parse_str(&schema_json).map_err(|e| PublishError::SchemaDerivation(e.to_string()))
}

/// `MutationValue { string md5Digest; string nodeId; string operation; }`.
/// Identical for every table, so it is a single process-wide constant
/// rather than something [`crate::cache::Publisher`] derives per table.
pub fn value_schema() -> Schema {
    Schema::parse_str(
        r#"{
            "type": "record",
            "name": "MutationValue",
            "fields": [
                {"name": "md5Digest", "type": "string"},
                {"name": "nodeId", "type": "string"},
                {"name": "operation", "type": "string"}
            ]
        }"#,
    )
    .expect("MutationValue schema is a fixed, valid literal")
}
