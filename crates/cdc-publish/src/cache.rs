//! The Outbound Publisher: per-table producer cache, schema
//! cache, and the async `publish` entry point the Delivery Loop blocks on.

use std::collections::HashMap;
use std::sync::Arc;

use apache_avro::Schema;
use parking_lot::RwLock;

use cdc_extract::metadata::TableMetadata;
use cdc_extract::{Mutation, MutationValue};

use crate::bus::{BusClient, BusProducer, OutboundMessage};
use crate::encode;
use crate::error::PublishError;
use crate::schema::{derive_key_schema, value_schema};

/// The cached schema/producer pair for one table: created lazily on first mutation
/// for a table, never evicted during process lifetime.
struct TableSchemaCacheEntry {
    key_schema: Schema,
    topic: String,
}

/// Per-table producer cache, schema derivation, and message composition
/// Keyed by `topicPrefix + keyspace + "." + table`
/// throughout.
pub struct Publisher<B> {
    bus: Arc<B>,
    topic_prefix: String,
    value_schema: Schema,
    schema_cache: RwLock<HashMap<String, Arc<TableSchemaCacheEntry>>>,
    producer_cache: RwLock<HashMap<String, Arc<dyn BusProducer>>>,
}

impl<B: BusClient> Publisher<B> {
    pub fn new(bus: Arc<B>, topic_prefix: impl Into<String>) -> Self {
        Self {
            bus,
            topic_prefix: topic_prefix.into(),
            value_schema: value_schema(),
            schema_cache: RwLock::new(HashMap::new()),
            producer_cache: RwLock::new(HashMap::new()),
        }
    }

    fn table_key<M: TableMetadata>(meta: &M) -> String {
        format!("{}.{}", meta.keyspace(), meta.table())
    }

    /// Lazily derive (or fetch the cached) key schema and topic name for a
    /// table. Creation is racy-but-idempotent: under
    /// contention two callers may both derive the schema, but only one
    /// write wins and both derivations are equal, so which one wins does
    /// not matter.
    fn schema_entry<M: TableMetadata>(&self, meta: &M) -> Result<Arc<TableSchemaCacheEntry>, PublishError> {
        let key = Self::table_key(meta);
        if let Some(entry) = self.schema_cache.read().get(&key) {
            return Ok(Arc::clone(entry));
        }

        let key_schema = derive_key_schema(meta)?;
        let topic = format!("{}{}.{}", self.topic_prefix, meta.keyspace(), meta.table());
        let entry = Arc::new(TableSchemaCacheEntry { key_schema, topic });
        self.schema_cache.write().entry(key).or_insert_with(|| Arc::clone(&entry));
        Ok(entry)
    }

    async fn producer_for(&self, topic: &str) -> Result<Arc<dyn BusProducer>, PublishError> {
        if let Some(producer) = self.producer_cache.read().get(topic) {
            return Ok(Arc::clone(producer));
        }

        let producer = self.bus.producer_for(topic).await?;
        // Two racing callers may both build a producer for the same topic;
        // the first insertion wins and the loser's handle is simply
        // dropped: creation is racy-but-idempotent.
        let producer = Arc::clone(
            self.producer_cache
                .write()
                .entry(topic.to_string())
                .or_insert(producer),
        );
        Ok(producer)
    }

    /// Async send: derive/reuse the table's schema and
    /// producer, encode the key and value, and await the broker send.
    ///
    /// Returns [`PublishError::UnsupportedColumnType`] for a primary-key
    /// column outside the supported mapping table — the caller
    /// (`cdc-producer`'s Delivery Loop) is expected to treat this as
    /// The immediate-complete-and-count-`skippedMutations` case,
    /// not a retryable send failure.
    pub async fn publish<M: TableMetadata>(&self, mutation: &Mutation<M>) -> Result<(), PublishError> {
        let entry = self.schema_entry(&mutation.metadata)?;
        let key_bytes = encode::encode_key(&entry.key_schema, &mutation.metadata, &mutation.data)?;

        let value = MutationValue::from(mutation);
        let value_bytes = encode::encode_value(&self.value_schema, &value)?;

        let producer = self.producer_for(&entry.topic).await?;
        producer.send(OutboundMessage { key_bytes, value_bytes }).await
    }
}
