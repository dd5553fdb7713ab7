//! The Outbound Publisher: per-table producer cache, AVRO
//! schema derivation over primary-key columns, CQL-to-AVRO type mapping,
//! message composition, and the bus client capability trait.

pub mod bus;
pub mod cache;
pub mod encode;
pub mod error;
pub mod schema;

pub use bus::{BusClient, BusProducer, OutboundMessage, PulsarBusClient};
pub use cache::Publisher;
pub use error::PublishError;
