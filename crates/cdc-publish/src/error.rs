//! The error taxonomy's portion owned by this crate.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PublishError {
    /// `UnsupportedColumnType`: a primary-key column's CQL type
    /// is outside the supported mapping table. The caller logs a warning,
    /// increments `skippedMutations`, and completes immediately — the
    /// mutation is not retried.
    #[error("unsupported primary-key column type: {0}")]
    UnsupportedColumnType(String),

    /// Schema derivation failed for a reason other than an unsupported
    /// column type (e.g. a keyspace/table name that is not a valid AVRO
    /// identifier).
    #[error("schema derivation failed: {0}")]
    SchemaDerivation(String),

    /// AVRO encoding of an already-derived schema against extracted cell
    /// bytes failed (malformed cell bytes for the declared CQL type).
    #[error("message encoding failed: {0}")]
    Encode(String),

    /// `PublisherSendError`: any send-future failure. The
    /// Delivery Loop increments `sentErrors`, sleeps, and retries forever.
    #[error("publish send failed: {0}")]
    Send(String),

    /// `PublisherInitError`: cannot connect at startup;
    /// propagates to the process boundary and the process exits.
    #[error("publisher initialization failed: {0}")]
    Init(String),
}
