//! The error taxonomy's portion owned by this crate.

use thiserror::Error;

use crate::keydecode::PartitionKeyDecodeError;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("malformed composite partition key")]
    PartitionKeyDecode(#[from] PartitionKeyDecodeError),
}
