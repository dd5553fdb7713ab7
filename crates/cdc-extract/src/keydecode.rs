//! Partition-key decoding: the single-column case composes
//! directly from the raw buffer; the composite case unpacks a
//! length-prefixed component stream.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PartitionKeyDecodeError {
    #[error("composite partition key ended after {components_read} of {expected} components")]
    TruncatedComponent { components_read: usize, expected: usize },
    #[error("composite partition key end-of-component byte was non-zero ({0:#x}) after {1} components")]
    MalformedEndOfComponent(u8, usize),
}

/// Decode `raw` into one value per partition-key column, in column order.
///
/// `column_count` is the number of partition-key columns (not the full
/// primary key); single-column tables compose directly from `raw`, multi-
/// column ("composite") tables unpack the length-prefixed encoding: an
/// optional 2-byte `0xFFFF` static-row prefix, then for each component a
/// 2-byte unsigned big-endian length, that many value bytes, and a 1-byte
/// end-of-component marker that must be zero to continue.
pub fn decode_partition_key(raw: &[u8], column_count: usize) -> Result<Vec<Vec<u8>>, PartitionKeyDecodeError> {
    if column_count <= 1 {
        return Ok(vec![raw.to_vec()]);
    }

    let mut buf = raw;
    if buf.len() >= 2 && buf[0] == 0xFF && buf[1] == 0xFF {
        buf = &buf[2..];
    }

    let mut components = Vec::with_capacity(column_count);
    for _ in 0..column_count {
        if buf.len() < 2 {
            return Err(PartitionKeyDecodeError::TruncatedComponent {
                components_read: components.len(),
                expected: column_count,
            });
        }
        let len = u16::from_be_bytes([buf[0], buf[1]]) as usize;
        buf = &buf[2..];

        if buf.len() < len + 1 {
            return Err(PartitionKeyDecodeError::TruncatedComponent {
                components_read: components.len(),
                expected: column_count,
            });
        }
        components.push(buf[..len].to_vec());
        buf = &buf[len..];

        let marker = buf[0];
        buf = &buf[1..];
        if marker != 0 && components.len() < column_count {
            return Err(PartitionKeyDecodeError::MalformedEndOfComponent(marker, components.len()));
        }
    }

    Ok(components)
}

/// Build the composite encoding [`decode_partition_key`] inverts, used by
/// tests asserting that decode is the inverse of encode for all primary
/// keys built from supported types.
#[cfg(test)]
pub fn encode_composite_key(components: &[Vec<u8>]) -> Vec<u8> {
    let mut buf = Vec::new();
    for component in components {
        buf.extend_from_slice(&(component.len() as u16).to_be_bytes());
        buf.extend_from_slice(component);
        buf.push(0);
    }
    buf
}
