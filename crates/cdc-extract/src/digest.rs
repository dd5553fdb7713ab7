//! MD5-hex digest of the parser-provided wire serialization.

use md5::{Digest, Md5};

pub fn md5_hex(bytes: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
