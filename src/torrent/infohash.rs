// infohash.rs
use crate::bencode::BValue;

use sha1::{Sha1, Digest};

/// SHA-1 of the `info` dictionary exactly as it appeared in the input.
pub fn calculate_info_hash(info: &BValue) -> [u8; 20] {
    let mut hasher = Sha1::new();
    hasher.update(info.span());
    let result = hasher.finalize();

    let mut hash_bytes = [0u8; 20];
    hash_bytes.copy_from_slice(&result);
    hash_bytes
}
