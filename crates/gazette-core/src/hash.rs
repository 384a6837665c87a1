//! Content-key hashing.
//!
//! Every durable identity in Gazette is derived by hashing the content it
//! names: a feed's link, an entry's upstream id, an entry body, a serialized
//! embedding vector. Identical content always maps to the identical key, so
//! re-ingesting the same data overwrites records with equivalent data instead
//! of duplicating them.
//!
//! Keys are the xxh64 digest rendered as 16 lowercase hex characters.

use xxhash_rust::xxh64::xxh64;

/// Length of a content key in characters.
pub const CONTENT_KEY_LEN: usize = 16;

/// Compute the content key for a byte sequence.
///
/// Deterministic: the same input always yields the same key.
pub fn content_key(data: impl AsRef<[u8]>) -> String {
    format!("{:016x}", xxh64(data.as_ref(), 0))
}

/// Check whether a string is a well-formed content key
/// (exactly 16 lowercase hex characters).
pub fn is_content_key(s: &str) -> bool {
    s.len() == CONTENT_KEY_LEN
        && s.bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}
