//! Key Hasher
//!
//! Maps a lookup subject (a URL) to a short, fixed-width cache key.
//!
//! The hash is a 32-bit rolling hash (`h = h * 31 + byte`) over the UTF-8
//! bytes, rendered in base 36. It is fast and stable across runs but not
//! collision resistant: two URLs sharing a key serve each other's cached
//! metadata.
//!
//! Keys are always zero-padded to six digits. They are not interchangeable
//! with keys from stores that render the same hash unpadded, or that hash
//! UTF-16 code units instead of bytes; such a store starts cold.

/// Width of every key produced by [`hash_subject`].
pub const HASH_WIDTH: usize = 6;

const ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Hashes a subject into a [`HASH_WIDTH`]-character lowercase base-36 key.
pub fn hash_subject(subject: &str) -> String {
    let mut hash: i32 = 0;
    for byte in subject.bytes() {
        hash = (hash << 5).wrapping_sub(hash).wrapping_add(i32::from(byte));
    }
    to_base36(hash.unsigned_abs())
}

// 36^6 > 2^31, so the magnitude of any i32 fits in six digits.
fn to_base36(mut value: u32) -> String {
    let mut digits = [b'0'; HASH_WIDTH];
    let mut pos = HASH_WIDTH;
    while value > 0 && pos > 0 {
        pos -= 1;
        digits[pos] = ALPHABET[(value % 36) as usize];
        value /= 36;
    }
    digits.iter().map(|&b| b as char).collect()
}
