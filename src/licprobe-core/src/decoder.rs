//! Product key decoding.
//!
//! The registry stores the installed product key as a fixed-format
//! encoded blob (`DigitalProductId`). Bytes 52..67 hold a 15-byte
//! little-endian integer whose base-24 digits, read most-significant
//! first, index into a 24-character alphabet that excludes vowels and
//! visually ambiguous characters.

/// Alphabet used by encoded product keys.
const KEY_ALPHABET: &[u8; 24] = b"BCDFGHJKMPQRTVWXY2346789";

/// Number of characters in a decoded key, before dash grouping.
const KEY_LENGTH: usize = 25;

/// Offset of the 15-byte key integer inside the blob.
const KEY_OFFSET: usize = 52;

/// Width of the key integer in bytes.
const KEY_BYTES: usize = 15;

/// Decode an encoded product-identifier blob into a dashed product key.
///
/// Returns `None` if the blob is shorter than the fixed 67-byte minimum.
/// Deterministic and pure: this is a straight base-24 conversion of a
/// multi-precision little-endian integer, and must stay bit-exact.
#[must_use]
pub fn decode_product_key(blob: &[u8]) -> Option<String> {
    if blob.len() < KEY_OFFSET + KEY_BYTES {
        return None;
    }

    let mut key_bytes = [0u8; KEY_BYTES];
    key_bytes.copy_from_slice(&blob[KEY_OFFSET..KEY_OFFSET + KEY_BYTES]);

    // Each long division by 24 peels off the least significant base-24
    // digit, so the output array fills back-to-front.
    let mut chars = [0u8; KEY_LENGTH];
    for slot in (0..KEY_LENGTH).rev() {
        let mut remainder: u32 = 0;
        for byte in key_bytes.iter_mut().rev() {
            let value = (remainder << 8) + u32::from(*byte);
            *byte = (value / KEY_ALPHABET.len() as u32) as u8;
            remainder = value % KEY_ALPHABET.len() as u32;
        }
        chars[slot] = KEY_ALPHABET[remainder as usize];
    }

    let mut key = String::with_capacity(KEY_LENGTH + 4);
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && i % 5 == 0 {
            key.push('-');
        }
        key.push(char::from(*c));
    }
    Some(key)
}
