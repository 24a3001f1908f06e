//! Strings carried in driver slots.
//!
//! A string occupies a run of consecutive slots, four bytes per 32-bit word
//! in little-endian order, padded with NUL bytes.

use alloc::vec::Vec;

pub const WORD_BYTES: usize = 4;

/// Packs `bytes` into exactly `words` words.
///
/// Returns `None` when `bytes` leaves no room for the terminating NUL.
pub fn pack(bytes: &[u8], words: usize) -> Option<Vec<i32>> {
    if bytes.len() >= words * WORD_BYTES {
        return None;
    }

    let packed = (0..words)
        .map(|i| {
            let mut word = [0; WORD_BYTES];
            for (j, byte) in word.iter_mut().enumerate() {
                *byte = bytes.get(i * WORD_BYTES + j).copied().unwrap_or(0);
            }
            i32::from_le_bytes(word)
        })
        .collect();

    Some(packed)
}

/// Unpacks `words` into `dst`, four bytes per word.
///
/// Stops at whichever of `words` or `dst` runs out first; a trailing partial
/// word is truncated.
pub fn unpack_into(words: impl IntoIterator<Item = i32>, dst: &mut [u8]) {
    for (chunk, word) in dst.chunks_mut(WORD_BYTES).zip(words) {
        let bytes = word.to_le_bytes();
        chunk.copy_from_slice(&bytes[..chunk.len()]);
    }
}

/// The bytes before the first NUL.
pub fn c_str(bytes: &[u8]) -> &[u8] {
    let len = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    &bytes[..len]
}
