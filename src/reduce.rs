//! The per-chunk reduction shared by every strategy.
//!
//! A chunk is viewed as a run of native-endian `i64` words which are folded
//! together with XOR. The fold is deliberately trivial: the point of the
//! crate is to measure how fast bytes arrive, not how fast we chew them.

const WORD: usize = std::mem::size_of::<i64>();

#[inline(always)]
fn word(bytes: &[u8]) -> i64 {
    let mut w = [0u8; WORD];
    w.copy_from_slice(bytes);
    i64::from_ne_bytes(w)
}

/// XOR of every whole word in `bytes`. A trailing partial word is ignored.
#[inline]
pub fn reduce_words(bytes: &[u8]) -> i64 {
    bytes
        .chunks_exact(WORD)
        .fold(0, |acc, bytes| acc ^ word(bytes))
}

/// Like [`reduce_words`], but a trailing partial word is zero-extended and
/// folded in as well.
///
/// This is what a reduction over a full window sees when the window runs
/// past the end of a mapped file into the zero-filled tail of its last page.
#[inline]
pub fn reduce_padded(bytes: &[u8]) -> i64 {
    let whole = bytes.len() - bytes.len() % WORD;
    let (body, tail) = bytes.split_at(whole);

    let mut acc = reduce_words(body);
    if !tail.is_empty() {
        let mut w = [0u8; WORD];
        w[..tail.len()].copy_from_slice(tail);
        acc ^= i64::from_ne_bytes(w);
    }
    acc
}
