//! Key-dependent byte shuffling applied before encryption.
//!
//! Every even index `i` is swapped with the index
//! `(i + len / 2 - 8 + offset) mod len`, where `offset` is a nibble of the
//! scramble key chosen by `i`. Each swap only depends on `i`, the length, and
//! the key, so running the same swaps in reverse order restores the input.

/// Scrambles (`forward == true`) or unscrambles (`forward == false`) data
/// in place.
///
/// Forward scrambling walks the even indices upwards starting at 0.
/// Unscrambling walks them downwards, starting at the last even index.
pub fn scramble_data(data: &mut [u8], scramble_key: u32, forward: bool) {
    let len = data.len();
    if len < 2 {
        return;
    }

    let evens = (0..len).step_by(2);
    if forward {
        for i in evens {
            data.swap(i, partner(i, len, scramble_key));
        }
    } else {
        for i in evens.rev() {
            data.swap(i, partner(i, len, scramble_key));
        }
    }
}

/// Computes the index to swap with `i`.
fn partner(i: usize, len: usize, scramble_key: u32) -> usize {
    // 8 nibbles in the key, cycled by the pair index
    let shift = ((i / 2) % 8) * 4;
    let offset = ((scramble_key >> shift) & 0xF) as usize;

    // `- 8` in modular arithmetic, without going negative for short data
    (i + len / 2 + offset + len - (8 % len)) % len
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unscramble_restores() {
        for len in [0usize, 1, 2, 3, 7, 8, 9, 16, 31, 64, 257] {
            for key in [0u32, 1, 0xDEAD_BEEF, u32::MAX, 0x1234_5678] {
                let original: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
                let mut data = original.clone();

                scramble_data(&mut data, key, true);
                scramble_data(&mut data, key, false);
                assert_eq!(data, original, "len {len} key {key:#x} not restored");
            }
        }
    }

    #[test]
    fn scramble_moves_bytes() {
        let original: Vec<u8> = (0..32).collect();
        let mut data = original.clone();
        scramble_data(&mut data, 0x0F1E_2D3C, true);

        assert_ne!(data, original, "scramble should move something");

        let mut sorted = data.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, original, "scramble must be a permutation");
    }

    #[test]
    fn partner_stays_in_range() {
        for len in 2..40 {
            for i in (0..len).step_by(2) {
                let p = partner(i, len, u32::MAX);
                assert!(p < len, "partner {p} out of range for len {len}");
            }
        }
    }

    #[test]
    fn partner_known_values() {
        // len 16: i + 8 - 8 + offset
        assert_eq!(partner(0, 16, 0x0000_0003), 3);
        assert_eq!(partner(2, 16, 0x0000_0050), 7);
        assert_eq!(partner(14, 16, 0xF000_0000), 13);
    }
}
