//! Single-parity XOR forward error correction (spec.md §4.3 point 4, §9:
//! "tolerates one missing data fragment per block").

/// XOR every byte position across `fragments`, zero-padding shorter
/// fragments to the length of the longest one in the block.
pub fn compute_parity(fragments: &[&[u8]]) -> Vec<u8> {
    let len = fragments.iter().map(|f| f.len()).max().unwrap_or(0);
    let mut parity = vec![0u8; len];
    for fragment in fragments {
        for (i, byte) in fragment.iter().enumerate() {
            parity[i] ^= byte;
        }
    }
    parity
}

/// Number of parity fragments for `data_fragment_count` data fragments
/// grouped into blocks of `fec_block_size` (spec.md §4.3 point 2).
pub fn parity_fragment_count(data_fragment_count: u32, fec_block_size: u32) -> u32 {
    if fec_block_size <= 1 {
        return 0;
    }
    (data_fragment_count + fec_block_size - 1) / fec_block_size
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parity_recovers_a_single_missing_fragment() {
        let a: &[u8] = b"AAAA";
        let b: &[u8] = b"BBBB";
        let c: &[u8] = b"CC"; // shorter than the rest, zero-padded
        let parity = compute_parity(&[a, b, c]);

        // Reconstruct `b` by XORing the parity with the other fragments.
        let mut recovered = parity.clone();
        for (i, byte) in a.iter().enumerate() {
            recovered[i] ^= byte;
        }
        for (i, byte) in c.iter().enumerate() {
            recovered[i] ^= byte;
        }
        assert_eq!(&recovered[..b.len()], b);
    }

    #[test]
    fn block_size_of_zero_or_one_disables_parity() {
        assert_eq!(parity_fragment_count(10, 0), 0);
        assert_eq!(parity_fragment_count(10, 1), 0);
    }

    #[test]
    fn parity_count_rounds_up_per_block() {
        assert_eq!(parity_fragment_count(4, 8), 1);
        assert_eq!(parity_fragment_count(16, 8), 2);
        assert_eq!(parity_fragment_count(17, 8), 3);
    }
}
