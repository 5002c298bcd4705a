//! MurmurHash64A as used by the bundle index for file paths.

use byteorder::{ByteOrder, LittleEndian};

pub const PATH_SEED: u64 = 0x1337_b33f;

const M: u64 = 0xc6a4_a793_5bd1_e995;
const R: u32 = 47;

pub fn murmur64a(data: &[u8], seed: u64) -> u64 {
    let mut h = seed ^ (data.len() as u64).wrapping_mul(M);

    let mut blocks = data.chunks_exact(8);
    for block in &mut blocks {
        let mut k = LittleEndian::read_u64(block);
        k = k.wrapping_mul(M);
        k ^= k >> R;
        k = k.wrapping_mul(M);

        h ^= k;
        h = h.wrapping_mul(M);
    }

    let tail = blocks.remainder();
    if !tail.is_empty() {
        for (i, &b) in tail.iter().enumerate() {
            h ^= (b as u64) << (8 * i);
        }
        h = h.wrapping_mul(M);
    }

    h ^= h >> R;
    h = h.wrapping_mul(M);
    h ^= h >> R;
    h
}

/// Hash key of a virtual file: the lowercased path with the index seed.
pub fn file_path_hash(path: &str) -> u64 {
    murmur64a(path.to_lowercase().as_bytes(), PATH_SEED)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_vectors() {
        assert_eq!(
            murmur64a(b"data/baseitemtypes.dat64", PATH_SEED),
            0x067d_a24a_5710_6af1
        );
        assert_eq!(murmur64a(b"", PATH_SEED), 0xf42a_94e6_9cff_42fe);
    }

    #[test]
    fn file_hash_ignores_case() {
        assert_eq!(
            file_path_hash("Data/BaseItemTypes.dat64"),
            file_path_hash("data/baseitemtypes.dat64")
        );
    }
}
