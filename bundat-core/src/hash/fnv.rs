//! FNV-1a 64 as used by the legacy directory table.

const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const PRIME: u64 = 0x0000_0100_0000_01b3;

pub fn fnv1a64(data: &[u8]) -> u64 {
    data.iter()
        .fold(OFFSET_BASIS, |h, &b| (h ^ b as u64).wrapping_mul(PRIME))
}

/// Hash key of a directory record: `path + "++"`.
pub fn dir_path_hash(path: &str) -> u64 {
    let mut key = String::with_capacity(path.len() + 2);
    key.push_str(path);
    key.push_str("++");
    fnv1a64(key.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_vectors() {
        assert_eq!(fnv1a64(b""), OFFSET_BASIS);
        assert_eq!(fnv1a64(b"Data++"), 0x33d0_84a6_e457_fb13);
        assert_eq!(dir_path_hash("Data"), 0x33d0_84a6_e457_fb13);
        assert_eq!(dir_path_hash(""), 0x07e4_7507_b4a9_2e53);
    }
}
