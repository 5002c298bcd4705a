#![allow(dead_code)]

use bundat_core::codec::zstdc::ZstdCodec;
use bundat_core::container::bundle::{DEFAULT_GRANULARITY, encode_bundle};
use bundat_core::container::index::{BundleRecord, FileRecord, encode_index};
use bundat_core::container::paths::pack_dir_tree;
use bundat_core::hash::murmur::file_path_hash;
use bundat_core::source::{BUNDLES_DIR, INDEX_BUNDLE};
use std::path::Path;

pub fn utf16z(s: &str) -> Vec<u8> {
    let mut b: Vec<u8> = s.encode_utf16().flat_map(u16::to_le_bytes).collect();
    b.extend_from_slice(&[0; 4]);
    b
}

/// `Mods.dat`: rows of `[Id str][Level u32][Tags array<u32>][Hidden bool]`.
pub fn mods_dat() -> Vec<u8> {
    let mut heap = vec![0xbb; 8];
    let mut ids = Vec::new();
    for id in ["Strength1", "Dexterity1", "Life2"] {
        ids.push(heap.len() as u32);
        heap.extend(utf16z(id));
    }
    let tags = heap.len() as u32;
    for t in [10u32, 20, 30] {
        heap.extend_from_slice(&t.to_le_bytes());
    }

    let mut out = 3u32.to_le_bytes().to_vec();
    for (i, id) in ids.iter().enumerate() {
        out.extend_from_slice(&id.to_le_bytes());
        out.extend_from_slice(&(i as u32 * 5 + 1).to_le_bytes());
        out.extend_from_slice(&(i as u32).to_le_bytes());
        out.extend_from_slice(&tags.to_le_bytes());
        out.push((i == 2) as u8);
    }
    out.extend(heap);
    out
}

/// `Stats.dat64`: rows of `[Parent self key][Weight f64]`.
pub fn stats_dat64() -> Vec<u8> {
    let mut out = 2u32.to_le_bytes().to_vec();
    out.extend_from_slice(&0xfefe_fefe_fefe_fefeu64.to_le_bytes());
    out.extend_from_slice(&0.5f64.to_le_bytes());
    out.extend_from_slice(&0u64.to_le_bytes());
    out.extend_from_slice(&2.25f64.to_le_bytes());
    out.extend_from_slice(&[0xbb; 8]);
    out
}

pub struct Archive {
    pub files: Vec<(&'static str, &'static str, Vec<u8>)>,
}

impl Archive {
    /// (path, bundle, contents)
    pub fn sample() -> Self {
        Self {
            files: vec![
                ("Data/Mods.dat", "Data", mods_dat()),
                ("Data/Balance/Stats.dat64", "Data", stats_dat64()),
                ("Art/readme.txt", "Art", b"hello bundles".to_vec()),
            ],
        }
    }

    /// Every bundle file, keyed by its on-disk name.
    pub fn bundles(&self) -> Vec<(String, Vec<u8>)> {
        let codec = ZstdCodec;
        let mut names: Vec<&str> = Vec::new();
        for (_, b, _) in &self.files {
            if !names.contains(b) {
                names.push(*b);
            }
        }

        let mut out = Vec::new();
        let mut records = Vec::new();
        let mut file_records = Vec::new();
        for (idx, name) in names.iter().enumerate() {
            let mut data = Vec::new();
            for (path, _, bytes) in self.files.iter().filter(|(_, b, _)| b == name) {
                file_records.push(FileRecord {
                    hash: file_path_hash(path),
                    bundle_idx: idx as u32,
                    offset: data.len() as u32,
                    size: bytes.len() as u32,
                });
                data.extend_from_slice(bytes);
            }
            records.push(BundleRecord { name: name.to_string(), decompressed_size: data.len() as u32 });
            let bundle = encode_bundle(&data, 16, &codec, 3).unwrap();
            out.push((format!("{name}.bundle.bin"), bundle));
        }

        let paths: Vec<&str> = self.files.iter().map(|(p, _, _)| *p).collect();
        let (reps, dirs) = pack_dir_tree(&paths).unwrap();
        let reps_bundle = encode_bundle(&reps, 64, &codec, 3).unwrap();
        let index = encode_index(&records, &file_records, &dirs, &reps_bundle).unwrap();
        out.push((INDEX_BUNDLE.to_string(), encode_bundle(&index, DEFAULT_GRANULARITY, &codec, 3).unwrap()));
        out
    }

    /// Lays the bundles out under `<game>/Bundles2`.
    pub fn write_game_dir(&self, game: &Path) {
        let dir = game.join(BUNDLES_DIR);
        std::fs::create_dir_all(&dir).unwrap();
        for (name, bytes) in self.bundles() {
            std::fs::write(dir.join(name), bytes).unwrap();
        }
    }
}
