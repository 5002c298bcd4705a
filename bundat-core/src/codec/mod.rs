//! Chunk codecs.
//!
//! The bundle layer only ever sees these traits: a chunk is handed over as a
//! compressed slice together with its known decompressed length.

use crate::error::Result;

#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CodecId {
    Store = 0,
    Zstd = 1,
}

/// Inflates one chunk. Implementations must be deterministic and pure.
pub trait Decompressor: Send + Sync {
    fn id(&self) -> CodecId;
    fn inflate(&self, compressed: &[u8], expected_len: usize) -> Result<Vec<u8>>;
}

/// Deflates one chunk; only needed to produce bundles.
pub trait Compressor: Send + Sync {
    fn id(&self) -> CodecId;
    fn deflate(&self, raw: &[u8], level: i32) -> Result<Vec<u8>>;
}

pub fn get_decoder(id: CodecId) -> Box<dyn Decompressor> {
    match id {
        CodecId::Store => Box::new(store::Store),
        CodecId::Zstd => Box::new(zstdc::ZstdCodec),
    }
}

pub mod store;
pub mod zstdc;
