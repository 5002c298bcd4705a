use super::{CodecId, Compressor, Decompressor};
use crate::error::{BundatError, Result};

pub struct Store;

impl Decompressor for Store {
    fn id(&self) -> CodecId {
        CodecId::Store
    }

    fn inflate(&self, compressed: &[u8], expected_len: usize) -> Result<Vec<u8>> {
        compressed
            .get(..expected_len)
            .map(<[u8]>::to_vec)
            .ok_or_else(|| {
                BundatError::Decode(format!(
                    "stored chunk too short: have {}, need {expected_len}",
                    compressed.len()
                ))
            })
    }
}

impl Compressor for Store {
    fn id(&self) -> CodecId {
        CodecId::Store
    }

    fn deflate(&self, raw: &[u8], _level: i32) -> Result<Vec<u8>> {
        Ok(raw.to_vec())
    }
}
