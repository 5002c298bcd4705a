use super::{CodecId, Compressor, Decompressor};
use crate::error::{BundatError, Result};

pub struct ZstdCodec;

impl Decompressor for ZstdCodec {
    fn id(&self) -> CodecId {
        CodecId::Zstd
    }

    fn inflate(&self, compressed: &[u8], expected_len: usize) -> Result<Vec<u8>> {
        let out = zstd::bulk::decompress(compressed, expected_len)
            .map_err(|e| BundatError::Decode(format!("zstd: {e}")))?;
        if out.len() != expected_len {
            return Err(BundatError::Decode(format!(
                "zstd chunk inflated to {} bytes, expected {expected_len}",
                out.len()
            )));
        }
        Ok(out)
    }
}

impl Compressor for ZstdCodec {
    fn id(&self) -> CodecId {
        CodecId::Zstd
    }

    fn deflate(&self, raw: &[u8], level: i32) -> Result<Vec<u8>> {
        zstd::bulk::compress(raw, level.max(1)).map_err(BundatError::Io)
    }
}
