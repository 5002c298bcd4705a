use crate::error::{BundatError, Result};

pub fn parse_hex_array<const N: usize>(hex_str: &str) -> Result<[u8; N]> {
    let mut out = [0u8; N];
    let bytes = hex::decode(hex_str.trim())
        .map_err(|e| BundatError::Format(format!("invalid hex: {e}")))?;
    if bytes.len() != N {
        return Err(BundatError::Format(format!(
            "expected {N} bytes ({} hex chars), got {}",
            N * 2,
            bytes.len()
        )));
    }
    out.copy_from_slice(&bytes);
    Ok(out)
}

/// Parses a 64-bit path hash written as 16 hex digits, optionally `0x`-prefixed.
pub fn parse_hash64(hex_str: &str) -> Result<u64> {
    let s = hex_str.trim();
    let s = s.strip_prefix("0x").unwrap_or(s);
    let be = parse_hex_array::<8>(s)?;
    Ok(u64::from_be_bytes(be))
}
