//! Bounds-checked little-endian reads over borrowed byte slices.
//!
//! Every reader returns `None` when the requested width does not fit; callers
//! decide whether that is a format error, corruption, or just a failed guess.

use byteorder::{ByteOrder, LittleEndian};

#[inline]
fn window(buf: &[u8], off: usize, len: usize) -> Option<&[u8]> {
    buf.get(off..off.checked_add(len)?)
}

#[inline]
pub fn u8_at(buf: &[u8], off: usize) -> Option<u8> {
    buf.get(off).copied()
}

#[inline]
pub fn u16_at(buf: &[u8], off: usize) -> Option<u16> {
    window(buf, off, 2).map(LittleEndian::read_u16)
}

#[inline]
pub fn u32_at(buf: &[u8], off: usize) -> Option<u32> {
    window(buf, off, 4).map(LittleEndian::read_u32)
}

#[inline]
pub fn u64_at(buf: &[u8], off: usize) -> Option<u64> {
    window(buf, off, 8).map(LittleEndian::read_u64)
}

#[inline]
pub fn i32_at(buf: &[u8], off: usize) -> Option<i32> {
    window(buf, off, 4).map(LittleEndian::read_i32)
}

/// Signed read of 1/2/4/8 bytes, sign-extended to `i64`.
pub fn int_at(buf: &[u8], off: usize, size: usize) -> Option<i64> {
    let b = window(buf, off, size)?;
    match size {
        1 => Some(b[0] as i8 as i64),
        2 => Some(LittleEndian::read_i16(b) as i64),
        4 => Some(LittleEndian::read_i32(b) as i64),
        8 => Some(LittleEndian::read_i64(b)),
        _ => None,
    }
}

/// Unsigned read of 1/2/4/8 bytes, zero-extended to `u64`.
pub fn uint_at(buf: &[u8], off: usize, size: usize) -> Option<u64> {
    let b = window(buf, off, size)?;
    match size {
        1 => Some(b[0] as u64),
        2 => Some(LittleEndian::read_u16(b) as u64),
        4 => Some(LittleEndian::read_u32(b) as u64),
        8 => Some(LittleEndian::read_u64(b)),
        _ => None,
    }
}

pub fn float_at(buf: &[u8], off: usize, size: usize) -> Option<f64> {
    let b = window(buf, off, size)?;
    match size {
        4 => Some(LittleEndian::read_f32(b) as f64),
        8 => Some(LittleEndian::read_f64(b)),
        _ => None,
    }
}

/// Offset of the first NUL byte at or after `from`.
pub fn nul_from(buf: &[u8], from: usize) -> Option<usize> {
    buf.get(from..)?.iter().position(|&b| b == 0).map(|p| from + p)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_stop_at_the_end_of_the_slice() {
        let b = [1u8, 0, 0, 0, 0xff];
        assert_eq!(u32_at(&b, 0), Some(1));
        assert_eq!(u32_at(&b, 2), None);
        assert_eq!(u32_at(&b, usize::MAX), None);
        assert_eq!(u8_at(&b, 4), Some(0xff));
    }

    #[test]
    fn signed_reads_sign_extend() {
        let b = [0xffu8, 0xff, 0xff, 0xff];
        assert_eq!(int_at(&b, 0, 1), Some(-1));
        assert_eq!(int_at(&b, 0, 4), Some(-1));
        assert_eq!(uint_at(&b, 0, 2), Some(0xffff));
        assert_eq!(uint_at(&b, 0, 3), None);
    }

    #[test]
    fn nul_search_is_relative_to_start() {
        let b = b"ab\0cd\0";
        assert_eq!(nul_from(b, 0), Some(2));
        assert_eq!(nul_from(b, 3), Some(5));
        assert_eq!(nul_from(b, 6), None);
        assert_eq!(nul_from(b, 9), None);
    }
}
