//! Pointer width of a dat file, bound once per file.
//!
//! Hot loops are written against [`SizeT`] and monomorphised for both widths
//! instead of branching on [`Width`] per field.

use crate::util::buf::{u32_at, u64_at};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Width {
    Four,
    Eight,
}

impl Width {
    pub const fn bytes(self) -> usize {
        match self {
            Width::Four => 4,
            Width::Eight => 8,
        }
    }
}

pub trait SizeT: Copy + Send + Sync + 'static {
    const SIZE: usize;
    const NULL: u64;
    fn read(buf: &[u8], off: usize) -> Option<u64>;
}

#[derive(Debug, Clone, Copy)]
pub struct P32;

#[derive(Debug, Clone, Copy)]
pub struct P64;

impl SizeT for P32 {
    const SIZE: usize = 4;
    const NULL: u64 = 0xfefe_fefe;

    #[inline]
    fn read(buf: &[u8], off: usize) -> Option<u64> {
        u32_at(buf, off).map(u64::from)
    }
}

impl SizeT for P64 {
    const SIZE: usize = 8;
    const NULL: u64 = 0xfefe_fefe_fefe_fefe;

    #[inline]
    fn read(buf: &[u8], off: usize) -> Option<u64> {
        u64_at(buf, off)
    }
}
