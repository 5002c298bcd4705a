//! Per-byte-offset plausibility flags.
//!
//! Each flag starts true when the row has room for it and is only ever
//! cleared by evidence from a scanned row.

use crate::dat::file::DatFile;
use crate::dat::text::{STR_TERMINATOR_LEN, is_string_at};
use crate::dat::width::SizeT;
use serde::{Deserialize, Serialize};

/// Smallest heap offset a pointer may have.
pub const MIN_VAR_OFFSET: u64 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrayStats {
    pub boolean: bool,
    pub numeric16: bool,
    pub numeric32: bool,
    pub numeric64: bool,
    pub string: bool,
    pub self_key: bool,
    pub foreign_key: bool,
}

impl ArrayStats {
    const ALL: Self = Self {
        boolean: true,
        numeric16: true,
        numeric32: true,
        numeric64: true,
        string: true,
        self_key: true,
        foreign_key: true,
    };

    pub fn any(&self) -> bool {
        self.boolean
            || self.numeric16
            || self.numeric32
            || self.numeric64
            || self.string
            || self.self_key
            || self.foreign_key
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnStats {
    pub max_value: u8,
    pub nullable_memsize: bool,
    pub key_self: bool,
    pub key_foreign: bool,
    pub ref_string: bool,
    /// `None` once no array interpretation survives.
    pub ref_array: Option<ArrayStats>,
}

impl ColumnStats {
    /// Flags before any row is seen, for an offset with `space` bytes left in the row.
    pub fn initial(space: usize, w: usize) -> Self {
        Self {
            max_value: 0,
            nullable_memsize: false,
            key_self: space >= w,
            key_foreign: space >= 2 * w,
            ref_string: space >= w,
            ref_array: (space >= 2 * w).then_some(ArrayStats::ALL),
        }
    }

    /// No further row can change these stats.
    pub fn is_settled(&self, space: usize, w: usize) -> bool {
        self.max_value == u8::MAX
            && (self.nullable_memsize || space < w)
            && !self.key_self
            && !self.key_foreign
            && !self.ref_string
            && self.ref_array.is_none()
    }
}

fn valid_var(offset: u64, len: Option<u64>, var_len: usize) -> bool {
    offset >= MIN_VAR_OFFSET
        && len
            .and_then(|l| offset.checked_add(l))
            .is_some_and(|end| end <= var_len as u64)
}

fn is_string_ptr(ptr: u64, heap: &[u8]) -> bool {
    valid_var(ptr, Some(STR_TERMINATOR_LEN as u64), heap.len()) && is_string_at(heap, ptr as usize)
}

/// Folds the evidence of one row into the stats of byte offset `bi`.
pub(crate) fn observe<S: SizeT>(stat: &mut ColumnStats, dat: &DatFile<'_>, row: usize, bi: usize) {
    let fixed = dat.fixed;
    let heap = dat.variable;
    let at = row * dat.row_length + bi;
    let space = dat.row_length - bi;

    let byte = fixed[at];
    stat.max_value = stat.max_value.max(byte);
    if space < S::SIZE {
        return;
    }
    let Some(word) = S::read(fixed, at) else {
        return;
    };

    if byte == 0xfe && !stat.nullable_memsize {
        stat.nullable_memsize = word == S::NULL;
    }
    if stat.ref_string {
        stat.ref_string = is_string_ptr(word, heap);
    }
    if stat.key_self && word != S::NULL {
        stat.key_self = word < dat.row_count as u64;
    }
    if space < 2 * S::SIZE {
        return;
    }
    let Some(second) = S::read(fixed, at + S::SIZE) else {
        return;
    };

    if stat.key_foreign {
        stat.key_foreign = foreign_pair_ok::<S>(word, second);
    }
    if let Some(arr) = stat.ref_array.as_mut() {
        let keep = observe_array::<S>(arr, word, second, dat);
        if !keep || !arr.any() {
            stat.ref_array = None;
        }
    }
}

/// A foreign key's second word is zero, or null alongside a null row index.
fn foreign_pair_ok<S: SizeT>(row: u64, second: u64) -> bool {
    if row != S::NULL { second == 0 } else { second == S::NULL }
}

/// Returns false when the `{count, offset}` pair cannot be an array at all.
fn observe_array<S: SizeT>(arr: &mut ArrayStats, count: u64, offset: u64, dat: &DatFile<'_>) -> bool {
    let heap = dat.variable;
    let n = heap.len();
    let w = S::SIZE as u64;
    let spans = |stride: u64| valid_var(offset, count.checked_mul(stride), n);

    if !(valid_var(offset, Some(0), n) && spans(1)) {
        // an empty array may point at the very end of the heap
        return count == 0 && offset == n as u64;
    }

    arr.numeric16 &= spans(2);
    arr.numeric32 &= spans(4);
    arr.numeric64 &= spans(8);
    arr.string &= spans(w);
    arr.self_key &= spans(w);
    arr.foreign_key &= spans(2 * w);

    // bounds are proven above for every surviving flag
    let base = offset as usize;
    let count = count as usize;
    let elem = |i: usize, stride: usize| S::read(heap, base + i * stride);

    if arr.boolean {
        arr.boolean = heap[base..base + count].iter().all(|&b| b <= 1);
    }
    if arr.string {
        arr.string = (0..count).all(|i| elem(i, S::SIZE).is_some_and(|p| is_string_ptr(p, heap)));
    }
    if arr.self_key {
        let rows = dat.row_count as u64;
        arr.self_key = (0..count).all(|i| elem(i, S::SIZE).is_some_and(|k| k == S::NULL || k < rows));
    }
    if arr.foreign_key {
        arr.foreign_key = (0..count).all(|i| {
            let row = elem(i, 2 * S::SIZE);
            let second = S::read(heap, base + i * 2 * S::SIZE + S::SIZE);
            matches!((row, second), (Some(r), Some(s)) if foreign_pair_ok::<S>(r, s))
        });
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dat::width::{P32, P64};

    #[test]
    fn initial_flags_need_room() {
        let s = ColumnStats::initial(3, 4);
        assert!(!s.key_self && !s.ref_string && s.ref_array.is_none());
        let s = ColumnStats::initial(7, 4);
        assert!(s.key_self && !s.key_foreign && s.ref_array.is_none());
        let s = ColumnStats::initial(16, 8);
        assert!(s.key_foreign && s.ref_array == Some(ArrayStats::ALL));
    }

    #[test]
    fn var_offset_bounds() {
        assert!(!valid_var(3, Some(0), 10));
        assert!(valid_var(4, Some(6), 10));
        assert!(!valid_var(4, Some(7), 10));
        assert!(!valid_var(4, None, 10));
        assert!(!valid_var(u64::MAX, Some(1), 10));
    }

    #[test]
    fn foreign_pair_rule() {
        assert!(foreign_pair_ok::<P32>(3, 0));
        assert!(!foreign_pair_ok::<P32>(3, 1));
        assert!(foreign_pair_ok::<P32>(0xfefe_fefe, 0xfefe_fefe));
        assert!(!foreign_pair_ok::<P64>(0xfefe_fefe_fefe_fefe, 0));
    }

    #[test]
    fn settled_only_when_nothing_can_change() {
        let mut s = ColumnStats::initial(2, 4);
        assert!(!s.is_settled(2, 4));
        s.max_value = 0xff;
        assert!(s.is_settled(2, 4));
        let mut wide = ColumnStats::initial(8, 4);
        wide.max_value = 0xff;
        wide.key_self = false;
        wide.key_foreign = false;
        wide.ref_string = false;
        wide.ref_array = None;
        assert!(!wide.is_settled(8, 4));
        wide.nullable_memsize = true;
        assert!(wide.is_settled(8, 4));
    }
}
