//! Whether a column header is plausible given the scanned stats.

use crate::analysis::stats::{ArrayStats, ColumnStats};
use crate::dat::header::{FieldKind, Header};
use crate::dat::width::Width;

pub fn validate_header(header: &Header, columns: &[ColumnStats], width: Width) -> bool {
    let Some(stats) = columns.get(header.offset) else {
        return false;
    };
    let space = columns.len() - header.offset;
    match &header.kind {
        FieldKind::Array(inner) => stats.ref_array.as_ref().is_some_and(|arr| array_fits(inner, arr)),
        FieldKind::Bool => stats.max_value <= 1,
        FieldKind::Integer { size, .. } | FieldKind::Decimal { size } => space >= *size as usize,
        FieldKind::Str => stats.ref_string,
        FieldKind::SelfKey => stats.key_self,
        FieldKind::ForeignKey => space >= 2 * width.bytes(),
    }
}

fn array_fits(inner: &FieldKind, arr: &ArrayStats) -> bool {
    match inner {
        FieldKind::Bool => arr.boolean,
        FieldKind::Integer { size: 1, .. } => true,
        FieldKind::Integer { size: 2, .. } => arr.numeric16,
        FieldKind::Integer { size: 4, .. } | FieldKind::Decimal { size: 4 } => arr.numeric32,
        FieldKind::Integer { size: 8, .. } | FieldKind::Decimal { size: 8 } => arr.numeric64,
        FieldKind::Str => arr.string,
        FieldKind::SelfKey => arr.self_key,
        FieldKind::ForeignKey => arr.foreign_key,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(n: usize) -> Vec<ColumnStats> {
        (0..n).map(|bi| ColumnStats::initial(n - bi, 4)).collect()
    }

    #[test]
    fn scalars_need_room_or_evidence() {
        let mut c = cols(8);
        let u32h = Header::new(4, FieldKind::Integer { unsigned: true, size: 4 });
        assert!(validate_header(&u32h, &c, Width::Four));
        let u64h = Header::new(4, FieldKind::Integer { unsigned: true, size: 8 });
        assert!(!validate_header(&u64h, &c, Width::Four));

        c[0].max_value = 2;
        assert!(!validate_header(&Header::new(0, FieldKind::Bool), &c, Width::Four));
        assert!(validate_header(&Header::new(1, FieldKind::Bool), &c, Width::Four));

        c[0].ref_string = false;
        assert!(!validate_header(&Header::new(0, FieldKind::Str), &c, Width::Four));
        assert!(validate_header(&Header::new(0, FieldKind::ForeignKey), &c, Width::Four));
        assert!(!validate_header(&Header::new(1, FieldKind::ForeignKey), &c, Width::Four));
        assert!(!validate_header(&Header::new(8, FieldKind::Bool), &c, Width::Four));
    }

    #[test]
    fn arrays_follow_sub_candidates() {
        let mut c = cols(8);
        let arr = |k| Header::new(0, FieldKind::Array(Box::new(k)));
        if let Some(a) = c[0].ref_array.as_mut() {
            a.numeric16 = false;
            a.string = false;
        }
        assert!(validate_header(&arr(FieldKind::Integer { unsigned: false, size: 1 }), &c, Width::Four));
        assert!(!validate_header(&arr(FieldKind::Integer { unsigned: false, size: 2 }), &c, Width::Four));
        assert!(validate_header(&arr(FieldKind::Decimal { size: 8 }), &c, Width::Four));
        assert!(!validate_header(&arr(FieldKind::Str), &c, Width::Four));
        assert!(!validate_header(&Header::new(1, FieldKind::Array(Box::new(FieldKind::Bool))), &c, Width::Four));
    }
}
