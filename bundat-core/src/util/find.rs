//! Iterative byte-pattern searches.
//!
//! Both searches restart at `match + 1` inside a loop; there is no recursion,
//! so adversarial inputs with many near-matches cannot grow the stack.

/// First offset `>= from` where `needle` occurs in `hay`.
pub fn find_sequence(hay: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if needle.is_empty() {
        return (from <= hay.len()).then_some(from);
    }
    let mut from = from;
    loop {
        let rel = hay.get(from..)?.iter().position(|&b| b == needle[0])?;
        let idx = from + rel;
        if idx + needle.len() > hay.len() {
            return None;
        }
        if &hay[idx..idx + needle.len()] == needle {
            return Some(idx);
        }
        from = idx + 1;
    }
}

/// Like [`find_sequence`] but only accepts matches where `accept(idx)` holds.
pub fn find_sequence_where(
    hay: &[u8],
    needle: &[u8],
    from: usize,
    mut accept: impl FnMut(usize) -> bool,
) -> Option<usize> {
    let mut from = from;
    loop {
        let idx = find_sequence(hay, needle, from)?;
        if accept(idx) {
            return Some(idx);
        }
        from = idx + 1;
    }
}

/// First offset `>= from` that starts a run of `count` zero bytes.
pub fn find_zero_run(hay: &[u8], count: usize, from: usize) -> Option<usize> {
    let mut from = from;
    loop {
        let rel = hay.get(from..)?.iter().position(|&b| b == 0)?;
        let idx = from + rel;
        if idx + count > hay.len() {
            return None;
        }
        match hay[idx..idx + count].iter().position(|&b| b != 0) {
            None => return Some(idx),
            Some(_) => from = idx + 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_after_partial_matches() {
        let hay = [1u8, 2, 1, 2, 3, 1, 2, 3];
        assert_eq!(find_sequence(&hay, &[1, 2, 3], 0), Some(2));
        assert_eq!(find_sequence(&hay, &[1, 2, 3], 3), Some(5));
        assert_eq!(find_sequence(&hay, &[1, 2, 3], 6), None);
        assert_eq!(find_sequence(&hay, &[9], 0), None);
    }

    #[test]
    fn filtered_search_skips_rejected_matches() {
        let hay = [0xbbu8; 12];
        let got = find_sequence_where(&hay, &[0xbb; 8], 0, |i| i % 3 == 2);
        assert_eq!(got, Some(2));
        assert_eq!(find_sequence_where(&hay, &[0xbb; 8], 0, |_| false), None);
    }

    #[test]
    fn zero_run_requires_full_width() {
        let hay = [0u8, 1, 0, 0, 0, 2, 0, 0, 0, 0];
        assert_eq!(find_zero_run(&hay, 4, 0), Some(6));
        assert_eq!(find_zero_run(&hay, 3, 0), Some(2));
        assert_eq!(find_zero_run(&hay, 4, 7), None);
    }
}
