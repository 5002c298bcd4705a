//! UTF-16LE strings in the variable-data heap.
//!
//! A string ends at the first four zero bytes that sit an even distance from
//! its start; a zero run at an odd distance is the high byte of one unit
//! followed by a zero unit and does not terminate.

use crate::error::{BundatError, Result};
use crate::util::buf::u16_at;
use crate::util::find::find_zero_run;

pub const STR_TERMINATOR_LEN: usize = 4;

/// End offset (exclusive, terminator not included) of the string at `start`.
pub fn string_end(variable: &[u8], start: usize) -> Option<usize> {
    let mut from = start;
    loop {
        let at = find_zero_run(variable, STR_TERMINATOR_LEN, from)?;
        if (at - start) % 2 == 0 {
            return Some(at);
        }
        from = at + 1;
    }
}

pub fn read_utf16(variable: &[u8], start: usize) -> Result<String> {
    let end = string_end(variable, start).ok_or_else(|| {
        BundatError::Format(format!("string at {start} has no terminator"))
    })?;
    let units: Vec<u16> = variable[start..end]
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect();
    Ok(String::from_utf16_lossy(&units))
}

/// Whether a well-formed UTF-16 string ends at a terminator inside the heap.
/// Lone or reversed surrogates fail.
pub fn is_string_at(variable: &[u8], start: usize) -> bool {
    let mut at = start;
    loop {
        let (Some(c1), Some(c2)) = (u16_at(variable, at), u16_at(variable, at + 2)) else {
            return false;
        };
        if c1 == 0 && c2 == 0 {
            return true;
        }
        match c1 {
            0xd800..=0xdbff if (0xdc00..=0xdfff).contains(&c2) => at += 4,
            0xd800..=0xdfff => return false,
            _ => at += 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utf16z(s: &str) -> Vec<u8> {
        let mut b: Vec<u8> = s.encode_utf16().flat_map(u16::to_le_bytes).collect();
        b.extend_from_slice(&[0; 4]);
        b
    }

    #[test]
    fn reads_terminated_string() {
        let mut heap = vec![0xbb; 8];
        heap.extend(utf16z("Hello"));
        assert_eq!(read_utf16(&heap, 8).unwrap(), "Hello");
        assert!(is_string_at(&heap, 8));
    }

    #[test]
    fn odd_zero_run_is_not_a_terminator() {
        // "A" then U+0100: 41 00 00 01 ... the run 00 00 at offset 1 is not even
        let mut heap = vec![0x41, 0x00, 0x00, 0x01];
        heap.extend_from_slice(&[0; 4]);
        assert_eq!(read_utf16(&heap, 0).unwrap(), "A\u{100}");

        // 41 00 | 00 00 00 00: run found at odd offset 1, accepted at 2
        let heap = [0x41, 0x00, 0x00, 0x00, 0x00, 0x00];
        assert_eq!(string_end(&heap, 0), Some(2));
        assert_eq!(read_utf16(&heap, 0).unwrap(), "A");
    }

    #[test]
    fn missing_terminator_is_format_error() {
        let heap = [0x41, 0x00, 0x42, 0x00, 0x00, 0x00];
        assert!(matches!(read_utf16(&heap, 0), Err(BundatError::Format(_))));
        assert!(matches!(read_utf16(&heap, 10), Err(BundatError::Format(_))));
        assert!(!is_string_at(&heap, 0));
    }

    #[test]
    fn surrogates_must_pair() {
        let ok = utf16z("\u{1F600}");
        assert!(is_string_at(&ok, 0));
        let lone_low = [0x00, 0xdc, 0x41, 0x00, 0, 0, 0, 0];
        assert!(!is_string_at(&lone_low, 0));
        let unpaired_high = [0x00, 0xd8, 0x41, 0x00, 0, 0, 0, 0];
        assert!(!is_string_at(&unpaired_high, 0));
    }
}
