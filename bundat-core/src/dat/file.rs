//! Dat table container: row count, fixed-size rows, variable-data heap.

use crate::dat::width::Width;
use crate::error::{BundatError, Result};
use crate::util::buf::u32_at;
use crate::util::find::find_sequence_where;
use tracing::debug;

pub const ROW_COUNT_LEN: usize = 4;
pub const VDATA_MAGIC: [u8; 8] = [0xbb; 8];
pub const MIN_FILE_SIZE: usize = ROW_COUNT_LEN + VDATA_MAGIC.len();

/// Borrowed view over one dat file. `variable` starts at the magic.
#[derive(Debug, Clone, Copy)]
pub struct DatFile<'a> {
    pub width: Width,
    pub row_count: usize,
    pub row_length: usize,
    pub fixed: &'a [u8],
    pub variable: &'a [u8],
}

impl<'a> DatFile<'a> {
    pub fn row(&self, idx: usize) -> Option<&'a [u8]> {
        if idx >= self.row_count {
            return None;
        }
        let begin = idx * self.row_length;
        self.fixed.get(begin..begin + self.row_length)
    }
}

/// Pointer width from a file name or bare extension.
pub fn width_from_name(name: &str) -> Result<Width> {
    let ext = match name.rfind('.') {
        Some(i) => &name[i + 1..],
        None => name,
    };
    match ext.to_ascii_lowercase().as_str() {
        "dat" => Ok(Width::Four),
        // `datc64` is the combined format, always 8 bytes wide
        "dat64" | "datc64" => Ok(Width::Eight),
        "datl" | "datl64" => Err(BundatError::Format(format!(
            "UTF-32 dat variant is not supported: {name}"
        ))),
        _ => Err(BundatError::Format(format!("unknown dat extension: {name}"))),
    }
}

pub fn read_dat_file<'a>(name: &str, bytes: &'a [u8]) -> Result<DatFile<'a>> {
    if bytes.len() < MIN_FILE_SIZE {
        return Err(BundatError::Format(format!(
            "dat file too small: {} bytes",
            bytes.len()
        )));
    }
    let width = width_from_name(name)?;
    let row_count = u32_at(bytes, 0)
        .ok_or_else(|| BundatError::Format("dat file truncated reading row count".into()))?
        as usize;

    // Row data may contain 0xBB runs; only a magic on a row boundary counts.
    let at = find_sequence_where(bytes, &VDATA_MAGIC, ROW_COUNT_LEN, |i| {
        row_count == 0 || (i - ROW_COUNT_LEN) % row_count == 0
    })
    .ok_or_else(|| {
        BundatError::Format("section with variable data not found on a row boundary".into())
    })?;

    let boundary = at - ROW_COUNT_LEN;
    let row_length = if row_count > 0 { boundary / row_count } else { 0 };
    debug!(name, row_count, row_length, variable = bytes.len() - at, "dat file");

    Ok(DatFile {
        width,
        row_count,
        row_length,
        fixed: &bytes[ROW_COUNT_LEN..at],
        variable: &bytes[at..],
    })
}

#[cfg(test)]
pub(crate) mod fixture {
    /// Assembles `row_count`, rows and heap (the heap must start with the magic).
    pub fn dat_bytes(rows: &[Vec<u8>], heap: &[u8]) -> Vec<u8> {
        let mut b = (rows.len() as u32).to_le_bytes().to_vec();
        for r in rows {
            b.extend_from_slice(r);
        }
        b.extend_from_slice(heap);
        b
    }
}

#[cfg(test)]
mod tests {
    use super::fixture::dat_bytes;
    use super::*;

    #[test]
    fn splits_rows_and_heap_at_the_magic() {
        let rows = vec![vec![1, 0, 0, 0, 9, 9, 9, 9], vec![2, 0, 0, 0, 8, 8, 8, 8]];
        let b = dat_bytes(&rows, &[0xbb; 8]);
        let dat = read_dat_file("Mods.dat64", &b).unwrap();
        assert_eq!(dat.row_count, 2);
        assert_eq!(dat.row_length, 8);
        assert_eq!(dat.fixed, &b[4..20]);
        assert_eq!(dat.variable, &b[20..]);
        assert_eq!(dat.width, Width::Eight);
        assert_eq!(dat.row(1).unwrap(), &rows[1][..]);
        assert!(dat.row(2).is_none());
    }

    #[test]
    fn boundary_is_stable_across_reads() {
        let mut r0 = vec![0u8; 10];
        r0[1..9].copy_from_slice(&[0xbb; 8]);
        let b = dat_bytes(&[r0, vec![0xbb; 10]], &[0xbb; 12]);
        let first = read_dat_file("x.dat", &b).unwrap();
        let second = read_dat_file("x.dat", &b).unwrap();
        assert_eq!(first.row_length, second.row_length);
        assert_eq!(first.fixed, second.fixed);
        assert_eq!(first.variable, second.variable);
    }

    #[test]
    fn magic_inside_row_data_is_skipped() {
        // 3 rows of 10 bytes; row 0 carries an 8-byte 0xBB run at offset 1.
        let mut r0 = vec![0u8; 10];
        r0[1..9].copy_from_slice(&[0xbb; 8]);
        let rows = vec![r0, vec![1u8; 10], vec![2u8; 10]];
        let b = dat_bytes(&rows, &[0xbb; 8]);
        let dat = read_dat_file("x.dat", &b).unwrap();
        assert_eq!(dat.row_length, 10);
        assert_eq!(dat.variable.len(), 8);
    }

    #[test]
    fn empty_table_has_zero_row_length() {
        let b = dat_bytes(&[], &[0xbb; 8]);
        let dat = read_dat_file("x.datc64", &b).unwrap();
        assert_eq!((dat.row_count, dat.row_length), (0, 0));
        assert!(dat.fixed.is_empty());
    }

    #[test]
    fn rejects_small_files_and_missing_magic() {
        assert!(matches!(
            read_dat_file("x.dat", &[0u8; 11]),
            Err(BundatError::Format(_))
        ));
        let b = dat_bytes(&[vec![0u8; 8]], &[0xbb; 7]);
        assert!(matches!(read_dat_file("x.dat", &b), Err(BundatError::Format(_))));
    }

    #[test]
    fn width_follows_extension() {
        assert_eq!(width_from_name("a.dat").unwrap(), Width::Four);
        assert_eq!(width_from_name("Data/a.DAT64").unwrap(), Width::Eight);
        assert_eq!(width_from_name("datc64").unwrap(), Width::Eight);
        assert!(width_from_name("a.datl64").is_err());
        assert!(width_from_name("a.txt").is_err());
    }
}
