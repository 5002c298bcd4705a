//! On-disk record of an analysis run, tied to the exact source bytes.

use crate::analysis::stats::ColumnStats;
use crate::dat::file::DatFile;
use crate::dat::width::Width;
use crate::error::{BundatError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use time::OffsetDateTime;

pub const SNAPSHOT_VERSION: u16 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub version: u16,
    /// blake3 of the whole dat file, hex.
    pub source_blake3: String,
    pub width: Width,
    pub row_count: usize,
    pub row_length: usize,
    /// Unix seconds.
    pub created: i64,
    pub columns: Vec<ColumnStats>,
}

impl StatsSnapshot {
    pub fn capture(source: &[u8], dat: &DatFile<'_>, columns: Vec<ColumnStats>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            source_blake3: blake3::hash(source).to_hex().to_string(),
            width: dat.width,
            row_count: dat.row_count,
            row_length: dat.row_length,
            created: OffsetDateTime::now_utc().unix_timestamp(),
            columns,
        }
    }

    pub fn verify_source(&self, source: &[u8]) -> Result<()> {
        let actual = blake3::hash(source).to_hex();
        if actual.as_str() != self.source_blake3 {
            return Err(BundatError::Snapshot(format!(
                "source digest mismatch: snapshot {}, file {}",
                self.source_blake3, actual
            )));
        }
        Ok(())
    }

    pub fn write_to<W: Write>(&self, w: W) -> Result<()> {
        ciborium::ser::into_writer(self, w).map_err(|e| BundatError::Snapshot(e.to_string()))
    }

    pub fn read_from<R: Read>(r: R) -> Result<Self> {
        let snap: Self =
            ciborium::de::from_reader(r).map_err(|e| BundatError::Snapshot(e.to_string()))?;
        if snap.version != SNAPSHOT_VERSION {
            return Err(BundatError::Snapshot(format!(
                "unsupported snapshot version {}",
                snap.version
            )));
        }
        if snap.columns.len() != snap.row_length {
            return Err(BundatError::Snapshot(format!(
                "{} columns for a {}-byte row",
                snap.columns.len(),
                snap.row_length
            )));
        }
        Ok(snap)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let mut w = BufWriter::new(File::create(path)?);
        self.write_to(&mut w)?;
        w.flush()?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        Self::read_from(BufReader::new(File::open(path)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::scan::analyze;
    use crate::dat::file::fixture::dat_bytes;
    use crate::dat::file::read_dat_file;

    fn source() -> Vec<u8> {
        dat_bytes(&[vec![1, 0, 0, 0, 2, 0, 0, 0]], &[0xbb; 8])
    }

    #[test]
    fn file_round_trip_and_verify() {
        let bytes = source();
        let dat = read_dat_file("s.dat", &bytes).unwrap();
        let snap = StatsSnapshot::capture(&bytes, &dat, analyze(&dat));
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.stats");
        snap.save(&path).unwrap();

        let back = StatsSnapshot::load(&path).unwrap();
        assert_eq!(back, snap);
        back.verify_source(&bytes).unwrap();

        let mut other = bytes.clone();
        other[4] = 9;
        assert!(matches!(back.verify_source(&other), Err(BundatError::Snapshot(_))));
    }

    #[test]
    fn rejects_inconsistent_payload() {
        let bytes = source();
        let dat = read_dat_file("s.dat", &bytes).unwrap();
        let mut snap = StatsSnapshot::capture(&bytes, &dat, analyze(&dat));
        snap.columns.pop();
        let mut buf = Vec::new();
        snap.write_to(&mut buf).unwrap();
        assert!(matches!(StatsSnapshot::read_from(&buf[..]), Err(BundatError::Snapshot(_))));
        assert!(StatsSnapshot::read_from(&b"junk"[..]).is_err());
    }
}
