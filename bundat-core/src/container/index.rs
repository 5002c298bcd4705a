//! Index bundle: the table of bundles, files and directories.
//!
//! ```text
//! u32 bundles_count, bundles_count x (u32 name_len, name, u32 decompressed_size)
//! u32 files_count,   files_count   x (u64 hash, u32 bundle_idx, u32 offset, u32 size)
//! u32 dirs_count,    dirs_count    x (u64 hash, u32 offset, u32 direct_size, u32 recursive_size)
//! remainder: compressed path-rep bundle
//! ```

use crate::codec::Decompressor;
use crate::container::bundle::decompress_bundle;
use crate::error::{BundatError, Result};
use crate::hash::murmur::file_path_hash;
use crate::util::buf::i32_at;
use crate::util::find::find_sequence_where;
use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use std::ops::Range;
use tracing::debug;

pub const BUNDLE_FILE_SUFFIX: &str = ".bundle.bin";
pub const FILE_RECORD_LEN: usize = 20;
pub const DIR_RECORD_LEN: usize = 20;

const COUNT_LEN: usize = 4;
const NAME_LEN_LEN: usize = 4;
const BUNDLE_SIZE_LEN: usize = 4;

#[derive(Debug, Clone, Copy)]
pub struct IndexBundle<'a> {
    pub bundles_info: &'a [u8],
    pub files_info: &'a [u8],
    pub dirs_info: &'a [u8],
    pub path_reps_bundle: &'a [u8],
}

/// Byte ranges of the four index regions, for owners of the inflated index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexLayout {
    pub bundles: Range<usize>,
    pub files: Range<usize>,
    pub dirs: Range<usize>,
    pub path_reps: Range<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleRecord {
    pub name: String,
    pub decompressed_size: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileRecord {
    pub hash: u64,
    pub bundle_idx: u32,
    pub offset: u32,
    pub size: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirRecord {
    pub hash: u64,
    pub offset: u32,
    pub direct_size: u32,
    pub recursive_size: u32,
}

/// Where a virtual file lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// Bundle name as stored in the index, without the file suffix.
    pub bundle: String,
    pub offset: u32,
    pub size: u32,
}

impl FileInfo {
    /// Name under which the bundle is stored on disk or on the CDN.
    pub fn bundle_file(&self) -> String {
        format!("{}{BUNDLE_FILE_SUFFIX}", self.bundle)
    }
}

impl FileRecord {
    fn parse(rec: &[u8]) -> Self {
        Self {
            hash: LittleEndian::read_u64(&rec[0..8]),
            bundle_idx: LittleEndian::read_u32(&rec[8..12]),
            offset: LittleEndian::read_u32(&rec[12..16]),
            size: LittleEndian::read_u32(&rec[16..20]),
        }
    }
}

impl DirRecord {
    fn parse(rec: &[u8]) -> Self {
        Self {
            hash: LittleEndian::read_u64(&rec[0..8]),
            offset: LittleEndian::read_u32(&rec[8..12]),
            direct_size: LittleEndian::read_u32(&rec[12..16]),
            recursive_size: LittleEndian::read_u32(&rec[16..20]),
        }
    }
}

fn read_count(buf: &[u8], off: usize, what: &str) -> Result<usize> {
    let v = i32_at(buf, off)
        .ok_or_else(|| BundatError::Format(format!("index truncated reading {what}")))?;
    usize::try_from(v).map_err(|_| BundatError::Format(format!("negative {what}: {v}")))
}

/// Returns the name range of the bundle entry at `off` and the offset of the next entry.
fn bundle_entry(info: &[u8], off: usize) -> Result<(Range<usize>, usize)> {
    let name_len = read_count(info, off, "bundle name length")?;
    let name = off + NAME_LEN_LEN..off + NAME_LEN_LEN + name_len;
    let next = name.end + BUNDLE_SIZE_LEN;
    if next > info.len() {
        return Err(BundatError::Format(format!(
            "bundle entry at {off} runs past the bundle table"
        )));
    }
    Ok((name, next))
}

fn fixed_table(
    buf: &[u8],
    off: usize,
    rec_len: usize,
    what: &str,
) -> Result<Range<usize>> {
    let count = read_count(buf, off, what)?;
    let begin = off + COUNT_LEN;
    let end = count
        .checked_mul(rec_len)
        .and_then(|n| n.checked_add(begin))
        .filter(|&end| end <= buf.len())
        .ok_or_else(|| {
            BundatError::Format(format!("{what} ({count}) runs past the index end"))
        })?;
    Ok(begin..end)
}

pub fn read_index_layout(index: &[u8]) -> Result<IndexLayout> {
    let bundles_count = read_count(index, 0, "bundles count")?;
    let begin = COUNT_LEN;
    let mut off = begin;
    for _ in 0..bundles_count {
        let (_, next) = bundle_entry(index, off)?;
        off = next;
    }
    let bundles = begin..off;
    let files = fixed_table(index, bundles.end, FILE_RECORD_LEN, "files count")?;
    let dirs = fixed_table(index, files.end, DIR_RECORD_LEN, "dirs count")?;
    let path_reps = dirs.end..index.len();

    debug!(
        bundles = bundles_count,
        files = files.len() / FILE_RECORD_LEN,
        dirs = dirs.len() / DIR_RECORD_LEN,
        path_reps = path_reps.len(),
        "index layout"
    );
    Ok(IndexLayout {
        bundles,
        files,
        dirs,
        path_reps,
    })
}

impl IndexLayout {
    pub fn view<'a>(&self, index: &'a [u8]) -> IndexBundle<'a> {
        IndexBundle {
            bundles_info: &index[self.bundles.clone()],
            files_info: &index[self.files.clone()],
            dirs_info: &index[self.dirs.clone()],
            path_reps_bundle: &index[self.path_reps.clone()],
        }
    }
}

pub fn read_index_bundle(index: &[u8]) -> Result<IndexBundle<'_>> {
    Ok(read_index_layout(index)?.view(index))
}

impl<'a> IndexBundle<'a> {
    pub fn bundles(&self) -> BundleIter<'a> {
        BundleIter {
            info: self.bundles_info,
            off: 0,
        }
    }

    pub fn files(&self) -> impl Iterator<Item = FileRecord> + 'a {
        self.files_info
            .chunks_exact(FILE_RECORD_LEN)
            .map(FileRecord::parse)
    }

    pub fn dirs(&self) -> impl Iterator<Item = DirRecord> + 'a {
        dir_records(self.dirs_info)
    }

    /// Inflates the nested path-rep bundle.
    pub fn path_reps(&self, codec: &dyn Decompressor) -> Result<Vec<u8>> {
        decompress_bundle(self.path_reps_bundle, codec)
    }

    pub fn file_info(&self, path: &str) -> Result<Option<FileInfo>> {
        get_file_info(path, self.bundles_info, self.files_info)
    }
}

pub struct BundleIter<'a> {
    info: &'a [u8],
    off: usize,
}

impl Iterator for BundleIter<'_> {
    type Item = Result<BundleRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.off >= self.info.len() {
            return None;
        }
        let item = bundle_entry(self.info, self.off).map(|(name, next)| {
            let size = LittleEndian::read_u32(&self.info[name.end..next]);
            self.off = next;
            BundleRecord {
                name: String::from_utf8_lossy(&self.info[name]).into_owned(),
                decompressed_size: size,
            }
        });
        if item.is_err() {
            self.off = self.info.len();
        }
        Some(item)
    }
}

pub(crate) fn dir_records(dirs_info: &[u8]) -> impl Iterator<Item = DirRecord> + '_ {
    dirs_info.chunks_exact(DIR_RECORD_LEN).map(DirRecord::parse)
}

/// Scans a 20-byte record table for `hash`; only record-aligned matches count.
pub(crate) fn find_record(table: &[u8], rec_len: usize, hash: u64) -> Option<&[u8]> {
    let needle = hash.to_le_bytes();
    let at = find_sequence_where(table, &needle, 0, |i| i % rec_len == 0)?;
    Some(&table[at..at + rec_len])
}

pub fn find_file_record(files_info: &[u8], hash: u64) -> Option<FileRecord> {
    find_record(files_info, FILE_RECORD_LEN, hash).map(FileRecord::parse)
}

pub fn find_dir_record(dirs_info: &[u8], hash: u64) -> Option<DirRecord> {
    find_record(dirs_info, DIR_RECORD_LEN, hash).map(DirRecord::parse)
}

/// Name of bundle `idx`, found by re-walking the variable-length bundle table.
pub fn bundle_name(bundles_info: &[u8], idx: usize) -> Result<String> {
    let mut off = 0usize;
    for _ in 0..idx {
        let (_, next) = bundle_entry(bundles_info, off)?;
        off = next;
    }
    let (name, _) = bundle_entry(bundles_info, off)?;
    Ok(String::from_utf8_lossy(&bundles_info[name]).into_owned())
}

/// Locates `path`. `Ok(None)` means the file is not part of this snapshot.
pub fn get_file_info(
    path: &str,
    bundles_info: &[u8],
    files_info: &[u8],
) -> Result<Option<FileInfo>> {
    let Some(rec) = find_file_record(files_info, file_path_hash(path)) else {
        return Ok(None);
    };
    let bundle = bundle_name(bundles_info, rec.bundle_idx as usize)?;
    Ok(Some(FileInfo {
        bundle,
        offset: rec.offset,
        size: rec.size,
    }))
}

/// Serialises index tables; the inverse of [`read_index_bundle`].
pub fn encode_index(
    bundles: &[BundleRecord],
    files: &[FileRecord],
    dirs: &[DirRecord],
    path_reps_bundle: &[u8],
) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    out.write_u32::<LittleEndian>(bundles.len() as u32)?;
    for b in bundles {
        out.write_u32::<LittleEndian>(b.name.len() as u32)?;
        out.extend_from_slice(b.name.as_bytes());
        out.write_u32::<LittleEndian>(b.decompressed_size)?;
    }
    out.write_u32::<LittleEndian>(files.len() as u32)?;
    for f in files {
        out.write_u64::<LittleEndian>(f.hash)?;
        out.write_u32::<LittleEndian>(f.bundle_idx)?;
        out.write_u32::<LittleEndian>(f.offset)?;
        out.write_u32::<LittleEndian>(f.size)?;
    }
    out.write_u32::<LittleEndian>(dirs.len() as u32)?;
    for d in dirs {
        out.write_u64::<LittleEndian>(d.hash)?;
        out.write_u32::<LittleEndian>(d.offset)?;
        out.write_u32::<LittleEndian>(d.direct_size)?;
        out.write_u32::<LittleEndian>(d.recursive_size)?;
    }
    out.extend_from_slice(path_reps_bundle);
    Ok(out)
}
