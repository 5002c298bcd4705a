//! Deduplicated path representation.
//!
//! The stream is a sequence of `u32` indices. Index `0` flips between base
//! registration and literal output (entering base mode drops all bases).
//! Any other index `n` is followed by a NUL-terminated UTF-8 suffix and
//! prepends base `n - 1` when it exists; an out-of-range back-reference
//! means the suffix stands alone.

use crate::container::index::{DirRecord, dir_records, find_dir_record};
use crate::error::{BundatError, Result};
use crate::hash::fnv::dir_path_hash;
use crate::util::buf::{nul_from, u32_at};
use byteorder::{LittleEndian, WriteBytesExt};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::warn;

const REP_INDEX: usize = 4;
const MODE_TOGGLE: u32 = 0;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirContent {
    /// Full paths of the files directly inside the directory.
    pub files: Vec<String>,
    /// Full paths of the immediate subdirectories.
    pub dirs: Vec<String>,
}

/// Problems found by [`check_dir_records`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirFinding {
    /// A directory implied by some file path has no record.
    Missing(String),
    /// Has subdirectories, yet its recursive size equals its direct size.
    NoRecursivePayload(String),
    /// Has no subdirectories, yet its recursive size differs (empty child dirs).
    EmptyChildDirs(String),
}

fn index_at(data: &[u8], off: usize) -> Result<u32> {
    u32_at(data, off)
        .ok_or_else(|| BundatError::Format(format!("path reps truncated at {off}")))
}

pub fn unpack_paths(data: &[u8]) -> Result<Vec<String>> {
    let mut off = 0usize;
    let mut base_mode = false;
    let mut bases: Vec<String> = Vec::new();
    let mut paths = Vec::new();

    while off + REP_INDEX <= data.len() {
        let idx = index_at(data, off)?;
        off += REP_INDEX;

        if idx == MODE_TOGGLE {
            base_mode = !base_mode;
            if base_mode {
                bases.clear();
            }
            continue;
        }

        let nul = nul_from(data, off)
            .ok_or_else(|| BundatError::Format(format!("unterminated path at {off}")))?;
        let suffix = String::from_utf8_lossy(&data[off..nul]);
        off = nul + 1;

        let path = match bases.get(idx as usize - 1) {
            Some(base) => format!("{base}{suffix}"),
            None => suffix.into_owned(),
        };
        if base_mode {
            bases.push(path);
        } else {
            paths.push(path);
        }
    }
    Ok(paths)
}

fn section<'a>(path_reps: &'a [u8], offset: u32, size: u32) -> Result<&'a [u8]> {
    let begin = offset as usize;
    path_reps
        .get(begin..begin + size as usize)
        .ok_or_else(|| {
            BundatError::Format(format!(
                "directory payload {begin}+{size} outside path reps ({})",
                path_reps.len()
            ))
        })
}

/// Reads the first base path of a directory section, or `None` when the
/// section registers no bases (the directory holds only subdirectories).
fn first_base(path_reps: &[u8], rec: &DirRecord) -> Result<Option<String>> {
    // skip `base mode on`
    let off = rec.offset as usize + REP_INDEX;
    if index_at(path_reps, off)? == MODE_TOGGLE {
        return Ok(None);
    }
    let from = off + REP_INDEX;
    let end = nul_from(path_reps, from)
        .ok_or_else(|| BundatError::Format(format!("unterminated base path at {from}")))?;
    Ok(Some(String::from_utf8_lossy(&path_reps[from..end]).into_owned()))
}

/// Lists a directory. `Ok(None)` when `dir_path` has no directory record.
pub fn get_dir_content(
    dir_path: &str,
    path_reps: &[u8],
    dirs_info: &[u8],
) -> Result<Option<DirContent>> {
    let Some(this) = find_dir_record(dirs_info, dir_path_hash(dir_path)) else {
        return Ok(None);
    };
    let files = unpack_paths(section(path_reps, this.offset, this.direct_size)?)?;

    let children_start = this.offset as u64 + this.direct_size as u64;
    let children_end = this.offset as u64 + this.recursive_size as u64;

    let mut seen = HashSet::new();
    let mut dirs = Vec::new();
    for rec in dir_records(dirs_info) {
        let begin = rec.offset as u64;
        if begin < children_start || begin + rec.direct_size as u64 > children_end {
            continue;
        }
        let Some(base) = first_base(path_reps, &rec)? else {
            continue;
        };
        let Some(rest) = base.strip_prefix(dir_path) else {
            warn!(dir = dir_path, base = %base, "subdirectory base outside parent, skipped");
            continue;
        };
        // "<dir_path>/<child>/..." -> "<dir_path>/<child>"
        let child_len = match rest.get(1..).and_then(|r| r.find('/')) {
            Some(p) => p + 1,
            None => rest.trim_end_matches('/').len(),
        };
        let child = &base[..dir_path.len() + child_len];
        if seen.insert(child.to_string()) {
            dirs.push(child.to_string());
        }
    }
    Ok(Some(DirContent { files, dirs }))
}

/// First path segments of every directory that directly holds files.
pub fn get_root_dirs(path_reps: &[u8], dirs_info: &[u8]) -> Result<Vec<String>> {
    let mut seen = HashSet::new();
    let mut roots = Vec::new();
    for rec in dir_records(dirs_info) {
        let Some(base) = first_base(path_reps, &rec)? else {
            continue;
        };
        let root = base.split('/').next().unwrap_or_default().to_string();
        if seen.insert(root.clone()) {
            roots.push(root);
        }
    }
    Ok(roots)
}

fn dir_of(path: &str) -> (&str, &str) {
    match path.rfind('/') {
        Some(i) => (&path[..i], &path[i + 1..]),
        None => ("", path),
    }
}

fn put_entry(out: &mut Vec<u8>, idx: u32, text: &str) -> Result<()> {
    out.write_u32::<LittleEndian>(idx)?;
    out.extend_from_slice(text.as_bytes());
    out.push(0);
    Ok(())
}

/// Encodes `paths` in order, registering every distinct directory prefix once.
pub fn pack_paths<S: AsRef<str>>(paths: &[S]) -> Result<Vec<u8>> {
    let mut bases: Vec<String> = Vec::new();
    let mut base_of: BTreeMap<String, u32> = BTreeMap::new();
    for p in paths {
        let (dir, _) = dir_of(p.as_ref());
        if !dir.is_empty() && !base_of.contains_key(dir) {
            bases.push(format!("{dir}/"));
            base_of.insert(dir.to_string(), bases.len() as u32);
        }
    }

    let mut out = Vec::new();
    out.write_u32::<LittleEndian>(MODE_TOGGLE)?;
    for (i, base) in bases.iter().enumerate() {
        // longest earlier base that prefixes this one
        let parent = bases[..i]
            .iter()
            .enumerate()
            .filter(|(_, b)| base.starts_with(b.as_str()))
            .max_by_key(|(_, b)| b.len());
        match parent {
            Some((j, b)) => put_entry(&mut out, j as u32 + 1, &base[b.len()..])?,
            None => put_entry(&mut out, i as u32 + 1, base)?,
        }
    }
    out.write_u32::<LittleEndian>(MODE_TOGGLE)?;

    let no_base = bases.len() as u32 + 1;
    for p in paths {
        let p = p.as_ref();
        let (dir, name) = dir_of(p);
        match base_of.get(dir) {
            Some(&idx) => put_entry(&mut out, idx, name)?,
            None => put_entry(&mut out, no_base, p)?,
        }
    }
    Ok(out)
}

/// Encodes `paths` as per-directory sections laid out depth-first, returning
/// the path-rep blob and one [`DirRecord`] per directory.
pub fn pack_dir_tree<S: AsRef<str>>(paths: &[S]) -> Result<(Vec<u8>, Vec<DirRecord>)> {
    let mut files: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut children: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for p in paths {
        let p = p.as_ref();
        let (dir, name) = dir_of(p);
        if dir.is_empty() {
            return Err(BundatError::Format(format!("path outside any directory: {p}")));
        }
        files.entry(dir.to_string()).or_default().push(name.to_string());
        let mut d = dir;
        loop {
            children.entry(d.to_string()).or_default();
            let (parent, _) = dir_of(d);
            if parent.is_empty() {
                break;
            }
            children.entry(parent.to_string()).or_default().insert(d.to_string());
            d = parent;
        }
    }
    let roots: Vec<String> = children
        .keys()
        .filter(|d| !d.contains('/'))
        .cloned()
        .collect();

    let mut out = Vec::new();
    let mut records = Vec::new();
    // explicit stack: (dir, section start, direct size once written)
    let mut stack: Vec<(String, usize, Option<usize>)> =
        roots.into_iter().rev().map(|d| (d, 0, None)).collect();
    while let Some((dir, start, direct)) = stack.pop() {
        match direct {
            Some(direct) => records.push(DirRecord {
                hash: dir_path_hash(&dir),
                offset: start as u32,
                direct_size: direct as u32,
                recursive_size: (out.len() - start) as u32,
            }),
            None => {
                let start = out.len();
                out.write_u32::<LittleEndian>(MODE_TOGGLE)?;
                match files.get(&dir) {
                    Some(names) => {
                        put_entry(&mut out, 1, &format!("{dir}/"))?;
                        out.write_u32::<LittleEndian>(MODE_TOGGLE)?;
                        for n in names {
                            put_entry(&mut out, 1, n)?;
                        }
                    }
                    None => out.write_u32::<LittleEndian>(MODE_TOGGLE)?,
                }
                let direct = out.len() - start;
                let kids: Vec<String> = children
                    .get(&dir)
                    .map(|k| k.iter().cloned().collect())
                    .unwrap_or_default();
                stack.push((dir, start, Some(direct)));
                stack.extend(kids.into_iter().rev().map(|k| (k, 0, None)));
            }
        }
    }
    Ok((out, records))
}

/// Cross-checks directory records against the directories implied by the
/// full path list.
pub fn check_dir_records(path_reps: &[u8], dirs_info: &[u8]) -> Result<Vec<DirFinding>> {
    let mut dirs: BTreeMap<String, bool> = BTreeMap::new();
    for path in unpack_paths(path_reps)? {
        let parts: Vec<&str> = path.split('/').collect();
        for i in 0..parts.len().saturating_sub(1) {
            let has_child_dirs = i + 2 < parts.len();
            let e = dirs.entry(parts[..=i].join("/")).or_default();
            *e = *e || has_child_dirs;
        }
    }

    let mut findings = Vec::new();
    for (dir, has_child_dirs) in dirs {
        match find_dir_record(dirs_info, dir_path_hash(&dir)) {
            None => findings.push(DirFinding::Missing(dir)),
            Some(rec) if has_child_dirs && rec.direct_size == rec.recursive_size => {
                findings.push(DirFinding::NoRecursivePayload(dir))
            }
            Some(rec) if !has_child_dirs && rec.direct_size != rec.recursive_size => {
                findings.push(DirFinding::EmptyChildDirs(dir))
            }
            Some(_) => {}
        }
    }
    Ok(findings)
}
