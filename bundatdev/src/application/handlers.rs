use std::io::Write;
use std::path::{Path, PathBuf};

use bundat_core::codec::{CodecId, Decompressor, get_decoder};
use bundat_core::container::index::{bundle_name, find_file_record};
use bundat_core::container::paths::DirFinding;
use bundat_core::dat::file::width_from_name;
use bundat_core::error::{BundatError, Result};
use bundat_core::hash::fnv::dir_path_hash;
use bundat_core::hash::murmur::file_path_hash;
use bundat_core::util::hex::parse_hash64;
use bundat_core::{
    AnalyzeOptions, BundleCache, ColumnStats, DatFile, DirBundleSource, FileLoader, Header,
    StatsSnapshot, analyze, analyze_yielding, get_field_reader, read_dat_file, validate_header,
};
use tracing::{debug, info, trace, warn};
use walkdir::WalkDir;

use crate::presentation::cli::CodecArg;

pub struct Context {
    pub bundles_dir: Option<PathBuf>,
    pub codec: CodecArg,
}

impl Context {
    fn decoder(&self) -> Box<dyn Decompressor> {
        get_decoder(match self.codec {
            CodecArg::Store => CodecId::Store,
            CodecArg::Zstd => CodecId::Zstd,
        })
    }

    fn loader(&self) -> Result<FileLoader<DirBundleSource>> {
        let dir = self.bundles_dir.as_ref().ok_or_else(|| {
            BundatError::Format(
                "no bundle directory: pass --bundles-dir or set BUNDAT_BUNDLES_DIR".into(),
            )
        })?;
        let loader = FileLoader::open(DirBundleSource::new(dir), self.decoder())?;
        debug!(root = %loader.source().root().display(), "index loaded");
        Ok(loader)
    }

    /// Bytes of a dat file, from disk or through the index.
    fn dat_bytes(&self, file: &Path, virtual_path: bool) -> Result<(String, Vec<u8>)> {
        let name = file.to_string_lossy().into_owned();
        if !virtual_path {
            return Ok((name, std::fs::read(file)?));
        }
        let loader = self.loader()?;
        let mut cache = BundleCache::default();
        let bytes = loader
            .get_file_contents(&name, &mut cache)?
            .ok_or_else(|| BundatError::Format(format!("not in index: {name}")))?;
        Ok((name, bytes))
    }
}

pub fn handle_hash(path: &str, dir: bool) -> Result<()> {
    let h = if dir { dir_path_hash(path) } else { file_path_hash(path) };
    println!("{h:016x}");
    Ok(())
}

pub fn handle_index_roots(ctx: &Context) -> Result<()> {
    for root in ctx.loader()?.index().root_dirs()? {
        println!("{root}");
    }
    Ok(())
}

pub fn handle_index_ls(ctx: &Context, dir: &str) -> Result<()> {
    let dir = dir.trim_end_matches('/');
    let Some(content) = ctx.loader()?.index().dir_content(dir)? else {
        return Err(BundatError::Format(format!("no such directory: {dir}")));
    };
    for d in content.dirs {
        println!("{d}/");
    }
    for f in content.files {
        println!("{f}");
    }
    Ok(())
}

pub fn handle_index_locate(ctx: &Context, path: &str) -> Result<()> {
    let loader = ctx.loader()?;
    match loader.index().file_info(path)? {
        Some(info) => println!("{}\toffset={}\tsize={}", info.bundle_file(), info.offset, info.size),
        None => eprintln!("locate: {path} not found"),
    }
    Ok(())
}

pub fn handle_index_find_hash(ctx: &Context, hash: &str) -> Result<()> {
    let hash = parse_hash64(hash)?;
    let loader = ctx.loader()?;
    let view = loader.index().view();
    match find_file_record(view.files_info, hash) {
        Some(rec) => {
            let bundle = bundle_name(view.bundles_info, rec.bundle_idx as usize)?;
            println!("{bundle}\toffset={}\tsize={}", rec.offset, rec.size);
        }
        None => eprintln!("find-hash: {hash:016x} not found"),
    }
    Ok(())
}

pub fn handle_index_paths(ctx: &Context) -> Result<()> {
    let mut out = std::io::stdout().lock();
    for p in ctx.loader()?.index().all_paths()? {
        writeln!(out, "{p}")?;
    }
    Ok(())
}

pub fn handle_index_check(ctx: &Context) -> Result<()> {
    let findings = ctx.loader()?.index().check()?;
    for f in &findings {
        match f {
            DirFinding::Missing(d) => println!("missing record\t{d}"),
            DirFinding::NoRecursivePayload(d) => println!("recursive size equals direct size\t{d}"),
            DirFinding::EmptyChildDirs(d) => println!("recursive size without subdirectories\t{d}"),
        }
    }
    eprintln!("check: {} finding(s)", findings.len());
    Ok(())
}

pub fn handle_cat(ctx: &Context, path: &str, out: Option<PathBuf>) -> Result<()> {
    let loader = ctx.loader()?;
    let mut cache = BundleCache::default();
    let bytes = loader
        .get_file_contents(path, &mut cache)?
        .ok_or_else(|| BundatError::Format(format!("not in index: {path}")))?;
    match out {
        Some(p) => std::fs::write(&p, &bytes)?,
        None => std::io::stdout().lock().write_all(&bytes)?,
    }
    Ok(())
}

pub fn handle_dat_info(ctx: &Context, file: &Path, virtual_path: bool) -> Result<()> {
    let (name, bytes) = ctx.dat_bytes(file, virtual_path)?;
    let dat = read_dat_file(&name, &bytes)?;
    println!("width:      {}", dat.width.bytes());
    println!("rows:       {}", dat.row_count);
    println!("row length: {}", dat.row_length);
    println!("heap:       {}", dat.variable.len());
    Ok(())
}

fn flags(s: &ColumnStats) -> String {
    let mut f = Vec::new();
    if s.nullable_memsize {
        f.push("nullable".to_string());
    }
    if s.key_self {
        f.push("key_self".into());
    }
    if s.key_foreign {
        f.push("key_foreign".into());
    }
    if s.ref_string {
        f.push("string".into());
    }
    if let Some(a) = &s.ref_array {
        let mut kinds = Vec::new();
        for (on, k) in [
            (a.boolean, "bool"),
            (a.numeric16, "i16"),
            (a.numeric32, "i32"),
            (a.numeric64, "i64"),
            (a.string, "string"),
            (a.self_key, "key_self"),
            (a.foreign_key, "key_foreign"),
        ] {
            if on {
                kinds.push(k);
            }
        }
        f.push(format!("array[{}]", kinds.join(",")));
    }
    f.join(" ")
}

pub fn handle_dat_analyze(
    ctx: &Context,
    file: &Path,
    virtual_path: bool,
    save: Option<PathBuf>,
    yield_ms: u64,
) -> Result<()> {
    let (name, bytes) = ctx.dat_bytes(file, virtual_path)?;
    let dat = read_dat_file(&name, &bytes)?;
    let opts = AnalyzeOptions {
        yield_interval: std::time::Duration::from_millis(yield_ms),
    };
    let mut checkpoints = 0usize;
    let stats = analyze_yielding(&dat, &opts, || {
        checkpoints += 1;
        trace!(checkpoints, "analysis checkpoint");
    });
    info!(file = %name, checkpoints, "analysed");

    for (offset, s) in stats.iter().enumerate() {
        println!("{offset:>5}  max={:02x}  {}", s.max_value, flags(s));
    }
    if let Some(path) = save {
        StatsSnapshot::capture(&bytes, &dat, stats).save(&path)?;
        eprintln!("analyze: saved {}", path.display());
    }
    Ok(())
}

pub fn handle_dat_scan(dir: &Path) -> Result<()> {
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!(error = %e, "scan: unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let name = path.to_string_lossy();
        if width_from_name(&name).is_err() {
            continue;
        }
        let bytes = std::fs::read(path)?;
        match read_dat_file(&name, &bytes) {
            Ok(dat) => {
                let stats = analyze(&dat);
                let strings = stats.iter().filter(|s| s.ref_string).count();
                let arrays = stats.iter().filter(|s| s.ref_array.is_some()).count();
                println!(
                    "{name}\trows={}\trow_length={}\tstring_offsets={strings}\tarray_offsets={arrays}",
                    dat.row_count, dat.row_length
                );
            }
            Err(e) => warn!(file = %name, error = %e, "scan: not a dat table"),
        }
    }
    Ok(())
}

fn load_stats(dat: &DatFile<'_>, bytes: &[u8], snapshot: Option<PathBuf>) -> Result<Vec<ColumnStats>> {
    let Some(path) = snapshot else {
        return Ok(analyze(dat));
    };
    let snap = StatsSnapshot::load(&path)?;
    snap.verify_source(bytes)?;
    Ok(snap.columns)
}

#[allow(clippy::too_many_arguments)]
pub fn handle_dat_read(
    ctx: &Context,
    file: &Path,
    virtual_path: bool,
    headers_path: &Path,
    column: Option<String>,
    snapshot: Option<PathBuf>,
    trust: bool,
    json: bool,
) -> Result<()> {
    let (name, bytes) = ctx.dat_bytes(file, virtual_path)?;
    let dat = read_dat_file(&name, &bytes)?;

    let raw = std::fs::read(headers_path)?;
    let mut headers: Vec<Header> = serde_json::from_slice(&raw)
        .map_err(|e| BundatError::Format(format!("{}: {e}", headers_path.display())))?;
    if let Some(col) = &column {
        headers.retain(|h| &h.label() == col);
        if headers.is_empty() {
            return Err(BundatError::Format(format!("no column {col}")));
        }
    }

    if !trust {
        let stats = load_stats(&dat, &bytes, snapshot)?;
        let rejected: Vec<String> = headers
            .iter()
            .filter(|h| !validate_header(h, &stats, dat.width))
            .map(Header::label)
            .collect();
        if !rejected.is_empty() {
            return Err(BundatError::Format(format!(
                "columns not supported by the data: {}",
                rejected.join(", ")
            )));
        }
    }

    let readers = headers
        .iter()
        .map(|h| get_field_reader(h, &dat))
        .collect::<Result<Vec<_>>>()?;
    let mut out = std::io::stdout().lock();
    for row in 0..dat.row_count {
        let values = readers.iter().map(|r| r.read(row)).collect::<Result<Vec<_>>>()?;
        if json {
            let obj: serde_json::Map<String, serde_json::Value> = headers
                .iter()
                .zip(&values)
                .map(|(h, v)| Ok((h.label(), serde_json::to_value(v)?)))
                .collect::<std::result::Result<_, serde_json::Error>>()
                .map_err(|e| BundatError::Format(e.to_string()))?;
            writeln!(out, "{}", serde_json::Value::Object(obj))?;
        } else {
            let cells: Vec<String> = values.iter().map(ToString::to_string).collect();
            writeln!(out, "{}", cells.join("\t"))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bundat_core::ArrayStats;

    #[test]
    fn flag_summary() {
        let s = ColumnStats {
            max_value: 3,
            nullable_memsize: false,
            key_self: true,
            key_foreign: false,
            ref_string: false,
            ref_array: Some(ArrayStats {
                boolean: false,
                numeric16: true,
                numeric32: true,
                numeric64: false,
                string: false,
                self_key: false,
                foreign_key: false,
            }),
        };
        assert_eq!(flags(&s), "key_self array[i16,i32]");
    }

    #[test]
    fn scan_skips_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut dat = 1u32.to_le_bytes().to_vec();
        dat.extend_from_slice(&[1, 2, 3, 4]);
        dat.extend_from_slice(&[0xbb; 8]);
        std::fs::write(dir.path().join("a.dat"), &dat).unwrap();
        std::fs::write(dir.path().join("b.dat"), b"short").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        handle_dat_scan(dir.path()).unwrap();
    }

    #[test]
    fn cat_needs_a_bundle_dir() {
        let ctx = Context { bundles_dir: None, codec: CodecArg::Zstd };
        assert!(matches!(handle_cat(&ctx, "a", None), Err(BundatError::Format(_))));
    }
}
