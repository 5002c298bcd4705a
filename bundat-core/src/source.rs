//! Where bundle bytes come from, and the caller-owned cache in front of it.

use crate::error::{BundatError, Result};
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Directory under a game install that holds the bundles.
pub const BUNDLES_DIR: &str = "Bundles2";
/// Bundle holding the index tables.
pub const INDEX_BUNDLE: &str = "_.index.bin";

pub trait BundleSource: Send + Sync {
    /// Raw bytes of the bundle file `name` (for example `Data.dat.bundle.bin`).
    fn fetch(&self, name: &str) -> Result<Vec<u8>>;
}

/// Reads bundles from a local directory.
#[derive(Debug, Clone)]
pub struct DirBundleSource {
    root: PathBuf,
}

impl DirBundleSource {
    /// `root` is the bundle directory itself.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn from_game_dir(game: &Path) -> Self {
        Self::new(game.join(BUNDLES_DIR))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl BundleSource for DirBundleSource {
    fn fetch(&self, name: &str) -> Result<Vec<u8>> {
        if Path::new(name).components().any(|c| !matches!(c, std::path::Component::Normal(_))) {
            return Err(BundatError::Format(format!("bad bundle name: {name}")));
        }
        let path = self.root.join(name);
        trace!(path = %path.display(), "fetch bundle");
        Ok(std::fs::read(path)?)
    }
}

impl BundleSource for HashMap<String, Vec<u8>> {
    fn fetch(&self, name: &str) -> Result<Vec<u8>> {
        self.get(name).cloned().ok_or_else(|| {
            BundatError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("bundle {name} not found"),
            ))
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct CacheOptions {
    /// Evict oldest entries once the cached bytes exceed this.
    pub max_bytes: Option<usize>,
}

/// Bundle bytes keyed by bundle name. Owned by the caller; nothing is global.
#[derive(Debug, Default)]
pub struct BundleCache {
    opts: CacheOptions,
    entries: HashMap<String, Vec<u8>>,
    order: VecDeque<String>,
    bytes: usize,
}

impl BundleCache {
    pub fn new(opts: CacheOptions) -> Self {
        Self { opts, ..Self::default() }
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.entries.get(name).map(Vec::as_slice)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Stores `data`; the newest entry always survives its own insertion.
    pub fn insert(&mut self, name: String, data: Vec<u8>) {
        self.evict(&name);
        self.bytes += data.len();
        self.order.push_back(name.clone());
        self.entries.insert(name, data);

        if let Some(max) = self.opts.max_bytes {
            while self.bytes > max && self.order.len() > 1 {
                let Some(oldest) = self.order.pop_front() else { break };
                if let Some(old) = self.entries.remove(&oldest) {
                    self.bytes -= old.len();
                    debug!(bundle = %oldest, size = old.len(), "evicted");
                }
            }
        }
    }

    pub fn evict(&mut self, name: &str) -> Option<Vec<u8>> {
        let data = self.entries.remove(name)?;
        self.order.retain(|n| n != name);
        self.bytes -= data.len();
        Some(data)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
        self.bytes = 0;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_bytes(&self) -> usize {
        self.bytes
    }

    pub fn get_or_fetch(&mut self, name: &str, source: &dyn BundleSource) -> Result<&[u8]> {
        if !self.entries.contains_key(name) {
            let data = source.fetch(name)?;
            self.insert(name.to_string(), data);
        }
        self.get(name)
            .ok_or_else(|| BundatError::Format(format!("bundle {name} vanished from cache")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        inner: HashMap<String, Vec<u8>>,
        fetches: AtomicUsize,
    }

    impl BundleSource for Counting {
        fn fetch(&self, name: &str) -> Result<Vec<u8>> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.inner.fetch(name)
        }
    }

    #[test]
    fn caches_by_name() {
        let src = Counting {
            inner: HashMap::from([("a".to_string(), vec![1, 2, 3])]),
            fetches: AtomicUsize::new(0),
        };
        let mut cache = BundleCache::default();
        assert_eq!(cache.get_or_fetch("a", &src).unwrap(), &[1, 2, 3]);
        assert_eq!(cache.get_or_fetch("a", &src).unwrap(), &[1, 2, 3]);
        assert_eq!(src.fetches.load(Ordering::SeqCst), 1);
        assert!(matches!(cache.get_or_fetch("b", &src), Err(BundatError::Io(_))));

        assert_eq!(cache.evict("a"), Some(vec![1, 2, 3]));
        cache.get_or_fetch("a", &src).unwrap();
        assert_eq!(src.fetches.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn budget_evicts_oldest_first() {
        let mut cache = BundleCache::new(CacheOptions { max_bytes: Some(10) });
        cache.insert("a".into(), vec![0; 4]);
        cache.insert("b".into(), vec![0; 4]);
        cache.insert("c".into(), vec![0; 4]);
        assert!(!cache.contains("a"));
        assert!(cache.contains("b") && cache.contains("c"));
        assert_eq!(cache.total_bytes(), 8);

        cache.insert("huge".into(), vec![0; 64]);
        assert_eq!(cache.len(), 1);
        assert!(cache.contains("huge"));

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.total_bytes(), 0);
    }

    #[test]
    fn reinsert_replaces_size() {
        let mut cache = BundleCache::default();
        cache.insert("a".into(), vec![0; 4]);
        cache.insert("a".into(), vec![0; 6]);
        assert_eq!((cache.len(), cache.total_bytes()), (1, 6));
    }

    #[test]
    fn dir_source_reads_files_and_rejects_escapes() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join(BUNDLES_DIR)).unwrap();
        std::fs::write(dir.path().join(BUNDLES_DIR).join("x.bundle.bin"), b"xyz").unwrap();
        let src = DirBundleSource::from_game_dir(dir.path());
        assert_eq!(src.fetch("x.bundle.bin").unwrap(), b"xyz");
        assert!(matches!(src.fetch("missing"), Err(BundatError::Io(_))));
        assert!(matches!(src.fetch("../x"), Err(BundatError::Format(_))));
    }
}
