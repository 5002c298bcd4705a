//! Index-driven file loading on top of a [`BundleSource`].

use crate::codec::Decompressor;
use crate::container::bundle::{SliceOptions, decompress_bundle, decompress_slice_with};
use crate::container::index::{FileInfo, IndexBundle, IndexLayout, read_index_layout};
use crate::container::paths::{
    DirContent, DirFinding, check_dir_records, get_dir_content, get_root_dirs, unpack_paths,
};
use crate::error::Result;
use crate::source::{BundleCache, BundleSource, INDEX_BUNDLE};
use tracing::debug;

/// Inflated index bundle plus its inflated path-rep blob.
pub struct LoadedIndex {
    raw: Vec<u8>,
    layout: IndexLayout,
    path_reps: Vec<u8>,
}

impl LoadedIndex {
    /// `bundle` is the raw index bundle as fetched.
    pub fn load(bundle: &[u8], codec: &dyn Decompressor) -> Result<Self> {
        let raw = decompress_bundle(bundle, codec)?;
        let layout = read_index_layout(&raw)?;
        let path_reps = layout.view(&raw).path_reps(codec)?;
        debug!(index = raw.len(), path_reps = path_reps.len(), "index loaded");
        Ok(Self { raw, layout, path_reps })
    }

    pub fn view(&self) -> IndexBundle<'_> {
        self.layout.view(&self.raw)
    }

    pub fn path_reps(&self) -> &[u8] {
        &self.path_reps
    }

    pub fn file_info(&self, path: &str) -> Result<Option<FileInfo>> {
        self.view().file_info(path)
    }

    pub fn dir_content(&self, dir_path: &str) -> Result<Option<DirContent>> {
        get_dir_content(dir_path, &self.path_reps, self.view().dirs_info)
    }

    pub fn root_dirs(&self) -> Result<Vec<String>> {
        get_root_dirs(&self.path_reps, self.view().dirs_info)
    }

    pub fn all_paths(&self) -> Result<Vec<String>> {
        unpack_paths(&self.path_reps)
    }

    pub fn check(&self) -> Result<Vec<DirFinding>> {
        check_dir_records(&self.path_reps, self.view().dirs_info)
    }
}

pub struct FileLoader<S: BundleSource> {
    source: S,
    codec: Box<dyn Decompressor>,
    index: LoadedIndex,
    slice: SliceOptions,
}

impl<S: BundleSource> FileLoader<S> {
    /// Fetches and inflates [`INDEX_BUNDLE`] from `source`.
    pub fn open(source: S, codec: Box<dyn Decompressor>) -> Result<Self> {
        let bundle = source.fetch(INDEX_BUNDLE)?;
        let index = LoadedIndex::load(&bundle, codec.as_ref())?;
        Ok(Self { source, codec, index, slice: SliceOptions::default() })
    }

    pub fn with_slice_options(mut self, slice: SliceOptions) -> Self {
        self.slice = slice;
        self
    }

    pub fn index(&self) -> &LoadedIndex {
        &self.index
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Bytes of `path`, or `Ok(None)` when the index does not know it.
    pub fn get_file_contents(&self, path: &str, cache: &mut BundleCache) -> Result<Option<Vec<u8>>> {
        let Some(info) = self.index.file_info(path)? else {
            return Ok(None);
        };
        let bundle = cache.get_or_fetch(&info.bundle_file(), &self.source)?;
        let mut out = vec![0u8; info.size as usize];
        decompress_slice_with(bundle, info.offset as usize, &mut out, self.codec.as_ref(), &self.slice)?;
        debug!(path, bundle = %info.bundle, offset = info.offset, size = info.size, "file loaded");
        Ok(Some(out))
    }
}
