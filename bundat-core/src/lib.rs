#![forbid(unsafe_code)]

pub mod error;

pub mod util {
    pub mod buf;
    pub mod find;
    pub mod hex;
}

pub mod hash {
    pub mod fnv;
    pub mod murmur;
}

pub mod codec;

pub mod container {
    pub mod bundle;
    pub mod index;
    pub mod paths;
}

pub mod dat {
    pub mod file;
    pub mod header;
    pub mod reader;
    pub mod text;
    pub mod width;
}

pub mod analysis {
    pub mod scan;
    pub mod snapshot;
    pub mod stats;
    pub mod validate;
}

pub mod loader;
pub mod source;

// Re-exports: stable API surface
pub use analysis::scan::{AnalyzeOptions, Analyzer, Step, analyze, analyze_rows, analyze_yielding};
pub use analysis::snapshot::StatsSnapshot;
pub use analysis::stats::{ArrayStats, ColumnStats};
pub use analysis::validate::validate_header;
pub use container::bundle::{SliceOptions, decompress_bundle, decompress_slice_in_bundle};
pub use container::index::{FileInfo, get_file_info, read_index_bundle};
pub use container::paths::{get_dir_content, get_root_dirs, unpack_paths};
pub use dat::file::{DatFile, read_dat_file};
pub use dat::header::{FieldKind, Header};
pub use dat::reader::{FieldReader, Value, get_field_reader, read_column};
pub use dat::width::Width;
pub use error::{BundatError, Result};
pub use loader::{FileLoader, LoadedIndex};
pub use source::{BundleCache, BundleSource, CacheOptions, DirBundleSource};
