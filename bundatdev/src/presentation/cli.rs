use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about = "bundatdev: bundle and dat table inspector", long_about = None)]
pub struct Cli {
    /// Directory holding the bundle files (`Bundles2` of a game install)
    #[arg(long, global = true, env = "BUNDAT_BUNDLES_DIR")]
    pub bundles_dir: Option<PathBuf>,

    /// Chunk codec the bundles were written with
    #[arg(long, global = true, value_enum, default_value_t = CodecArg::Zstd)]
    pub codec: CodecArg,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum CodecArg {
    Store,
    Zstd,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the lookup hash of a virtual path
    Hash {
        path: String,
        /// Directory hash (FNV-1a of `path++`) instead of the file hash
        #[arg(long)]
        dir: bool,
    },

    #[command(subcommand)]
    /// Query the index bundle
    Index(IndexCommands),

    /// Write one virtual file to stdout or to --out
    Cat {
        path: String,
        #[arg(long)]
        out: Option<PathBuf>,
    },

    #[command(subcommand)]
    /// Inspect dat tables
    Dat(DatCommands),
}

#[derive(Subcommand)]
pub enum IndexCommands {
    /// Top-level directories
    Roots,
    /// Files and subdirectories of one directory
    Ls { dir: String },
    /// Bundle, offset and size of one file
    Locate { path: String },
    /// Look a file record up by its raw 64-bit hash (hex)
    FindHash { hash: String },
    /// Every path in the index
    Paths,
    /// Cross-check directory records against the path list
    Check,
}

#[derive(Subcommand)]
pub enum DatCommands {
    /// Row count, row length and heap size
    Info {
        file: PathBuf,
        /// Treat FILE as a virtual path and load it through the index
        #[arg(long)]
        virtual_path: bool,
    },
    /// Per-offset plausibility flags
    Analyze {
        file: PathBuf,
        #[arg(long)]
        virtual_path: bool,
        /// Write the stats as a snapshot file
        #[arg(long)]
        save: Option<PathBuf>,
        /// Milliseconds between progress checkpoints
        #[arg(long, default_value_t = 10)]
        yield_ms: u64,
    },
    /// Analyse every dat file under a directory
    Scan { dir: PathBuf },
    /// Read columns described by a JSON header file
    Read {
        file: PathBuf,
        #[arg(long)]
        virtual_path: bool,
        /// JSON array of `{ "name"?, "offset", "kind" }`
        #[arg(long)]
        headers: PathBuf,
        /// Only this column (name or `@offset`)
        #[arg(long)]
        column: Option<String>,
        /// Use a saved snapshot instead of analysing
        #[arg(long)]
        stats: Option<PathBuf>,
        /// Skip validating headers against the stats
        #[arg(long)]
        trust: bool,
        /// Emit one JSON object per row
        #[arg(long)]
        json: bool,
    },
}
