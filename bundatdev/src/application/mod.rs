pub mod handlers;

use crate::presentation::cli::{Cli, Commands, DatCommands, IndexCommands};
use bundat_core::error::Result;
use clap::Parser;

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let ctx = handlers::Context {
        bundles_dir: cli.bundles_dir,
        codec: cli.codec,
    };
    match cli.command {
        Commands::Hash { path, dir } => handlers::handle_hash(&path, dir),
        Commands::Index(cmd) => match cmd {
            IndexCommands::Roots => handlers::handle_index_roots(&ctx),
            IndexCommands::Ls { dir } => handlers::handle_index_ls(&ctx, &dir),
            IndexCommands::Locate { path } => handlers::handle_index_locate(&ctx, &path),
            IndexCommands::FindHash { hash } => handlers::handle_index_find_hash(&ctx, &hash),
            IndexCommands::Paths => handlers::handle_index_paths(&ctx),
            IndexCommands::Check => handlers::handle_index_check(&ctx),
        },
        Commands::Cat { path, out } => handlers::handle_cat(&ctx, &path, out),
        Commands::Dat(cmd) => match cmd {
            DatCommands::Info { file, virtual_path } => {
                handlers::handle_dat_info(&ctx, &file, virtual_path)
            }
            DatCommands::Analyze {
                file,
                virtual_path,
                save,
                yield_ms,
            } => handlers::handle_dat_analyze(&ctx, &file, virtual_path, save, yield_ms),
            DatCommands::Scan { dir } => handlers::handle_dat_scan(&dir),
            DatCommands::Read {
                file,
                virtual_path,
                headers,
                column,
                stats,
                trust,
                json,
            } => handlers::handle_dat_read(
                &ctx,
                &file,
                virtual_path,
                &headers,
                column,
                stats,
                trust,
                json,
            ),
        },
    }
}
