pub mod ids;
pub mod info;
pub mod objects;
pub mod show;
pub mod show_at;
pub mod verify;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Subcommand;
use pack_read::pack::PackReader;

#[derive(Subcommand)]
pub enum Commands {
    /// List all object identifiers in the index
    Ids(ids::IdsArgs),
    /// List all objects with their offsets (and CRCs for v2 indexes)
    Objects(objects::ObjectsArgs),
    /// Show index and pack header information
    Info(info::InfoArgs),
    /// Resolve and display the object at a pack offset
    ShowAt(show_at::ShowAtArgs),
    /// Resolve and display the object for an identifier prefix
    Show(show::ShowArgs),
    /// Verify pack and index checksums and the per-entry CRC table
    Verify(verify::VerifyArgs),
}

pub fn run(command: Commands) -> Result<i32> {
    match command {
        Commands::Ids(args) => ids::run(&args),
        Commands::Objects(args) => objects::run(&args),
        Commands::Info(args) => info::run(&args),
        Commands::ShowAt(args) => show_at::run(&args),
        Commands::Show(args) => show::run(&args),
        Commands::Verify(args) => verify::run(&args),
    }
}

/// Open a pack pair from a shared base name. A trailing `.pack` or `.idx`
/// extension is accepted and stripped, so any of `pack-1234`,
/// `pack-1234.idx`, and `pack-1234.pack` name the same pair.
pub fn open_pair(base: &Path) -> Result<PackReader> {
    let base: PathBuf = match base.extension().and_then(|e| e.to_str()) {
        Some("pack") | Some("idx") => base.with_extension(""),
        _ => base.to_path_buf(),
    };
    let pack_path = base.with_extension("pack");
    let idx_path = base.with_extension("idx");
    PackReader::open(&pack_path, &idx_path)
        .with_context(|| format!("cannot open pack pair '{}'", base.display()))
}

/// Parse an offset argument, accepting `0x`-prefixed hex or decimal.
pub fn parse_offset(arg: &str) -> Result<u64> {
    let parsed = match arg.strip_prefix("0x") {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => arg.parse(),
    };
    parsed.with_context(|| format!("invalid offset '{arg}'"))
}
