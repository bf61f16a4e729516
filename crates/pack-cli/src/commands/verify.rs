use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use super::open_pair;

#[derive(Args)]
pub struct VerifyArgs {
    /// Base name of the pack pair
    pub base: PathBuf,
}

pub fn run(args: &VerifyArgs) -> Result<i32> {
    let pack = open_pair(&args.base)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    pack.verify_checksum()?;
    writeln!(out, "pack checksum: ok")?;

    pack.verify_index_checksum()?;
    writeln!(out, "index checksum: ok")?;

    match pack.verify_crcs()? {
        Some(count) => writeln!(out, "entry crcs: {count} ok")?,
        None => writeln!(out, "entry crcs: none (v1 index)")?,
    }
    Ok(0)
}
