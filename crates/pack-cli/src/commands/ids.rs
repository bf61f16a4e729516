use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use super::open_pair;

#[derive(Args)]
pub struct IdsArgs {
    /// Base name of the pack pair (the shared stem of .pack and .idx)
    pub base: PathBuf,
}

pub fn run(args: &IdsArgs) -> Result<i32> {
    let pack = open_pair(&args.base)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    for (i, digest) in pack.index().digests().into_iter().enumerate() {
        writeln!(out, "{i} {digest}")?;
    }
    Ok(0)
}
