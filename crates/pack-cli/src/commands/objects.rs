use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use super::open_pair;

#[derive(Args)]
pub struct ObjectsArgs {
    /// Base name of the pack pair
    pub base: PathBuf,
}

pub fn run(args: &ObjectsArgs) -> Result<i32> {
    let pack = open_pair(&args.base)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let has_crcs = pack.index().version() >= 2;
    if has_crcs {
        writeln!(out, "Id  Sha1                                     Offset     Crc")?;
    } else {
        writeln!(out, "Id  Sha1                                     Offset")?;
    }

    for (i, entry) in pack.index().entries().enumerate() {
        match entry.crc {
            Some(crc) => writeln!(
                out,
                "{i:03} {} {:#010x} {crc:#010x}",
                entry.digest, entry.offset
            )?,
            None => writeln!(out, "{i:03} {} {:#010x}", entry.digest, entry.offset)?,
        }
    }
    Ok(0)
}
