use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use super::open_pair;

#[derive(Args)]
pub struct InfoArgs {
    /// Base name of the pack pair
    pub base: PathBuf,
}

pub fn run(args: &InfoArgs) -> Result<i32> {
    let pack = open_pair(&args.base)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let summary = pack.index().summary();

    writeln!(out, "index ------------------------")?;
    writeln!(out, "   version: {}", summary.version)?;
    writeln!(out, "   entries: {}", summary.entry_count)?;
    let names: Vec<&str> = summary.tables.iter().map(|(name, _)| *name).collect();
    writeln!(out, "    tables: {}", names.join(", "))?;

    writeln!(out, "table offsets ----------------")?;
    for (name, spec) in &summary.tables {
        writeln!(out, "  {name:>8} table offset: {:#010x}", spec.start)?;
    }
    writeln!(out, "        trailer offset: {:#010x}", summary.trailer_start)?;

    writeln!(out, "checksums --------------------")?;
    writeln!(out, "    pack checksum: {}", summary.trailer.pack_checksum)?;
    writeln!(out, "   index checksum: {}", summary.trailer.index_checksum)?;

    writeln!(out, "pack -------------------------")?;
    writeln!(out, "   version: {}", pack.header().version)?;
    writeln!(out, "   entries: {}", pack.header().entry_count)?;
    if pack.header().entry_count != summary.entry_count {
        writeln!(
            out,
            "   note: pack declares {} entries but the index has {}",
            pack.header().entry_count,
            summary.entry_count
        )?;
    }
    Ok(0)
}
