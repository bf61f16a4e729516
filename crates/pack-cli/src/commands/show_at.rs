use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use pack_read::pack::PackReader;
use pack_read::EntryKind;

use super::{open_pair, parse_offset};

#[derive(Args)]
pub struct ShowAtArgs {
    /// Base name of the pack pair
    pub base: PathBuf,

    /// Pack offset of the object (decimal or 0x-prefixed hex)
    pub offset: String,
}

pub fn run(args: &ShowAtArgs) -> Result<i32> {
    let pack = open_pair(&args.base)?;
    let offset = parse_offset(&args.offset)?;
    show_object(&pack, offset)
}

/// Render one object: identity, entry header details, and resolved payload.
pub fn show_object(pack: &PackReader, offset: u64) -> Result<i32> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let entry = pack.entry_header_at(offset)?;
    let resolved = pack.resolve_at(offset)?;

    writeln!(out, "info -------------------------")?;
    match pack.index().digest_for_offset(offset) {
        Ok(digest) => writeln!(out, "             sha1: {digest}")?,
        Err(_) => writeln!(out, "             sha1: (not indexed)")?,
    }
    writeln!(out, "    object offset: {offset:#010x}")?;
    writeln!(out, "   payload offset: {:#010x}", entry.payload_offset)?;
    writeln!(out, "       entry type: {}", entry.kind.name())?;
    if let Ok(size) = pack.packed_size_at(offset) {
        writeln!(out, "  packed obj size: {size}")?;
    }

    match entry.kind {
        EntryKind::OfsDelta { base_offset } => {
            writeln!(out, "delta ------------------------")?;
            writeln!(
                out,
                "      base offset: {base_offset:#010x} = {offset:#010x} - {:#010x}",
                offset - base_offset
            )?;
            writeln!(out, "delta stream size: {}", entry.size)?;
        }
        EntryKind::RefDelta { base } => {
            writeln!(out, "delta ------------------------")?;
            writeln!(out, "          base id: {base}")?;
            writeln!(out, "delta stream size: {}", entry.size)?;
        }
        _ => {}
    }

    writeln!(out, "    resolved type: {}", resolved.kind)?;
    writeln!(out, "    dest obj size: {}", resolved.len())?;
    writeln!(out, "data -------------------------")?;
    out.write_all(&resolved.data)?;
    if !resolved.data.ends_with(b"\n") {
        writeln!(out)?;
    }
    Ok(0)
}
