use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use super::{open_pair, show_at::show_object};

#[derive(Args)]
pub struct ShowArgs {
    /// Base name of the pack pair
    pub base: PathBuf,

    /// Identifier hex prefix (first match wins)
    pub prefix: String,
}

pub fn run(args: &ShowArgs) -> Result<i32> {
    let pack = open_pair(&args.base)?;
    let offset = pack.index().offset_for_prefix(&args.prefix)?;
    show_object(&pack, offset)
}
