use clap::Args;
use stacbuild::cache::{self, CacheKey};

use crate::commands::{CmdResult, GlobalArgs};

#[derive(Args)]
pub struct CacheKeysArgs {
    /// Language runtime version the caches belong to (e.g. 3.10)
    #[arg(long, value_name = "VERSION")]
    pub runtime: String,

    /// Runner OS label (defaults to the current platform)
    #[arg(long, value_name = "OS")]
    pub os: Option<String>,
}

pub fn run(args: CacheKeysArgs, global: &GlobalArgs) -> CmdResult<Vec<CacheKey>> {
    let workspace = global.workspace()?;
    let os = args
        .os
        .unwrap_or_else(|| cache::current_os().to_string());
    let keys = cache::cache_keys(
        &workspace.root,
        &args.runtime,
        &os,
        &workspace.settings.caches,
    )?;
    Ok((keys, 0))
}
