use clap::Args;
use stacbuild::publish::{self, EventContext, PublishReport};
use stacbuild::BuildOptions;

use crate::commands::{CmdResult, GlobalArgs};

#[derive(Args)]
pub struct PublishArgs {
    /// Do not use the build cache for either image
    #[arg(long)]
    pub no_cache: bool,

    /// Always pull newer versions of base images
    #[arg(long)]
    pub pull: bool,

    /// Triggering event (defaults to $GITHUB_EVENT_NAME)
    #[arg(long, value_name = "NAME")]
    pub event: Option<String>,

    /// Git ref of the run (defaults to $GITHUB_REF)
    #[arg(long = "ref", value_name = "REF")]
    pub git_ref: Option<String>,

    /// Branch whose pushes publish images (overrides stacbuild.json)
    #[arg(long, value_name = "BRANCH")]
    pub default_branch: Option<String>,
}

pub fn run(args: PublishArgs, global: &GlobalArgs) -> CmdResult<PublishReport> {
    let (mut workspace, coords, engine) = global.image_context()?;
    if let Some(branch) = args.default_branch {
        workspace.settings.default_branch = branch;
    }

    let options = BuildOptions {
        no_cache: args.no_cache,
        pull: args.pull,
    };
    let event = EventContext::resolve(args.event, args.git_ref);

    let report = publish::publish(&engine, &workspace, &coords, options, event)?;
    Ok((report, 0))
}
