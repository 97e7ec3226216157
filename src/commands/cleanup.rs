use stacbuild::cleanup::{self, CleanupOutcome};

use crate::commands::{CmdResult, GlobalArgs};

pub fn run(_args: (), global: &GlobalArgs) -> CmdResult<CleanupOutcome> {
    let (_workspace, coords, engine) = global.image_context()?;
    let outcome = cleanup::cleanup_debug_container(&engine, &coords.debug_container_name)?;
    Ok((outcome, 0))
}
