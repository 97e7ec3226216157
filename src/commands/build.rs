use clap::Args;
use serde::Serialize;
use stacbuild::args::{self, Invocation};
use stacbuild::build::{self, BuildReport};
use stacbuild::cleanup::{self, CleanupOutcome};
use stacbuild::{log_debug, log_warn};

use crate::commands::{CmdResult, GlobalArgs};

#[derive(Args)]
pub struct BuildArgs {
    /// Build flags: --no-cache, --pull, --help. Anything else is ignored.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

impl BuildArgs {
    /// Whether `--help` appears anywhere in the arguments.
    pub fn wants_help(&self) -> bool {
        matches!(args::parse(&self.args).invocation, Invocation::Help)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildOutput {
    #[serde(flatten)]
    pub build: BuildReport,
    /// Absent when the cleanup step failed; the failure is logged instead.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cleanup: Option<CleanupOutcome>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ignored_args: Vec<String>,
}

pub fn run(args: BuildArgs, global: &GlobalArgs) -> CmdResult<BuildOutput> {
    let parsed = args::parse(&args.args);
    for token in &parsed.ignored {
        log_debug!("build", "Ignoring unrecognized argument '{}'", token);
    }

    // Help is printed by main before dispatch; this arm only guards library use.
    let Invocation::Build { options } = parsed.invocation else {
        return Err(stacbuild::Error::validation_invalid_argument(
            "args",
            "--help is handled before dispatch",
            None,
        ));
    };

    let (workspace, coords, engine) = global.image_context()?;
    let report = build::build_images(&engine, &workspace, &coords, options)?;

    let cleanup = match cleanup::cleanup_debug_container(&engine, &coords.debug_container_name) {
        Ok(outcome) => Some(outcome),
        Err(err) => {
            log_warn!(
                "cleanup",
                "Could not clean up {}: {}",
                coords.debug_container_name,
                err
            );
            None
        }
    };

    Ok((
        BuildOutput {
            build: report,
            cleanup,
            ignored_args: parsed.ignored,
        },
        0,
    ))
}
