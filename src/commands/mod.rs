use std::path::PathBuf;

use stacbuild::{DockerCli, ImageCoordinates, Workspace};

pub type CmdResult<T> = stacbuild::Result<(T, i32)>;

pub mod build;
pub mod cache;
pub mod cleanup;
pub mod pipeline;
pub mod publish;

/// Options shared by every subcommand.
pub(crate) struct GlobalArgs {
    pub root: PathBuf,
    pub config: Option<PathBuf>,
}

impl GlobalArgs {
    pub fn workspace(&self) -> stacbuild::Result<Workspace> {
        Workspace::load(&self.root, self.config.as_deref())
    }

    /// Workspace, image coordinates and the configured engine.
    pub fn image_context(&self) -> stacbuild::Result<(Workspace, ImageCoordinates, DockerCli)> {
        let workspace = self.workspace()?;
        let coords = ImageCoordinates::load(&workspace.env_file())?;
        let engine = DockerCli::new(workspace.settings.engine.clone());
        Ok((workspace, coords, engine))
    }
}

/// Dispatch a command to its handler and map result to JSON.
macro_rules! dispatch {
    ($args:expr, $module:ident) => {
        crate::output::map_cmd_result_to_json($module::run($args))
    };
    ($args:expr, $global:expr, $module:ident) => {
        crate::output::map_cmd_result_to_json($module::run($args, $global))
    };
}

pub(crate) fn run_json(
    command: crate::Commands,
    global: &GlobalArgs,
) -> (stacbuild::Result<serde_json::Value>, i32) {
    match command {
        // Commands without global context
        crate::Commands::Pipeline(args) => dispatch!(args, pipeline),

        // Commands with global context
        crate::Commands::Build(args) => dispatch!(args, global, build),
        crate::Commands::Cleanup => dispatch!((), global, cleanup),
        crate::Commands::Publish(args) => dispatch!(args, global, publish),
        crate::Commands::CacheKeys(args) => dispatch!(args, global, cache),
    }
}
