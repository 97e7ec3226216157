use clap::{Parser, Subcommand};
use std::path::PathBuf;

use commands::GlobalArgs;

mod commands;
mod output;

use commands::{build, cache, pipeline, publish};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "stacbuild")]
#[command(version = VERSION)]
#[command(about = "Build, clean up and publish the stactools container images")]
struct Cli {
    /// Use verbose mode (echo engine commands)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use quiet mode (errors only; STACTOOLS_DEBUG still echoes engine commands)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Repository root (defaults to the current directory)
    #[arg(short = 'C', long, global = true, value_name = "DIR")]
    root: Option<PathBuf>,

    /// Settings file (defaults to <root>/stacbuild.json when present)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the main and dev images, then remove the debug container
    #[command(disable_help_flag = true)]
    Build(build::BuildArgs),
    /// Remove the debug container if it exists
    Cleanup,
    /// Build both images and push them on default-branch pushes
    Publish(publish::PublishArgs),
    /// Plan or conclude a CI workflow's job graph
    Pipeline(pipeline::PipelineArgs),
    /// Compute the CI setup cache keys
    CacheKeys(cache::CacheKeysArgs),
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    stacbuild::log::init(cli.verbose, cli.quiet);

    // Usage goes to stdout and nothing is built.
    if let Commands::Build(args) = &cli.command {
        if args.wants_help() {
            print!("{}", stacbuild::args::USAGE);
            return std::process::ExitCode::SUCCESS;
        }
    }

    let root = match cli.root.clone().map(Ok).unwrap_or_else(std::env::current_dir) {
        Ok(root) => root,
        Err(e) => {
            let err = stacbuild::Error::internal_io(
                e.to_string(),
                Some("resolve current directory".to_string()),
            );
            let _ = output::print_json_result(Err(err));
            return std::process::ExitCode::from(1);
        }
    };

    let global = GlobalArgs {
        root,
        config: cli.config,
    };

    let (json_result, exit_code) = commands::run_json(cli.command, &global);
    let _ = output::print_json_result(json_result);

    std::process::ExitCode::from(exit_code_to_u8(exit_code))
}

fn exit_code_to_u8(code: i32) -> u8 {
    if code <= 0 {
        0
    } else if code >= 255 {
        255
    } else {
        code as u8
    }
}
