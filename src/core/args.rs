//! Argument scanning for `stacbuild build`.
//!
//! Recognizes `--help`, `--no-cache` and `--pull`. Every other token is
//! skipped without error and never forwarded to the engine.

use serde::Serialize;

use crate::image::BuildOptions;

pub const USAGE: &str = "\
Usage: stacbuild build [--no-cache] [--pull] [--help]

Builds the main and dev container images from the repository's build file,
then removes the leftover debug container if one exists.

Options:
  --no-cache  Do not use the build cache for either image
  --pull      Always pull newer versions of base images
  --help      Print this message and exit
";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Invocation {
    Help,
    Build { options: BuildOptions },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedArgs {
    pub invocation: Invocation,
    /// Tokens that were skipped.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ignored: Vec<String>,
}

/// Scan `args` (without the program or subcommand name).
///
/// `--help` anywhere wins over everything else.
pub fn parse<I, S>(args: I) -> ParsedArgs
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = BuildOptions::default();
    let mut help = false;
    let mut ignored = Vec::new();

    for arg in args {
        match arg.as_ref() {
            "--help" => help = true,
            "--no-cache" => options.no_cache = true,
            "--pull" => options.pull = true,
            other => ignored.push(other.to_string()),
        }
    }

    let invocation = if help {
        Invocation::Help
    } else {
        Invocation::Build { options }
    };

    ParsedArgs {
        invocation,
        ignored,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_options(args: &[&str]) -> BuildOptions {
        match parse(args).invocation {
            Invocation::Build { options } => options,
            Invocation::Help => panic!("unexpected help for {:?}", args),
        }
    }

    #[test]
    fn no_args_builds_with_defaults() {
        assert_eq!(build_options(&[]), BuildOptions::default());
    }

    #[test]
    fn flags_accumulate() {
        let options = build_options(&["--pull", "--no-cache"]);
        assert!(options.pull);
        assert!(options.no_cache);
    }

    #[test]
    fn repeated_flags_are_idempotent() {
        let options = build_options(&["--pull", "--pull"]);
        assert!(options.pull);
        assert!(!options.no_cache);
    }

    #[test]
    fn help_in_any_position() {
        for args in [
            vec!["--help"],
            vec!["--pull", "--help"],
            vec!["--bogus", "--no-cache", "--help", "--pull"],
        ] {
            assert_eq!(parse(&args).invocation, Invocation::Help);
        }
    }

    #[test]
    fn unknown_tokens_are_skipped() {
        let parsed = parse(["--bogus", "--pull", "extra", "-x"]);
        assert_eq!(
            parsed.invocation,
            Invocation::Build {
                options: BuildOptions {
                    no_cache: false,
                    pull: true
                }
            }
        );
        assert_eq!(parsed.ignored, vec!["--bogus", "extra", "-x"]);
    }

    #[test]
    fn near_miss_flags_are_not_recognized() {
        let parsed = parse(["--nocache", "--pull=true", "-h"]);
        assert_eq!(
            parsed.invocation,
            Invocation::Build {
                options: BuildOptions::default()
            }
        );
        assert_eq!(parsed.ignored.len(), 3);
    }

    #[test]
    fn usage_mentions_every_flag() {
        for flag in ["--no-cache", "--pull", "--help"] {
            assert!(USAGE.contains(flag));
        }
    }
}
