// Container engine access.
//
// Everything that touches the engine goes through `ContainerEngine`, so the
// build, cleanup and publish flows can be exercised against a recording
// engine in tests. `DockerCli` is the real implementation and shells out to
// the configured binary (docker or a CLI-compatible engine such as podman).
//
// Builds and pushes stream their output to the terminal. Lookups capture it.

use serde::Serialize;

use crate::error::Result;
use crate::image::BuildRequest;
use crate::utils::command;

/// A container seen in the engine's container list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerState {
    pub name: String,
    pub running: bool,
}

pub trait ContainerEngine {
    /// Build one image. Fails if the engine exits non-zero.
    fn build(&self, request: &BuildRequest) -> Result<()>;

    /// Push a tagged image to its registry.
    fn push(&self, image: &str) -> Result<()>;

    /// Look up a container (running or stopped) by exact name.
    fn find_container(&self, name: &str) -> Result<Option<ContainerState>>;

    fn kill(&self, name: &str) -> Result<()>;

    fn remove(&self, name: &str) -> Result<()>;
}

/// Engine backed by the docker CLI.
#[derive(Debug, Clone)]
pub struct DockerCli {
    binary: String,
}

impl DockerCli {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl ContainerEngine for DockerCli {
    fn build(&self, request: &BuildRequest) -> Result<()> {
        command::run_passthrough(&self.binary, &build_args(request))
    }

    fn push(&self, image: &str) -> Result<()> {
        command::run_passthrough(&self.binary, &["push".to_string(), image.to_string()])
    }

    fn find_container(&self, name: &str) -> Result<Option<ContainerState>> {
        let output = command::run_captured(&self.binary, &list_args(name))?;
        Ok(parse_container_list(&output.stdout, name))
    }

    fn kill(&self, name: &str) -> Result<()> {
        command::run_captured(&self.binary, &["kill".to_string(), name.to_string()]).map(|_| ())
    }

    fn remove(&self, name: &str) -> Result<()> {
        command::run_captured(&self.binary, &["rm".to_string(), name.to_string()]).map(|_| ())
    }
}

/// Arguments for one `build` invocation.
///
/// `--pull` and `--no-cache` are present only when requested.
pub fn build_args(request: &BuildRequest) -> Vec<String> {
    let mut args = vec!["build".to_string()];
    if request.options.pull {
        args.push("--pull".to_string());
    }
    if request.options.no_cache {
        args.push("--no-cache".to_string());
    }
    args.extend([
        "-f".to_string(),
        request.dockerfile.to_string_lossy().to_string(),
        "--target".to_string(),
        request.target.clone(),
        "-t".to_string(),
        request.image.clone(),
        request.context.to_string_lossy().to_string(),
    ]);
    args
}

/// Arguments listing all containers whose name contains `name`.
///
/// The name filter is a substring match; exact matching happens in
/// `parse_container_list`.
pub fn list_args(name: &str) -> Vec<String> {
    vec![
        "ps".to_string(),
        "--all".to_string(),
        "--filter".to_string(),
        format!("name={}", name),
        "--format".to_string(),
        "{{.Names}}\t{{.State}}".to_string(),
    ]
}

/// Find `name` in `ps --format '{{.Names}}\t{{.State}}'` output.
pub fn parse_container_list(output: &str, name: &str) -> Option<ContainerState> {
    output.lines().find_map(|line| {
        let (names, state) = line.split_once('\t').unwrap_or((line, ""));
        names
            .split(',')
            .map(|n| n.trim().trim_start_matches('/'))
            .any(|n| n == name)
            .then(|| ContainerState {
                name: name.to_string(),
                running: state.trim().eq_ignore_ascii_case("running"),
            })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::{BuildOptions, StageKind};
    use std::path::PathBuf;

    fn request(options: BuildOptions) -> BuildRequest {
        BuildRequest {
            kind: StageKind::Main,
            target: "main".to_string(),
            image: "ghcr.io/stac-utils/stactools:latest".to_string(),
            dockerfile: PathBuf::from("/repo/docker/Dockerfile"),
            context: PathBuf::from("/repo"),
            options,
        }
    }

    #[test]
    fn build_args_without_flags() {
        assert_eq!(
            build_args(&request(BuildOptions::default())),
            vec![
                "build",
                "-f",
                "/repo/docker/Dockerfile",
                "--target",
                "main",
                "-t",
                "ghcr.io/stac-utils/stactools:latest",
                "/repo",
            ]
        );
    }

    #[test]
    fn build_args_with_both_flags() {
        let args = build_args(&request(BuildOptions {
            no_cache: true,
            pull: true,
        }));
        assert_eq!(&args[..3], &["build", "--pull", "--no-cache"]);
        assert_eq!(args.last().map(String::as_str), Some("/repo"));
    }

    #[test]
    fn list_args_filter_by_name() {
        let args = list_args("stactools-debug");
        assert!(args.contains(&"--all".to_string()));
        assert!(args.contains(&"name=stactools-debug".to_string()));
    }

    #[test]
    fn parse_finds_exact_running_container() {
        let output = "stactools-debug-old\texited\nstactools-debug\trunning\n";
        assert_eq!(
            parse_container_list(output, "stactools-debug"),
            Some(ContainerState {
                name: "stactools-debug".to_string(),
                running: true,
            })
        );
    }

    #[test]
    fn parse_finds_stopped_container() {
        let state = parse_container_list("stactools-debug\texited\n", "stactools-debug").unwrap();
        assert!(!state.running);
    }

    #[test]
    fn parse_ignores_substring_matches() {
        assert_eq!(
            parse_container_list("stactools-debug-2\trunning\n", "stactools-debug"),
            None
        );
    }

    #[test]
    fn parse_handles_empty_output() {
        assert_eq!(parse_container_list("", "stactools-debug"), None);
    }

    #[test]
    fn parse_handles_multiple_names() {
        let state = parse_container_list("other,/stactools-debug\tcreated\n", "stactools-debug");
        assert_eq!(state.map(|s| s.running), Some(false));
    }
}
