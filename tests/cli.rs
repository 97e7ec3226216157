use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde_json::Value;

const COORDINATE_KEYS: &[&str] = &[
    "DOCKER_REGISTRY",
    "DOCKER_ORG",
    "DOCKER_REPO",
    "DOCKER_TAG",
    "DOCKER_TAG_DEV",
    "DOCKER_DEBUG_CONTAINER_NAME",
    "STACTOOLS_DEBUG",
];

const ENV_FILE: &str = "\
DOCKER_REGISTRY=ghcr.io
DOCKER_ORG=stac-utils
DOCKER_REPO=stactools
DOCKER_TAG=latest
DOCKER_TAG_DEV=\"${DOCKER_TAG}-dev\"
DOCKER_DEBUG_CONTAINER_NAME=stactools-debug
";

fn stacbuild(root: &Path, args: &[&str]) -> Output {
    stacbuild_with_env(root, args, &[])
}

fn stacbuild_with_env(root: &Path, args: &[&str], env: &[(&str, &str)]) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_stacbuild"));
    cmd.arg("-C").arg(root).args(args);
    for key in COORDINATE_KEYS {
        cmd.env_remove(key);
    }
    cmd.envs(env.iter().copied());
    cmd.output().unwrap()
}

fn envelope(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).unwrap()
}

/// Repository with an env file and settings pointing at `engine`.
fn repo(engine: &str) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("docker")).unwrap();
    fs::write(dir.path().join("docker/env"), ENV_FILE).unwrap();
    fs::write(
        dir.path().join("stacbuild.json"),
        serde_json::json!({ "engine": engine }).to_string(),
    )
    .unwrap();
    dir
}

/// Shell script standing in for the engine. Every invocation is appended to
/// `calls.log`; `ps` reports the debug container in `container_state`.
#[cfg(unix)]
fn fake_engine(dir: &Path, container_state: Option<&str>) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let log = dir.join("calls.log");
    let ps_output = match container_state {
        Some(state) => format!("printf 'stactools-debug\\t{}\\n'", state),
        None => "true".to_string(),
    };
    let script = format!(
        "#!/bin/sh\necho \"$*\" >> '{}'\ncase \"$1\" in\n  ps) {} ;;\nesac\nexit 0\n",
        log.display(),
        ps_output
    );
    let path = dir.join("fake-docker");
    fs::write(&path, script).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

#[cfg(unix)]
fn calls(dir: &Path) -> Vec<String> {
    fs::read_to_string(dir.join("calls.log"))
        .unwrap_or_default()
        .lines()
        .map(String::from)
        .collect()
}

#[test]
fn help_prints_usage_without_touching_the_repository() {
    let dir = tempfile::tempdir().unwrap();
    let output = stacbuild(dir.path(), &["build", "--pull", "--help"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("--no-cache"));
    assert!(stdout.contains("--pull"));
}

#[test]
fn missing_env_file_exits_four() {
    let dir = tempfile::tempdir().unwrap();
    let output = stacbuild(dir.path(), &["build"]);

    assert_eq!(output.status.code(), Some(4));
    let json = envelope(&output);
    assert_eq!(json["success"], false);
    assert_eq!(json["error"]["code"], "env.file_not_found");
}

#[test]
fn missing_engine_exits_127() {
    let dir = repo("nonexistent-engine-xyz");
    let output = stacbuild(dir.path(), &["build"]);

    assert_eq!(output.status.code(), Some(127));
    assert_eq!(envelope(&output)["error"]["code"], "engine.not_found");
}

#[cfg(unix)]
#[test]
fn build_runs_both_stages_then_removes_running_container() {
    let dir = tempfile::tempdir().unwrap();
    let engine = fake_engine(dir.path(), Some("running"));
    let repo = repo(&engine.to_string_lossy());

    let output = stacbuild(repo.path(), &["build", "--bogus", "--no-cache"]);
    assert!(output.status.success(), "{:?}", output);

    let calls = calls(dir.path());
    assert_eq!(calls.len(), 5, "{:?}", calls);
    assert!(calls[0].starts_with("build --no-cache -f "));
    assert!(calls[0].contains("--target main -t ghcr.io/stac-utils/stactools:latest "));
    assert!(calls[1].contains("--target dev -t ghcr.io/stac-utils/stactools:latest-dev "));
    assert!(!calls[0].contains("--pull"));
    assert!(!calls.iter().any(|c| c.contains("--bogus")));
    assert!(calls[2].starts_with("ps --all --filter name=stactools-debug"));
    assert_eq!(calls[3], "kill stactools-debug");
    assert_eq!(calls[4], "rm stactools-debug");

    let json = envelope(&output);
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["images"].as_array().map(Vec::len), Some(2));
    assert_eq!(json["data"]["cleanup"]["status"], "removed");
    assert_eq!(json["data"]["ignoredArgs"][0], "--bogus");
}

#[cfg(unix)]
#[test]
fn build_without_container_skips_kill_and_rm() {
    let dir = tempfile::tempdir().unwrap();
    let engine = fake_engine(dir.path(), None);
    let repo = repo(&engine.to_string_lossy());

    let output = stacbuild(repo.path(), &["build"]);
    assert!(output.status.success(), "{:?}", output);

    let calls = calls(dir.path());
    assert_eq!(calls.len(), 3, "{:?}", calls);
    assert!(calls[2].starts_with("ps "));
    assert_eq!(envelope(&output)["data"]["cleanup"]["status"], "notFound");
}

#[cfg(unix)]
#[test]
fn failing_engine_exit_code_is_propagated() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let engine = dir.path().join("broken-docker");
    fs::write(&engine, "#!/bin/sh\nexit 3\n").unwrap();
    fs::set_permissions(&engine, fs::Permissions::from_mode(0o755)).unwrap();
    let repo = repo(&engine.to_string_lossy());

    let output = stacbuild(repo.path(), &["build"]);
    assert_eq!(output.status.code(), Some(3));
    assert_eq!(envelope(&output)["error"]["code"], "engine.command_failed");
}

#[cfg(unix)]
#[test]
fn env_file_assignments_win_over_exported_values() {
    let dir = tempfile::tempdir().unwrap();
    let engine = fake_engine(dir.path(), None);
    let repo = repo(&engine.to_string_lossy());

    let output = stacbuild_with_env(repo.path(), &["build"], &[("DOCKER_TAG", "leaked")]);
    assert!(output.status.success(), "{:?}", output);

    let calls = calls(dir.path());
    assert!(calls[0].contains("-t ghcr.io/stac-utils/stactools:latest "));
    assert!(calls[1].contains("-t ghcr.io/stac-utils/stactools:latest-dev "));
    assert!(!calls.iter().any(|c| c.contains("leaked")));
}

#[cfg(unix)]
#[test]
fn debug_env_echoes_engine_commands() {
    let dir = tempfile::tempdir().unwrap();
    let engine = fake_engine(dir.path(), None);
    let repo = repo(&engine.to_string_lossy());

    for args in [vec!["build", "--pull"], vec!["-q", "build", "--pull"]] {
        let output = stacbuild_with_env(repo.path(), &args, &[("STACTOOLS_DEBUG", "1")]);
        assert!(output.status.success(), "{:?}", output);

        let stderr = String::from_utf8_lossy(&output.stderr);
        let echoed: Vec<&str> = stderr.lines().filter(|l| l.starts_with("+ ")).collect();
        assert!(
            echoed
                .iter()
                .any(|l| l.contains(" build --pull -f ") && l.contains("--target main")),
            "{}",
            stderr
        );
        assert!(echoed.iter().any(|l| l.contains("--target dev")), "{}", stderr);
        assert!(echoed.iter().any(|l| l.contains(" ps --all ")), "{}", stderr);
    }
}

#[cfg(unix)]
#[test]
fn no_echo_without_debug_env() {
    let dir = tempfile::tempdir().unwrap();
    let engine = fake_engine(dir.path(), None);
    let repo = repo(&engine.to_string_lossy());

    let output = stacbuild(repo.path(), &["build"]);
    assert!(output.status.success(), "{:?}", output);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!stderr.lines().any(|l| l.starts_with("+ ")), "{}", stderr);
}
