//! Process execution primitives with consistent error handling.
//!
//! Programs run directly (no `sh -c`), so arguments never need quoting.

use serde::Serialize;
use std::process::{Command, Output, Stdio};

use crate::error::{EngineCommandFailedDetails, Error, Result};
use crate::utils::shell;

/// Captured output from command execution.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CapturedOutput {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub stdout: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub stderr: String,
}

impl CapturedOutput {
    pub fn new(stdout: String, stderr: String) -> Self {
        Self { stdout, stderr }
    }
}

/// Echo a command line to stderr when command echoing is on (`set -x` style).
pub fn echo(program: &str, args: &[String]) {
    if crate::log::echo_commands() {
        eprintln!("+ {}", shell::command_line(program, args));
    }
}

/// Run a command, capturing its output.
///
/// Fails with `engine.not_found` when the program cannot be started and with
/// `engine.command_failed` when it exits non-zero.
pub fn run_captured(program: &str, args: &[String]) -> Result<CapturedOutput> {
    echo(program, args);

    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| Error::engine_not_found(program, e.to_string()))?;

    if !output.status.success() {
        return Err(Error::engine_command_failed(EngineCommandFailedDetails {
            command: shell::command_line(program, args),
            exit_code: output.status.code().unwrap_or(-1),
            stderr: error_text(&output),
        }));
    }

    Ok(CapturedOutput::new(
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
    ))
}

/// Run a command with stdout/stderr passed through to the terminal.
pub fn run_passthrough(program: &str, args: &[String]) -> Result<()> {
    echo(program, args);

    let status = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .map_err(|e| Error::engine_not_found(program, e.to_string()))?;

    if !status.success() {
        return Err(Error::engine_command_failed(EngineCommandFailedDetails {
            command: shell::command_line(program, args),
            exit_code: status.code().unwrap_or(-1),
            stderr: String::new(),
        }));
    }

    Ok(())
}

/// Extract error text from command output.
///
/// Prefers stderr, falls back to stdout if stderr is empty.
pub fn error_text(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.trim().is_empty() {
        stderr.trim().to_string()
    } else {
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }
}
