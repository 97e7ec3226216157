//! CLI response formatting and output.
//!
//! Provides JSON envelope, printing, and exit code mapping.

use serde::Serialize;
use stacbuild::error::Hint;
use stacbuild::{Error, ErrorCode, Result};

#[derive(Debug, Serialize)]
pub struct CliResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<CliError>,
}

#[derive(Debug, Serialize)]
pub struct CliError {
    pub code: String,
    pub message: String,
    pub details: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hints: Option<Vec<Hint>>,
}

impl<T: Serialize> CliResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| {
            Error::internal_json(e.to_string(), Some("serialize response".to_string()))
        })
    }
}

impl CliResponse<()> {
    pub fn from_error(err: &Error) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(CliError {
                code: err.code.as_str().to_string(),
                message: err.message.clone(),
                details: err.details.clone(),
                hints: if err.hints.is_empty() {
                    None
                } else {
                    Some(err.hints.clone())
                },
            }),
        }
    }
}

fn print_response<T: Serialize>(response: &CliResponse<T>) -> Result<()> {
    use std::io::{self, Write};

    let payload = response.to_json()?;
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if let Err(e) = writeln!(handle, "{}", payload) {
        if e.kind() == io::ErrorKind::BrokenPipe {
            return Ok(()); // Exit gracefully on SIGPIPE
        }
        return Err(Error::internal_io(
            e.to_string(),
            Some("write stdout".to_string()),
        ));
    }
    Ok(())
}

pub fn print_success<T: Serialize>(data: T) -> Result<()> {
    print_response(&CliResponse::success(data))
}

pub fn print_json_result(result: Result<serde_json::Value>) -> Result<()> {
    match result {
        Ok(data) => print_success(data),
        Err(err) => print_response(&CliResponse::<()>::from_error(&err)),
    }
}

pub fn map_cmd_result_to_json<T: Serialize>(
    result: Result<(T, i32)>,
) -> (Result<serde_json::Value>, i32) {
    match result {
        Ok((data, exit_code)) => match serde_json::to_value(data) {
            Ok(value) => (Ok(value), exit_code),
            Err(err) => (
                Err(Error::internal_json(
                    err.to_string(),
                    Some("serialize response".to_string()),
                )),
                1,
            ),
        },
        Err(err) => {
            let exit_code = exit_code_for_error(&err);
            (Err(err), exit_code)
        }
    }
}

/// Engine failures exit with the engine's own status, like a `set -e` script.
pub fn exit_code_for_error(err: &Error) -> i32 {
    match err.code {
        ErrorCode::ConfigMissingKey
        | ErrorCode::ConfigInvalidJson
        | ErrorCode::ConfigInvalidValue
        | ErrorCode::ValidationMissingArgument
        | ErrorCode::ValidationInvalidArgument
        | ErrorCode::EnvMissingKey
        | ErrorCode::PipelineInvalid
        | ErrorCode::PipelineUnknownJob
        | ErrorCode::PipelineCycle => 2,

        ErrorCode::EnvFileNotFound => 4,

        ErrorCode::EngineNotFound => 127,

        ErrorCode::EngineCommandFailed => match err.engine_exit_code() {
            Some(code) if (1..=255).contains(&code) => code,
            _ => 1,
        },

        ErrorCode::InternalIoError
        | ErrorCode::InternalJsonError
        | ErrorCode::InternalUnexpected => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stacbuild::error::EngineCommandFailedDetails;

    fn engine_failure(exit_code: i32) -> Error {
        Error::engine_command_failed(EngineCommandFailedDetails {
            command: "docker build .".to_string(),
            exit_code,
            stderr: "no space left on device".to_string(),
        })
    }

    #[test]
    fn engine_failure_serializes_details() {
        let json = CliResponse::<()>::from_error(&engine_failure(1))
            .to_json()
            .unwrap();

        assert!(json.contains("\"code\": \"engine.command_failed\""));
        assert!(json.contains("\"exitCode\": 1"));
        assert!(json.contains("no space left on device"));
        assert!(json.contains("\"success\": false"));
    }

    #[test]
    fn engine_failure_exits_with_engine_code() {
        let (_value, exit_code) = map_cmd_result_to_json::<serde_json::Value>(Err(engine_failure(17)));
        assert_eq!(exit_code, 17);
    }

    #[test]
    fn engine_failure_out_of_range_exits_one() {
        assert_eq!(exit_code_for_error(&engine_failure(-1)), 1);
        assert_eq!(exit_code_for_error(&engine_failure(300)), 1);
    }

    #[test]
    fn validation_errors_exit_two() {
        let err = Error::validation_invalid_argument("outcome", "bad", None);
        assert_eq!(exit_code_for_error(&err), 2);
    }

    #[test]
    fn hints_are_omitted_when_empty() {
        let json = CliResponse::<()>::from_error(&Error::internal_unexpected("x"))
            .to_json()
            .unwrap();
        assert!(!json.contains("hints"));
    }

    #[test]
    fn success_wraps_data() {
        let (value, exit_code) = map_cmd_result_to_json(Ok((serde_json::json!({"a": 1}), 0)));
        assert_eq!(exit_code, 0);
        let json = CliResponse::success(value.unwrap()).to_json().unwrap();
        assert!(json.contains("\"success\": true"));
        assert!(json.contains("\"a\": 1"));
    }
}
