use clap::{Args, Subcommand};
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;

use stacbuild::pipeline::{Conclusion, Outcome, Plan, Workflow};

use crate::commands::CmdResult;

#[derive(Args)]
pub struct PipelineArgs {
    #[command(subcommand)]
    command: PipelineCommand,
}

#[derive(Subcommand)]
enum PipelineCommand {
    /// Expand matrices and order jobs into stages
    Plan {
        /// Workflow file
        workflow: PathBuf,
    },
    /// Conclude a run from reported job outcomes
    Conclude {
        /// Workflow file
        workflow: PathBuf,

        /// Reported outcome, as JOB=success|failure (job id or instance name)
        #[arg(long = "outcome", value_name = "JOB=STATUS")]
        outcomes: Vec<String>,
    },
}

#[derive(Serialize)]
#[serde(untagged)]
pub enum PipelineOutput {
    Plan(Plan),
    Conclusion(Conclusion),
}

pub fn run(args: PipelineArgs) -> CmdResult<PipelineOutput> {
    match args.command {
        PipelineCommand::Plan { workflow } => {
            let plan = Workflow::load(&workflow)?.plan()?;
            Ok((PipelineOutput::Plan(plan), 0))
        }
        PipelineCommand::Conclude { workflow, outcomes } => {
            let plan = Workflow::load(&workflow)?.plan()?;
            let outcomes = parse_outcomes(&outcomes)?;
            let conclusion = plan.conclude(&outcomes)?;
            let exit_code = if conclusion.success { 0 } else { 1 };
            Ok((PipelineOutput::Conclusion(conclusion), exit_code))
        }
    }
}

fn parse_outcomes(raw: &[String]) -> stacbuild::Result<HashMap<String, Outcome>> {
    raw.iter()
        .map(|entry| -> stacbuild::Result<(String, Outcome)> {
            let (job, status) = entry.rsplit_once('=').ok_or_else(|| {
                stacbuild::Error::validation_invalid_argument(
                    "outcome",
                    "expected JOB=success|failure",
                    Some(entry.clone()),
                )
            })?;
            let outcome: Outcome = status.parse()?;
            Ok((job.trim().to_string(), outcome))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_outcomes_accepts_instance_names() {
        let parsed =
            parse_outcomes(&["test (3.10)=failure".to_string(), "lint=success".to_string()])
                .unwrap();
        assert_eq!(parsed["test (3.10)"], Outcome::Failure);
        assert_eq!(parsed["lint"], Outcome::Success);
    }

    #[test]
    fn parse_outcomes_rejects_missing_separator() {
        let err = parse_outcomes(&["lint".to_string()]).unwrap_err();
        assert_eq!(err.code.as_str(), "validation.invalid_argument");
    }
}
