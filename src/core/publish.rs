use serde::Serialize;

use crate::build::{self, BuildReport};
use crate::config::Workspace;
use crate::engine::ContainerEngine;
use crate::error::Result;
use crate::image::{BuildOptions, ImageCoordinates};

pub const EVENT_NAME_ENV: &str = "GITHUB_EVENT_NAME";
pub const REF_ENV: &str = "GITHUB_REF";

/// What triggered the run: event name (`push`, `pull_request`, ...) and git ref.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_ref: Option<String>,
}

impl EventContext {
    pub fn new(event_name: Option<String>, git_ref: Option<String>) -> Self {
        Self {
            event_name,
            git_ref,
        }
    }

    /// Explicit values win; missing ones are read from the CI environment.
    pub fn resolve(event_name: Option<String>, git_ref: Option<String>) -> Self {
        Self {
            event_name: event_name.or_else(|| non_empty_env(EVENT_NAME_ENV)),
            git_ref: git_ref.or_else(|| non_empty_env(REF_ENV)),
        }
    }

    /// Push gate: images are pushed only for push events on the default branch.
    pub fn gate(&self, default_branch: &str) -> PushGate {
        let branch_ref = format!("refs/heads/{}", default_branch);
        match (self.event_name.as_deref(), self.git_ref.as_deref()) {
            (Some("push"), Some(git_ref)) if git_ref == branch_ref => PushGate::Open,
            (Some("push"), Some(git_ref)) => PushGate::Closed {
                reason: format!("push to {} is not {}", git_ref, branch_ref),
            },
            (Some("push"), None) => PushGate::Closed {
                reason: "push event without a git ref".to_string(),
            },
            (Some(event), _) => PushGate::Closed {
                reason: format!("'{}' events never push", event),
            },
            (None, _) => PushGate::Closed {
                reason: "no triggering event".to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum PushGate {
    Open,
    Closed { reason: String },
}

impl PushGate {
    pub fn is_open(&self) -> bool {
        matches!(self, PushGate::Open)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishReport {
    pub event: EventContext,
    pub gate: PushGate,
    pub build: BuildReport,
    pub pushed: Vec<String>,
}

/// Build both images, then push main and dev (in that order) when the gate is open.
pub fn publish(
    engine: &dyn ContainerEngine,
    workspace: &Workspace,
    coords: &ImageCoordinates,
    options: BuildOptions,
    event: EventContext,
) -> Result<PublishReport> {
    let build = build::build_images(engine, workspace, coords, options)?;
    let gate = event.gate(&workspace.settings.default_branch);

    let mut pushed = Vec::new();
    match &gate {
        PushGate::Open => {
            for image in &build.images {
                log_status!("publish", "Pushing {}", image.image);
                engine.push(&image.image)?;
                pushed.push(image.image.clone());
            }
        }
        PushGate::Closed { reason } => {
            log_status!("publish", "Skipping push: {}", reason);
        }
    }

    Ok(PublishReport {
        event,
        gate,
        build,
        pushed,
    })
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
