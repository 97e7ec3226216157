use chrono::Utc;
use serde::Serialize;

use crate::config::Workspace;
use crate::engine::ContainerEngine;
use crate::error::Result;
use crate::image::{BuildOptions, BuildRequest, ImageCoordinates, StageKind};

/// One finished image build.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuiltImage {
    pub stage: StageKind,
    pub target: String,
    pub image: String,
    pub started_at: String,
    pub duration_ms: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildReport {
    pub options: BuildOptions,
    pub images: Vec<BuiltImage>,
}

/// The two build requests, main first, then dev.
pub fn plan_builds(
    workspace: &Workspace,
    coords: &ImageCoordinates,
    options: BuildOptions,
) -> Vec<BuildRequest> {
    let settings = &workspace.settings;
    [
        (StageKind::Main, &settings.main_stage),
        (StageKind::Dev, &settings.dev_stage),
    ]
    .into_iter()
    .map(|(kind, target)| BuildRequest {
        kind,
        target: target.clone(),
        image: coords.image_for(kind),
        dockerfile: workspace.dockerfile(),
        context: workspace.context(),
        options,
    })
    .collect()
}

/// Build the main and dev images in order.
///
/// The first failure is returned immediately; later builds are not attempted.
pub fn build_images(
    engine: &dyn ContainerEngine,
    workspace: &Workspace,
    coords: &ImageCoordinates,
    options: BuildOptions,
) -> Result<BuildReport> {
    let mut images = Vec::new();

    for request in plan_builds(workspace, coords, options) {
        log_status!(
            "build",
            "Building stage '{}' as {}",
            request.target,
            request.image
        );

        let started = Utc::now();
        engine.build(&request)?;
        let finished = Utc::now();

        images.push(BuiltImage {
            stage: request.kind,
            target: request.target,
            image: request.image,
            started_at: started.to_rfc3339(),
            duration_ms: (finished - started).num_milliseconds(),
        });
    }

    Ok(BuildReport { options, images })
}
