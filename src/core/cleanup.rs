//! Removal of the leftover debug container.
//!
//! Absence is not an error: the lookup is the only engine call in that case.

use serde::Serialize;

use crate::engine::ContainerEngine;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum CleanupOutcome {
    NotFound { name: String },
    Removed { name: String, was_running: bool },
}

/// Kill the container if it is running, then remove it if it existed at all.
pub fn cleanup_debug_container(engine: &dyn ContainerEngine, name: &str) -> Result<CleanupOutcome> {
    let Some(state) = engine.find_container(name)? else {
        log_debug!("cleanup", "No container named {}", name);
        return Ok(CleanupOutcome::NotFound {
            name: name.to_string(),
        });
    };

    if state.running {
        log_status!("cleanup", "Killing running container {}", name);
        engine.kill(name)?;
    }

    match engine.remove(name) {
        Ok(()) => log_status!("cleanup", "Removed container {}", name),
        // Containers started with --rm disappear once killed.
        Err(err) if state.running && engine.find_container(name)?.is_none() => {
            log_debug!("cleanup", "{} was removed by the kill: {}", name, err);
        }
        Err(err) => return Err(err),
    }

    Ok(CleanupOutcome::Removed {
        name: name.to_string(),
        was_running: state.running,
    })
}
