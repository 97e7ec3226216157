use regex::Regex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use crate::env_file::{self, EnvVars};
use crate::error::{Error, Result};

pub const DOCKER_REGISTRY: &str = "DOCKER_REGISTRY";
pub const DOCKER_ORG: &str = "DOCKER_ORG";
pub const DOCKER_REPO: &str = "DOCKER_REPO";
pub const DOCKER_TAG: &str = "DOCKER_TAG";
pub const DOCKER_TAG_DEV: &str = "DOCKER_TAG_DEV";
pub const DOCKER_DEBUG_CONTAINER_NAME: &str = "DOCKER_DEBUG_CONTAINER_NAME";

static COMPONENT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]+(?:(?:[._]|__|-+)[a-z0-9]+)*$").expect("valid repository pattern")
});

static TAG_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9_.-]{0,127}$").expect("valid tag pattern")
});

static CONTAINER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.-]*$").expect("valid container name pattern")
});

/// Where the two images go and which leftover container to clean up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageCoordinates {
    /// May be empty, in which case tags carry no registry segment.
    pub registry: String,
    pub org: String,
    pub repo: String,
    pub tag: String,
    pub dev_tag: String,
    pub debug_container_name: String,
}

impl ImageCoordinates {
    /// Load coordinates from the env file.
    ///
    /// The file is treated as sourced: its assignments win over exported
    /// variables of the same name, and the process environment only fills
    /// references the file does not define itself.
    pub fn load(env_path: &Path) -> Result<Self> {
        let vars = env_file::load(env_path)?;
        Self::from_vars(&vars, Some(env_path))
    }

    pub fn from_vars(vars: &EnvVars, source: Option<&Path>) -> Result<Self> {
        let source = source.map(|p| p.to_string_lossy().to_string());
        let get = |key: &str, allow_empty: bool| -> Result<String> {
            match vars.get(key) {
                Some(value) if allow_empty || !value.trim().is_empty() => {
                    Ok(value.trim().to_string())
                }
                _ => Err(Error::env_missing_key(key, source.clone())),
            }
        };

        let coords = Self {
            registry: get(DOCKER_REGISTRY, true)?,
            org: get(DOCKER_ORG, false)?,
            repo: get(DOCKER_REPO, false)?,
            tag: get(DOCKER_TAG, false)?,
            dev_tag: get(DOCKER_TAG_DEV, false)?,
            debug_container_name: get(DOCKER_DEBUG_CONTAINER_NAME, false)?,
        };
        coords.validate()?;
        Ok(coords)
    }

    /// Repository reference without a tag: `registry/org/repo` or `org/repo`.
    pub fn repository(&self) -> String {
        let registry = self.registry.trim_end_matches('/');
        if registry.is_empty() {
            format!("{}/{}", self.org, self.repo)
        } else {
            format!("{}/{}/{}", registry, self.org, self.repo)
        }
    }

    pub fn main_image(&self) -> String {
        format!("{}:{}", self.repository(), self.tag)
    }

    pub fn dev_image(&self) -> String {
        format!("{}:{}", self.repository(), self.dev_tag)
    }

    pub fn image_for(&self, stage: StageKind) -> String {
        match stage {
            StageKind::Main => self.main_image(),
            StageKind::Dev => self.dev_image(),
        }
    }

    fn validate(&self) -> Result<()> {
        for (key, value) in [(DOCKER_ORG, &self.org), (DOCKER_REPO, &self.repo)] {
            if value.split('/').any(|part| !COMPONENT_PATTERN.is_match(part)) {
                return Err(Error::config_invalid_value(
                    key,
                    Some(value.clone()),
                    "must be lowercase letters, digits and separators",
                ));
            }
        }
        for (key, value) in [(DOCKER_TAG, &self.tag), (DOCKER_TAG_DEV, &self.dev_tag)] {
            if !TAG_PATTERN.is_match(value) {
                return Err(Error::config_invalid_value(
                    key,
                    Some(value.clone()),
                    "is not a valid image tag",
                ));
            }
        }
        if !CONTAINER_PATTERN.is_match(&self.debug_container_name) {
            return Err(Error::config_invalid_value(
                DOCKER_DEBUG_CONTAINER_NAME,
                Some(self.debug_container_name.clone()),
                "is not a valid container name",
            ));
        }
        Ok(())
    }
}

/// Which of the two images a build produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StageKind {
    Main,
    Dev,
}

/// Flags forwarded to both build invocations. They accumulate; neither
/// excludes the other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildOptions {
    pub no_cache: bool,
    pub pull: bool,
}

/// One image build as handed to a container engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildRequest {
    pub kind: StageKind,
    /// Build stage name inside the build file.
    pub target: String,
    pub image: String,
    pub dockerfile: PathBuf,
    pub context: PathBuf,
    pub options: BuildOptions,
}
