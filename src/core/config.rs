use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::cache::CacheSpec;
use crate::error::{Error, Result};
use crate::utils::io;

pub const CONFIG_FILE_NAME: &str = "stacbuild.json";

/// Settings for a repository, read from `stacbuild.json` at the repository root.
///
/// Every field has a default, so a missing file behaves like `{}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildSettings {
    /// Container engine binary.
    #[serde(default = "default_engine")]
    pub engine: String,

    /// Build file, relative to the repository root.
    #[serde(default = "default_dockerfile")]
    pub dockerfile: String,

    /// Build context, relative to the repository root.
    #[serde(default = "default_context")]
    pub context: String,

    /// Sourced variable file supplying the image coordinates.
    #[serde(default = "default_env_file")]
    pub env_file: String,

    #[serde(default = "default_main_stage")]
    pub main_stage: String,

    #[serde(default = "default_dev_stage")]
    pub dev_stage: String,

    /// Branch whose push events publish images.
    #[serde(default = "default_branch")]
    pub default_branch: String,

    #[serde(default = "default_caches")]
    pub caches: Vec<CacheSpec>,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            engine: default_engine(),
            dockerfile: default_dockerfile(),
            context: default_context(),
            env_file: default_env_file(),
            main_stage: default_main_stage(),
            dev_stage: default_dev_stage(),
            default_branch: default_branch(),
            caches: default_caches(),
        }
    }
}

// =============================================================================
// Default value functions
// =============================================================================

fn default_engine() -> String {
    "docker".to_string()
}

fn default_dockerfile() -> String {
    "docker/Dockerfile".to_string()
}

fn default_context() -> String {
    ".".to_string()
}

fn default_env_file() -> String {
    "docker/env".to_string()
}

fn default_main_stage() -> String {
    "main".to_string()
}

fn default_dev_stage() -> String {
    "dev".to_string()
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_caches() -> Vec<CacheSpec> {
    vec![
        CacheSpec {
            name: "pip".to_string(),
            key_files: vec!["setup.cfg".to_string(), "requirements*.txt".to_string()],
        },
        CacheSpec {
            name: "conda".to_string(),
            key_files: vec!["environment.yml".to_string()],
        },
        CacheSpec {
            name: "pre-commit".to_string(),
            key_files: vec![".pre-commit-config.yaml".to_string()],
        },
    ]
}

// =============================================================================
// Loading
// =============================================================================

/// Repository root plus the settings that apply to it.
#[derive(Debug, Clone)]
pub struct Workspace {
    pub root: PathBuf,
    pub settings: BuildSettings,
}

impl Workspace {
    /// Load settings for `root`. An explicit `config_path` must exist; the
    /// default `stacbuild.json` is optional.
    pub fn load(root: &Path, config_path: Option<&Path>) -> Result<Self> {
        let settings = match config_path {
            Some(path) => {
                let path = resolve(root, path);
                if !path.exists() {
                    return Err(Error::config_missing_key(
                        "config",
                        Some(path.to_string_lossy().to_string()),
                    )
                    .with_hint("Check the --config path"));
                }
                load_settings(&path)?
            }
            None => {
                let path = root.join(CONFIG_FILE_NAME);
                if path.exists() {
                    load_settings(&path)?
                } else {
                    BuildSettings::default()
                }
            }
        };

        validate(&settings)?;

        Ok(Self {
            root: root.to_path_buf(),
            settings,
        })
    }

    pub fn dockerfile(&self) -> PathBuf {
        self.root.join(&self.settings.dockerfile)
    }

    pub fn context(&self) -> PathBuf {
        self.root.join(&self.settings.context)
    }

    pub fn env_file(&self) -> PathBuf {
        self.root.join(&self.settings.env_file)
    }
}

pub fn load_settings(path: &Path) -> Result<BuildSettings> {
    let content = io::read_file(path, &format!("read {}", path.display()))?;
    serde_json::from_str(&content)
        .map_err(|e| Error::config_invalid_json(path.to_string_lossy().to_string(), e))
}

fn validate(settings: &BuildSettings) -> Result<()> {
    let required = [
        ("engine", &settings.engine),
        ("dockerfile", &settings.dockerfile),
        ("main_stage", &settings.main_stage),
        ("dev_stage", &settings.dev_stage),
        ("default_branch", &settings.default_branch),
    ];
    for (key, value) in required {
        if value.trim().is_empty() {
            return Err(Error::config_invalid_value(
                key,
                Some(value.clone()),
                "must not be empty",
            ));
        }
    }
    if settings.main_stage == settings.dev_stage {
        return Err(Error::config_invalid_value(
            "dev_stage",
            Some(settings.dev_stage.clone()),
            "must differ from main_stage",
        ));
    }
    Ok(())
}

fn resolve(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}
