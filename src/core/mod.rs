// Public modules
pub mod args;
pub mod build;
pub mod cache;
pub mod cleanup;
pub mod config;
pub mod engine;
pub mod env_file;
pub mod error;
pub mod image;
pub mod log;
pub mod pipeline;
pub mod publish;

// Re-export common types for convenience
pub use config::{BuildSettings, Workspace};
pub use engine::{ContainerEngine, ContainerState, DockerCli};
pub use error::{Error, ErrorCode, Result};
pub use image::{BuildOptions, BuildRequest, ImageCoordinates, StageKind};
