use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum CatalogError {
    #[error("storage root unreachable: {0}")]
    StorageUnreachable(String),

    #[error("invalid storage root: {0}")]
    InvalidStorageRoot(String),

    #[error("invalid filename pattern: {0}")]
    InvalidPattern(String),

    #[error("cannot parse dataset name {name}: expected {expected} segments, found {found}")]
    FilenameParse {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("cannot parse dataset name {name}: segment {position} is empty")]
    EmptyNameSegment { name: String, position: usize },

    #[error("failed to read dataset {name}: {message}")]
    ContentRead { name: String, message: String },

    #[error("{command} exited with {status}: {stderr}")]
    ExternalTool {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("required tool not found: {0}")]
    MissingTool(String),

    #[error("failed to write manifest {path}: {message}")]
    ManifestWrite { path: PathBuf, message: String },

    #[error("failed to read manifest {path}: {message}")]
    ManifestRead { path: PathBuf, message: String },

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("invalid config value: {0}")]
    InvalidConfig(String),
}
