mod config;
mod link;
mod registry;

pub use config::{AbilityConfig, ContentFileConfig};
pub use registry::ContentRegistry;

use std::path::PathBuf;
use thiserror::Error;

/// Error loading ability/effect content files
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading '{path:?}': {error}")]
    Io {
        error: std::io::Error,
        path: Option<PathBuf>,
    },
    #[error("Parse error in '{path}': {error}")]
    Parse {
        error: toml::de::Error,
        path: PathBuf,
    },
    #[error("Validation error in '{path}': {message}")]
    Validation { message: String, path: PathBuf },
}

/// Error resolving content once it has been loaded
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("Unknown ability: {0}")]
    UnknownAbility(String),
    #[error("Ability '{ability}' applies unknown effect '{effect}'")]
    UnknownEffect { ability: String, effect: String },
    #[error("Duplicate id: {0}")]
    DuplicateId(String),
    #[error("Invalid definition '{id}': {message}")]
    Invalid { id: String, message: String },
}
