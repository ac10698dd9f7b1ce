//! Error types for loading schemas, settings and records.

use std::io;
use std::path::{Path, PathBuf};

/// Errors in the files the CLI reads, as opposed to errors in the locator.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A file could not be read.
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Invalid YAML in a schema, settings or records file.
    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Invalid JSON in a records file.
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A records file whose extension is neither JSON nor YAML.
    #[error("Unsupported records format '{0}'; expected .json, .yaml or .yml")]
    UnsupportedFormat(String),

    /// The schema is well-formed YAML but not a usable schema.
    #[error("Invalid schema: {0}")]
    Schema(String),
}

impl ConfigError {
    pub fn read(path: &Path, source: io::Error) -> Self {
        Self::Read {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn schema(msg: impl Into<String>) -> Self {
        Self::Schema(msg.into())
    }
}

pub(crate) fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|e| ConfigError::read(path, e))
}
