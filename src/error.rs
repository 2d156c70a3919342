//! Error types for geometry generation.
//!
//! Every fallible operation in the library returns [`GeometryError`]. Errors
//! are raised where they are detected and propagated with `?` up to the build
//! call; no layer catches them to continue with a partial result.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading metadata or composing the geometry.
#[derive(Debug, Error)]
pub enum GeometryError {
    /// Malformed or inconsistent configuration or metadata.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Two volumes resolved to the same name.
    #[error("Naming conflict: {kind} name '{name}' is already assigned")]
    NamingConflict { kind: &'static str, name: String },

    /// A request the generator refuses to perform.
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// A volume could not be built or placed.
    #[error("Geometry construction failed: {0}")]
    Construction(String),

    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed JSON document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed YAML document: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl GeometryError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn construction(msg: impl Into<String>) -> Self {
        Self::Construction(msg.into())
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::UnsupportedOperation(msg.into())
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, GeometryError>;
