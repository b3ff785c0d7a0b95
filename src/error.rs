// src/error.rs

//! Error types for module loading, composition and installation

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the mcconf library
#[derive(Debug, Error)]
pub enum Error {
    /// A requested or hard-included module is not in the catalog
    #[error("Didn't find module {0}")]
    NotFound(String),

    /// A module provides tags that previously selected modules already provide
    #[error("requested module {module} conflicts with previously selected modules [{}] on tags [{}]", .providers.join(", "), .tags.join(", "))]
    Conflict {
        module: String,
        tags: Vec<String>,
        providers: Vec<String>,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid module file {}: {message}", .path.display())]
    InvalidModule { path: PathBuf, message: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid file pattern: {0}")]
    InvalidPattern(String),

    #[error("Invalid destination path: {0}")]
    InvalidPath(String),

    #[error("Template error: {0}")]
    Template(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether this error aborts a composition run (as opposed to I/O or parse failures)
    pub fn is_fatal_composition(&self) -> bool {
        matches!(self, Error::NotFound(_) | Error::Conflict { .. })
    }
}

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, Error>;
