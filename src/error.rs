//! Common error types for the catalog core

use std::path::PathBuf;
use thiserror::Error;

/// Common result type for catalog operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types shared across the catalog core
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed XML in a directly referenced document
    #[error("XML parse error in {path}: {source}")]
    Xml {
        path: String,
        #[source]
        source: crate::xml::ParseError,
    },

    /// Requested file or directory does not exist
    #[error("Not found: {0}")]
    NotFound(PathBuf),

    /// Path exists but is not a directory
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Merge cannot proceed (e.g. the base document has no bank container)
    #[error("Merge error: {0}")]
    Merge(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Wrap an XML parse failure with the path of the offending document.
    pub fn xml(path: &std::path::Path, source: crate::xml::ParseError) -> Self {
        Error::Xml {
            path: path.display().to_string(),
            source,
        }
    }
}
