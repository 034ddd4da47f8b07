//! Error types for nxcat.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NxcatError {
    #[error("Document not found: {}", .0.display())]
    DocumentMissing(PathBuf),

    #[error("Malformed document {}: {reason}", path.display())]
    DocumentMalformed { path: PathBuf, reason: String },

    #[error("Inconsistent topology in pool {pool} at {vdev}: {detail}")]
    TopologyInconsistent {
        pool: String,
        vdev: String,
        detail: String,
    },

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl NxcatError {
    /// Stable short code used when reporting the failure.
    pub fn kind(&self) -> &'static str {
        match self {
            NxcatError::DocumentMissing(_) => "document_missing",
            NxcatError::DocumentMalformed { .. } => "document_malformed",
            NxcatError::TopologyInconsistent { .. } => "topology_inconsistent",
            NxcatError::Config(_) => "config",
            NxcatError::Io(_) => "io",
        }
    }
}

pub type Result<T> = std::result::Result<T, NxcatError>;
