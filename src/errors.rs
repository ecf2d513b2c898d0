use std::path::PathBuf;

use thiserror::Error;

use crate::key::KeyError;

#[derive(Error, Debug)]
pub enum JwkMintError {
    #[error("key error: {0}")]
    KeyError(#[from] KeyError),

    #[error("file already exists: {path}")]
    FileExists { path: PathBuf },

    #[error("failed to access file: {path}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid manifest {path}: {reason}")]
    InvalidManifest { path: PathBuf, reason: String },

    #[error("no claims provided {source_name}")]
    EmptyClaims { source_name: &'static str },
}
