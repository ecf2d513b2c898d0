use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::Deserialize;

use crate::errors::JwkMintError;

pub mod jwk;
pub mod jwks;
pub mod sign;
pub mod verify;

/// RSA algorithm a caller may declare for a key
#[derive(ValueEnum, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RsaAlgorithm {
    #[default]
    #[value(name = "RS256")]
    RS256,
    #[value(name = "RS384")]
    RS384,
    #[value(name = "RS512")]
    RS512,
}

impl RsaAlgorithm {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::RS256 => "RS256",
            Self::RS384 => "RS384",
            Self::RS512 => "RS512",
        }
    }
}

/// Intended use of a public key (`use` member of a JWK)
#[derive(ValueEnum, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum KeyUse {
    /// Signature verification
    #[default]
    #[value(name = "sig")]
    Sig,
    /// Encryption
    #[value(name = "enc")]
    Enc,
}

impl KeyUse {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Sig => "sig",
            Self::Enc => "enc",
        }
    }
}

/// Write response content to file
/// Validates that the file doesn't exist to prevent accidental overwrites
pub fn write_response_to_file(path: &Path, content: &str) -> Result<(), JwkMintError> {
    if path.exists() {
        return Err(JwkMintError::FileExists {
            path: path.to_path_buf(),
        });
    }

    std::fs::write(path, content).map_err(|e| JwkMintError::IoError {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Show output to stdout or save to file
/// If output_path is Some, writes to file silently. Otherwise writes to stdout.
pub fn show_output_or_save(output_path: Option<&PathBuf>, content: &str) -> color_eyre::Result<()> {
    if let Some(path) = output_path {
        write_response_to_file(path, content)?;
    } else {
        writeln!(io::stdout(), "{content}").map_err(|e| JwkMintError::IoError {
            path: PathBuf::from("<stdout>"),
            source: e,
        })?;
    }

    Ok(())
}

/// Read text from `path`, or from stdin when no path is given
pub fn read_input(path: Option<&PathBuf>) -> Result<String, JwkMintError> {
    match path {
        Some(path) => std::fs::read_to_string(path).map_err(|e| JwkMintError::IoError {
            path: path.clone(),
            source: e,
        }),
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .map_err(|e| JwkMintError::IoError {
                    path: PathBuf::from("<stdin>"),
                    source: e,
                })?;
            Ok(buffer)
        }
    }
}
