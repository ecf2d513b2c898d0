use std::path::{Path, PathBuf};

use clap::Args;
use serde::Deserialize;
use tracing::debug;

use super::{show_output_or_save, KeyUse, RsaAlgorithm};
use crate::{errors::JwkMintError, jwk::JwkDocument, parse_public_key, KeyMaterial, KeyParams};

#[derive(Args)]
pub struct ArgsJwks {
    /// JSON manifest listing the keys of the set
    #[arg(short, long, value_name = "FILE")]
    pub manifest: PathBuf,

    /// Print the standard base64 encoding of the JSON instead
    #[arg(long)]
    pub base64: bool,

    /// Write output to file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

/// One key of a JWK set manifest.
///
/// Exactly one of `public_key_file` (relative to the manifest) and
/// `public_key` (inline PEM) must be given.
#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct ManifestEntry {
    #[serde(default)]
    pub public_key_file: Option<PathBuf>,
    #[serde(default)]
    pub public_key: Option<String>,
    #[serde(default)]
    pub kid: String,
    #[serde(default)]
    pub alg: RsaAlgorithm,
    #[serde(default, rename = "use")]
    pub key_use: KeyUse,
}

impl ManifestEntry {
    fn params(&self) -> KeyParams {
        KeyParams::new()
            .with_alg(self.alg.as_str())
            .with_kid(&self.kid)
            .with_use(self.key_use.as_str())
    }

    fn load_key(&self, base_dir: &Path, manifest: &Path) -> Result<KeyMaterial, JwkMintError> {
        match (&self.public_key_file, &self.public_key) {
            (Some(file), None) => Ok(KeyMaterial::from_public_pem_file(&base_dir.join(file))?),
            (None, Some(pem)) => Ok(parse_public_key(pem)?),
            _ => Err(JwkMintError::InvalidManifest {
                path: manifest.to_path_buf(),
                reason: "each entry needs exactly one of public_key_file or public_key".to_string(),
            }),
        }
    }
}

/// Read a manifest and classify every key it names, in manifest order
pub fn load_manifest(path: &Path) -> Result<Vec<(KeyMaterial, KeyParams)>, JwkMintError> {
    let text = std::fs::read_to_string(path).map_err(|e| JwkMintError::IoError {
        path: path.to_path_buf(),
        source: e,
    })?;

    let entries: Vec<ManifestEntry> =
        serde_json::from_str(&text).map_err(|e| JwkMintError::InvalidManifest {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));

    entries
        .iter()
        .map(|entry| -> Result<_, JwkMintError> {
            Ok((entry.load_key(base_dir, path)?, entry.params()))
        })
        .collect()
}

/// Build the JWK set document for the manifest named in `args`
pub fn render_jwks(args: &ArgsJwks) -> Result<JwkDocument, JwkMintError> {
    let entries = load_manifest(&args.manifest)?;
    debug!("Building JWK set from {} manifest entries", entries.len());

    Ok(crate::build_jwks(
        entries.iter().map(|(key, params)| (key, params)),
    )?)
}

pub fn handle_jwks(args: &ArgsJwks) -> color_eyre::Result<()> {
    let document = render_jwks(args)?;

    let content = if args.base64 {
        &document.base64
    } else {
        &document.json
    };

    show_output_or_save(args.output.as_ref(), content)
}
