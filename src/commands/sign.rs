use std::path::PathBuf;

use clap::Args;
use tracing::debug;

use super::{read_input, show_output_or_save, RsaAlgorithm};
use crate::{errors::JwkMintError, KeyMaterial, KeyParams};

#[derive(Args)]
pub struct ArgsSign {
    /// Path to PEM-encoded private key (PKCS#1 RSA, SEC1 EC or PKCS#8 Ed25519)
    #[arg(short = 'k', long, value_name = "FILE")]
    pub private_key: PathBuf,

    /// Signing algorithm for RSA keys; ECDSA and Ed25519 keys derive their own
    #[arg(long, value_enum, default_value = "RS256", value_name = "ALG")]
    pub alg: RsaAlgorithm,

    /// Key ID for the token header
    #[arg(long, default_value = "", value_name = "KID")]
    pub kid: String,

    /// Read claims from file instead of stdin
    #[arg(long, value_name = "FILE")]
    pub claims: Option<PathBuf>,

    /// Write the token to file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

/// Sign `claims` (JSON text) with the key named in `args`
pub fn sign_claims(args: &ArgsSign, claims: &str) -> Result<String, JwkMintError> {
    if claims.trim().is_empty() {
        return Err(JwkMintError::EmptyClaims {
            source_name: if args.claims.is_some() {
                "from file"
            } else {
                "via stdin"
            },
        });
    }

    let key = KeyMaterial::from_private_pem_file(&args.private_key)?;
    debug!("Signing claims with {}", key.describe());

    let params = KeyParams::new()
        .with_alg(args.alg.as_str())
        .with_kid(&args.kid);

    Ok(crate::sign_json(&key, claims, &params)?)
}

pub fn handle_sign(args: &ArgsSign) -> color_eyre::Result<()> {
    let claims = read_input(args.claims.as_ref())?;
    let token = sign_claims(args, &claims)?;

    show_output_or_save(args.output.as_ref(), &token)
}
