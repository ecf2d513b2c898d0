use std::path::PathBuf;

use clap::Args;
use tracing::info;

use crate::{errors::JwkMintError, KeyMaterial, VerifiedToken};

#[derive(Args)]
pub struct ArgsVerify {
    /// Path to PEM-encoded public or private key
    #[arg(short, long, value_name = "FILE")]
    pub key: PathBuf,

    /// JWT token to verify
    #[arg(value_name = "TOKEN")]
    pub token: String,
}

/// Check the token's signature against the key named in `args`
pub fn verify_token(args: &ArgsVerify) -> Result<VerifiedToken, JwkMintError> {
    let key = KeyMaterial::from_pem_file(&args.key)?;
    info!("Verifying JWT token with {}", key.describe());

    let verified = crate::verify(&key, &args.token)?;

    info!("Token algorithm: {}", verified.alg);
    if let Some(kid) = &verified.kid {
        info!("Token key ID (kid): {}", kid);
    }

    Ok(verified)
}

pub fn handle_verify(args: &ArgsVerify) -> color_eyre::Result<()> {
    let verified = verify_token(args)?;

    println!("{}", serde_json::to_string_pretty(&verified.claims)?);

    Ok(())
}
