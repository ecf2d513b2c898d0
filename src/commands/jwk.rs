use std::path::PathBuf;

use clap::Args;
use tracing::debug;

use super::{show_output_or_save, KeyUse, RsaAlgorithm};
use crate::{errors::JwkMintError, jwk::JwkDocument, KeyMaterial, KeyParams};

#[derive(Args)]
pub struct ArgsJwk {
    /// Path to PEM-encoded public key (RSA, ECDSA or Ed25519)
    #[arg(short = 'k', long, value_name = "FILE")]
    pub public_key: PathBuf,

    /// Key ID (omitted when empty)
    #[arg(long, default_value = "", value_name = "KID")]
    pub kid: String,

    /// Algorithm for RSA keys; ECDSA and Ed25519 keys derive their own
    #[arg(long, value_enum, default_value = "RS256", value_name = "ALG")]
    pub alg: RsaAlgorithm,

    /// Intended key use
    #[arg(long = "use", value_enum, default_value = "sig", value_name = "USE")]
    pub key_use: KeyUse,

    /// Print the standard base64 encoding of the JSON instead
    #[arg(long)]
    pub base64: bool,

    /// Write output to file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

impl ArgsJwk {
    fn params(&self) -> KeyParams {
        KeyParams::new()
            .with_alg(self.alg.as_str())
            .with_kid(&self.kid)
            .with_use(self.key_use.as_str())
    }
}

/// Build the JWK document for the key named in `args`
pub fn render_jwk(args: &ArgsJwk) -> Result<JwkDocument, JwkMintError> {
    let key = KeyMaterial::from_public_pem_file(&args.public_key)?;
    debug!("Building JWK for {}", key.describe());

    let json = crate::build_jwk(&key, &args.params())?;

    Ok(JwkDocument::from_json_bytes(json)?)
}

pub fn handle_jwk(args: &ArgsJwk) -> color_eyre::Result<()> {
    let document = render_jwk(args)?;

    let content = if args.base64 {
        &document.base64
    } else {
        &document.json
    };

    show_output_or_save(args.output.as_ref(), content)
}
