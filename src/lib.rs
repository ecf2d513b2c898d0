pub mod commands;
pub mod errors;
pub mod jwk;
pub mod jwt;
pub mod key;
pub(crate) mod utils;

pub use jwk::{build_jwk, build_jwks, JsonWebKey, JsonWebKeySet, JwkDocument, KeyParams};
pub use jwt::{sign, sign_json, verify, VerifiedToken};
pub use key::{parse_private_key, parse_public_key, EcdsaCurve, KeyError, KeyMaterial};

/// Cryptographic key family
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyFamily {
    Rsa,
    Ecdsa,
    Ed25519,
}

impl KeyFamily {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Rsa => "RSA",
            Self::Ecdsa => "ECDSA",
            Self::Ed25519 => "Ed25519",
        }
    }
}

impl std::fmt::Display for KeyFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// JWS algorithm identifier a token can be signed with
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeySignAlgorithm {
    RS256,
    RS384,
    RS512,
    ES256,
    ES384,
    ES512,
    EdDSA,
}

impl KeySignAlgorithm {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::RS256 => "RS256",
            Self::RS384 => "RS384",
            Self::RS512 => "RS512",
            Self::ES256 => "ES256",
            Self::ES384 => "ES384",
            Self::ES512 => "ES512",
            Self::EdDSA => "EdDSA",
        }
    }

    /// Get the key family required for this algorithm
    pub fn key_family(&self) -> KeyFamily {
        match self {
            Self::RS256 | Self::RS384 | Self::RS512 => KeyFamily::Rsa,
            Self::ES256 | Self::ES384 | Self::ES512 => KeyFamily::Ecdsa,
            Self::EdDSA => KeyFamily::Ed25519,
        }
    }

    /// Get the ECDSA curve for this algorithm (if applicable)
    ///
    /// Returns None for RSA and EdDSA
    pub fn curve(&self) -> Option<EcdsaCurve> {
        match self {
            Self::ES256 => Some(EcdsaCurve::P256),
            Self::ES384 => Some(EcdsaCurve::P384),
            Self::ES512 => Some(EcdsaCurve::P521),
            _ => None,
        }
    }
}

/// Algorithm names are matched exactly, as JWS requires.
impl std::str::FromStr for KeySignAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RS256" => Ok(Self::RS256),
            "RS384" => Ok(Self::RS384),
            "RS512" => Ok(Self::RS512),
            "ES256" => Ok(Self::ES256),
            "ES384" => Ok(Self::ES384),
            "ES512" => Ok(Self::ES512),
            "EdDSA" => Ok(Self::EdDSA),
            _ => Err(format!(
                "unsupported algorithm: {s}. Valid algorithms: RS256, RS384, RS512, ES256, ES384, ES512, EdDSA"
            )),
        }
    }
}

impl std::fmt::Display for KeySignAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl AsRef<str> for KeySignAlgorithm {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}
