use std::path::Path;

use ed25519_dalek::pkcs8::{DecodePrivateKey, PrivateKeyInfo};
use elliptic_curve::pkcs8::{AssociatedOid, EncodePrivateKey};
use elliptic_curve::sec1::ToEncodedPoint;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::{RsaPrivateKey, RsaPublicKey};
use sec1::EcPrivateKey;
use spki::{DecodePublicKey, ObjectIdentifier, SubjectPublicKeyInfoRef};
use thiserror::Error;
use tracing::debug;

use crate::KeyFamily;

/// Maximum size for PEM-encoded keys (64KB)
const MAX_PEM_SIZE: usize = 64 * 1024;

/// Maximum size for key files (64KB)
const MAX_KEY_FILE_SIZE: u64 = 64 * 1024;

const RSA_ENCRYPTION_OID: ObjectIdentifier = rsa::pkcs1::ALGORITHM_OID;
const EC_PUBLIC_KEY_OID: ObjectIdentifier = elliptic_curve::ALGORITHM_OID;
const ED25519_OID: ObjectIdentifier = ed25519_dalek::pkcs8::ALGORITHM_OID;

#[derive(Error, Debug)]
pub enum KeyError {
    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("unsupported key type: {0}")]
    UnsupportedKeyType(String),

    #[error("unsupported elliptic curve size: {bits} bits")]
    UnsupportedCurve { bits: usize },

    #[error("invalid claims: {0}")]
    InvalidClaims(String),

    #[error("failed to sign JWT: {0}")]
    SigningFailed(String),

    #[error("failed to verify JWT: {0}")]
    VerificationFailed(String),

    #[error("failed to encode {0}")]
    FailedToEncode(String),

    #[error("failed to read key file: {path}")]
    FailedToReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("key file too large: {size} bytes (maximum: {max} bytes)")]
    FileTooLarge { size: u64, max: u64 },
}

/// Validate PEM input size to prevent resource exhaustion
fn validate_pem_size(pem: &[u8]) -> Result<(), KeyError> {
    if pem.len() > MAX_PEM_SIZE {
        return Err(KeyError::FileTooLarge {
            size: pem.len() as u64,
            max: MAX_PEM_SIZE as u64,
        });
    }
    Ok(())
}

/// Validate file size before reading to prevent resource exhaustion
fn validate_file_size(path: &Path) -> Result<(), KeyError> {
    let metadata = std::fs::metadata(path).map_err(|e| KeyError::FailedToReadFile {
        path: path.to_string_lossy().to_string(),
        source: e,
    })?;

    if metadata.len() > MAX_KEY_FILE_SIZE {
        return Err(KeyError::FileTooLarge {
            size: metadata.len(),
            max: MAX_KEY_FILE_SIZE,
        });
    }
    Ok(())
}

fn read_pem_file(path: &Path) -> Result<Vec<u8>, KeyError> {
    validate_file_size(path)?;

    std::fs::read(path).map_err(|e| KeyError::FailedToReadFile {
        path: path.to_string_lossy().to_string(),
        source: e,
    })
}

/// Decode the first PEM block of `input` and return its DER payload.
///
/// The block label is not inspected; classification works on the DER content.
fn decode_pem_block(input: &[u8]) -> Result<Vec<u8>, KeyError> {
    validate_pem_size(input)?;

    let block = pem::parse(input).map_err(|e| KeyError::MalformedInput(e.to_string()))?;

    Ok(block.into_contents())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EcdsaCurve {
    P224,
    P256,
    P384,
    P521,
}

impl EcdsaCurve {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::P224 => "P-224",
            Self::P256 => "P-256",
            Self::P384 => "P-384",
            Self::P521 => "P-521",
        }
    }

    /// Order size of the curve in bits
    pub const fn bit_size(&self) -> usize {
        match self {
            Self::P224 => 224,
            Self::P256 => 256,
            Self::P384 => 384,
            Self::P521 => 521,
        }
    }

    /// Size of one encoded coordinate in bytes
    pub const fn field_size(&self) -> usize {
        match self {
            Self::P224 => 28,
            Self::P256 => 32,
            Self::P384 => 48,
            Self::P521 => 66,
        }
    }

    fn from_oid(oid: &ObjectIdentifier) -> Option<Self> {
        if *oid == p224::NistP224::OID {
            Some(Self::P224)
        } else if *oid == p256::NistP256::OID {
            Some(Self::P256)
        } else if *oid == p384::NistP384::OID {
            Some(Self::P384)
        } else if *oid == p521::NistP521::OID {
            Some(Self::P521)
        } else {
            None
        }
    }
}

impl std::fmt::Display for EcdsaCurve {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl AsRef<str> for EcdsaCurve {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EcdsaPublicKey {
    P224(p224::PublicKey),
    P256(p256::PublicKey),
    P384(p384::PublicKey),
    P521(p521::PublicKey),
}

impl EcdsaPublicKey {
    pub fn curve(&self) -> EcdsaCurve {
        match self {
            Self::P224(_) => EcdsaCurve::P224,
            Self::P256(_) => EcdsaCurve::P256,
            Self::P384(_) => EcdsaCurve::P384,
            Self::P521(_) => EcdsaCurve::P521,
        }
    }

    /// SEC1 uncompressed point: `0x04 || x || y`
    pub fn uncompressed_point(&self) -> Vec<u8> {
        match self {
            Self::P224(key) => key.to_encoded_point(false).as_bytes().to_vec(),
            Self::P256(key) => key.to_encoded_point(false).as_bytes().to_vec(),
            Self::P384(key) => key.to_encoded_point(false).as_bytes().to_vec(),
            Self::P521(key) => key.to_encoded_point(false).as_bytes().to_vec(),
        }
    }

    /// Affine `x` and `y` coordinates, each padded to the curve's field size
    pub fn coordinates(&self) -> (Vec<u8>, Vec<u8>) {
        let point = self.uncompressed_point();
        let size = self.curve().field_size();
        let (x, y) = point[1..].split_at(size);

        (x.to_vec(), y.to_vec())
    }

    fn from_spki_der(curve: EcdsaCurve, der: &[u8]) -> Result<Self, spki::Error> {
        Ok(match curve {
            EcdsaCurve::P224 => Self::P224(p224::PublicKey::from_public_key_der(der)?),
            EcdsaCurve::P256 => Self::P256(p256::PublicKey::from_public_key_der(der)?),
            EcdsaCurve::P384 => Self::P384(p384::PublicKey::from_public_key_der(der)?),
            EcdsaCurve::P521 => Self::P521(p521::PublicKey::from_public_key_der(der)?),
        })
    }
}

#[derive(Clone, Debug)]
pub enum EcdsaPrivateKey {
    P224(p224::SecretKey),
    P256(p256::SecretKey),
    P384(p384::SecretKey),
    P521(p521::SecretKey),
}

impl EcdsaPrivateKey {
    pub fn curve(&self) -> EcdsaCurve {
        match self {
            Self::P224(_) => EcdsaCurve::P224,
            Self::P256(_) => EcdsaCurve::P256,
            Self::P384(_) => EcdsaCurve::P384,
            Self::P521(_) => EcdsaCurve::P521,
        }
    }

    pub fn public_key(&self) -> EcdsaPublicKey {
        match self {
            Self::P224(key) => EcdsaPublicKey::P224(key.public_key()),
            Self::P256(key) => EcdsaPublicKey::P256(key.public_key()),
            Self::P384(key) => EcdsaPublicKey::P384(key.public_key()),
            Self::P521(key) => EcdsaPublicKey::P521(key.public_key()),
        }
    }

    /// PKCS#8 DER encoding, including the public point
    pub fn to_pkcs8_der(&self) -> Result<Vec<u8>, KeyError> {
        let der = match self {
            Self::P224(key) => key.to_pkcs8_der(),
            Self::P256(key) => key.to_pkcs8_der(),
            Self::P384(key) => key.to_pkcs8_der(),
            Self::P521(key) => key.to_pkcs8_der(),
        };

        der.map(|doc| doc.as_bytes().to_vec())
            .map_err(|_| KeyError::FailedToEncode(format!("ECDSA {} key", self.curve())))
    }

    fn from_sec1_der(curve: EcdsaCurve, der: &[u8]) -> Result<Self, elliptic_curve::Error> {
        Ok(match curve {
            EcdsaCurve::P224 => Self::P224(p224::SecretKey::from_sec1_der(der)?),
            EcdsaCurve::P256 => Self::P256(p256::SecretKey::from_sec1_der(der)?),
            EcdsaCurve::P384 => Self::P384(p384::SecretKey::from_sec1_der(der)?),
            EcdsaCurve::P521 => Self::P521(p521::SecretKey::from_sec1_der(der)?),
        })
    }
}

/// A classified asymmetric key.
///
/// Produced once by [`parse_public_key`] or [`parse_private_key`] and only
/// ever read afterwards.
#[derive(Clone, Debug)]
pub enum KeyMaterial {
    RsaPublic(RsaPublicKey),
    RsaPrivate(RsaPrivateKey),
    EcdsaPublic(EcdsaPublicKey),
    EcdsaPrivate(EcdsaPrivateKey),
    Ed25519Public(ed25519_dalek::VerifyingKey),
    Ed25519Private(ed25519_dalek::SigningKey),
}

impl KeyMaterial {
    pub fn family(&self) -> KeyFamily {
        match self {
            Self::RsaPublic(_) | Self::RsaPrivate(_) => KeyFamily::Rsa,
            Self::EcdsaPublic(_) | Self::EcdsaPrivate(_) => KeyFamily::Ecdsa,
            Self::Ed25519Public(_) | Self::Ed25519Private(_) => KeyFamily::Ed25519,
        }
    }

    pub fn is_private(&self) -> bool {
        matches!(
            self,
            Self::RsaPrivate(_) | Self::EcdsaPrivate(_) | Self::Ed25519Private(_)
        )
    }

    /// Human-readable variant name, e.g. "ECDSA P-384 private key"
    pub fn describe(&self) -> String {
        let visibility = if self.is_private() { "private" } else { "public" };

        match self {
            Self::EcdsaPublic(key) => format!("ECDSA {} {visibility} key", key.curve()),
            Self::EcdsaPrivate(key) => format!("ECDSA {} {visibility} key", key.curve()),
            _ => format!("{} {visibility} key", self.family()),
        }
    }

    /// The public half of this key; public variants are returned as-is.
    pub fn to_public(&self) -> KeyMaterial {
        match self {
            Self::RsaPrivate(key) => Self::RsaPublic(RsaPublicKey::from(key)),
            Self::EcdsaPrivate(key) => Self::EcdsaPublic(key.public_key()),
            Self::Ed25519Private(key) => Self::Ed25519Public(key.verifying_key()),
            public => public.clone(),
        }
    }

    pub fn from_public_pem_file(path: &Path) -> Result<Self, KeyError> {
        parse_public_key(read_pem_file(path)?)
    }

    pub fn from_private_pem_file(path: &Path) -> Result<Self, KeyError> {
        parse_private_key(read_pem_file(path)?)
    }

    /// Load a key that may be either public or private.
    ///
    /// The public form is tried first; when neither decodes, the private
    /// parser's error is returned.
    pub fn from_pem_file(path: &Path) -> Result<Self, KeyError> {
        let pem = read_pem_file(path)?;

        parse_public_key(&pem).or_else(|_| parse_private_key(&pem))
    }
}

/// Parse a PEM-encoded SubjectPublicKeyInfo.
///
/// Supported algorithms:
///
/// - RSA
/// - ECDSA on P-224, P-256, P-384 and P-521
/// - Ed25519
pub fn parse_public_key(pem: impl AsRef<[u8]>) -> Result<KeyMaterial, KeyError> {
    let der = decode_pem_block(pem.as_ref())?;

    let spki = SubjectPublicKeyInfoRef::try_from(der.as_slice()).map_err(|_| {
        KeyError::UnsupportedKeyType("not a SubjectPublicKeyInfo structure".to_string())
    })?;
    let algorithm = spki.algorithm.oid;

    let key = if algorithm == RSA_ENCRYPTION_OID {
        let key = RsaPublicKey::from_public_key_der(&der)
            .map_err(|e| KeyError::UnsupportedKeyType(format!("invalid RSA public key: {e}")))?;
        KeyMaterial::RsaPublic(key)
    } else if algorithm == EC_PUBLIC_KEY_OID {
        let curve = spki
            .algorithm
            .parameters_oid()
            .ok()
            .and_then(|oid| EcdsaCurve::from_oid(&oid))
            .ok_or_else(|| KeyError::UnsupportedKeyType("unsupported elliptic curve".to_string()))?;
        let key = EcdsaPublicKey::from_spki_der(curve, &der).map_err(|e| {
            KeyError::UnsupportedKeyType(format!("invalid ECDSA {curve} public key: {e}"))
        })?;
        KeyMaterial::EcdsaPublic(key)
    } else if algorithm == ED25519_OID {
        let key = ed25519_dalek::VerifyingKey::from_public_key_der(&der).map_err(|e| {
            KeyError::UnsupportedKeyType(format!("invalid Ed25519 public key: {e}"))
        })?;
        KeyMaterial::Ed25519Public(key)
    } else {
        return Err(KeyError::UnsupportedKeyType(format!(
            "public key algorithm {algorithm}"
        )));
    };

    debug!("classified public key as {}", key.describe());
    Ok(key)
}

/// Parse a PEM-encoded private key.
///
/// Encodings are tried in order and the first one that decodes wins:
///
/// 1. PKCS#1 (RSA)
/// 2. SEC1 (ECDSA)
/// 3. PKCS#8, accepted only when it wraps an Ed25519 key
pub fn parse_private_key(pem: impl AsRef<[u8]>) -> Result<KeyMaterial, KeyError> {
    let der = decode_pem_block(pem.as_ref())?;

    let key = if let Ok(key) = RsaPrivateKey::from_pkcs1_der(&der) {
        KeyMaterial::RsaPrivate(key)
    } else if let Some(key) = parse_sec1(&der) {
        KeyMaterial::EcdsaPrivate(key)
    } else {
        KeyMaterial::Ed25519Private(parse_pkcs8_ed25519(&der)?)
    };

    debug!("classified private key as {}", key.describe());
    Ok(key)
}

/// SEC1 `ECPrivateKey` carrying a named-curve parameter
fn parse_sec1(der: &[u8]) -> Option<EcdsaPrivateKey> {
    let sec1_key = EcPrivateKey::try_from(der).ok()?;
    let curve = EcdsaCurve::from_oid(&sec1_key.parameters?.named_curve()?)?;

    EcdsaPrivateKey::from_sec1_der(curve, der).ok()
}

// PKCS#8-wrapped RSA and EC keys are rejected here on purpose; only the
// PKCS#1 and SEC1 forms are accepted for those families.
fn parse_pkcs8_ed25519(der: &[u8]) -> Result<ed25519_dalek::SigningKey, KeyError> {
    let info = PrivateKeyInfo::try_from(der)
        .map_err(|_| KeyError::UnsupportedKeyType("unsupported private key type".to_string()))?;

    if info.algorithm.oid != ED25519_OID {
        return Err(KeyError::UnsupportedKeyType(format!(
            "PKCS#8 key with algorithm {} is not an Ed25519 key",
            info.algorithm.oid
        )));
    }

    ed25519_dalek::SigningKey::from_pkcs8_der(der)
        .map_err(|e| KeyError::UnsupportedKeyType(format!("invalid Ed25519 private key: {e}")))
}
