use rsa::traits::PublicKeyParts;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use tracing::debug;

use crate::key::{KeyError, KeyMaterial};
use crate::utils::base64 as base64url;
use crate::utils::base64::encode_standard;

/// Caller-declared parameters for a key: algorithm hint, key id and usage.
///
/// Empty strings mean "not set".
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyParams {
    pub alg: String,
    pub kid: String,
    #[serde(rename = "use")]
    pub key_use: String,
}

impl KeyParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_alg(mut self, alg: impl Into<String>) -> Self {
        self.alg = alg.into();
        self
    }

    pub fn with_kid(mut self, kid: impl Into<String>) -> Self {
        self.kid = kid.into();
        self
    }

    pub fn with_use(mut self, key_use: impl Into<String>) -> Self {
        self.key_use = key_use.into();
        self
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

/// A public JSON Web Key (RFC 7517).
///
/// Field order is the serialization order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonWebKey {
    #[serde(rename = "use", skip_serializing_if = "Option::is_none")]
    pub key_use: Option<String>,
    pub kty: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crv: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,
}

impl JsonWebKey {
    fn empty(kty: &str, params: &KeyParams) -> Self {
        Self {
            key_use: non_empty(&params.key_use),
            kty: kty.to_string(),
            kid: non_empty(&params.kid),
            crv: None,
            alg: None,
            x: None,
            y: None,
            n: None,
            e: None,
        }
    }

    /// Describe a public key as a JWK.
    ///
    /// - RSA keys carry `params.alg` verbatim, or no `alg` when it is empty
    /// - ECDSA keys derive `alg` from the curve size
    /// - Ed25519 keys always use `EdDSA`
    pub fn from_key(key: &KeyMaterial, params: &KeyParams) -> Result<Self, KeyError> {
        let jwk = match key {
            KeyMaterial::RsaPublic(key) => Self {
                alg: non_empty(&params.alg),
                n: Some(base64url::encode(&key.n().to_bytes_be())),
                e: Some(base64url::encode(&key.e().to_bytes_be())),
                ..Self::empty("RSA", params)
            },
            KeyMaterial::EcdsaPublic(key) => {
                let curve = key.curve();
                let alg = jwk_algorithm_for_curve_bits(curve.bit_size())?;
                let (x, y) = key.coordinates();

                Self {
                    crv: Some(curve.as_str().to_string()),
                    alg: Some(alg.to_string()),
                    x: Some(base64url::encode(&x)),
                    y: Some(base64url::encode(&y)),
                    ..Self::empty("EC", params)
                }
            }
            KeyMaterial::Ed25519Public(key) => Self {
                crv: Some("Ed25519".to_string()),
                alg: Some("EdDSA".to_string()),
                x: Some(base64url::encode(key.as_bytes())),
                ..Self::empty("OKP", params)
            },
            private => {
                return Err(KeyError::UnsupportedKeyType(format!(
                    "a JWK can only be built from a public key, got {}",
                    private.describe()
                )))
            }
        };

        debug!(kty = %jwk.kty, alg = ?jwk.alg, "built JWK");
        Ok(jwk)
    }

    pub fn to_json(&self) -> Result<Vec<u8>, KeyError> {
        serde_json::to_vec(self).map_err(|e| KeyError::FailedToEncode(format!("JWK: {e}")))
    }
}

/// Map an ECDSA curve size to its JWK algorithm.
///
/// Only 256, 384 and 521 bit curves are accepted.
pub fn jwk_algorithm_for_curve_bits(bits: usize) -> Result<&'static str, KeyError> {
    match bits {
        256 => Ok("ES256"),
        384 => Ok("ES384"),
        521 => Ok("ES512"),
        _ => Err(KeyError::UnsupportedCurve { bits }),
    }
}

/// Build the JWK JSON for a public key
pub fn build_jwk(key: &KeyMaterial, params: &KeyParams) -> Result<Vec<u8>, KeyError> {
    JsonWebKey::from_key(key, params)?.to_json()
}

/// JSON output paired with its standard base64 encoding
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JwkDocument {
    pub json: String,
    pub base64: String,
}

impl JwkDocument {
    pub fn new(json: impl Into<String>) -> Self {
        let json = json.into();
        let base64 = encode_standard(json.as_bytes());

        Self { json, base64 }
    }

    pub fn from_json_bytes(json: Vec<u8>) -> Result<Self, KeyError> {
        let json = String::from_utf8(json)
            .map_err(|e| KeyError::MalformedInput(format!("JWK is not UTF-8: {e}")))?;

        Ok(Self::new(json))
    }
}

/// `{"keys": [...]}` wrapper holding already-serialized JWKs verbatim
#[derive(Debug, Default, Serialize)]
pub struct JsonWebKeySet {
    keys: Vec<Box<RawValue>>,
}

impl JsonWebKeySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Append one JWK JSON blob as-is
    pub fn push_raw(&mut self, jwk: &[u8]) -> Result<(), KeyError> {
        let raw: Box<RawValue> = serde_json::from_slice(jwk)
            .map_err(|e| KeyError::MalformedInput(format!("JWK is not valid JSON: {e}")))?;
        self.keys.push(raw);
        Ok(())
    }

    pub fn to_document(&self) -> Result<JwkDocument, KeyError> {
        let json = serde_json::to_string(self)
            .map_err(|e| KeyError::FailedToEncode(format!("JWK set: {e}")))?;

        Ok(JwkDocument::new(json))
    }
}

/// Build a JWK set from `(key, params)` pairs, preserving their order.
///
/// The first failing entry aborts the whole set.
pub fn build_jwks<'a, I>(entries: I) -> Result<JwkDocument, KeyError>
where
    I: IntoIterator<Item = (&'a KeyMaterial, &'a KeyParams)>,
{
    let mut set = JsonWebKeySet::new();

    for (key, params) in entries {
        set.push_raw(&build_jwk(key, params)?)?;
    }

    debug!(keys = set.len(), "built JWK set");
    set.to_document()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::{EcdsaPrivateKey, EcdsaPublicKey};

    fn ed25519_public() -> KeyMaterial {
        KeyMaterial::Ed25519Public(ed25519_dalek::SigningKey::from_bytes(&[5u8; 32]).verifying_key())
    }

    fn p384_public() -> KeyMaterial {
        let secret = p384::SecretKey::from_slice(&[11u8; 48]).expect("valid scalar");
        KeyMaterial::EcdsaPublic(EcdsaPublicKey::P384(secret.public_key()))
    }

    #[test]
    fn test_curve_bits_to_algorithm() {
        assert_eq!(jwk_algorithm_for_curve_bits(256).unwrap(), "ES256");
        assert_eq!(jwk_algorithm_for_curve_bits(384).unwrap(), "ES384");
        assert_eq!(jwk_algorithm_for_curve_bits(521).unwrap(), "ES512");

        for bits in [0, 224, 255, 512, 1024] {
            match jwk_algorithm_for_curve_bits(bits).unwrap_err() {
                KeyError::UnsupportedCurve { bits: reported } => assert_eq!(reported, bits),
                other => panic!("expected UnsupportedCurve, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_empty_params_are_omitted() {
        let json = build_jwk(&ed25519_public(), &KeyParams::new()).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&json).unwrap();
        let object = value.as_object().unwrap();

        assert!(!object.contains_key("kid"));
        assert!(!object.contains_key("use"));
        assert_eq!(object["kty"], "OKP");
        assert_eq!(object["alg"], "EdDSA");
    }

    #[test]
    fn test_ed25519_ignores_alg_param() {
        let params = KeyParams::new().with_alg("RS512");
        let jwk = JsonWebKey::from_key(&ed25519_public(), &params).unwrap();
        assert_eq!(jwk.alg.as_deref(), Some("EdDSA"));
    }

    #[test]
    fn test_ecdsa_member_order() {
        let params = KeyParams::new().with_kid("ec-1").with_use("sig").with_alg("RS256");
        let json = String::from_utf8(build_jwk(&p384_public(), &params).unwrap()).unwrap();

        let members = ["use", "kty", "kid", "crv", "alg", "x", "y"];
        let positions: Vec<usize> = members
            .iter()
            .map(|member| format!("\"{member}\":"))
            .map(|member| json.find(&member).expect("member present"))
            .collect();
        assert!(positions.windows(2).all(|pair| pair[0] < pair[1]), "{json}");
        assert!(json.contains(r#""alg":"ES384""#));
        assert!(json.contains(r#""crv":"P-384""#));
    }

    #[test]
    fn test_private_key_is_rejected() {
        let secret = p256::SecretKey::from_slice(&[3u8; 32]).unwrap();
        let key = KeyMaterial::EcdsaPrivate(EcdsaPrivateKey::P256(secret));

        assert!(matches!(
            build_jwk(&key, &KeyParams::new()).unwrap_err(),
            KeyError::UnsupportedKeyType(_)
        ));
    }

    #[test]
    fn test_key_params_deserialize_with_defaults() {
        let params: KeyParams = serde_json::from_str(r#"{"use":"enc"}"#).unwrap();
        assert_eq!(params, KeyParams::new().with_use("enc"));
    }

    #[test]
    fn test_empty_jwk_set() {
        let document = build_jwks(std::iter::empty::<(&KeyMaterial, &KeyParams)>()).unwrap();
        assert_eq!(document.json, r#"{"keys":[]}"#);
        assert_eq!(document.base64, "eyJrZXlzIjpbXX0=");
    }

    #[test]
    fn test_jwk_set_embeds_blobs_verbatim() {
        let mut set = JsonWebKeySet::new();
        set.push_raw(br#"{"kty":"OKP","x":"a"}"#).unwrap();
        set.push_raw(br#"{"kty":"EC"}"#).unwrap();

        assert_eq!(set.len(), 2);
        assert_eq!(
            set.to_document().unwrap().json,
            r#"{"keys":[{"kty":"OKP","x":"a"},{"kty":"EC"}]}"#
        );
        assert!(set.push_raw(b"not json").is_err());
    }
}
