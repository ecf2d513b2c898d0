use ed25519_dalek::pkcs8::{EncodePrivateKey, KeypairBytes};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use p521::ecdsa::{
    signature::{Signer, Verifier},
    Signature as P521Signature, SigningKey as P521SigningKey, VerifyingKey as P521VerifyingKey,
};
use rsa::pkcs1::EncodeRsaPrivateKey;
use rsa::traits::PublicKeyParts;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::jwk::KeyParams;
use crate::key::{EcdsaPrivateKey, KeyError, KeyMaterial};
use crate::utils::base64 as base64url;
use crate::KeySignAlgorithm;

/// RSA algorithm for a declared `alg`.
///
/// Anything other than an exact `RS256`, `RS384` or `RS512` falls back to RS256.
pub fn rsa_signing_algorithm(alg: &str) -> KeySignAlgorithm {
    match alg {
        "RS384" => KeySignAlgorithm::RS384,
        "RS512" => KeySignAlgorithm::RS512,
        _ => KeySignAlgorithm::RS256,
    }
}

/// ECDSA algorithm for a curve size: 256 and 384 map to ES256 and ES384,
/// every other size to ES512.
pub fn signing_algorithm_for_curve_bits(bits: usize) -> KeySignAlgorithm {
    match bits {
        256 => KeySignAlgorithm::ES256,
        384 => KeySignAlgorithm::ES384,
        _ => KeySignAlgorithm::ES512,
    }
}

/// jsonwebtoken has no ES512 support; those tokens are handled with p521 directly.
fn jose_algorithm(alg: KeySignAlgorithm) -> Option<Algorithm> {
    match alg {
        KeySignAlgorithm::RS256 => Some(Algorithm::RS256),
        KeySignAlgorithm::RS384 => Some(Algorithm::RS384),
        KeySignAlgorithm::RS512 => Some(Algorithm::RS512),
        KeySignAlgorithm::ES256 => Some(Algorithm::ES256),
        KeySignAlgorithm::ES384 => Some(Algorithm::ES384),
        KeySignAlgorithm::ES512 => None,
        KeySignAlgorithm::EdDSA => Some(Algorithm::EdDSA),
    }
}

/// Sign `claims` with a private key and return the compact token.
///
/// The algorithm comes from the key family:
///
/// - RSA: `params.alg` via [`rsa_signing_algorithm`]
/// - ECDSA: the curve size via [`signing_algorithm_for_curve_bits`]
/// - Ed25519: always EdDSA
///
/// RSA and ECDSA headers carry `kid` only when `params.kid` is non-empty.
/// Ed25519 headers always carry it, even when empty.
pub fn sign(
    key: &KeyMaterial,
    claims: &Map<String, Value>,
    params: &KeyParams,
) -> Result<String, KeyError> {
    match key {
        KeyMaterial::RsaPrivate(key) => sign_rsa(key, claims, params),
        KeyMaterial::EcdsaPrivate(key) => sign_ecdsa(key, claims, params),
        KeyMaterial::Ed25519Private(key) => sign_ed25519(key, claims, params),
        public => Err(KeyError::UnsupportedKeyType(format!(
            "signing requires a private key, got {}",
            public.describe()
        ))),
    }
}

/// Like [`sign`], with the claims given as JSON text.
///
/// Fails with [`KeyError::InvalidClaims`] unless the text is a JSON object.
pub fn sign_json(key: &KeyMaterial, claims: &str, params: &KeyParams) -> Result<String, KeyError> {
    let claims: Value =
        serde_json::from_str(claims).map_err(|e| KeyError::InvalidClaims(e.to_string()))?;

    match claims {
        Value::Object(claims) => sign(key, &claims, params),
        _ => Err(KeyError::InvalidClaims(
            "claims must be a JSON object".to_string(),
        )),
    }
}

fn non_empty_kid(params: &KeyParams) -> Option<String> {
    (!params.kid.is_empty()).then(|| params.kid.clone())
}

fn encode_with(
    alg: Algorithm,
    kid: Option<String>,
    claims: &Map<String, Value>,
    encoding_key: &EncodingKey,
) -> Result<String, KeyError> {
    let mut header = Header::new(alg);
    header.kid = kid;

    encode(&header, claims, encoding_key).map_err(|e| KeyError::SigningFailed(e.to_string()))
}

fn sign_rsa(
    key: &rsa::RsaPrivateKey,
    claims: &Map<String, Value>,
    params: &KeyParams,
) -> Result<String, KeyError> {
    let algorithm = rsa_signing_algorithm(&params.alg);
    debug!(alg = %algorithm, "signing with RSA key");

    let der = key
        .to_pkcs1_der()
        .map_err(|e| KeyError::SigningFailed(format!("RSA key encoding: {e}")))?;
    let encoding_key = EncodingKey::from_rsa_der(der.as_bytes());

    let alg = jose_algorithm(algorithm)
        .ok_or_else(|| KeyError::SigningFailed(format!("{algorithm} is not an RSA algorithm")))?;
    encode_with(alg, non_empty_kid(params), claims, &encoding_key)
}

fn sign_ecdsa(
    key: &EcdsaPrivateKey,
    claims: &Map<String, Value>,
    params: &KeyParams,
) -> Result<String, KeyError> {
    let curve = key.curve();
    let algorithm = signing_algorithm_for_curve_bits(curve.bit_size());
    debug!(alg = %algorithm, curve = %curve, "signing with ECDSA key");

    if algorithm.curve() != Some(curve) {
        return Err(KeyError::SigningFailed(format!(
            "algorithm {algorithm} does not match curve {curve}"
        )));
    }

    match (key, jose_algorithm(algorithm)) {
        (EcdsaPrivateKey::P521(secret), None) => {
            let signing_key = P521SigningKey::from_bytes(&secret.to_bytes())
                .map_err(|e| KeyError::SigningFailed(format!("P-521 key: {e}")))?;
            sign_es512(&signing_key, claims, non_empty_kid(params).as_deref())
        }
        (_, Some(alg)) => {
            let der = key.to_pkcs8_der()?;
            let encoding_key = EncodingKey::from_ec_der(&der);
            encode_with(alg, non_empty_kid(params), claims, &encoding_key)
        }
        (_, None) => Err(KeyError::SigningFailed(format!(
            "P-521 key required for {algorithm}"
        ))),
    }
}

#[derive(Serialize)]
struct Es512Header<'a> {
    typ: &'static str,
    alg: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    kid: Option<&'a str>,
}

fn sign_es512(
    signing_key: &P521SigningKey,
    claims: &Map<String, Value>,
    kid: Option<&str>,
) -> Result<String, KeyError> {
    let header = Es512Header {
        typ: "JWT",
        alg: KeySignAlgorithm::ES512.as_str(),
        kid,
    };

    let header_json = serde_json::to_vec(&header)
        .map_err(|e| KeyError::SigningFailed(format!("header serialization: {e}")))?;
    let claims_json = serde_json::to_vec(claims)
        .map_err(|e| KeyError::SigningFailed(format!("claims serialization: {e}")))?;

    let signing_input = format!(
        "{}.{}",
        base64url::encode(&header_json),
        base64url::encode(&claims_json)
    );

    // SHA-512 is applied by the signer (RFC 7518 §3.4)
    let signature: P521Signature = signing_key.sign(signing_input.as_bytes());

    Ok(format!(
        "{signing_input}.{}",
        base64url::encode(&signature.to_bytes())
    ))
}

fn sign_ed25519(
    key: &ed25519_dalek::SigningKey,
    claims: &Map<String, Value>,
    params: &KeyParams,
) -> Result<String, KeyError> {
    debug!(alg = %KeySignAlgorithm::EdDSA, "signing with Ed25519 key");

    // PKCS#8 v1: ring rejects the v2 layout written by the pkcs8 crate
    let keypair = KeypairBytes {
        secret_key: key.to_bytes(),
        public_key: None,
    };
    let der = keypair
        .to_pkcs8_der()
        .map_err(|e| KeyError::SigningFailed(format!("Ed25519 key encoding: {e}")))?;
    let encoding_key = EncodingKey::from_ed_der(der.as_bytes());

    encode_with(
        Algorithm::EdDSA,
        Some(params.kid.clone()),
        claims,
        &encoding_key,
    )
}

/// Header and claims of a token whose signature checked out
#[derive(Clone, Debug, PartialEq)]
pub struct VerifiedToken {
    pub alg: KeySignAlgorithm,
    pub kid: Option<String>,
    pub claims: Map<String, Value>,
}

#[derive(Deserialize)]
struct TokenHeader {
    alg: String,
    #[serde(default)]
    kid: Option<String>,
}

fn decode_segment<T: serde::de::DeserializeOwned>(segment: &str, name: &str) -> Result<T, KeyError> {
    let bytes = base64url::decode(segment)
        .map_err(|e| KeyError::VerificationFailed(format!("{name} is not base64url: {e}")))?;

    serde_json::from_slice(&bytes)
        .map_err(|e| KeyError::VerificationFailed(format!("{name} is not valid JSON: {e}")))
}

/// Verify a compact token's signature.
///
/// Private keys verify with their public half. The header `alg` must
/// belong to the key's family (and curve, for ECDSA). Time-based claims
/// are not checked.
pub fn verify(key: &KeyMaterial, token: &str) -> Result<VerifiedToken, KeyError> {
    let segments: Vec<&str> = token.trim().split('.').collect();
    let [header_b64, claims_b64, signature_b64] = segments[..] else {
        return Err(KeyError::VerificationFailed(
            "token must have three segments".to_string(),
        ));
    };

    let header: TokenHeader = decode_segment(header_b64, "header")?;
    let alg: KeySignAlgorithm = header
        .alg
        .parse()
        .map_err(KeyError::VerificationFailed)?;

    let public = key.to_public();
    if alg.key_family() != public.family() {
        return Err(KeyError::VerificationFailed(format!(
            "algorithm {alg} cannot be verified with {}",
            public.describe()
        )));
    }

    let claims = match (&public, jose_algorithm(alg)) {
        (KeyMaterial::EcdsaPublic(ec), _) if alg.curve() != Some(ec.curve()) => {
            return Err(KeyError::VerificationFailed(format!(
                "algorithm {alg} does not match curve {}",
                ec.curve()
            )))
        }
        (KeyMaterial::EcdsaPublic(ec), None) => {
            let verifying_key = P521VerifyingKey::from_sec1_bytes(&ec.uncompressed_point())
                .map_err(|e| KeyError::VerificationFailed(format!("P-521 key: {e}")))?;
            let signature_bytes = base64url::decode(signature_b64).map_err(|e| {
                KeyError::VerificationFailed(format!("signature is not base64url: {e}"))
            })?;
            let signature = P521Signature::from_slice(&signature_bytes)
                .map_err(|e| KeyError::VerificationFailed(format!("signature: {e}")))?;

            let signing_input = format!("{header_b64}.{claims_b64}");
            verifying_key
                .verify(signing_input.as_bytes(), &signature)
                .map_err(|_| KeyError::VerificationFailed("invalid signature".to_string()))?;

            decode_segment(claims_b64, "claims")?
        }
        (_, Some(jose_alg)) => {
            let decoding_key = decoding_key(&public)?;

            let mut validation = Validation::new(jose_alg);
            validation.required_spec_claims.clear();
            validation.validate_exp = false;
            validation.validate_aud = false;

            decode::<Map<String, Value>>(token.trim(), &decoding_key, &validation)
                .map_err(|e| KeyError::VerificationFailed(e.to_string()))?
                .claims
        }
        (_, None) => {
            return Err(KeyError::VerificationFailed(format!(
                "algorithm {alg} cannot be verified with {}",
                public.describe()
            )))
        }
    };

    debug!(alg = %alg, "verified token");
    Ok(VerifiedToken {
        alg,
        kid: header.kid,
        claims,
    })
}

fn decoding_key(public: &KeyMaterial) -> Result<DecodingKey, KeyError> {
    match public {
        KeyMaterial::RsaPublic(key) => Ok(DecodingKey::from_rsa_raw_components(
            &key.n().to_bytes_be(),
            &key.e().to_bytes_be(),
        )),
        KeyMaterial::EcdsaPublic(key) => Ok(DecodingKey::from_ec_der(&key.uncompressed_point())),
        KeyMaterial::Ed25519Public(key) => Ok(DecodingKey::from_ed_der(key.as_bytes())),
        private => Err(KeyError::VerificationFailed(format!(
            "expected a public key, got {}",
            private.describe()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn p256_private() -> KeyMaterial {
        let secret = p256::SecretKey::from_slice(&[3u8; 32]).expect("valid scalar");
        KeyMaterial::EcdsaPrivate(EcdsaPrivateKey::P256(secret))
    }

    fn p521_private() -> KeyMaterial {
        let mut scalar = [9u8; 66];
        scalar[0] = 0;
        let secret = p521::SecretKey::from_slice(&scalar).expect("valid scalar");
        KeyMaterial::EcdsaPrivate(EcdsaPrivateKey::P521(secret))
    }

    fn ed25519_private() -> KeyMaterial {
        KeyMaterial::Ed25519Private(ed25519_dalek::SigningKey::from_bytes(&[5u8; 32]))
    }

    fn header_of(token: &str) -> Map<String, Value> {
        let header = token.split('.').next().expect("header segment");
        decode_segment(header, "header").expect("header JSON")
    }

    fn claims(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    #[test]
    fn test_rsa_algorithm_fallback() {
        assert_eq!(rsa_signing_algorithm("RS256"), KeySignAlgorithm::RS256);
        assert_eq!(rsa_signing_algorithm("RS384"), KeySignAlgorithm::RS384);
        assert_eq!(rsa_signing_algorithm("RS512"), KeySignAlgorithm::RS512);

        for declared in ["", "rs384", "PS256", "ES256", "RS1024", " RS512"] {
            assert_eq!(rsa_signing_algorithm(declared), KeySignAlgorithm::RS256);
        }
    }

    #[test]
    fn test_curve_bits_fallback_to_es512() {
        assert_eq!(signing_algorithm_for_curve_bits(256), KeySignAlgorithm::ES256);
        assert_eq!(signing_algorithm_for_curve_bits(384), KeySignAlgorithm::ES384);

        for bits in [521, 224, 512, 0] {
            assert_eq!(signing_algorithm_for_curve_bits(bits), KeySignAlgorithm::ES512);
        }
    }

    #[test]
    fn test_ecdsa_kid_only_when_non_empty() {
        let key = p256_private();
        let claims = claims(json!({"sub": "abc"}));

        let token = sign(&key, &claims, &KeyParams::new()).unwrap();
        let header = header_of(&token);
        assert_eq!(header["alg"], "ES256");
        assert!(!header.contains_key("kid"));

        let token = sign(&key, &claims, &KeyParams::new().with_kid("ec-1")).unwrap();
        assert_eq!(header_of(&token)["kid"], "ec-1");
    }

    #[test]
    fn test_ed25519_always_sets_kid() {
        let token = sign_json(&ed25519_private(), r#"{"sub":"abc"}"#, &KeyParams::new()).unwrap();
        let header = header_of(&token);

        assert_eq!(header["alg"], "EdDSA");
        assert_eq!(header["kid"], "");
    }

    #[test]
    fn test_es512_header_and_signature_size() {
        let token = sign(
            &p521_private(),
            &claims(json!({"sub": "abc"})),
            &KeyParams::new().with_kid("p521"),
        )
        .unwrap();

        let header = header_of(&token);
        assert_eq!(header["alg"], "ES512");
        assert_eq!(header["typ"], "JWT");
        assert_eq!(header["kid"], "p521");

        let signature = base64url::decode(token.rsplit('.').next().unwrap()).unwrap();
        assert_eq!(signature.len(), 132);
    }

    #[test]
    fn test_sign_then_verify() {
        for key in [p256_private(), p521_private(), ed25519_private()] {
            let token = sign_json(&key, r#"{"sub":"abc","n":1}"#, &KeyParams::new()).unwrap();
            let verified = verify(&key.to_public(), &token).unwrap();
            assert_eq!(verified.claims, claims(json!({"sub": "abc", "n": 1})));
        }
    }

    #[test]
    fn test_invalid_claims() {
        let key = ed25519_private();
        for text in ["null", "[1,2]", "\"sub\"", "42", "{not json", ""] {
            assert!(
                matches!(
                    sign_json(&key, text, &KeyParams::new()).unwrap_err(),
                    KeyError::InvalidClaims(_)
                ),
                "claims {text:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_public_key_cannot_sign() {
        let public = ed25519_private().to_public();
        assert!(matches!(
            sign(&public, &Map::new(), &KeyParams::new()).unwrap_err(),
            KeyError::UnsupportedKeyType(_)
        ));
    }

    #[test]
    fn test_verify_rejects_other_family_and_curve() {
        let token = sign(&p256_private(), &Map::new(), &KeyParams::new()).unwrap();

        assert!(matches!(
            verify(&ed25519_private(), &token).unwrap_err(),
            KeyError::VerificationFailed(_)
        ));
        assert!(matches!(
            verify(&p521_private(), &token).unwrap_err(),
            KeyError::VerificationFailed(_)
        ));
        assert!(matches!(
            verify(&p256_private(), "only.two").unwrap_err(),
            KeyError::VerificationFailed(_)
        ));
    }

    #[test]
    fn test_verify_rejects_tampered_payload() {
        let key = p521_private();
        let token = sign(&key, &claims(json!({"sub": "abc"})), &KeyParams::new()).unwrap();
        let mut segments: Vec<String> = token.split('.').map(str::to_string).collect();
        segments[1] = base64url::encode(br#"{"sub":"xyz"}"#);

        assert!(matches!(
            verify(&key, &segments.join(".")).unwrap_err(),
            KeyError::VerificationFailed(_)
        ));
    }
}
