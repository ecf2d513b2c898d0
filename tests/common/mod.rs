#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::{decode, decode_header, DecodingKey, Validation};
use p521::ecdsa::{signature::Verifier, Signature, VerifyingKey};
use serde_json::Value;

use jwkmint::{parse_private_key, parse_public_key, JsonWebKey, KeyMaterial};

static RSA_PRIVATE: OnceLock<KeyMaterial> = OnceLock::new();
static RSA_PUBLIC: OnceLock<KeyMaterial> = OnceLock::new();

pub fn fixture_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

pub fn fixture(name: &str) -> String {
    let path = fixture_path(name);
    std::fs::read_to_string(&path)
        .unwrap_or_else(|_| panic!("Failed to read fixture {}", path.display()))
}

/// Parse a private key fixture
pub fn private_key(name: &str) -> KeyMaterial {
    if name == "rsa_pkcs1.pem" {
        return RSA_PRIVATE
            .get_or_init(|| parse_private_key(fixture(name)).expect("RSA fixture"))
            .clone();
    }

    parse_private_key(fixture(name))
        .unwrap_or_else(|e| panic!("Failed to parse private fixture {name}: {e}"))
}

/// Parse a public key fixture
pub fn public_key(name: &str) -> KeyMaterial {
    if name == "rsa_pub.pem" {
        return RSA_PUBLIC
            .get_or_init(|| parse_public_key(fixture(name)).expect("RSA fixture"))
            .clone();
    }

    parse_public_key(fixture(name))
        .unwrap_or_else(|e| panic!("Failed to parse public fixture {name}: {e}"))
}

/// Matching (private, public) fixture names for every supported key kind
pub const KEY_PAIRS: [(&str, &str); 5] = [
    ("rsa_pkcs1.pem", "rsa_pub.pem"),
    ("ec_p256_sec1.pem", "ec_p256_pub.pem"),
    ("ec_p384_sec1.pem", "ec_p384_pub.pem"),
    ("ec_p521_sec1.pem", "ec_p521_pub.pem"),
    ("ed25519_pkcs8.pem", "ed25519_pub.pem"),
];

/// Decode one base64url JSON segment of a compact token
pub fn decode_segment(token: &str, index: usize) -> Value {
    let segment = token.split('.').nth(index).expect("segment present");
    let bytes = URL_SAFE_NO_PAD.decode(segment).expect("base64url segment");
    serde_json::from_slice(&bytes).expect("JSON segment")
}

fn member<'a>(value: &'a Option<String>, name: &str) -> color_eyre::Result<&'a str> {
    value
        .as_deref()
        .ok_or_else(|| color_eyre::eyre::eyre!("JWK missing '{name}'"))
}

/// Verify a token against a JWK without going through jwkmint's own verifier
pub fn verify_with_jwk(token: &str, jwk_json: &[u8]) -> color_eyre::Result<Value> {
    let jwk: JsonWebKey = serde_json::from_slice(jwk_json)?;

    // jsonwebtoken cannot parse ES512 headers
    if decode_segment(token, 0)["alg"] == "ES512" {
        return verify_es512(token, &jwk);
    }

    let header = decode_header(token)?;

    let decoding_key = match jwk.kty.as_str() {
        "RSA" => DecodingKey::from_rsa_components(member(&jwk.n, "n")?, member(&jwk.e, "e")?)?,
        "EC" => DecodingKey::from_ec_components(member(&jwk.x, "x")?, member(&jwk.y, "y")?)?,
        "OKP" => DecodingKey::from_ed_components(member(&jwk.x, "x")?)?,
        other => return Err(color_eyre::eyre::eyre!("Unexpected kty {other}")),
    };

    let mut validation = Validation::new(header.alg);
    validation.required_spec_claims.clear();
    validation.validate_aud = false;
    validation.validate_exp = false;

    let decoded = decode::<Value>(token, &decoding_key, &validation)?;
    Ok(decoded.claims)
}

fn verify_es512(token: &str, jwk: &JsonWebKey) -> color_eyre::Result<Value> {
    let mut point = vec![0x04];
    point.extend(URL_SAFE_NO_PAD.decode(member(&jwk.x, "x")?)?);
    point.extend(URL_SAFE_NO_PAD.decode(member(&jwk.y, "y")?)?);
    let verifying_key = VerifyingKey::from_sec1_bytes(&point)?;

    let (signing_input, signature) = token
        .rsplit_once('.')
        .ok_or_else(|| color_eyre::eyre::eyre!("Token has no signature"))?;
    let signature = Signature::from_slice(&URL_SAFE_NO_PAD.decode(signature)?)?;

    verifying_key.verify(signing_input.as_bytes(), &signature)?;
    Ok(decode_segment(token, 1))
}
