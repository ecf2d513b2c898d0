//! Base64 encoding/decoding utilities
//!
//! JOSE segments and JWK members use the URL-safe alphabet without padding
//! (RFC 4648 §5). The opaque `*_b64` outputs use the standard alphabet with padding.

use base64::{
    engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
    Engine,
};

/// Encode bytes to Base64URL string without padding
pub(crate) fn encode(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Decode Base64URL string (no padding) to bytes
pub(crate) fn decode(input: &str) -> Result<Vec<u8>, base64::DecodeError> {
    URL_SAFE_NO_PAD.decode(input)
}

/// Encode bytes with the standard, padded alphabet
pub(crate) fn encode_standard(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}
