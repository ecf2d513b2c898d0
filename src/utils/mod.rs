pub(crate) mod base64;
