//! Login password encryption.
//!
//! The login page embeds the portal's RSA public key in an inline script as a
//! bare base64 DER body, normally SPKI but bare PKCS#1 is accepted too.
//! Passwords are sent PKCS#1 v1.5 encrypted and base64 encoded.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rand_core::OsRng;
use regex::Regex;
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::pkcs8::DecodePublicKey;
use rsa::{Pkcs1v15Encrypt, RsaPublicKey};
use std::sync::LazyLock;

use crate::portal::errors::PortalError;
use crate::portal::html::Document;

static PUB_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"jsePubKey\s*=\s*'([+/=0-9A-Za-z]+)'").unwrap());

const PEM_LINE_WIDTH: usize = 64;

/// Extract the public key body from the login page's inline scripts.
pub fn extract_public_key(doc: &Document) -> Result<String, PortalError> {
    doc.script_capture(&PUB_KEY_RE)
        .ok_or(PortalError::KeyNotFound)
}

fn compact(key: &str) -> String {
    key.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Wrap a bare base64 key body into a `PUBLIC KEY` PEM block.
fn pem_block(key: &str) -> String {
    let body = compact(key);
    let mut pem = String::from("-----BEGIN PUBLIC KEY-----\n");
    for line in body.as_bytes().chunks(PEM_LINE_WIDTH) {
        // base64 is ASCII, so byte chunks are valid UTF-8
        pem.push_str(&String::from_utf8_lossy(line));
        pem.push('\n');
    }
    pem.push_str("-----END PUBLIC KEY-----\n");
    pem
}

/// Decode a bare base64 PKCS#1 `RSAPublicKey` body.
fn pkcs1_key(key: &str) -> Option<RsaPublicKey> {
    let der = STANDARD.decode(compact(key)).ok()?;
    RsaPublicKey::from_pkcs1_der(&der).ok()
}

/// PKCS#1 v1.5 encryption under the portal's public key.
#[derive(Debug, Clone)]
pub struct Encryptor {
    key: RsaPublicKey,
}

impl Encryptor {
    /// Parse the key as SPKI, falling back to PKCS#1. The SPKI error is
    /// reported when neither decodes.
    pub fn new(public_key: &str) -> Result<Self, PortalError> {
        let key = match RsaPublicKey::from_public_key_pem(&pem_block(public_key)) {
            Ok(key) => key,
            Err(e) => pkcs1_key(public_key).ok_or(PortalError::KeyFormat(e))?,
        };
        Ok(Self { key })
    }

    /// Encrypt `plain` and return the ciphertext as standard base64.
    ///
    /// Padding is randomized, so the output differs between calls.
    pub fn encrypt(&self, plain: &str) -> Result<String, PortalError> {
        let cipher = self
            .key
            .encrypt(&mut OsRng, Pkcs1v15Encrypt, plain.as_bytes())?;
        Ok(STANDARD.encode(cipher))
    }
}
