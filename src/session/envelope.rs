//! Encrypted session envelopes
//!
//! Envelopes are sealed with AES-256-GCM under a 32-byte key. The stored text
//! is `base64(nonce || ciphertext || tag)` over the JSON-serialized value, with
//! a fresh random nonce per encryption.

use crate::{Error, Result, types::CookieEnvelope};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use ring::aead::{AES_256_GCM, Aad, LessSafeKey, NONCE_LEN, Nonce, UnboundKey};
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Serialize, de::DeserializeOwned};
use std::fmt;

/// Required key length in bytes
pub const KEY_LEN: usize = 32;

/// 32-byte envelope key
#[derive(Clone, PartialEq, Eq)]
pub struct EnvelopeKey([u8; KEY_LEN]);

impl fmt::Debug for EnvelopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EnvelopeKey(<redacted>)")
    }
}

impl EnvelopeKey {
    /// Use raw key bytes; anything but exactly 32 bytes is rejected.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let key: [u8; KEY_LEN] = bytes.try_into().map_err(|_| {
            Error::invalid_key(format!(
                "key must be {} bytes, got {}",
                KEY_LEN,
                bytes.len()
            ))
        })?;
        Ok(Self(key))
    }

    /// Interpret key text as raw bytes, then base64, then hex; the first
    /// reading that yields exactly 32 bytes wins.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(Error::invalid_key("cookie encryption key missing"));
        }
        if raw.len() == KEY_LEN {
            return Self::from_bytes(raw.as_bytes());
        }
        if let Ok(decoded) = STANDARD.decode(raw)
            && decoded.len() == KEY_LEN
        {
            return Self::from_bytes(&decoded);
        }
        if let Ok(decoded) = hex::decode(raw)
            && decoded.len() == KEY_LEN
        {
            return Self::from_bytes(&decoded);
        }
        Err(Error::invalid_key(
            "cookie encryption key must be 32 bytes (raw/base64/hex)",
        ))
    }

    fn aead(&self) -> Result<LessSafeKey> {
        let unbound = UnboundKey::new(&AES_256_GCM, &self.0)
            .map_err(|_| Error::invalid_key("key rejected by cipher"))?;
        Ok(LessSafeKey::new(unbound))
    }
}

/// Seal any serializable value.
pub fn seal<T: Serialize>(key: &EnvelopeKey, value: &T) -> Result<String> {
    let mut in_out = serde_json::to_vec(value)?;

    let mut nonce_bytes = [0u8; NONCE_LEN];
    SystemRandom::new()
        .fill(&mut nonce_bytes)
        .map_err(|_| Error::internal("secure random source unavailable"))?;

    key.aead()?
        .seal_in_place_append_tag(
            Nonce::assume_unique_for_key(nonce_bytes),
            Aad::empty(),
            &mut in_out,
        )
        .map_err(|_| Error::internal("envelope encryption failed"))?;

    let mut sealed = Vec::with_capacity(NONCE_LEN + in_out.len());
    sealed.extend_from_slice(&nonce_bytes);
    sealed.extend_from_slice(&in_out);
    Ok(STANDARD.encode(sealed))
}

/// Open a value sealed by [`seal`]. Fails closed: nothing is decoded unless
/// the authentication tag verifies.
pub fn open<T: DeserializeOwned>(key: &EnvelopeKey, blob: &str) -> Result<T> {
    let sealed = STANDARD
        .decode(blob.trim())
        .map_err(|e| Error::decryption_failed(format!("envelope is not base64: {}", e)))?;
    if sealed.len() < NONCE_LEN + AES_256_GCM.tag_len() {
        return Err(Error::CiphertextTooShort { len: sealed.len() });
    }

    let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);
    let nonce = Nonce::try_assume_unique_for_key(nonce_bytes)
        .map_err(|_| Error::decryption_failed("bad nonce"))?;
    let mut in_out = ciphertext.to_vec();
    let plain = key
        .aead()?
        .open_in_place(nonce, Aad::empty(), &mut in_out)
        .map_err(|_| Error::decryption_failed("authentication failed"))?;

    serde_json::from_slice(plain).map_err(|e| Error::decode("envelope", e))
}

/// Encrypt a cookie envelope for storage as text
pub fn encrypt_envelope(key: &EnvelopeKey, envelope: &CookieEnvelope) -> Result<String> {
    seal(key, envelope)
}

/// Decrypt a cookie envelope produced by [`encrypt_envelope`]
pub fn decrypt_envelope(key: &EnvelopeKey, blob: &str) -> Result<CookieEnvelope> {
    open(key, blob)
}
