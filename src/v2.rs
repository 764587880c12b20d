//! Version2 engine: hybrid encryption with an AEAD cipher.
//!
//! Same multi-recipient wrapping strategy as Version1, but AES-256-GCM
//! authenticates the ciphertext atomically, so there is no detached HMAC
//! and no intermediate secrets bundle: the raw per-message content key is
//! RSA-wrapped per recipient, and the IV and authentication tag travel
//! alongside the ciphertext.
//!
//! Construction asserts once per process that the AEAD mode and its
//! detached-tag handling actually work, failing fast with
//! `RequirementsFailure` rather than ever producing an unauthenticated
//! envelope.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use serde_json::Value;
use zeroize::Zeroizing;

use crate::authz;
use crate::error::{EncryptedAttributeError, Result};
use crate::keys::EncryptionKey;
use crate::secret::{self, CONTENT_KEY_BYTES};
use crate::wire::{self, AeadBlock, V2Payload, VERSION2_CLASS};

const AEAD_CIPHER: &str = "aes-256-gcm";
const IV_BYTES: usize = 12;
const TAG_BYTES: usize = 16;

#[derive(Clone, Debug, Default)]
pub struct Version2 {
    payload: Option<V2Payload>,
}

impl Version2 {
    pub fn new() -> Result<Self> {
        aead_support()?;
        Ok(Self { payload: None })
    }

    pub(crate) fn from_payload(payload: V2Payload) -> Result<Self> {
        aead_support()?;
        Ok(Self {
            payload: Some(payload),
        })
    }

    /// Replace the envelope contents wholesale with a freshly generated
    /// content key and IV.
    pub fn encrypt(&mut self, value: &Value, keys: &[EncryptionKey]) -> Result<()> {
        let recipients = authz::dedup(keys)?;
        let cleartext = wire::json_encode(value)?;

        let content_key = secret::random_secret(CONTENT_KEY_BYTES)?;
        let iv = secret::random_iv(IV_BYTES)?;
        let cipher = Aes256Gcm::new_from_slice(&content_key)
            .map_err(|e| EncryptedAttributeError::EncryptionFailure(e.to_string()))?;
        let mut sealed = cipher
            .encrypt(Nonce::from_slice(&iv), cleartext.as_bytes())
            .map_err(|_| EncryptedAttributeError::EncryptionFailure("aead seal failed".into()))?;
        if sealed.len() < TAG_BYTES {
            return Err(EncryptedAttributeError::EncryptionFailure(
                "aead ciphertext shorter than its tag".into(),
            ));
        }
        let tag = sealed.split_off(sealed.len() - TAG_BYTES);

        let encrypted_data = AeadBlock {
            cipher: AEAD_CIPHER.into(),
            iv: wire::b64_encode(&iv),
            auth_tag: wire::b64_encode(&tag),
            data: wire::b64_encode(&sealed),
        };

        let mut encrypted_secret = BTreeMap::new();
        for (fingerprint, key) in recipients {
            let wrapped = key.wrap(&content_key)?;
            encrypted_secret.insert(fingerprint, wire::b64_encode(&wrapped));
        }

        self.payload = Some(V2Payload {
            encrypted_data,
            encrypted_secret,
        });
        Ok(())
    }

    pub fn decrypt(&self, key: &EncryptionKey) -> Result<Value> {
        let payload = self.payload()?;
        let fingerprint = key.fingerprint()?;
        let wrapped = payload.encrypted_secret.get(&fingerprint).ok_or_else(|| {
            EncryptedAttributeError::DecryptionFailure(
                "attribute cannot be decrypted with the provided key".into(),
            )
        })?;
        let content_key = Zeroizing::new(key.unwrap(&wire::b64_decode(wrapped)?)?);

        if payload.encrypted_data.cipher != AEAD_CIPHER {
            return Err(EncryptedAttributeError::DecryptionFailure(format!(
                "unsupported cipher: {}",
                payload.encrypted_data.cipher
            )));
        }
        let iv = wire::b64_decode(&payload.encrypted_data.iv)?;
        if iv.len() != IV_BYTES {
            return Err(EncryptedAttributeError::DecryptionFailure(
                "unexpected iv length".into(),
            ));
        }
        let tag = wire::b64_decode(&payload.encrypted_data.auth_tag)?;
        let mut sealed = wire::b64_decode(&payload.encrypted_data.data)?;
        sealed.extend_from_slice(&tag);

        let cipher = Aes256Gcm::new_from_slice(&content_key)
            .map_err(|e| EncryptedAttributeError::DecryptionFailure(e.to_string()))?;
        let cleartext = Zeroizing::new(
            cipher
                .decrypt(Nonce::from_slice(&iv), sealed.as_slice())
                .map_err(|_| {
                    EncryptedAttributeError::DecryptionFailure(
                        "aead open failed: tag mismatch or corrupt ciphertext".into(),
                    )
                })?,
        );
        wire::json_decode(&cleartext)
    }

    pub fn can_be_decrypted_by(&self, keys: &[EncryptionKey]) -> Result<bool> {
        let target = authz::fingerprint_set(keys)?;
        Ok(authz::covers(self.stored(), &target))
    }

    pub fn needs_update(&self, keys: &[EncryptionKey]) -> Result<bool> {
        let target = authz::fingerprint_set(keys)?;
        Ok(authz::needs_update(self.stored(), &target))
    }

    pub fn to_value(&self) -> Result<Value> {
        wire::write_tagged(VERSION2_CLASS, self.payload()?)
    }

    fn payload(&self) -> Result<&V2Payload> {
        self.payload.as_ref().ok_or_else(|| {
            EncryptedAttributeError::DecryptionFailure("envelope holds no encrypted data".into())
        })
    }

    fn stored(&self) -> &BTreeMap<String, String> {
        static EMPTY: BTreeMap<String, String> = BTreeMap::new();
        self.payload
            .as_ref()
            .map(|p| &p.encrypted_secret)
            .unwrap_or(&EMPTY)
    }
}

/// One-time known-answer self-check of the AEAD mode.
///
/// Seals and opens a probe message with a fixed key, then confirms a
/// flipped tag byte is rejected. The result is cached for the process
/// lifetime.
fn aead_support() -> Result<()> {
    static CHECK: OnceLock<Option<String>> = OnceLock::new();
    let failure = CHECK.get_or_init(|| {
        let key = [0u8; CONTENT_KEY_BYTES];
        let iv = [0u8; IV_BYTES];
        let cipher = match Aes256Gcm::new_from_slice(&key) {
            Ok(c) => c,
            Err(e) => return Some(e.to_string()),
        };
        let mut sealed = match cipher.encrypt(Nonce::from_slice(&iv), b"probe".as_ref()) {
            Ok(s) => s,
            Err(_) => return Some("aead seal failed".into()),
        };
        if sealed.len() != b"probe".len() + TAG_BYTES {
            return Some("unexpected authentication tag layout".into());
        }
        match cipher.decrypt(Nonce::from_slice(&iv), sealed.as_slice()) {
            Ok(pt) if pt == b"probe" => {}
            _ => return Some("aead open failed".into()),
        }
        let last = sealed.len() - 1;
        sealed[last] ^= 0x01;
        if cipher.decrypt(Nonce::from_slice(&iv), sealed.as_slice()).is_ok() {
            return Some("tag verification not enforced".into());
        }
        None
    });
    match failure {
        None => Ok(()),
        Some(msg) => Err(EncryptedAttributeError::RequirementsFailure(format!(
            "{AEAD_CIPHER} unavailable: {msg}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aead_self_check_passes() {
        aead_support().unwrap();
        assert!(Version2::new().is_ok());
    }
}
