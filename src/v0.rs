//! Version0 engine: legacy multi-recipient RSA-only encryption.
//!
//! The cleartext JSON is RSA-encrypted directly under every recipient's
//! public key, so payload size is bounded by the RSA modulus. There is no
//! integrity protection: corrupted ciphertext surfaces as an RSA or JSON
//! decode error, never a dedicated tamper signal. That gap is part of the
//! wire compatibility contract and is preserved exactly.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::authz;
use crate::error::{EncryptedAttributeError, Result};
use crate::keys::EncryptionKey;
use crate::wire::{self, V0Payload, VERSION0_CLASS};

#[derive(Clone, Debug, Default)]
pub struct Version0 {
    payload: Option<V0Payload>,
}

impl Version0 {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_payload(payload: V0Payload) -> Self {
        Self {
            payload: Some(payload),
        }
    }

    /// Replace the envelope contents wholesale: encrypt `value` for every
    /// distinct recipient in `keys`.
    pub fn encrypt(&mut self, value: &Value, keys: &[EncryptionKey]) -> Result<()> {
        let recipients = authz::dedup(keys)?;
        let cleartext = wire::json_encode(value)?;

        let mut encrypted_data = BTreeMap::new();
        for (fingerprint, key) in recipients {
            let wrapped = key.wrap(cleartext.as_bytes())?;
            encrypted_data.insert(fingerprint, wire::b64_encode(&wrapped));
        }

        self.payload = Some(V0Payload { encrypted_data });
        Ok(())
    }

    pub fn decrypt(&self, key: &EncryptionKey) -> Result<Value> {
        let payload = self.payload()?;
        let fingerprint = key.fingerprint()?;
        let wrapped = payload.encrypted_data.get(&fingerprint).ok_or_else(|| {
            EncryptedAttributeError::DecryptionFailure(
                "attribute cannot be decrypted with the provided key".into(),
            )
        })?;
        let cleartext = key.unwrap(&wire::b64_decode(wrapped)?)?;
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
        wire::write_tagged(VERSION0_CLASS, self.payload()?)
    }

    fn payload(&self) -> Result<&V0Payload> {
        self.payload.as_ref().ok_or_else(|| {
            EncryptedAttributeError::DecryptionFailure("envelope holds no encrypted data".into())
        })
    }

    fn stored(&self) -> &BTreeMap<String, String> {
        static EMPTY: BTreeMap<String, String> = BTreeMap::new();
        self.payload
            .as_ref()
            .map(|p| &p.encrypted_data)
            .unwrap_or(&EMPTY)
    }
}
