//! Version1 engine: hybrid encryption with a detached HMAC.
//!
//! RSA cannot safely wrap arbitrary-length payloads per recipient, so only
//! small shared secrets are RSA-wrapped; the bulk payload is encrypted once
//! with AES-256-CBC. Integrity comes from HMAC-SHA256 over the ciphertext
//! block (encrypt-then-MAC), keyed by a second random secret that travels
//! in the same wrapped bundle.
//!
//! Secrets bundle (RSA-wrapped once per distinct recipient fingerprint):
//!   `{"data": base64(content_key), "hmac": base64(hmac_key)}`
//!
//! The MAC pre-image is the canonical field-sorted JSON encoding of the
//! `{cipher, data, iv}` block. Verification always precedes symmetric
//! decryption.

use std::collections::BTreeMap;

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::authz;
use crate::error::{EncryptedAttributeError, Result};
use crate::keys::EncryptionKey;
use crate::secret::{self, CONTENT_KEY_BYTES, HMAC_KEY_BYTES};
use crate::wire::{self, CipherBlock, HmacBlock, V1Payload, VERSION1_CLASS};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;
type HmacSha256 = Hmac<Sha256>;

const SYMMETRIC_CIPHER: &str = "aes-256-cbc";
const HMAC_ALGORITHM: &str = "sha256";
const IV_BYTES: usize = 16;

/// Wrapped per recipient; never persisted unwrapped.
#[derive(Serialize, Deserialize)]
struct SecretsBundle {
    data: String,
    hmac: String,
}

#[derive(Clone, Debug, Default)]
pub struct Version1 {
    payload: Option<V1Payload>,
}

impl Version1 {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_payload(payload: V1Payload) -> Self {
        Self {
            payload: Some(payload),
        }
    }

    /// Replace the envelope contents wholesale with freshly generated
    /// secret material. Rotated-out recipients lose all future
    /// derivability because both secrets are regenerated on every call.
    pub fn encrypt(&mut self, value: &Value, keys: &[EncryptionKey]) -> Result<()> {
        let recipients = authz::dedup(keys)?;
        let cleartext = wire::json_encode(value)?;

        let content_key = secret::random_secret(CONTENT_KEY_BYTES)?;
        let iv = secret::random_iv(IV_BYTES)?;
        let ciphertext = Aes256CbcEnc::new_from_slices(&content_key, &iv)
            .map_err(|e| EncryptedAttributeError::EncryptionFailure(e.to_string()))?
            .encrypt_padded_vec_mut::<Pkcs7>(cleartext.as_bytes());

        let encrypted_data = CipherBlock {
            cipher: SYMMETRIC_CIPHER.into(),
            iv: wire::b64_encode(&iv),
            data: wire::b64_encode(&ciphertext),
        };

        let hmac_key = secret::random_secret(HMAC_KEY_BYTES).map_err(|_| {
            EncryptedAttributeError::MessageAuthenticationFailure("rng failure".into())
        })?;
        let mac = compute_hmac(&hmac_key, mac_input(&encrypted_data)?.as_bytes())?;
        let hmac = HmacBlock {
            cipher: HMAC_ALGORITHM.into(),
            data: wire::b64_encode(&mac),
        };

        let bundle = Zeroizing::new(
            serde_json::to_string(&SecretsBundle {
                data: wire::b64_encode(&content_key),
                hmac: wire::b64_encode(&hmac_key),
            })
            .map_err(|e| EncryptedAttributeError::EncryptionFailure(e.to_string()))?,
        );

        let mut encrypted_secret = BTreeMap::new();
        for (fingerprint, key) in recipients {
            let wrapped = key.wrap(bundle.as_bytes())?;
            encrypted_secret.insert(fingerprint, wire::b64_encode(&wrapped));
        }

        self.payload = Some(V1Payload {
            encrypted_data,
            hmac,
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
        let bundle_json = Zeroizing::new(key.unwrap(&wire::b64_decode(wrapped)?)?);
        let bundle: SecretsBundle = serde_json::from_slice(&bundle_json)
            .map_err(|e| EncryptedAttributeError::DecryptionFailure(e.to_string()))?;
        let content_key = Zeroizing::new(wire::b64_decode(&bundle.data)?);
        let hmac_key = Zeroizing::new(wire::b64_decode(&bundle.hmac)?);

        // MAC verification precedes any symmetric decryption.
        if payload.hmac.cipher != HMAC_ALGORITHM {
            return Err(EncryptedAttributeError::MessageAuthenticationFailure(
                format!("unsupported hmac algorithm: {}", payload.hmac.cipher),
            ));
        }
        let expected = wire::b64_decode(&payload.hmac.data)?;
        verify_hmac(
            &hmac_key,
            mac_input(&payload.encrypted_data)?.as_bytes(),
            &expected,
        )?;

        if payload.encrypted_data.cipher != SYMMETRIC_CIPHER {
            return Err(EncryptedAttributeError::DecryptionFailure(format!(
                "unsupported cipher: {}",
                payload.encrypted_data.cipher
            )));
        }
        let iv = wire::b64_decode(&payload.encrypted_data.iv)?;
        let data = wire::b64_decode(&payload.encrypted_data.data)?;
        let cleartext = Zeroizing::new(
            Aes256CbcDec::new_from_slices(&content_key, &iv)
                .map_err(|e| EncryptedAttributeError::DecryptionFailure(e.to_string()))?
                .decrypt_padded_vec_mut::<Pkcs7>(&data)
                .map_err(|_| {
                    EncryptedAttributeError::DecryptionFailure(
                        "symmetric decryption failed".into(),
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
        wire::write_tagged(VERSION1_CLASS, self.payload()?)
    }

    fn payload(&self) -> Result<&V1Payload> {
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

/// Canonical MAC pre-image: the `{cipher, data, iv}` block as JSON with
/// lexicographically sorted keys.
fn mac_input(block: &CipherBlock) -> Result<String> {
    let sorted: BTreeMap<&str, &str> = [
        ("cipher", block.cipher.as_str()),
        ("data", block.data.as_str()),
        ("iv", block.iv.as_str()),
    ]
    .into_iter()
    .collect();
    serde_json::to_string(&sorted)
        .map_err(|e| EncryptedAttributeError::MessageAuthenticationFailure(e.to_string()))
}

fn compute_hmac(key: &[u8], input: &[u8]) -> Result<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| EncryptedAttributeError::MessageAuthenticationFailure(e.to_string()))?;
    mac.update(input);
    Ok(mac.finalize().into_bytes().to_vec())
}

fn verify_hmac(key: &[u8], input: &[u8], expected: &[u8]) -> Result<()> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| EncryptedAttributeError::MessageAuthenticationFailure(e.to_string()))?;
    mac.update(input);
    mac.verify_slice(expected)
        .map_err(|_| EncryptedAttributeError::DecryptionFailure("invalid hmac".into()))
}
