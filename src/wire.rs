//! Tagged key/value wire format.
//!
//! Every envelope serializes to a JSON object carrying two tags plus
//! version-specific fields. Field names are part of the compatibility
//! contract and are reproduced exactly:
//!
//! Common tags:
//!   `x_json_class`: "Chef::EncryptedAttribute::EncryptedMash::Version<N>"
//!   `chef_type`:    "encrypted_attribute"
//!
//! Version0:
//!   `encrypted_data`: { fingerprint_hex: base64_rsa_ciphertext, ... }
//!
//! Version1:
//!   `encrypted_data`:   { cipher, iv, data }
//!   `hmac`:             { cipher, data }
//!   `encrypted_secret`: { fingerprint_hex: base64_rsa_ct_of_json_secrets }
//!
//! Version2:
//!   `encrypted_data`:   { cipher, iv, auth_tag, data }
//!   `encrypted_secret`: { fingerprint_hex: base64_rsa_ct_of_raw_key }
//!
//! Fingerprint = lowercase hex SHA-1 of the DER-encoded RSA public key
//! (SubjectPublicKeyInfo form).

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{EncryptedAttributeError, Result};

/// Tag naming the serialized envelope class.
pub const JSON_CLASS: &str = "x_json_class";

/// Tag distinguishing encrypted attributes from ordinary attribute data.
pub const CHEF_TYPE: &str = "chef_type";

/// Fixed value of the [`CHEF_TYPE`] tag.
pub const CHEF_TYPE_VALUE: &str = "encrypted_attribute";

pub const VERSION0_CLASS: &str = "Chef::EncryptedAttribute::EncryptedMash::Version0";
pub const VERSION1_CLASS: &str = "Chef::EncryptedAttribute::EncryptedMash::Version1";
pub const VERSION2_CLASS: &str = "Chef::EncryptedAttribute::EncryptedMash::Version2";

// ---------------------------------------------------------------------------
// Version-specific payloads
// ---------------------------------------------------------------------------

/// Version0 payload: one RSA ciphertext per recipient fingerprint.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct V0Payload {
    pub encrypted_data: BTreeMap<String, String>,
}

/// A symmetric ciphertext block (Version1).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CipherBlock {
    pub cipher: String,
    pub iv: String,
    pub data: String,
}

/// A detached MAC block (Version1).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HmacBlock {
    pub cipher: String,
    pub data: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct V1Payload {
    pub encrypted_data: CipherBlock,
    pub hmac: HmacBlock,
    pub encrypted_secret: BTreeMap<String, String>,
}

/// An AEAD ciphertext block with its detached authentication tag (Version2).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AeadBlock {
    pub cipher: String,
    pub iv: String,
    pub auth_tag: String,
    pub data: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct V2Payload {
    pub encrypted_data: AeadBlock,
    pub encrypted_secret: BTreeMap<String, String>,
}

// ---------------------------------------------------------------------------
// Tag handling
// ---------------------------------------------------------------------------

/// Extract the `x_json_class` tag, validating the `chef_type` tag first.
///
/// Returns the class tag string on success. All failures here are
/// [`UnacceptableFormat`]: the input is not a well-tagged encrypted
/// attribute at all, as opposed to a recognized envelope of an unknown
/// version.
///
/// [`UnacceptableFormat`]: EncryptedAttributeError::UnacceptableFormat
pub(crate) fn read_tags(value: &Value) -> Result<&str> {
    let map = value.as_object().ok_or_else(|| {
        EncryptedAttributeError::UnacceptableFormat("expected a key/value map".into())
    })?;

    match map.get(CHEF_TYPE).and_then(Value::as_str) {
        Some(CHEF_TYPE_VALUE) => {}
        Some(other) => {
            return Err(EncryptedAttributeError::UnacceptableFormat(format!(
                "wrong {CHEF_TYPE} tag: {other:?}"
            )))
        }
        None => {
            return Err(EncryptedAttributeError::UnacceptableFormat(format!(
                "missing {CHEF_TYPE} tag"
            )))
        }
    }

    let class = map.get(JSON_CLASS).and_then(Value::as_str).ok_or_else(|| {
        EncryptedAttributeError::UnacceptableFormat(format!("missing {JSON_CLASS} tag"))
    })?;
    if class.trim().is_empty() {
        return Err(EncryptedAttributeError::UnacceptableFormat(format!(
            "empty {JSON_CLASS} tag"
        )));
    }
    Ok(class)
}

/// Deep-copy all fields except the two tags into a typed payload.
pub(crate) fn read_payload<T: serde::de::DeserializeOwned>(value: &Value) -> Result<T> {
    let map = value.as_object().ok_or_else(|| {
        EncryptedAttributeError::UnacceptableFormat("expected a key/value map".into())
    })?;
    let mut body = map.clone();
    body.remove(JSON_CLASS);
    body.remove(CHEF_TYPE);
    serde_json::from_value(Value::Object(body))
        .map_err(|e| EncryptedAttributeError::UnacceptableFormat(e.to_string()))
}

/// Serialize a payload and attach the tags.
pub(crate) fn write_tagged<T: Serialize>(class: &str, payload: &T) -> Result<Value> {
    let mut value = serde_json::to_value(payload)
        .map_err(|e| EncryptedAttributeError::EncryptionFailure(e.to_string()))?;
    let map = value.as_object_mut().ok_or_else(|| {
        EncryptedAttributeError::EncryptionFailure("payload did not serialize to a map".into())
    })?;
    map.insert(JSON_CLASS.into(), Value::String(class.into()));
    map.insert(CHEF_TYPE.into(), Value::String(CHEF_TYPE_VALUE.into()));
    Ok(value)
}

// ---------------------------------------------------------------------------
// Cleartext and binary-field encoding
// ---------------------------------------------------------------------------

/// Canonical cleartext encoding: JSON of the value wrapped in a
/// single-element array. The wrapping avoids ambiguous bare-scalar
/// encodings and applies to every version.
pub(crate) fn json_encode(value: &Value) -> Result<String> {
    serde_json::to_string(&[value])
        .map_err(|e| EncryptedAttributeError::EncryptionFailure(e.to_string()))
}

/// Inverse of [`json_encode`]: parse and unwrap the single element.
pub(crate) fn json_decode(text: &[u8]) -> Result<Value> {
    let parsed: Value = serde_json::from_slice(text)
        .map_err(|e| EncryptedAttributeError::DecryptionFailure(e.to_string()))?;
    match parsed {
        Value::Array(mut items) if items.len() == 1 => Ok(items.remove(0)),
        _ => Err(EncryptedAttributeError::DecryptionFailure(
            "unexpected cleartext encoding".into(),
        )),
    }
}

pub(crate) fn b64_encode(data: &[u8]) -> String {
    BASE64.encode(data)
}

pub(crate) fn b64_decode(text: &str) -> Result<Vec<u8>> {
    BASE64
        .decode(text.trim())
        .map_err(|e| EncryptedAttributeError::DecryptionFailure(e.to_string()))
}
