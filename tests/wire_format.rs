//! Wire-format known answers: tag values, field names, and dispatch
//! failures are part of the compatibility contract.

use std::sync::OnceLock;

use encrypted_attributes::{
    wire, EncryptedAttributeError, EncryptionKey, Envelope, FormatVersion,
};
use serde_json::{json, Value};

fn keys() -> &'static [EncryptionKey] {
    static KEYS: OnceLock<Vec<EncryptionKey>> = OnceLock::new();
    KEYS.get_or_init(|| (0..2).map(|_| EncryptionKey::generate().unwrap()).collect())
}

fn serialized(version: FormatVersion) -> Value {
    let mut envelope = Envelope::create(version).unwrap();
    envelope.encrypt(&json!({"a": 1}), &keys()[..2]).unwrap();
    envelope.to_value().unwrap()
}

fn is_fingerprint(s: &str) -> bool {
    s.len() == 40 && s.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
}

#[test]
fn tag_constants() {
    assert_eq!(wire::JSON_CLASS, "x_json_class");
    assert_eq!(wire::CHEF_TYPE, "chef_type");
    assert_eq!(wire::CHEF_TYPE_VALUE, "encrypted_attribute");
    assert_eq!(
        wire::VERSION1_CLASS,
        "Chef::EncryptedAttribute::EncryptedMash::Version1"
    );
}

#[test]
fn every_version_carries_both_tags() {
    for version in [FormatVersion::V0, FormatVersion::V1, FormatVersion::V2] {
        let value = serialized(version);
        assert_eq!(
            value[wire::JSON_CLASS].as_str().unwrap(),
            version.class_name(),
            "{version:?}"
        );
        assert_eq!(
            value[wire::CHEF_TYPE].as_str().unwrap(),
            wire::CHEF_TYPE_VALUE,
            "{version:?}"
        );
    }
}

#[test]
fn version0_field_layout() {
    let value = serialized(FormatVersion::V0);
    let data = value["encrypted_data"].as_object().unwrap();
    assert_eq!(data.len(), 2);
    for (fingerprint, ciphertext) in data {
        assert!(is_fingerprint(fingerprint), "bad fingerprint {fingerprint}");
        assert!(!ciphertext.as_str().unwrap().is_empty());
    }
}

#[test]
fn version1_field_layout() {
    let value = serialized(FormatVersion::V1);

    let data = value["encrypted_data"].as_object().unwrap();
    assert_eq!(data["cipher"], "aes-256-cbc");
    assert!(!data["iv"].as_str().unwrap().is_empty());
    assert!(!data["data"].as_str().unwrap().is_empty());

    let hmac = value["hmac"].as_object().unwrap();
    assert_eq!(hmac["cipher"], "sha256");
    assert!(!hmac["data"].as_str().unwrap().is_empty());

    let secrets = value["encrypted_secret"].as_object().unwrap();
    assert_eq!(secrets.len(), 2);
    for fingerprint in secrets.keys() {
        assert!(is_fingerprint(fingerprint));
    }
}

#[test]
fn version2_field_layout() {
    let value = serialized(FormatVersion::V2);

    let data = value["encrypted_data"].as_object().unwrap();
    assert_eq!(data["cipher"], "aes-256-gcm");
    assert!(!data["iv"].as_str().unwrap().is_empty());
    assert!(!data["data"].as_str().unwrap().is_empty());
    assert!(!data["auth_tag"].as_str().unwrap().is_empty());

    let secrets = value["encrypted_secret"].as_object().unwrap();
    assert_eq!(secrets.len(), 2);
}

#[test]
fn wrapped_secrets_are_keyed_by_recipient_fingerprint() {
    let value = serialized(FormatVersion::V1);
    let secrets = value["encrypted_secret"].as_object().unwrap();
    for key in &keys()[..2] {
        let fingerprint = key.fingerprint().unwrap();
        assert!(secrets.contains_key(&fingerprint));
    }
}

#[test]
fn parse_rejects_unknown_version() {
    let value = json!({
        "x_json_class": "Chef::EncryptedAttribute::EncryptedMash::Version9",
        "chef_type": "encrypted_attribute",
        "encrypted_data": {},
    });
    assert!(matches!(
        Envelope::parse(&value),
        Err(EncryptedAttributeError::UnsupportedFormat(_))
    ));
}

#[test]
fn parse_rejects_bad_tags() {
    // Missing type tag.
    let missing_type = json!({
        "x_json_class": wire::VERSION1_CLASS,
        "encrypted_data": {},
    });
    // Mismatched type tag.
    let wrong_type = json!({
        "x_json_class": wire::VERSION1_CLASS,
        "chef_type": "node",
    });
    // Empty version tag.
    let empty_class = json!({
        "x_json_class": "",
        "chef_type": "encrypted_attribute",
    });
    // Not a map at all.
    let not_a_map = json!(["encrypted_attribute"]);

    for value in [missing_type, wrong_type, empty_class, not_a_map] {
        assert!(matches!(
            Envelope::parse(&value),
            Err(EncryptedAttributeError::UnacceptableFormat(_))
        ));
    }
}

#[test]
fn parse_rejects_malformed_payload() {
    // Version1 without its hmac block is not an acceptable envelope.
    let value = json!({
        "x_json_class": wire::VERSION1_CLASS,
        "chef_type": "encrypted_attribute",
        "encrypted_data": {"cipher": "aes-256-cbc", "iv": "aXY=", "data": "ZGF0YQ=="},
        "encrypted_secret": {},
    });
    assert!(matches!(
        Envelope::parse(&value),
        Err(EncryptedAttributeError::UnacceptableFormat(_))
    ));
}

#[test]
fn create_accepts_numbers_and_numeral_strings() {
    for (numeral, expected) in [
        ("0", FormatVersion::V0),
        ("1", FormatVersion::V1),
        ("2", FormatVersion::V2),
    ] {
        let version: FormatVersion = numeral.parse().unwrap();
        assert_eq!(version, expected);
        assert_eq!(Envelope::create(version).unwrap().version(), expected);
    }
    assert!(matches!(
        "3".parse::<FormatVersion>(),
        Err(EncryptedAttributeError::UnsupportedFormat(_))
    ));
}
