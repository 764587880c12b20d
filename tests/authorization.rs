//! Recipient-set authorization drift: `needs_update` decisions across
//! encrypt, target-set changes, and rekey.

use std::sync::OnceLock;

use encrypted_attributes::{EncryptionKey, Envelope, FormatVersion};
use serde_json::json;

fn keys() -> &'static [EncryptionKey] {
    static KEYS: OnceLock<Vec<EncryptionKey>> = OnceLock::new();
    KEYS.get_or_init(|| (0..3).map(|_| EncryptionKey::generate().unwrap()).collect())
}

fn encrypted(version: FormatVersion, recipients: &[EncryptionKey]) -> Envelope {
    let mut envelope = Envelope::create(version).unwrap();
    envelope.encrypt(&json!({"a": 1}), recipients).unwrap();
    envelope
}

#[test]
fn no_drift_right_after_encrypt() {
    for version in [FormatVersion::V0, FormatVersion::V1, FormatVersion::V2] {
        let envelope = encrypted(version, &keys()[..2]);
        assert!(envelope.can_be_decrypted_by(&keys()[..2]).unwrap());
        assert!(!envelope.needs_update(&keys()[..2]).unwrap(), "{version:?}");
    }
}

#[test]
fn added_recipient_triggers_update() {
    let envelope = encrypted(FormatVersion::V1, &keys()[..2]);
    assert!(!envelope.can_be_decrypted_by(keys()).unwrap());
    assert!(envelope.needs_update(keys()).unwrap());
}

#[test]
fn removed_recipient_triggers_update() {
    let envelope = encrypted(FormatVersion::V1, &keys()[..2]);
    // Still decryptable by the remaining key, but the set is too wide.
    assert!(envelope.can_be_decrypted_by(&keys()[..1]).unwrap());
    assert!(envelope.needs_update(&keys()[..1]).unwrap());
}

#[test]
fn reencrypt_clears_drift() {
    let mut envelope = encrypted(FormatVersion::V1, &keys()[..2]);
    assert!(envelope.needs_update(&keys()[..1]).unwrap());

    envelope.encrypt(&json!({"a": 1}), &keys()[..1]).unwrap();
    assert!(!envelope.needs_update(&keys()[..1]).unwrap());
    assert!(envelope.decrypt(&keys()[1]).is_err());
}

#[test]
fn duplicate_target_keys_do_not_skew_cardinality() {
    let envelope = encrypted(FormatVersion::V1, &keys()[..2]);
    let duplicated = [keys()[0].clone(), keys()[0].clone(), keys()[1].clone()];
    assert!(!envelope.needs_update(&duplicated).unwrap());
}

#[test]
fn comparison_tolerates_reencoded_keys() {
    let envelope = encrypted(FormatVersion::V2, &keys()[..1]);
    // A public-only copy parsed back from PEM must compare equal.
    let pem = keys()[0].public_pem().unwrap();
    let reparsed = EncryptionKey::from_pem(&pem).unwrap();
    assert!(envelope.can_be_decrypted_by(&[reparsed]).unwrap());
}

#[test]
fn rekey_rotates_recipients_with_fresh_material() {
    let mut envelope = encrypted(FormatVersion::V1, &keys()[..2]);
    let before = envelope.to_value().unwrap();

    let rotated = [keys()[0].clone(), keys()[2].clone()];
    envelope.rekey(&keys()[0], &rotated).unwrap();

    assert!(!envelope.needs_update(&rotated).unwrap());
    assert_eq!(envelope.decrypt(&keys()[2]).unwrap(), json!({"a": 1}));
    assert!(envelope.decrypt(&keys()[1]).is_err());

    // Full re-encryption: fresh symmetric material, not an edited map.
    let after = envelope.to_value().unwrap();
    assert_ne!(
        before["encrypted_data"]["data"],
        after["encrypted_data"]["data"]
    );
    assert_ne!(before["encrypted_data"]["iv"], after["encrypted_data"]["iv"]);
}

#[test]
fn config_merges_standing_keys_into_target_set() {
    use encrypted_attributes::EncryptionConfig;

    let standing = keys()[2].public_pem().unwrap();
    let config = EncryptionConfig::new().with_keys([standing]);

    let target = config.target_keys(&keys()[..2]).unwrap();
    assert_eq!(target.len(), 3);

    // Standing key already in the discovered set: no duplicate entry.
    let target = config.target_keys(keys()).unwrap();
    assert_eq!(target.len(), 3);

    let mut envelope = Envelope::create(config.format_version().unwrap()).unwrap();
    envelope.encrypt(&json!(1), &target).unwrap();
    assert!(!envelope.needs_update(&target).unwrap());
}
