//! Recipient-set authorization.
//!
//! All recipient comparison in this crate goes through public-key
//! fingerprints. Key objects, PEM text, and encoding variants never take
//! part in a comparison, so re-encoded copies of the same key always match.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::error::Result;
use crate::keys::EncryptionKey;

/// Derive the deduplicated fingerprint set of a target key list.
pub(crate) fn fingerprint_set(keys: &[EncryptionKey]) -> Result<BTreeSet<String>> {
    keys.iter().map(|k| k.fingerprint()).collect()
}

/// Deduplicate a recipient list by fingerprint, keeping the first copy of
/// each key. The map is ordered by fingerprint so wrapped-secret maps come
/// out deterministic.
pub(crate) fn dedup(keys: &[EncryptionKey]) -> Result<BTreeMap<String, &EncryptionKey>> {
    let mut recipients = BTreeMap::new();
    for key in keys {
        recipients.entry(key.fingerprint()?).or_insert(key);
    }
    Ok(recipients)
}

/// True iff every target fingerprint has an entry in the stored map.
pub(crate) fn covers(stored: &BTreeMap<String, String>, target: &BTreeSet<String>) -> bool {
    target.iter().all(|fp| stored.contains_key(fp))
}

/// True iff the stored map holds exactly the target set: full membership
/// and equal cardinality.
///
/// The cardinality comparison assumes distinct recipients have distinct
/// SHA-1 fingerprints; colliding fingerprints would make this under- or
/// over-trigger rotation. Carried as-is from the original design.
pub(crate) fn covers_exactly(stored: &BTreeMap<String, String>, target: &BTreeSet<String>) -> bool {
    covers(stored, target) && stored.len() == target.len()
}

/// Rotation decision: the stored recipient set is not exactly the target.
///
/// Recomputed before every write; the result is logged so operators can see
/// why an attribute was (or was not) regenerated.
pub(crate) fn needs_update(stored: &BTreeMap<String, String>, target: &BTreeSet<String>) -> bool {
    let update = !covers_exactly(stored, target);
    debug!(
        stored = stored.len(),
        target = target.len(),
        update, "recipient set rotation check"
    );
    update
}
