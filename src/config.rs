//! Encryption configuration.
//!
//! Callers hold one of these per deployment: which envelope version new
//! attributes are written with, and which standing keys are always added
//! to the recipient set (operator escape hatches, backup keys). Invalid
//! PEM in the standing list surfaces when the target set is materialized,
//! not at construction, so configs can be loaded before keys exist.

use serde::{Deserialize, Serialize};

use crate::envelope::FormatVersion;
use crate::error::Result;
use crate::keys::EncryptionKey;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EncryptionConfig {
    #[serde(default = "default_version")]
    version: u32,
    #[serde(default)]
    keys: Vec<String>,
}

fn default_version() -> u32 {
    FormatVersion::DEFAULT.number()
}

impl EncryptionConfig {
    pub fn new() -> Self {
        Self {
            version: default_version(),
            keys: Vec::new(),
        }
    }

    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Standing recipient keys as PEM strings, merged into every target set.
    pub fn with_keys<I>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        self.keys = keys.into_iter().collect();
        self
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn format_version(&self) -> Result<FormatVersion> {
        FormatVersion::try_from(self.version)
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// The full target recipient set: discovered keys plus the standing
    /// configured keys, deduplicated by fingerprint.
    pub fn target_keys(&self, discovered: &[EncryptionKey]) -> Result<Vec<EncryptionKey>> {
        let mut merged: Vec<EncryptionKey> = discovered.to_vec();
        for pem in &self.keys {
            merged.push(EncryptionKey::from_pem(pem)?);
        }

        let mut seen = std::collections::BTreeSet::new();
        let mut unique = Vec::with_capacity(merged.len());
        for key in merged {
            if seen.insert(key.fingerprint()?) {
                unique.push(key);
            }
        }
        Ok(unique)
    }
}

impl Default for EncryptionConfig {
    fn default() -> Self {
        Self::new()
    }
}
