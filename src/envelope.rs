//! Envelope format registry and dispatch.
//!
//! Version resolution goes through the static [`FormatVersion`] table:
//! version numbers and class tags map to engines through explicit match
//! arms, never through dynamic lookup of caller-supplied strings.
//! Unconstrained string-to-type resolution is a type-confusion risk this
//! design deliberately rules out.

use std::str::FromStr;

use serde_json::Value;
use tracing::debug;

use crate::error::{EncryptedAttributeError, Result};
use crate::keys::EncryptionKey;
use crate::v0::Version0;
use crate::v1::Version1;
use crate::v2::Version2;
use crate::wire::{self, VERSION0_CLASS, VERSION1_CLASS, VERSION2_CLASS};

// ---------------------------------------------------------------------------
// Static version registry
// ---------------------------------------------------------------------------

/// The envelope format versions this crate knows how to build and open.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FormatVersion {
    /// Legacy multi-recipient RSA-only encryption, no integrity check.
    V0,
    /// AES-256-CBC with a detached HMAC-SHA256 (encrypt-then-MAC).
    V1,
    /// AES-256-GCM authenticated encryption.
    V2,
}

impl FormatVersion {
    /// Default version for newly created envelopes.
    pub const DEFAULT: FormatVersion = FormatVersion::V1;

    pub fn number(self) -> u32 {
        match self {
            Self::V0 => 0,
            Self::V1 => 1,
            Self::V2 => 2,
        }
    }

    /// The `x_json_class` tag value for this version.
    pub fn class_name(self) -> &'static str {
        match self {
            Self::V0 => VERSION0_CLASS,
            Self::V1 => VERSION1_CLASS,
            Self::V2 => VERSION2_CLASS,
        }
    }

    fn from_class(class: &str) -> Option<Self> {
        match class {
            VERSION0_CLASS => Some(Self::V0),
            VERSION1_CLASS => Some(Self::V1),
            VERSION2_CLASS => Some(Self::V2),
            _ => None,
        }
    }
}

impl TryFrom<u32> for FormatVersion {
    type Error = EncryptedAttributeError;

    fn try_from(n: u32) -> Result<Self> {
        match n {
            0 => Ok(Self::V0),
            1 => Ok(Self::V1),
            2 => Ok(Self::V2),
            _ => Err(EncryptedAttributeError::UnsupportedFormat(n.to_string())),
        }
    }
}

impl FromStr for FormatVersion {
    type Err = EncryptedAttributeError;

    /// Accepts numeral strings ("0", "1", "2").
    fn from_str(s: &str) -> Result<Self> {
        let n: u32 = s
            .trim()
            .parse()
            .map_err(|_| EncryptedAttributeError::UnsupportedFormat(s.to_string()))?;
        Self::try_from(n)
    }
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// A versioned encrypted-attribute envelope.
///
/// Created wholesale by [`encrypt`](Envelope::encrypt); updates always
/// re-encrypt with freshly generated secret material, never edit fields
/// incrementally.
#[derive(Clone, Debug)]
pub enum Envelope {
    V0(Version0),
    V1(Version1),
    V2(Version2),
}

impl Envelope {
    /// Instantiate an empty engine for a format version.
    pub fn create(version: FormatVersion) -> Result<Self> {
        Ok(match version {
            FormatVersion::V0 => Self::V0(Version0::new()),
            FormatVersion::V1 => Self::V1(Version1::new()),
            FormatVersion::V2 => Self::V2(Version2::new()?),
        })
    }

    /// Inspect the tags of a serialized envelope and dispatch to the
    /// matching engine, deep-copying all fields except the tags.
    pub fn parse(value: &Value) -> Result<Self> {
        let class = wire::read_tags(value)?;
        let version = FormatVersion::from_class(class).ok_or_else(|| {
            EncryptedAttributeError::UnsupportedFormat(class.to_string())
        })?;
        debug!(version = version.number(), "parsed encrypted attribute");
        Ok(match version {
            FormatVersion::V0 => Self::V0(Version0::from_payload(wire::read_payload(value)?)),
            FormatVersion::V1 => Self::V1(Version1::from_payload(wire::read_payload(value)?)),
            FormatVersion::V2 => Self::V2(Version2::from_payload(wire::read_payload(value)?)?),
        })
    }

    pub fn version(&self) -> FormatVersion {
        match self {
            Self::V0(_) => FormatVersion::V0,
            Self::V1(_) => FormatVersion::V1,
            Self::V2(_) => FormatVersion::V2,
        }
    }

    /// Encrypt `value` for every distinct recipient in `keys`, replacing
    /// any previous contents and secret material wholesale.
    pub fn encrypt(&mut self, value: &Value, keys: &[EncryptionKey]) -> Result<()> {
        match self {
            Self::V0(e) => e.encrypt(value, keys),
            Self::V1(e) => e.encrypt(value, keys),
            Self::V2(e) => e.encrypt(value, keys),
        }
    }

    /// Recover the cleartext with one recipient's private key.
    pub fn decrypt(&self, key: &EncryptionKey) -> Result<Value> {
        match self {
            Self::V0(e) => e.decrypt(key),
            Self::V1(e) => e.decrypt(key),
            Self::V2(e) => e.decrypt(key),
        }
    }

    /// True iff every key in `keys` has a matching fingerprint entry.
    pub fn can_be_decrypted_by(&self, keys: &[EncryptionKey]) -> Result<bool> {
        match self {
            Self::V0(e) => e.can_be_decrypted_by(keys),
            Self::V1(e) => e.can_be_decrypted_by(keys),
            Self::V2(e) => e.can_be_decrypted_by(keys),
        }
    }

    /// True iff the stored recipient set is not exactly `keys`.
    pub fn needs_update(&self, keys: &[EncryptionKey]) -> Result<bool> {
        match self {
            Self::V0(e) => e.needs_update(keys),
            Self::V1(e) => e.needs_update(keys),
            Self::V2(e) => e.needs_update(keys),
        }
    }

    /// Rotate the recipient set: decrypt with a held private key, then
    /// fully re-encrypt for the new target set with fresh secret material.
    pub fn rekey(&mut self, private: &EncryptionKey, keys: &[EncryptionKey]) -> Result<()> {
        let value = self.decrypt(private)?;
        self.encrypt(&value, keys)
    }

    /// Serialize to the tagged key/value wire format.
    pub fn to_value(&self) -> Result<Value> {
        match self {
            Self::V0(e) => e.to_value(),
            Self::V1(e) => e.to_value(),
            Self::V2(e) => e.to_value(),
        }
    }
}
