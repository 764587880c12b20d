//! # Encrypted Attributes
//!
//! Versioned multi-recipient envelope encryption for shared attribute
//! storage. Sensitive values live inside ordinary attribute data as tagged
//! maps that only holders of specific RSA private keys can open.
//!
//! ## Quick Start
//!
//! ```rust
//! use encrypted_attributes::{Envelope, EncryptionKey, FormatVersion};
//! use serde_json::json;
//!
//! let key = EncryptionKey::generate().unwrap();
//! let mut envelope = Envelope::create(FormatVersion::V1).unwrap();
//! envelope
//!     .encrypt(&json!({"password": "s3cr3t"}), std::slice::from_ref(&key))
//!     .unwrap();
//!
//! // Store the tagged map anywhere; parse + decrypt it later.
//! let stored = envelope.to_value().unwrap();
//! let loaded = Envelope::parse(&stored).unwrap();
//! assert_eq!(loaded.decrypt(&key).unwrap(), json!({"password": "s3cr3t"}));
//! ```
//!
//! ## Protocol Properties
//!
//! - **Multi-recipient**: one envelope, independently decryptable by every
//!   authorized private key
//! - **Fingerprint authorization**: recipients are compared by SHA-1 of
//!   their DER public keys, tolerant of re-encoding
//! - **Rotation detection**: `needs_update` flags any drift between the
//!   stored recipient set and the target set
//! - **Stable wire format**: versioned, self-describing tagged maps
//!
//! ## What's NOT Provided
//!
//! - Recipient discovery (who is currently authorized)
//! - Attribute storage and retrieval
//! - Network transport
//! - Command-line tooling

#![deny(unsafe_code)]

// ---------------------------------------------------------------------------
// Internal modules
// ---------------------------------------------------------------------------

mod authz;
mod cache;
mod config;
mod envelope;
mod error;
mod keys;
mod secret;
mod v0;
mod v1;
mod v2;

// Wire module is exposed for collaborators that need the tag and field
// constants, but its internals are not considered stable API.
pub mod wire;

// ---------------------------------------------------------------------------
// Public interface
// ---------------------------------------------------------------------------

pub use cache::{LruCache, DEFAULT_MAX_SIZE};
pub use config::EncryptionConfig;
pub use envelope::{Envelope, FormatVersion};
pub use error::{EncryptedAttributeError, Result};
pub use keys::{EncryptionKey, KEY_BITS};
pub use v0::Version0;
pub use v1::Version1;
pub use v2::Version2;
