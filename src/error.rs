//! Error taxonomy for the encrypted-attributes protocol.
//!
//! Every failure is terminal to the call that raised it; nothing is retried
//! internally. Retry and rotation policy belong to the caller.

use thiserror::Error;

/// Errors raised while building, parsing, or opening encrypted attributes.
#[derive(Error, Debug)]
pub enum EncryptedAttributeError {
    /// No engine is registered for the requested format version.
    #[error("unsupported encrypted attribute format: {0}")]
    UnsupportedFormat(String),

    /// The tagged map is not an encrypted attribute, or its tags are
    /// missing or malformed.
    #[error("unacceptable encrypted attribute format: {0}")]
    UnacceptableFormat(String),

    /// Key material could not be parsed or is unusable.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// A public key could not be parsed or encoded.
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    /// The operation requires a private key the caller does not hold.
    #[error("missing private key: {0}")]
    MissingPrivateKey(String),

    /// A cipher failed while building an envelope.
    #[error("encryption failed: {0}")]
    EncryptionFailure(String),

    /// A cipher, lookup, or decode failed while opening an envelope.
    #[error("decryption failed: {0}")]
    DecryptionFailure(String),

    /// The HMAC primitive itself failed (key setup, unsupported algorithm).
    /// A mismatched MAC is a [`DecryptionFailure`], not this.
    ///
    /// [`DecryptionFailure`]: EncryptedAttributeError::DecryptionFailure
    #[error("message authentication failed: {0}")]
    MessageAuthenticationFailure(String),

    /// The cryptography provider lacks a required capability.
    #[error("cryptographic requirements not met: {0}")]
    RequirementsFailure(String),
}

/// Result type alias for encrypted-attribute operations.
pub type Result<T> = std::result::Result<T, EncryptedAttributeError>;
