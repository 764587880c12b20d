//! Transient secret material.
//!
//! Content keys and HMAC keys exist only while an envelope is being built
//! or opened. They are held in [`Zeroizing`] buffers so they are wiped as
//! soon as the envelope is finalized; only their RSA-wrapped form is ever
//! persisted.

use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::Zeroizing;

use crate::error::{EncryptedAttributeError, Result};

/// Symmetric content key size (AES-256).
pub(crate) const CONTENT_KEY_BYTES: usize = 32;

/// HMAC-SHA256 key size.
pub(crate) const HMAC_KEY_BYTES: usize = 32;

/// Fresh random secret, zeroized on drop.
pub(crate) fn random_secret(len: usize) -> Result<Zeroizing<Vec<u8>>> {
    let mut buf = Zeroizing::new(vec![0u8; len]);
    OsRng
        .try_fill_bytes(&mut buf)
        .map_err(|e| EncryptedAttributeError::EncryptionFailure(format!("rng failure: {e}")))?;
    Ok(buf)
}

/// Fresh random IV. IVs travel on the wire, so no zeroization.
pub(crate) fn random_iv(len: usize) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; len];
    OsRng
        .try_fill_bytes(&mut buf)
        .map_err(|e| EncryptedAttributeError::EncryptionFailure(format!("rng failure: {e}")))?;
    Ok(buf)
}
