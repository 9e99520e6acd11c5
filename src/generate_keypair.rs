//! RSA Key Pair Generation Module
//!
//! Produces the 4096-bit RSA key pairs backing both identities. Key material
//! is random per call; only the strength is fixed.
//!
//! A [`KeyPair`] is meant to be short-lived: it exists long enough to sign a
//! certificate and be serialized, and is dropped at the end of the issuance
//! call that created it.

use std::fmt;

use openssl::pkey::{PKey, PKeyRef, Private, Public};
use openssl::rsa::Rsa;
use tracing::debug;

use crate::error::{Error, Result};

pub const RSA_KEY_SIZE: u32 = 4096;

/// An RSA key pair. The public half is always derivable from the private key.
pub struct KeyPair {
    private_key: PKey<Private>,
}

impl KeyPair {
    /// Borrow the private key for signing or serialization.
    pub fn private_key(&self) -> &PKeyRef<Private> {
        &self.private_key
    }

    /// Extract the public half as a standalone key.
    pub fn public_key(&self) -> Result<PKey<Public>> {
        let der = self
            .private_key
            .public_key_to_der()
            .map_err(|e| Error::EncodingFailed(format!("Failed to encode public key: {}", e)))?;
        PKey::public_key_from_der(&der)
            .map_err(|e| Error::EncodingFailed(format!("Failed to decode public key: {}", e)))
    }

    pub fn bits(&self) -> u32 {
        self.private_key.bits()
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("bits", &self.private_key.bits())
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// Generate a fresh 4096-bit RSA key pair.
///
/// # Errors
/// [`Error::AlgorithmUnavailable`] if the provider cannot generate RSA keys.
/// No certificate can be issued without one, so callers treat this as fatal.
pub fn generate_key_pair() -> Result<KeyPair> {
    debug!(bits = RSA_KEY_SIZE, "generating RSA key pair");

    let rsa = Rsa::generate(RSA_KEY_SIZE)
        .map_err(|e| Error::AlgorithmUnavailable(format!("Failed to generate RSA keypair: {}", e)))?;
    let private_key = PKey::from_rsa(rsa)
        .map_err(|e| Error::AlgorithmUnavailable(format!("Failed to create private key: {}", e)))?;

    Ok(KeyPair { private_key })
}
