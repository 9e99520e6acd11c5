//! Password-protected credential stores.
//!
//! Stores are PKCS#12 containers. Two shapes are written:
//!
//! - a **trust store** holding one trusted certificate and no private key,
//!   laid out by [`crate::trust_store_encoding`] so Java runtimes see the
//!   entry as trusted
//! - a **key store** holding one private key whose certificate chain is the
//!   single matching certificate
//!
//! Each write builds a fresh container and replaces whatever was at the path.
//! There is no merge with an existing store.

use std::fs;
use std::path::Path;

use openssl::pkcs12::Pkcs12;
use openssl::pkey::{PKey, PKeyRef, Private};
use openssl::x509::{X509Ref, X509};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::trust_store_encoding::encode_trust_store;

/// Private key entry read back from a store.
pub struct KeyEntry {
    pub private_key: PKey<Private>,
    pub certificate_chain: Vec<X509>,
}

/// Everything a store holds once opened with its password.
pub struct StoreContents {
    pub key_entry: Option<KeyEntry>,
    pub trusted_certificates: Vec<X509>,
}

/// Write a store containing `certificate` as its only, trusted, entry.
pub fn write_trust_store(
    path: &Path,
    password: &SecretString,
    alias: &str,
    certificate: &X509Ref,
) -> Result<()> {
    let certificate_der = certificate
        .to_der()
        .map_err(|e| Error::store_write(path, format!("Failed to encode certificate: {}", e)))?;
    let store = encode_trust_store(alias, &certificate_der, password.expose_secret())
        .map_err(|e| Error::store_write(path, e))?;

    fs::write(path, store).map_err(|e| Error::store_write(path, e))?;
    info!(path = %path.display(), alias, "wrote trust store");
    Ok(())
}

/// Write a store containing one private key entry with a single-certificate
/// chain.
pub fn write_key_store(
    path: &Path,
    password: &SecretString,
    alias: &str,
    private_key: &PKeyRef<Private>,
    certificate: &X509Ref,
) -> Result<()> {
    let store = Pkcs12::builder()
        .name(alias)
        .pkey(private_key)
        .cert(certificate)
        .build2(password.expose_secret())
        .map_err(|e| Error::store_write(path, format!("Failed to build key store: {}", e)))?;

    let der = store
        .to_der()
        .map_err(|e| Error::store_write(path, format!("Failed to encode store: {}", e)))?;
    fs::write(path, der).map_err(|e| Error::store_write(path, e))?;
    info!(path = %path.display(), alias, "wrote key store");
    Ok(())
}

/// Open a store and return its entries.
///
/// A certificate without a matching key is reported as trusted.
pub fn open_store(path: &Path, password: &SecretString) -> Result<StoreContents> {
    let der = fs::read(path).map_err(|e| Error::store_read(path, e))?;
    let parsed = Pkcs12::from_der(&der)
        .and_then(|store| store.parse2(password.expose_secret()))
        .map_err(|e| Error::store_read(path, format!("Failed to decrypt store: {}", e)))?;

    let mut trusted_certificates: Vec<X509> = parsed
        .ca
        .map(|stack| stack.into_iter().collect())
        .unwrap_or_default();

    let key_entry = match (parsed.pkey, parsed.cert) {
        (Some(private_key), Some(certificate)) => Some(KeyEntry {
            private_key,
            certificate_chain: vec![certificate],
        }),
        (Some(_), None) => {
            return Err(Error::store_read(
                path,
                "private key entry has no certificate chain",
            ))
        }
        (None, Some(certificate)) => {
            trusted_certificates.insert(0, certificate);
            None
        }
        (None, None) => None,
    };

    debug!(
        path = %path.display(),
        has_key = key_entry.is_some(),
        trusted = trusted_certificates.len(),
        "opened credential store"
    );

    Ok(StoreContents {
        key_entry,
        trusted_certificates,
    })
}
