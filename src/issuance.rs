//! Issuance of the server and client identities.
//!
//! [`IssuanceCoordinator`] drives both flows and owns the server certificate
//! that the client flow needs for its trust store:
//!
//! ```text
//! Uninitialized ──issue_server_identity()──▶ ServerIssued ──issue_client_identity()──▶ ClientIssued
//! ```
//!
//! Reuse is keyed on file existence only. If `cert.pem` (or
//! `client-cert.pem`) is present it is used as-is, even when expired.
//!
//! A failed call leaves the artifact directory in an unspecified state;
//! delete it before retrying.

use std::fs;
use std::path::{Path, PathBuf};

use openssl::x509::{X509Ref, X509};
use secrecy::SecretString;
use tracing::{info, warn};

use crate::configs::IssuanceConfig;
use crate::credential_store::{write_key_store, write_trust_store};
use crate::distinguished_name::DistinguishedName;
use crate::error::{Error, Result};
use crate::generate_keypair::generate_key_pair;
use crate::generate_self_signed::{is_currently_valid, SelfSignedCertBuilder, ValidityWindow};
use crate::pem_encoding::{read_certificate, write_certificate, write_private_key};

pub const SERVER_CERT_FILE: &str = "cert.pem";
pub const SERVER_KEY_FILE: &str = "privatekey.pem";
pub const CLIENT_CERT_FILE: &str = "client-cert.pem";
pub const CLIENT_KEY_FILE: &str = "client-privatekey.pem";
pub const KEY_STORE_FILE: &str = "keystore.jks";
pub const TRUST_STORE_FILE: &str = "truststore.jks";

pub const TRUST_STORE_ALIAS: &str = "cert";
pub const KEY_STORE_ALIAS: &str = "privatekey";

/// File locations for both identities under one base directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub base_dir: PathBuf,
    pub server_cert: PathBuf,
    pub server_key: PathBuf,
    pub client_cert: PathBuf,
    pub client_key: PathBuf,
    pub key_store: PathBuf,
    pub trust_store: PathBuf,
}

impl ArtifactPaths {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        Self {
            server_cert: base_dir.join(SERVER_CERT_FILE),
            server_key: base_dir.join(SERVER_KEY_FILE),
            client_cert: base_dir.join(CLIENT_CERT_FILE),
            client_key: base_dir.join(CLIENT_KEY_FILE),
            key_store: base_dir.join(KEY_STORE_FILE),
            trust_store: base_dir.join(TRUST_STORE_FILE),
            base_dir,
        }
    }

    fn reusable(&self, cert_path: &Path) -> bool {
        self.base_dir.is_dir() && cert_path.is_file()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum IssuanceState {
    Uninitialized,
    ServerIssued,
    ClientIssued,
}

/// Issues the server identity, then the client identity that trusts it.
///
/// Not synchronized; callers on multiple threads must serialize access.
pub struct IssuanceCoordinator {
    paths: ArtifactPaths,
    server_subject: DistinguishedName,
    client_subject: DistinguishedName,
    validity: ValidityWindow,
    store_password: SecretString,
    state: IssuanceState,
    server_certificate: Option<X509>,
}

impl IssuanceCoordinator {
    pub fn new(config: IssuanceConfig) -> Self {
        Self {
            paths: ArtifactPaths::new(config.base_dir),
            server_subject: config.server_subject,
            client_subject: config.client_subject,
            validity: config.validity,
            store_password: config.store_password,
            state: IssuanceState::Uninitialized,
            server_certificate: None,
        }
    }

    pub fn artifact_paths(&self) -> &ArtifactPaths {
        &self.paths
    }

    pub fn state(&self) -> IssuanceState {
        self.state
    }

    /// The server certificate cached by [`Self::issue_server_identity`].
    pub fn server_certificate(&self) -> Option<&X509Ref> {
        self.server_certificate.as_deref()
    }

    /// Issue (or reload) the server identity.
    ///
    /// When the base directory and `cert.pem` already exist the certificate is
    /// loaded from disk and no key material is generated. Otherwise a fresh
    /// key pair and certificate are created and written as PEM.
    pub fn issue_server_identity(&mut self) -> Result<&X509Ref> {
        let certificate = if self.paths.reusable(&self.paths.server_cert) {
            let certificate = read_certificate(&self.paths.server_cert)?;
            info!(path = %self.paths.server_cert.display(), "reusing existing server certificate");
            if !is_currently_valid(&certificate)? {
                warn!(
                    path = %self.paths.server_cert.display(),
                    "reused server certificate is outside its validity window"
                );
            }
            certificate
        } else {
            fs::create_dir_all(&self.paths.base_dir)
                .map_err(|e| Error::io(&self.paths.base_dir, e))?;

            let key_pair = generate_key_pair()?;
            let certificate = SelfSignedCertBuilder::new(self.server_subject.clone())
                .validity(self.validity)
                .build(&key_pair)?;
            write_certificate(&certificate, &self.paths.server_cert)?;
            write_private_key(key_pair.private_key(), &self.paths.server_key)?;
            info!(
                subject = %self.server_subject,
                dir = %self.paths.base_dir.display(),
                "issued server identity"
            );
            certificate
        };

        self.state = self.state.max(IssuanceState::ServerIssued);
        let certificate: &X509Ref = self.server_certificate.insert(certificate);
        Ok(certificate)
    }

    /// Issue the client identity and the stores that go with it.
    ///
    /// # Errors
    /// [`Error::InvalidState`] if the server identity has not been issued in
    /// this coordinator yet.
    pub fn issue_client_identity(&mut self) -> Result<()> {
        let server_certificate = match (&self.state, &self.server_certificate) {
            (IssuanceState::Uninitialized, _) | (_, None) => {
                return Err(Error::InvalidState(
                    "client identity requested before the server identity was issued".to_string(),
                ))
            }
            (_, Some(certificate)) => certificate,
        };

        if self.paths.reusable(&self.paths.client_cert) {
            info!(path = %self.paths.client_cert.display(), "reusing existing client certificate");
            self.state = IssuanceState::ClientIssued;
            return Ok(());
        }

        write_trust_store(
            &self.paths.trust_store,
            &self.store_password,
            TRUST_STORE_ALIAS,
            server_certificate,
        )?;

        let key_pair = generate_key_pair()?;
        let certificate = SelfSignedCertBuilder::new(self.client_subject.clone())
            .validity(self.validity)
            .build(&key_pair)?;
        write_key_store(
            &self.paths.key_store,
            &self.store_password,
            KEY_STORE_ALIAS,
            key_pair.private_key(),
            &certificate,
        )?;
        write_certificate(&certificate, &self.paths.client_cert)?;
        write_private_key(key_pair.private_key(), &self.paths.client_key)?;

        info!(
            subject = %self.client_subject,
            dir = %self.paths.base_dir.display(),
            "issued client identity"
        );
        self.state = IssuanceState::ClientIssued;
        Ok(())
    }
}
