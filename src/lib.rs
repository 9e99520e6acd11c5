//! Loopback PKI - Self-signed identities for local TLS fixtures
//!
//! Issues two independent, short-lived, self-signed RSA identities for a
//! service listening on `127.0.0.1`:
//!
//! ```text
//! Server identity (self-signed)   ─┐
//!                                  ├─ truststore: server certificate
//! Client identity (self-signed)   ─┴─ keystore:   client key + certificate
//! ```
//!
//! Both are written under one base directory:
//!
//! | File | Content |
//! |---|---|
//! | `cert.pem` | server certificate |
//! | `privatekey.pem` | server private key (PKCS#8) |
//! | `client-cert.pem` | client certificate |
//! | `client-privatekey.pem` | client private key (PKCS#8) |
//! | `keystore.jks` | PKCS#12: client private key + certificate |
//! | `truststore.jks` | PKCS#12: server certificate as trusted entry |
//!
//! This is not a certificate authority. There are no chains, no revocation
//! and no renewal: once issued, material is reused until the files are
//! deleted.
//!
//! # Certificates
//!
//! - **Key**: RSA 4096-bit
//! - **Signature**: SHA-1 with RSA (test use only)
//! - **Serial**: `1`
//! - **Validity**: 30 days before to 30 days after issuance
//! - **Subject Alternative Name**: IP `127.0.0.1`
//!
//! # Example
//!
//! ```no_run
//! use loopback_pki::configs::IssuanceConfig;
//! use loopback_pki::issuance::IssuanceCoordinator;
//!
//! fn main() -> loopback_pki::Result<()> {
//!     let mut coordinator = IssuanceCoordinator::new(IssuanceConfig::with_base_dir("target/ssl"));
//!     coordinator.issue_server_identity()?;
//!     coordinator.issue_client_identity()?;
//!
//!     let paths = coordinator.artifact_paths();
//!     println!("trust store at {}", paths.trust_store.display());
//!     Ok(())
//! }
//! ```
//!
//! # Error Handling
//!
//! Every operation returns [`Result`]; match on [`Error`] to find out which
//! phase failed. Nothing is retried.

pub mod configs;
pub mod credential_store;
pub mod distinguished_name;
pub mod error;
pub mod generate_keypair;
pub mod generate_self_signed;
pub mod issuance;
pub mod pem_encoding;
pub mod trust_store_encoding;

pub use error::{Error, Result};
