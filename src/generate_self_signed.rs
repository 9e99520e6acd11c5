//! Self-Signed Certificate Generation Module
//!
//! Builds the X.509v3 certificates for both the server and the client
//! identity. Each one is independent: issuer and subject are the same
//! distinguished name and the signature is made with the private key that
//! matches the embedded public key.
//!
//! # Certificate Properties
//! - **Version**: X.509v3
//! - **Serial Number**: constant `1` (certificates are never chained)
//! - **Validity**: backdated 30 days, forward-dated 30 days by default
//! - **Subject Alternative Name**: IP `127.0.0.1`, non-critical
//! - **Signature Algorithm**: SHA-1 with RSA (test fixtures only)
//!
//! # Example
//! ```rust,no_run
//! use loopback_pki::distinguished_name::DistinguishedName;
//! use loopback_pki::generate_keypair::generate_key_pair;
//! use loopback_pki::generate_self_signed::issue_self_signed;
//! # fn example() -> loopback_pki::Result<()> {
//!
//! let key_pair = generate_key_pair()?;
//! let subject: DistinguishedName = "C=AU, O=Acme, OU=Test Server, CN=localhost".parse()?;
//! let certificate = issue_self_signed(&key_pair, &subject)?;
//! # Ok(())
//! # }
//! ```

use std::time::{SystemTime, UNIX_EPOCH};

use openssl::asn1::Asn1Time;
use openssl::bn::BigNum;
use openssl::hash::MessageDigest;
use openssl::x509::extension::SubjectAlternativeName;
use openssl::x509::{X509Ref, X509};
use serde::Deserialize;
use tracing::debug;

use crate::distinguished_name::DistinguishedName;
use crate::error::{Error, Result};
use crate::generate_keypair::KeyPair;

const X509_VERSION_3: i32 = 2; // X509 version 3 is represented by 2
const SERIAL_NUMBER: u32 = 1;
const SECONDS_PER_DAY: i64 = 60 * 60 * 24;
pub const LOOPBACK_IP: &str = "127.0.0.1";

/// Validity window relative to the moment of issuance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ValidityWindow {
    #[serde(default = "default_days")]
    pub days_before: u32,
    #[serde(default = "default_days")]
    pub days_after: u32,
}

fn default_days() -> u32 {
    30
}

impl Default for ValidityWindow {
    fn default() -> Self {
        Self {
            days_before: default_days(),
            days_after: default_days(),
        }
    }
}

// ================= Self-Signed Certificate Builder =================

/// Builder for self-signed certificates bound to a caller-supplied key pair.
///
/// The key pair is borrowed, not generated here, so the caller decides how
/// long the private key lives and where it gets written.
pub struct SelfSignedCertBuilder {
    subject: DistinguishedName,
    validity: ValidityWindow,
}

impl SelfSignedCertBuilder {
    pub fn new(subject: DistinguishedName) -> Self {
        Self {
            subject,
            validity: ValidityWindow::default(),
        }
    }

    /// Override the default 30/30 day validity window.
    pub fn validity(mut self, validity: ValidityWindow) -> Self {
        self.validity = validity;
        self
    }

    /// Build, sign and self-check the certificate.
    ///
    /// # Errors
    /// [`Error::CertificateIssuanceFailed`] if any builder step, the signature,
    /// or the post-signing verification fails. An invalid certificate is never
    /// returned.
    pub fn build(self, key_pair: &KeyPair) -> Result<X509> {
        if self.validity.days_after == 0 {
            return Err(Error::CertificateIssuanceFailed(
                "validity window must extend past the issuance time".to_string(),
            ));
        }
        let failed = |step: &str, e: openssl::error::ErrorStack| {
            Error::CertificateIssuanceFailed(format!("Failed to {}: {}", step, e))
        };

        let private_key = key_pair.private_key();

        let mut builder = X509::builder().map_err(|e| failed("create X509 builder", e))?;
        builder
            .set_version(X509_VERSION_3)
            .map_err(|e| failed("set version", e))?;

        let serial = BigNum::from_u32(SERIAL_NUMBER)
            .and_then(|n| n.to_asn1_integer())
            .map_err(|e| failed("create serial number", e))?;
        builder
            .set_serial_number(&serial)
            .map_err(|e| failed("set serial number", e))?;

        let name = self.subject.to_x509_name()?;
        builder
            .set_subject_name(&name)
            .map_err(|e| failed("set subject", e))?;
        builder
            .set_issuer_name(&name)
            .map_err(|e| failed("set issuer", e))?;

        // Both bounds come from the same instant so the window is exact.
        let now = unix_now()?;
        let not_before =
            Asn1Time::from_unix(now - i64::from(self.validity.days_before) * SECONDS_PER_DAY)
                .map_err(|e| failed("create not_before", e))?;
        builder
            .set_not_before(&not_before)
            .map_err(|e| failed("set not_before", e))?;
        let not_after =
            Asn1Time::from_unix(now + i64::from(self.validity.days_after) * SECONDS_PER_DAY)
                .map_err(|e| failed("create not_after", e))?;
        builder
            .set_not_after(&not_after)
            .map_err(|e| failed("set not_after", e))?;

        builder
            .set_pubkey(private_key)
            .map_err(|e| failed("set public key", e))?;

        let san = SubjectAlternativeName::new()
            .ip(LOOPBACK_IP)
            .build(&builder.x509v3_context(None, None))
            .map_err(|e| failed("build SubjectAlternativeName", e))?;
        builder
            .append_extension(san)
            .map_err(|e| failed("add SubjectAlternativeName", e))?;

        builder
            .sign(private_key, MessageDigest::sha1())
            .map_err(|e| failed("sign certificate", e))?;
        let certificate = builder.build();

        self_check(&certificate, key_pair)?;
        debug!(subject = %self.subject, "issued self-signed certificate");

        Ok(certificate)
    }
}

/// Issue a self-signed certificate with the default validity window.
pub fn issue_self_signed(key_pair: &KeyPair, subject: &DistinguishedName) -> Result<X509> {
    SelfSignedCertBuilder::new(subject.clone()).build(key_pair)
}

/// Whether the current time falls inside the certificate's validity window.
pub fn is_currently_valid(certificate: &X509Ref) -> Result<bool> {
    let now = Asn1Time::days_from_now(0)
        .map_err(|e| Error::CertificateIssuanceFailed(format!("Failed to read clock: {}", e)))?;
    Ok(certificate.not_before() <= now && certificate.not_after() >= now)
}

fn self_check(certificate: &X509Ref, key_pair: &KeyPair) -> Result<()> {
    let embedded = certificate.public_key().map_err(|e| {
        Error::CertificateIssuanceFailed(format!("Failed to read certificate public key: {}", e))
    })?;
    if !embedded.public_eq(key_pair.private_key()) {
        return Err(Error::CertificateIssuanceFailed(
            "certificate public key does not match the key pair".to_string(),
        ));
    }
    let verified = certificate.verify(&embedded).map_err(|e| {
        Error::CertificateIssuanceFailed(format!("Failed to verify signature: {}", e))
    })?;
    if !verified {
        return Err(Error::CertificateIssuanceFailed(
            "signature does not verify against the embedded public key".to_string(),
        ));
    }
    if !is_currently_valid(certificate)? {
        return Err(Error::CertificateIssuanceFailed(
            "current time is outside the certificate validity window".to_string(),
        ));
    }
    debug!("certificate self-check passed");
    Ok(())
}

fn unix_now() -> Result<i64> {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| Error::CertificateIssuanceFailed(format!("System clock before epoch: {}", e)))?;
    i64::try_from(elapsed.as_secs())
        .map_err(|e| Error::CertificateIssuanceFailed(format!("System clock out of range: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate_keypair::generate_key_pair;
    use openssl::asn1::TimeDiff;

    fn server_name() -> DistinguishedName {
        DistinguishedName::new(
            "AU",
            "The Legion of the Bouncy Castle",
            "Vault Server Certificate",
            "localhost",
        )
    }

    #[test]
    fn certificate_is_self_signed_and_verifies() {
        let key_pair = generate_key_pair().unwrap();
        let cert = issue_self_signed(&key_pair, &server_name()).unwrap();

        let embedded = cert.public_key().unwrap();
        assert!(cert.verify(&embedded).unwrap());
        assert!(embedded.public_eq(key_pair.private_key()));
        assert_eq!(
            cert.subject_name().to_der().unwrap(),
            cert.issuer_name().to_der().unwrap()
        );
        assert_eq!(
            DistinguishedName::from_x509_name(cert.subject_name()),
            server_name()
        );
        assert_eq!(cert.serial_number().to_bn().unwrap(), BigNum::from_u32(1).unwrap());
        assert_eq!(cert.version(), X509_VERSION_3);
        assert_eq!(
            cert.signature_algorithm().object().nid(),
            openssl::nid::Nid::SHA1WITHRSAENCRYPTION
        );
    }

    #[test]
    fn validity_spans_sixty_days_around_issuance() {
        let key_pair = generate_key_pair().unwrap();
        let cert = issue_self_signed(&key_pair, &server_name()).unwrap();

        let now = Asn1Time::days_from_now(0).unwrap();
        assert!(cert.not_before() < now);
        assert!(cert.not_after() > now);
        assert_eq!(
            cert.not_before().diff(cert.not_after()).unwrap(),
            TimeDiff { days: 60, secs: 0 }
        );
        assert!(is_currently_valid(&cert).unwrap());
    }

    #[test]
    fn subject_alt_name_is_loopback_ip() {
        let key_pair = generate_key_pair().unwrap();
        let cert = issue_self_signed(&key_pair, &server_name()).unwrap();

        let names = cert.subject_alt_names().expect("SAN extension present");
        assert_eq!(names.len(), 1);
        assert_eq!(names.get(0).unwrap().ipaddress(), Some(&[127u8, 0, 0, 1][..]));
    }

    #[test]
    fn custom_validity_window() {
        let key_pair = generate_key_pair().unwrap();
        let cert = SelfSignedCertBuilder::new(server_name())
            .validity(ValidityWindow {
                days_before: 1,
                days_after: 2,
            })
            .build(&key_pair)
            .unwrap();

        assert_eq!(
            cert.not_before().diff(cert.not_after()).unwrap(),
            TimeDiff { days: 3, secs: 0 }
        );
    }

    #[test]
    fn self_check_rejects_certificate_for_another_key() {
        let key_pair = generate_key_pair().unwrap();
        let other = generate_key_pair().unwrap();
        let cert = issue_self_signed(&key_pair, &server_name()).unwrap();

        assert!(self_check(&cert, &key_pair).is_ok());
        assert!(matches!(
            self_check(&cert, &other),
            Err(Error::CertificateIssuanceFailed(_))
        ));
    }

    #[test]
    fn rejects_window_ending_at_issuance() {
        let key_pair = generate_key_pair().unwrap();
        let result = SelfSignedCertBuilder::new(server_name())
            .validity(ValidityWindow {
                days_before: 30,
                days_after: 0,
            })
            .build(&key_pair);

        assert!(matches!(result, Err(Error::CertificateIssuanceFailed(_))));
    }
}
