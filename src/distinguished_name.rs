//! Distinguished names for self-signed identities.
//!
//! A [`DistinguishedName`] carries the four attributes every identity in this
//! crate uses: country, organization, organizational unit and common name.
//! Because every certificate here is self-signed, the same value is written
//! as both issuer and subject.
//!
//! The textual form mirrors the usual RFC 4514-ish layout used in test
//! fixtures:
//!
//! ```text
//! C=AU, O=The Legion of the Bouncy Castle, OU=Vault Server Certificate, CN=localhost
//! ```

use std::fmt;
use std::str::FromStr;

use openssl::nid::Nid;
use openssl::x509::{X509Name, X509NameRef};
use serde::Deserialize;

use crate::error::{Error, Result};

/// Subject (and issuer) identity of a self-signed certificate.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DistinguishedName {
    pub country: String,
    pub organization: String,
    pub organizational_unit: String,
    pub common_name: String,
}

impl DistinguishedName {
    pub fn new(
        country: impl Into<String>,
        organization: impl Into<String>,
        organizational_unit: impl Into<String>,
        common_name: impl Into<String>,
    ) -> Self {
        Self {
            country: country.into(),
            organization: organization.into(),
            organizational_unit: organizational_unit.into(),
            common_name: common_name.into(),
        }
    }

    /// Build the openssl name, entries in C, O, OU, CN order.
    pub(crate) fn to_x509_name(&self) -> Result<X509Name> {
        let failed = |field: &str, e: openssl::error::ErrorStack| {
            Error::CertificateIssuanceFailed(format!("Failed to set {}: {}", field, e))
        };

        let mut name_builder = X509Name::builder().map_err(|e| {
            Error::CertificateIssuanceFailed(format!("Failed to create name builder: {}", e))
        })?;
        name_builder
            .append_entry_by_nid(Nid::COUNTRYNAME, &self.country)
            .map_err(|e| failed("country", e))?;
        name_builder
            .append_entry_by_nid(Nid::ORGANIZATIONNAME, &self.organization)
            .map_err(|e| failed("organization", e))?;
        name_builder
            .append_entry_by_nid(Nid::ORGANIZATIONALUNITNAME, &self.organizational_unit)
            .map_err(|e| failed("organizational unit", e))?;
        name_builder
            .append_entry_by_nid(Nid::COMMONNAME, &self.common_name)
            .map_err(|e| failed("CN", e))?;

        Ok(name_builder.build())
    }

    /// Read the four attributes back out of a certificate name.
    ///
    /// Missing attributes come back as empty strings; certificates loaded from
    /// disk on the reuse path may have been crafted elsewhere.
    pub fn from_x509_name(name: &X509NameRef) -> Self {
        let entry = |nid: Nid| {
            name.entries_by_nid(nid)
                .next()
                .and_then(|e| e.data().as_utf8().ok())
                .map(|s| s.to_string())
                .unwrap_or_default()
        };

        Self {
            country: entry(Nid::COUNTRYNAME),
            organization: entry(Nid::ORGANIZATIONNAME),
            organizational_unit: entry(Nid::ORGANIZATIONALUNITNAME),
            common_name: entry(Nid::COMMONNAME),
        }
    }
}

impl fmt::Display for DistinguishedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "C={}, O={}, OU={}, CN={}",
            self.country, self.organization, self.organizational_unit, self.common_name
        )
    }
}

impl FromStr for DistinguishedName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut country = None;
        let mut organization = None;
        let mut organizational_unit = None;
        let mut common_name = None;

        for part in s.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let (key, value) = part
                .split_once('=')
                .ok_or_else(|| Error::Config(format!("malformed name component '{}'", part)))?;
            let value = value.trim().to_string();
            let slot = match key.trim().to_ascii_uppercase().as_str() {
                "C" => &mut country,
                "O" => &mut organization,
                "OU" => &mut organizational_unit,
                "CN" => &mut common_name,
                other => {
                    return Err(Error::Config(format!(
                        "unsupported name attribute '{}'",
                        other
                    )))
                }
            };
            if slot.replace(value).is_some() {
                return Err(Error::Config(format!("duplicate attribute in '{}'", s)));
            }
        }

        let require = |field: Option<String>, label: &str| {
            field.ok_or_else(|| Error::Config(format!("missing {} in '{}'", label, s)))
        };

        Ok(Self {
            country: require(country, "C")?,
            organization: require(organization, "O")?,
            organizational_unit: require(organizational_unit, "OU")?,
            common_name: require(common_name, "CN")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SERVER: &str =
        "C=AU, O=The Legion of the Bouncy Castle, OU=Vault Server Certificate, CN=localhost";

    #[test]
    fn parses_and_prints_the_same_string() {
        let dn: DistinguishedName = SERVER.parse().unwrap();
        assert_eq!(dn.country, "AU");
        assert_eq!(dn.organization, "The Legion of the Bouncy Castle");
        assert_eq!(dn.organizational_unit, "Vault Server Certificate");
        assert_eq!(dn.common_name, "localhost");
        assert_eq!(dn.to_string(), SERVER);
    }

    #[test]
    fn attribute_order_does_not_matter() {
        let dn: DistinguishedName = "CN=localhost,OU=Client Certificate,O=Acme,C=NZ"
            .parse()
            .unwrap();
        assert_eq!(
            dn,
            DistinguishedName::new("NZ", "Acme", "Client Certificate", "localhost")
        );
    }

    #[test]
    fn rejects_missing_and_unknown_attributes() {
        assert!(matches!(
            "C=AU, O=Acme, CN=localhost".parse::<DistinguishedName>(),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            "C=AU, O=Acme, OU=x, CN=localhost, L=Perth".parse::<DistinguishedName>(),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            "C=AU, C=NZ, O=Acme, OU=x, CN=localhost".parse::<DistinguishedName>(),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn x509_name_round_trip() {
        let dn: DistinguishedName = SERVER.parse().unwrap();
        let name = dn.to_x509_name().unwrap();
        assert_eq!(DistinguishedName::from_x509_name(&name), dn);
    }
}
