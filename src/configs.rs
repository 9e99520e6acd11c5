use secrecy::SecretString;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::distinguished_name::DistinguishedName;
use crate::error::{Error, Result};
use crate::generate_self_signed::ValidityWindow;

pub const DEFAULT_CONFIG_PATH: &str = "loopback-pki.toml";

#[derive(Debug, Deserialize)]
pub struct IssuanceConfig {
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,
    #[serde(default = "default_server_subject")]
    pub server_subject: DistinguishedName,
    #[serde(default = "default_client_subject")]
    pub client_subject: DistinguishedName,
    #[serde(default)]
    pub validity: ValidityWindow,
    #[serde(default = "default_store_password")]
    pub store_password: SecretString,
}

impl Default for IssuanceConfig {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
            server_subject: default_server_subject(),
            client_subject: default_client_subject(),
            validity: ValidityWindow::default(),
            store_password: default_store_password(),
        }
    }
}

fn default_base_dir() -> PathBuf {
    PathBuf::from("target/vault/config/ssl")
}

fn default_server_subject() -> DistinguishedName {
    DistinguishedName::new(
        "AU",
        "The Legion of the Bouncy Castle",
        "Vault Server Certificate",
        "localhost",
    )
}

fn default_client_subject() -> DistinguishedName {
    DistinguishedName::new(
        "AU",
        "The Legion of the Bouncy Castle",
        "Client Certificate",
        "localhost",
    )
}

fn default_store_password() -> SecretString {
    SecretString::from("password")
}

impl IssuanceConfig {
    /// Defaults with artifacts rooted at `base_dir`.
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            ..Self::default()
        }
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config_str = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;

        Self::from_toml(&config_str)
    }

    pub fn from_toml(config_str: &str) -> Result<Self> {
        toml::from_str(config_str)
            .map_err(|e| Error::Config(format!("Failed to parse config file: {}", e)))
    }

    /// Load configuration with default path (loopback-pki.toml)
    pub fn load() -> Result<Self> {
        Self::from_file(DEFAULT_CONFIG_PATH)
    }
}
