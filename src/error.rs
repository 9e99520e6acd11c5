//! Error types used by this crate.
//!
//! Every fallible operation returns [`Result`], and callers match on the
//! [`Error`] variant to learn which phase of issuance failed. All variants
//! are fatal for the call that produced them; nothing is retried internally.

use std::io;
use std::path::PathBuf;
use std::result;

use thiserror::Error;

/// The result type for issuance operations.
pub type Result<T> = result::Result<T, Error>;

/// The error type for issuance operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The crypto provider could not produce an RSA key pair.
    #[error("RSA key generation unavailable: {0}")]
    AlgorithmUnavailable(String),

    /// Building, signing or self-verifying a certificate failed.
    #[error("certificate issuance failed: {0}")]
    CertificateIssuanceFailed(String),

    /// DER or PEM conversion failed.
    #[error("encoding failed: {0}")]
    EncodingFailed(String),

    #[error("io failure at {}: {source}", path.display())]
    IoFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write credential store {}: {reason}", path.display())]
    StoreWriteFailed { path: PathBuf, reason: String },

    #[error("failed to open credential store {}: {reason}", path.display())]
    StoreReadFailed { path: PathBuf, reason: String },

    /// An operation was called out of order.
    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::IoFailure {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn store_write(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Error::StoreWriteFailed {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn store_read(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Error::StoreReadFailed {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
